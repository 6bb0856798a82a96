pub mod classifier;
mod daily_challenge;
mod legal;

use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

pub use classifier::is_in_domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotVariant {
    DailyChallenge,
    Legal,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseBotVariantError {
    message: String,
}

impl fmt::Display for ParseBotVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseBotVariantError {}

impl FromStr for BotVariant {
    type Err = ParseBotVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "daily-challenge" | "daily" | "challenge" => Ok(BotVariant::DailyChallenge),
            "legal" | "legal-assistant" => Ok(BotVariant::Legal),
            _ =>
                Err(ParseBotVariantError {
                    message: format!("Invalid bot variant: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for BotVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotVariant::DailyChallenge => write!(f, "daily-challenge"),
            BotVariant::Legal => write!(f, "legal"),
        }
    }
}

/// Everything that makes one bot variant behave the way it does: who it says
/// it is, what it may talk about and how it turns other topics down.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub name: String,
    pub description: String,
    pub scope: String,
    pub refusal: String,
    pub greeting: String,
    /// Lower-cased at construction; matched as plain substrings.
    pub keywords: Vec<String>,
}

impl Persona {
    pub fn for_variant(variant: BotVariant) -> Self {
        let (name, description, scope, refusal, greeting, keywords) = match variant {
            BotVariant::DailyChallenge =>
                (
                    daily_challenge::NAME,
                    daily_challenge::DESCRIPTION,
                    daily_challenge::SCOPE,
                    daily_challenge::REFUSAL,
                    daily_challenge::GREETING,
                    daily_challenge::KEYWORDS,
                ),
            BotVariant::Legal =>
                (legal::NAME, legal::DESCRIPTION, legal::SCOPE, legal::REFUSAL, legal::GREETING, legal::KEYWORDS),
        };

        Self {
            name: name.to_string(),
            description: description.to_string(),
            scope: scope.to_string(),
            refusal: refusal.to_string(),
            greeting: greeting.to_string(),
            keywords: keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// First synthetic turn of every conversation sent upstream.
    pub fn acknowledgement_request(&self) -> String {
        format!("You are {}, please acknowledge your role", self.name)
    }

    /// Second synthetic turn, spoken by the model: the full persona and
    /// domain restriction, including the exact refusal wording.
    pub fn system_prompt(&self) -> String {
        format!(
            "I am {name}. {description}\n\n\
             I only answer questions about {scope}. \
             If a question is not about {scope}, I will reply exactly with: \"{refusal}\"\n\n\
             I will keep my answers clear, friendly and concise.",
            name = self.name,
            description = self.description,
            scope = self.scope,
            refusal = self.refusal
        )
    }

    pub fn is_in_domain(&self, text: &str) -> bool {
        is_in_domain(&self.keywords, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variant_names() {
        assert_eq!("legal".parse::<BotVariant>().unwrap(), BotVariant::Legal);
        assert_eq!("Daily_Challenge".parse::<BotVariant>().unwrap(), BotVariant::DailyChallenge);
        assert!("weather".parse::<BotVariant>().is_err());
    }

    #[test]
    fn keyword_lists_are_sized_and_lower_case() {
        for variant in [BotVariant::DailyChallenge, BotVariant::Legal] {
            let persona = Persona::for_variant(variant);
            assert!(
                (40..=70).contains(&persona.keywords.len()),
                "{} has {} keywords",
                variant,
                persona.keywords.len()
            );
            assert!(persona.keywords.iter().all(|k| *k == k.to_lowercase()));
        }
    }

    #[test]
    fn system_prompt_carries_refusal_verbatim() {
        let persona = Persona::for_variant(BotVariant::Legal);
        assert!(persona.system_prompt().contains(&persona.refusal));
        assert_eq!(
            persona.acknowledgement_request(),
            format!("You are {}, please acknowledge your role", persona.name)
        );
    }
}
