use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

use crate::bot::{ BotVariant, Persona };

#[derive(Debug)]
pub enum PersonaError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    EmptyKeywords,
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::IoError(e) => write!(f, "Persona file IO error: {}", e),
            PersonaError::JsonError(e) => write!(f, "Persona JSON parsing error: {}", e),
            PersonaError::EmptyKeywords => write!(f, "Persona keyword list must not be empty"),
        }
    }
}

impl Error for PersonaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersonaError::IoError(e) => Some(e),
            PersonaError::JsonError(e) => Some(e),
            PersonaError::EmptyKeywords => None,
        }
    }
}

impl From<std::io::Error> for PersonaError {
    fn from(err: std::io::Error) -> Self {
        PersonaError::IoError(err)
    }
}

impl From<serde_json::Error> for PersonaError {
    fn from(err: serde_json::Error) -> Self {
        PersonaError::JsonError(err)
    }
}

/// On-disk persona override. Absent fields keep the built-in value.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PersonaOverride {
    pub name: Option<String>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub refusal: Option<String>,
    pub greeting: Option<String>,
    pub keywords: Option<Vec<String>>,
}

impl PersonaOverride {
    pub fn apply(self, mut persona: Persona) -> Result<Persona, PersonaError> {
        if let Some(name) = self.name {
            persona.name = name;
        }
        if let Some(description) = self.description {
            persona.description = description;
        }
        if let Some(scope) = self.scope {
            persona.scope = scope;
        }
        if let Some(refusal) = self.refusal {
            persona.refusal = refusal;
        }
        if let Some(greeting) = self.greeting {
            persona.greeting = greeting;
        }
        if let Some(keywords) = self.keywords {
            let keywords: Vec<String> = keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(PersonaError::EmptyKeywords);
            }
            persona.keywords = keywords;
        }
        Ok(persona)
    }
}

pub fn parse_persona_override(text: &str) -> Result<PersonaOverride, PersonaError> {
    Ok(serde_json::from_str(text)?)
}

/// Built-in persona for `variant`, with the file at `path` layered on top
/// when one is given.
pub fn load_persona<P: AsRef<Path>>(
    variant: BotVariant,
    path: Option<P>
) -> Result<Persona, PersonaError> {
    let persona = Persona::for_variant(variant);
    match path {
        Some(path) => {
            let file_content = fs::read_to_string(path.as_ref())?;
            let overrides = parse_persona_override(&file_content)?;
            info!("Applying persona overrides from {}", path.as_ref().display());
            overrides.apply(persona)
        }
        None => Ok(persona),
    }
}
