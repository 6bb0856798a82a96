pub mod chat;
pub mod error;

use serde::{ Deserialize, Serialize };

pub use error::LlmError;

/// Speaker of a history entry, as the generation API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub parts: Vec<String>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: HistoryRole::User, parts: vec![text.into()] }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: HistoryRole::Model, parts: vec![text.into()] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
}
