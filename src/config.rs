//! Settings shared by the demos, resolved from environment variables.
//!
//! Demos load an optional `.env` file first, so every value below can live there as well.

use std::error::Error;
use std::fmt;
use std::fmt::Formatter;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const CHAT_MODEL: &str = "PROMPTBOOK_CHAT_MODEL";
pub const EMBEDDING_MODEL: &str = "PROMPTBOOK_EMBEDDING_MODEL";
pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const GOOGLE_CSE_ID: &str = "GOOGLE_CSE_ID";

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub deepseek_api_key: Option<String>,
    pub ollama_base_url: String,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            openai_api_key: get(OPENAI_API_KEY),
            openai_base_url: get(OPENAI_BASE_URL),
            chat_model: get(CHAT_MODEL).unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: get(EMBEDDING_MODEL).unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            deepseek_api_key: get(DEEPSEEK_API_KEY),
            ollama_base_url: get(OLLAMA_BASE_URL).unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            google_api_key: get(GOOGLE_API_KEY),
            google_cse_id: get(GOOGLE_CSE_ID),
        }
    }

    pub fn openai_api_key(&self) -> Result<&str, MissingSetting> {
        require(&self.openai_api_key, OPENAI_API_KEY)
    }

    pub fn deepseek_api_key(&self) -> Result<&str, MissingSetting> {
        require(&self.deepseek_api_key, DEEPSEEK_API_KEY)
    }

    pub fn google_api_key(&self) -> Result<&str, MissingSetting> {
        require(&self.google_api_key, GOOGLE_API_KEY)
    }

    pub fn google_cse_id(&self) -> Result<&str, MissingSetting> {
        require(&self.google_cse_id, GOOGLE_CSE_ID)
    }
}

fn require<'a>(value: &'a Option<String>, variable: &'static str) -> Result<&'a str, MissingSetting> {
    value.as_deref().ok_or(MissingSetting { variable })
}

/// Error when a required environment variable is not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSetting {
    pub variable: &'static str,
}

impl fmt::Display for MissingSetting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Please set the {} environment variable", self.variable)
    }
}

impl Error for MissingSetting {}

#[cfg(test)]
mod test_config {
    use std::collections::HashMap;
    use super::{Settings, DEFAULT_CHAT_MODEL, GOOGLE_CSE_ID};

    #[test]
    fn test_defaults_and_missing_keys() {
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("GOOGLE_API_KEY", "  "),
        ]);
        let settings = Settings::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!("sk-test", settings.openai_api_key().unwrap());
        assert_eq!(DEFAULT_CHAT_MODEL, settings.chat_model);
        assert!(settings.google_api_key().is_err());
        let err = settings.google_cse_id().unwrap_err();
        assert_eq!(GOOGLE_CSE_ID, err.variable);
        assert_eq!("Please set the GOOGLE_CSE_ID environment variable", err.to_string());
    }
}
