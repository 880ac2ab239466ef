//! Environment-driven configuration.
//!
//! Loaded once at startup (a `.env` file is honored when present). The LLM
//! endpoint is optional: without `MENTOR_LLM_API_KEY` the architect stays
//! unregistered and the classifier runs purely rule-based.

use crate::llm::LlmSettings;
use std::path::PathBuf;

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TEMPERATURE: f64 = 0.2;

/// Runtime configuration for the core and the chat binary.
#[derive(Debug, Clone)]
pub struct MentorConfig {
    /// SQLite database location.
    pub database_path: PathBuf,
    /// OpenAI-compatible endpoint, when configured.
    pub llm: Option<LlmSettings>,
}

impl MentorConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let database_path = lookup("MENTOR_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_database_path);

        Self {
            database_path,
            llm: llm_settings_from(lookup),
        }
    }

    /// `~/.project-mentor/sessions.db`, falling back to the working directory
    /// when no home directory is resolvable.
    pub fn default_database_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".project-mentor")
            .join("sessions.db")
    }
}

/// Assemble LLM settings from a key lookup; `None` without an api key.
fn llm_settings_from(lookup: impl Fn(&str) -> Option<String>) -> Option<LlmSettings> {
    let api_key = lookup("MENTOR_LLM_API_KEY")?;
    Some(LlmSettings {
        base_url: lookup("MENTOR_LLM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
        api_key,
        model: lookup("MENTOR_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        temperature: lookup("MENTOR_LLM_TEMPERATURE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LLM_TEMPERATURE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_no_api_key_means_no_llm() {
        let settings = llm_settings_from(lookup_from(HashMap::new()));
        assert!(settings.is_none());
    }

    #[test]
    fn test_api_key_alone_uses_defaults() {
        let settings = llm_settings_from(lookup_from(HashMap::from([(
            "MENTOR_LLM_API_KEY",
            "secret",
        )])))
        .unwrap();
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(settings.model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.temperature, DEFAULT_LLM_TEMPERATURE);
    }

    #[test]
    fn test_all_settings_overridable() {
        let settings = llm_settings_from(lookup_from(HashMap::from([
            ("MENTOR_LLM_API_KEY", "secret"),
            ("MENTOR_LLM_BASE_URL", "https://llm.internal/v1"),
            ("MENTOR_LLM_MODEL", "local-model"),
            ("MENTOR_LLM_TEMPERATURE", "0.7"),
        ])))
        .unwrap();
        assert_eq!(settings.base_url, "https://llm.internal/v1");
        assert_eq!(settings.model, "local-model");
        assert_eq!(settings.temperature, 0.7);
    }

    #[test]
    fn test_bad_temperature_falls_back_to_default() {
        let settings = llm_settings_from(lookup_from(HashMap::from([
            ("MENTOR_LLM_API_KEY", "secret"),
            ("MENTOR_LLM_TEMPERATURE", "hot"),
        ])))
        .unwrap();
        assert_eq!(settings.temperature, DEFAULT_LLM_TEMPERATURE);
    }

    #[test]
    fn test_default_database_path_ends_with_expected_file() {
        let path = MentorConfig::default_database_path();
        assert!(path.ends_with(".project-mentor/sessions.db") || path.ends_with("sessions.db"));
    }
}
