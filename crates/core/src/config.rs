use std::env;
use crate::error::{AppError, Result};
use dotenvy::dotenv;

/// Model used when neither `GEMINI_MODEL` nor an override is given.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// A missing API key is fatal: callers are expected to abort startup.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        Self::load_from(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, which maps variable names to values.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .ok_or_else(|| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model_name = lookup("GEMINI_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::builder()
            .with_api_key(api_key)
            .with_model(model_name)
            .build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let gemini_api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::config("Gemini API key must not be empty"))?;

        let model_name = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Config {
            gemini_api_key,
            model_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_api_key() {
        let err = Config::builder().with_model("x").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = Config::builder().with_api_key("   ").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Config::load_from(|_| None).unwrap_err();
        assert!(matches!(err, AppError::MissingEnvVar(ref name) if name == "GEMINI_API_KEY"));
    }

    #[test]
    fn load_reads_key_and_model() {
        let config = Config::load_from(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "GEMINI_MODEL" => Some("gemini-2.0-flash-exp".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.gemini_api_key, "secret");
        assert_eq!(config.model_name, "gemini-2.0-flash-exp");
    }

    #[test]
    fn builder_falls_back_to_default_model() {
        let config = Config::builder().with_api_key("key").build().unwrap();
        assert_eq!(config.model_name, DEFAULT_MODEL);

        let config = Config::builder()
            .with_api_key("key")
            .with_model("gemini-2.0-flash-exp")
            .build()
            .unwrap();
        assert_eq!(config.model_name, "gemini-2.0-flash-exp");
    }
}
