use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Environment-driven application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub model: String,
    pub openai_api_key: SecretString,
    /// Override for OpenAI-compatible endpoints; None uses the default.
    pub openai_base_url: Option<String>,
    pub alpha_vantage_key: SecretString,
    pub market_base_url: Option<String>,
    pub retrieval_base_url: String,
    pub portfolio_path: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let port = match std::env::var("FINCH_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "FINCH_PORT",
                value: raw,
            })?,
            Err(_) => 8000,
        };

        Ok(Self {
            port,
            model: env_or("FINCH_MODEL", "gpt-4o-mini"),
            openai_api_key,
            openai_base_url: std::env::var("OPENAI_BASE_URL").ok(),
            alpha_vantage_key: SecretString::from(env_or("ALPHAVANTAGE_API_KEY", "")),
            market_base_url: std::env::var("FINCH_MARKET_URL").ok(),
            retrieval_base_url: env_or("FINCH_RETRIEVAL_URL", "http://localhost:8100"),
            portfolio_path: PathBuf::from(env_or(
                "FINCH_PORTFOLIO_PATH",
                "./portfolios/portfolio1.json",
            )),
            allowed_origins: env_or("FINCH_ALLOWED_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back() {
        assert_eq!(env_or("FINCH_DEFINITELY_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn origins_split_and_trimmed() {
        let origins: Vec<String> = "http://a.example, http://b.example ,"
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(origins, vec!["http://a.example", "http://b.example"]);
    }
}
