use std::env;

use anyhow::{anyhow, Result};

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    /// Override for the chat endpoint (tests, proxies).
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment. Fails fast when the API
    /// credential is missing; no partial progress is possible without it.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("DEEPSEEK_API_KEY")
            .map_err(|_| anyhow!("DEEPSEEK_API_KEY environment variable is required"))?;
        Ok(Self {
            api_key,
            model: env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
            base_url: env::var("DEEPSEEK_BASE_URL").ok(),
        })
    }
}
