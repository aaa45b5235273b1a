use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::idealista::DEFAULT_BASE_URL;
use crate::orchestrator::SecretNames;

/// Collector configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub prefix: String,
    pub secret_names: SecretNames,
    pub secrets_file: PathBuf,
    pub storage_root: PathBuf,
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bucket: var("S3_BUCKET").context("S3_BUCKET must be set")?,
            prefix: var("S3_PREFIX").unwrap_or_else(|| "bronze/idealista/".to_string()),
            secret_names: SecretNames {
                sale: var("SECRET_NAME_SALE")
                    .or_else(|| var("SECRET_NAME_LVW"))
                    .context("SECRET_NAME_SALE (or SECRET_NAME_LVW) must be set")?,
                rent: var("SECRET_NAME_RENT")
                    .or_else(|| var("SECRET_NAME_PMV"))
                    .context("SECRET_NAME_RENT (or SECRET_NAME_PMV) must be set")?,
            },
            secrets_file: var("SECRETS_FILE")
                .unwrap_or_else(|| "secrets.json".to_string())
                .into(),
            storage_root: var("STORAGE_ROOT")
                .unwrap_or_else(|| "data".to_string())
                .into(),
            api_base_url: var("IDEALISTA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}
