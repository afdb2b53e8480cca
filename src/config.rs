use std::env;

use crate::error::{BotError, Result};

/// Process configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub database_url: String,
    pub default_prefix: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            token: env::var("DISCORD_TOKEN")
                .map_err(|_| BotError::Config("DISCORD_TOKEN not set".into()))?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| BotError::Config("DATABASE_URL not set".into()))?,
            default_prefix: env::var("DEFAULT_PREFIX").unwrap_or_else(|_| ",".into()),
        })
    }
}
