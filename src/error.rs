use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<&str> for BotError {
    fn from(s: &str) -> Self {
        BotError::Config(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
