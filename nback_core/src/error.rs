//! Error types for the progression engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("History store error: {0}")]
    History(String),

    #[error("Settings write error: {0}")]
    Settings(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
