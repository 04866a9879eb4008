use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("version control error: {0}")]
    VersionControl(String),
    #[error("diff parse error: {0}")]
    Parse(String),
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),
    #[error("language model error: {0}")]
    LanguageModel(String),
    #[error("token counting error: {0}")]
    TokenCount(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
