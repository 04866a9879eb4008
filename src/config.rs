use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini-2024-07-18";
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 16_384;
pub const DEFAULT_LANGUAGE: &str = "english";
pub const MIN_COMPLETION_TOKENS: u32 = 8_000;

/// Tokens held back from the completion budget for the model's own response
/// and instruction overhead.
pub const TOKENS_LIMIT_RESERVE: u32 = 4_000;

/// Lockfiles and generated project files that never carry reviewable changes.
pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    "yarn.lock",
    "package-lock.json",
    "Gemfile.lock",
    "Podfile.lock",
    "project.pbxproj",
];

/// Binary formats whose diff bodies are noise to a language model.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jar"];

/// Resolved configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub project_path: PathBuf,
    pub git_range: String,
    pub model: String,
    pub max_completion_tokens: u32,
    pub language: String,
    pub additional_context: String,
    pub excluded_files: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub output: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
}

impl GenerateConfig {
    /// Bucket budget: the completion budget minus the fixed reserve.
    pub fn tokens_limit(&self) -> usize {
        self.max_completion_tokens.saturating_sub(TOKENS_LIMIT_RESERVE) as usize
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.git_range.trim().is_empty() {
            return Err(AppError::Configuration(
                "git range must not be empty".to_string(),
            ));
        }
        if self.max_completion_tokens < MIN_COMPLETION_TOKENS {
            return Err(AppError::Configuration(format!(
                "max completion tokens must be at least {MIN_COMPLETION_TOKENS}, got {}",
                self.max_completion_tokens
            )));
        }
        Ok(())
    }

    pub fn is_excluded_file(&self, file_name: &str) -> bool {
        self.excluded_files.iter().any(|name| name == file_name)
    }

    pub fn is_excluded_extension(&self, extension: &str) -> bool {
        self.excluded_extensions.iter().any(|ext| ext == extension)
    }
}
