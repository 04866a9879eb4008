use async_trait::async_trait;

/// Settings passed through opaquely to the generation backend.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub max_completion_tokens: u32,
    pub language: String,
    pub additional_context: String,
}

/// Text generation backend. Both operations return `None` on failure so the
/// caller decides whether a missing result is fatal: a failed bucket summary
/// is tolerated, a failed merge is not.
#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Summarize one bucket's payload into release notes.
    async fn summarize(&self, payload: &str, options: &GenerationOptions) -> Option<String>;

    /// Merge per-bucket notes into a single deduplicated document.
    async fn merge(&self, notes: &[String], options: &GenerationOptions) -> Option<String>;
}
