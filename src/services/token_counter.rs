use crate::error::AppResult;

/// Counts tokens for a text under a given model's tokenizer.
pub trait TokenCountService: Send + Sync {
    fn count(&self, text: &str, model: &str) -> AppResult<usize>;
}
