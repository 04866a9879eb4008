use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tiktoken_rs::CoreBPE;

use crate::cache::ResponseCache;
use crate::error::{AppError, AppResult};
use crate::services::TokenCountService;

#[derive(Serialize)]
struct CountRequest<'a> {
    text: &'a str,
    model: &'a str,
}

/// Token counting through tiktoken, memoized in process and through the
/// content-addressed cache so re-runs over the same diff are free.
pub struct TiktokenCounter {
    cache: Arc<ResponseCache>,
    encodings: Mutex<HashMap<String, Arc<CoreBPE>>>,
}

impl TiktokenCounter {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self {
            cache,
            encodings: Mutex::new(HashMap::new()),
        }
    }

    fn encoding_for(&self, model: &str) -> AppResult<Arc<CoreBPE>> {
        let mut encodings = self
            .encodings
            .lock()
            .map_err(|_| AppError::TokenCount("tokenizer registry poisoned".to_string()))?;
        if let Some(bpe) = encodings.get(model) {
            return Ok(Arc::clone(bpe));
        }
        // Unknown model ids fall back to the o200k encoding rather than
        // failing the whole run over a name tiktoken has not catalogued.
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .or_else(|_| tiktoken_rs::o200k_base())
            .map_err(|err| AppError::TokenCount(format!("tokenizer unavailable: {err}")))?;
        let bpe = Arc::new(bpe);
        encodings.insert(model.to_string(), Arc::clone(&bpe));
        Ok(bpe)
    }
}

impl TokenCountService for TiktokenCounter {
    fn count(&self, text: &str, model: &str) -> AppResult<usize> {
        let key = ResponseCache::key(&CountRequest { text, model })?;
        if let Some(tokens) = self.cache.get::<usize>(&key) {
            return Ok(tokens);
        }

        let bpe = self.encoding_for(model)?;
        let tokens = bpe.encode_with_special_tokens(text).len();
        self.cache.put(&key, &tokens)?;
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_deterministic() {
        let counter = TiktokenCounter::new(Arc::new(ResponseCache::new(None)));
        let first = counter.count("fn main() {}", "gpt-4o-mini-2024-07-18").unwrap();
        let second = counter.count("fn main() {}", "gpt-4o-mini-2024-07-18").unwrap();
        assert_eq!(first, second);
        assert!(first > 0);
    }

    #[test]
    fn unknown_model_falls_back() {
        let counter = TiktokenCounter::new(Arc::new(ResponseCache::new(None)));
        assert!(counter.count("hello world", "some-future-model").unwrap() > 0);
    }

    #[test]
    fn cached_count_survives_re_runs() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(Some(dir.path().to_path_buf())));

        let first = TiktokenCounter::new(Arc::clone(&cache))
            .count("let x = 1;", "gpt-4o-mini-2024-07-18")
            .unwrap();
        let second = TiktokenCounter::new(cache)
            .count("let x = 1;", "gpt-4o-mini-2024-07-18")
            .unwrap();
        assert_eq!(first, second);
    }
}
