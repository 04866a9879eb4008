use std::fs;
use std::path::PathBuf;

use blake3::Hasher;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// Content-addressed cache for external call results: one JSON file per
/// entry, named by the hash of the serialized request. Without a directory
/// the cache is a no-op and every lookup misses.
pub struct ResponseCache {
    dir: Option<PathBuf>,
}

impl ResponseCache {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Deterministic key for a request payload.
    pub fn key<R: Serialize>(request: &R) -> AppResult<String> {
        let serialized = serde_json::to_string(request)
            .map_err(|err| AppError::Configuration(format!("unserializable cache key: {err}")))?;
        let mut hasher = Hasher::new();
        hasher.update(serialized.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }

    /// A corrupt or unreadable entry counts as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key)?;
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let Some(path) = self.entry_path(key) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string(value)
            .map_err(|err| AppError::Configuration(format!("unserializable cache entry: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }
}
