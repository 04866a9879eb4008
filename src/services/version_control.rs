use async_trait::async_trait;

use crate::error::AppResult;

/// Read-only queries against the project's version control history.
#[async_trait]
pub trait VersionControlService: Send + Sync {
    /// Raw multi-file diff text for a commit range such as `main..develop`.
    async fn diff_text(&self, range: &str) -> AppResult<String>;

    /// Commit log for the range restricted to one file, one commit per line
    /// formatted as `<id><space><subject>`, newest first.
    async fn commit_log(&self, range: &str, filepath: &str) -> AppResult<String>;
}
