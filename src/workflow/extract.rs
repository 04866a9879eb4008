use tracing::warn;

use crate::config::GenerateConfig;
use crate::domain::change::{ChangeRecord, CommitMap, name_and_extension};
use crate::error::{AppError, AppResult};
use crate::services::{TokenCountService, VersionControlService};

/// Changes above this token count are reported during extraction so outliers
/// show up before any bucket is built.
const LONG_CHANGE_WARN_TOKENS: usize = 5_000;

const DIFF_HEADER_PREFIX: &str = "diff --git";

/// Parses raw diff text into one `ChangeRecord` per file, attributed to the
/// commits in the range that touched it.
///
/// An unrecognized diff segment aborts the whole run: a silently dropped
/// file would corrupt the release notes downstream.
pub struct ChangeExtractor<'a> {
    version_control: &'a dyn VersionControlService,
    token_counter: &'a dyn TokenCountService,
    config: &'a GenerateConfig,
}

impl<'a> ChangeExtractor<'a> {
    pub fn new(
        version_control: &'a dyn VersionControlService,
        token_counter: &'a dyn TokenCountService,
        config: &'a GenerateConfig,
    ) -> Self {
        Self {
            version_control,
            token_counter,
            config,
        }
    }

    pub async fn extract(&self, diff: &str) -> AppResult<Vec<ChangeRecord>> {
        let mut records = Vec::new();

        for segment in split_segments(diff) {
            let header = segment.lines().next().unwrap_or_default();
            let action = segment.lines().nth(1).ok_or_else(|| {
                AppError::Parse(format!("diff segment has no action line: {header}"))
            })?;

            let filepath = canonical_path(header)?;
            let (file_name, extension) = name_and_extension(&filepath);

            // Lockfiles and generated files are skipped before any external
            // query is spent on them.
            if self.config.is_excluded_file(&file_name) {
                continue;
            }

            let content = self.segment_content(&segment, header, action, &extension)?;
            let commits = self.commit_attribution(&filepath).await?;
            let tokens = self.token_counter.count(&content, &self.config.model)?;

            records.push(ChangeRecord::new(filepath, content, commits, tokens));
        }

        report_long_changes(&records);
        Ok(records)
    }

    /// Deleted files and excluded binary formats are reduced to the two
    /// header lines; everything else keeps the full segment.
    fn segment_content(
        &self,
        segment: &str,
        header: &str,
        action: &str,
        extension: &str,
    ) -> AppResult<String> {
        if action.starts_with("deleted file") {
            return Ok(format!("{header}\n{action}"));
        }
        if action.starts_with("new file")
            || action.starts_with("index")
            || action.starts_with("similarity")
        {
            if self.config.is_excluded_extension(extension) {
                return Ok(format!("{header}\n{action}"));
            }
            return Ok(segment.to_string());
        }
        Err(AppError::Parse(format!("unhandled action type: {action}")))
    }

    async fn commit_attribution(&self, filepath: &str) -> AppResult<CommitMap> {
        let log = self
            .version_control
            .commit_log(&self.config.git_range, filepath)
            .await?;

        let mut commits = CommitMap::new();
        for line in log.trim().lines().filter(|line| !line.is_empty()) {
            // Split on the first space only: subjects may contain spaces.
            let (id, message) = line.split_once(' ').unwrap_or((line, ""));
            commits.insert(id.to_string(), message.to_string());
        }
        Ok(commits)
    }
}

/// Splits the diff on per-file boundary markers, keeping the marker line at
/// the head of each segment. Text before the first marker is dropped.
fn split_segments(diff: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for line in diff.lines() {
        if line.starts_with(DIFF_HEADER_PREFIX) {
            segments.push(line.to_string());
        } else if let Some(segment) = segments.last_mut() {
            segment.push('\n');
            segment.push_str(line);
        }
    }
    segments.retain(|segment| !segment.trim().is_empty());
    segments
}

/// The canonical path is the "after" side of the header line. A header
/// without one means a diff format the extractor does not understand.
fn canonical_path(header: &str) -> AppResult<String> {
    let filepath = header
        .rsplit_once(" b/")
        .map(|(_, after)| after)
        .ok_or_else(|| AppError::Parse(format!("unhandled diff case: {header}")))?;
    if filepath.is_empty() || filepath.starts_with("diff") {
        return Err(AppError::Parse(format!("unhandled diff case: {header}")));
    }
    Ok(filepath.to_string())
}

/// Reporting side effect only: extraction output order is unchanged.
fn report_long_changes(records: &[ChangeRecord]) {
    let mut by_tokens: Vec<&ChangeRecord> = records.iter().collect();
    by_tokens.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    for record in by_tokens {
        if record.tokens <= LONG_CHANGE_WARN_TOKENS {
            break;
        }
        warn!(
            tokens = record.tokens,
            filepath = %record.filepath,
            commits = ?record.commits,
            "long file change"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_EXCLUDED_EXTENSIONS, DEFAULT_EXCLUDED_FILES, DEFAULT_MODEL, GenerateConfig,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct StubVcs {
        logs: HashMap<String, String>,
    }

    #[async_trait]
    impl VersionControlService for StubVcs {
        async fn diff_text(&self, _range: &str) -> AppResult<String> {
            unreachable!("extraction receives the diff text directly")
        }

        async fn commit_log(&self, _range: &str, filepath: &str) -> AppResult<String> {
            Ok(self.logs.get(filepath).cloned().unwrap_or_default())
        }
    }

    struct WordCounter;

    impl TokenCountService for WordCounter {
        fn count(&self, text: &str, _model: &str) -> AppResult<usize> {
            Ok(text.split_whitespace().count())
        }
    }

    fn config() -> GenerateConfig {
        GenerateConfig {
            project_path: PathBuf::from("."),
            git_range: "main..develop".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_completion_tokens: 16_384,
            language: "english".to_string(),
            additional_context: String::new(),
            excluded_files: DEFAULT_EXCLUDED_FILES.iter().map(|s| s.to_string()).collect(),
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output: None,
            cache_path: None,
        }
    }

    fn logs(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(path, log)| (path.to_string(), log.to_string()))
            .collect()
    }

    async fn extract(diff: &str, vcs_logs: HashMap<String, String>) -> AppResult<Vec<ChangeRecord>> {
        let vcs = StubVcs { logs: vcs_logs };
        let config = config();
        ChangeExtractor::new(&vcs, &WordCounter, &config)
            .extract(diff)
            .await
    }

    const MODIFIED: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
index 111..222 100644\n\
--- a/src/lib.rs\n\
+++ b/src/lib.rs\n\
@@ -1 +1 @@\n\
-old\n\
+new\n";

    #[tokio::test]
    async fn emits_record_for_modified_file() {
        let records = extract(MODIFIED, logs(&[("src/lib.rs", "abc123 Fix the thing\n")]))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.filepath, "src/lib.rs");
        assert_eq!(record.file_name, "lib.rs");
        assert_eq!(record.extension, "rs");
        assert!(record.content.contains("@@ -1 +1 @@"));
        assert_eq!(record.commits.get("abc123").map(String::as_str), Some("Fix the thing"));
        assert!(record.tokens > 0);
    }

    #[tokio::test]
    async fn deleted_file_keeps_only_header_lines() {
        let diff = "diff --git a/docs/old.md b/docs/old.md\n\
deleted file mode 100644\n\
index 333..000\n\
--- a/docs/old.md\n\
+++ /dev/null\n\
@@ -1 +0,0 @@\n\
-gone\n";
        let records = extract(diff, logs(&[("docs/old.md", "def456 Remove docs\n")]))
            .await
            .unwrap();
        assert_eq!(
            records[0].content,
            "diff --git a/docs/old.md b/docs/old.md\ndeleted file mode 100644"
        );
    }

    #[tokio::test]
    async fn binary_extension_keeps_only_header_lines() {
        let diff = "diff --git a/assets/logo.png b/assets/logo.png\n\
new file mode 100644\n\
index 000..444\n\
Binary files /dev/null and b/assets/logo.png differ\n";
        let records = extract(diff, logs(&[("assets/logo.png", "aaa111 Add logo\n")]))
            .await
            .unwrap();
        assert_eq!(
            records[0].content,
            "diff --git a/assets/logo.png b/assets/logo.png\nnew file mode 100644"
        );
    }

    #[tokio::test]
    async fn skips_excluded_filenames() {
        let diff = "diff --git a/yarn.lock b/yarn.lock\n\
index 555..666 100644\n\
--- a/yarn.lock\n\
+++ b/yarn.lock\n\
@@ -1 +1 @@\n\
-x\n\
+y\n";
        let records = extract(diff, logs(&[])).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn unknown_action_is_fatal() {
        let diff = "diff --git a/a.rs b/a.rs\nsomething unexpected\n";
        let err = extract(diff, logs(&[("a.rs", "c1 m\n")])).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn missing_after_path_is_fatal() {
        let diff = "diff --git mangled-header\nindex 1..2 100644\n";
        let err = extract(diff, logs(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_diff_yields_no_records() {
        assert!(extract("", logs(&[])).await.unwrap().is_empty());
        assert!(extract("\n\n", logs(&[])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_subjects_keep_their_spaces() {
        let records = extract(
            MODIFIED,
            logs(&[(
                "src/lib.rs",
                "abc123 Fix the thing properly this time\nabc122 Earlier attempt\n",
            )]),
        )
        .await
        .unwrap();
        let commits = &records[0].commits;
        assert_eq!(
            commits.get("abc123").map(String::as_str),
            Some("Fix the thing properly this time")
        );
        let ids: Vec<&str> = commits.keys().map(String::as_str).collect();
        assert_eq!(ids, ["abc123", "abc122"]);
    }
}
