use indexmap::IndexMap;

/// Commit id to commit message, in the order the commits were discovered
/// (newest first, matching `git log` output).
pub type CommitMap = IndexMap<String, String>;

/// One file's change within a diff range.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    /// Unique within one run's change set.
    pub filepath: String,
    pub file_name: String,
    pub extension: String,
    /// Text sent to the language model for this file: the full diff segment,
    /// or a two-line stub for deleted and binary files.
    pub content: String,
    /// Every commit in the range that touched this file. Never empty.
    pub commits: CommitMap,
    /// Token count of `content` under the active model.
    pub tokens: usize,
}

impl ChangeRecord {
    pub fn new(filepath: String, content: String, commits: CommitMap, tokens: usize) -> Self {
        let (file_name, extension) = name_and_extension(&filepath);
        Self {
            filepath,
            file_name,
            extension,
            content,
            commits,
            tokens,
        }
    }
}

/// Bare file name and extension of a path. A path without a dot in its last
/// component yields the whole component as both name and extension, matching
/// a last-dot split where no dot exists.
pub fn name_and_extension(filepath: &str) -> (String, String) {
    let file_name = filepath.rsplit('/').next().unwrap_or(filepath).to_string();
    let extension = file_name.rsplit('.').next().unwrap_or(&file_name).to_string();
    (file_name, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_and_extension() {
        let record = ChangeRecord::new(
            "src/app/main.rs".to_string(),
            String::new(),
            CommitMap::new(),
            0,
        );
        assert_eq!(record.file_name, "main.rs");
        assert_eq!(record.extension, "rs");
    }

    #[test]
    fn handles_path_without_extension() {
        let record =
            ChangeRecord::new("bin/Makefile".to_string(), String::new(), CommitMap::new(), 0);
        assert_eq!(record.file_name, "Makefile");
        assert_eq!(record.extension, "Makefile");
    }

    #[test]
    fn keeps_commit_insertion_order() {
        let mut commits = CommitMap::new();
        commits.insert("bbb".to_string(), "newer".to_string());
        commits.insert("aaa".to_string(), "older".to_string());
        let record = ChangeRecord::new("a.txt".to_string(), String::new(), commits, 1);
        let ids: Vec<&str> = record.commits.keys().map(String::as_str).collect();
        assert_eq!(ids, ["bbb", "aaa"]);
    }
}
