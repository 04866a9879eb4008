use crate::domain::change::{ChangeRecord, CommitMap};

/// One unit of work for the summarizer: a set of file changes whose combined
/// token count fits the budget, plus the commits they belong to in the order
/// the commits were first pulled in.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub commits: CommitMap,
    pub files: Vec<ChangeRecord>,
}

impl Bucket {
    pub fn token_total(&self) -> usize {
        self.files.iter().map(|file| file.tokens).sum()
    }

    /// Request payload for the summarizer: the bucket's commit messages
    /// followed by the concatenated file diffs.
    pub fn payload(&self) -> String {
        let commits = self
            .commits
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let diffs = self
            .files
            .iter()
            .map(|file| file.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        format!("COMMITS\n{commits}\n\nDIFF{diffs}")
    }
}
