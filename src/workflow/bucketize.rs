use std::collections::VecDeque;
use std::collections::hash_map::{Entry, HashMap};
use std::mem;

use tracing::warn;

use crate::domain::bucket::Bucket;
use crate::domain::change::{ChangeRecord, CommitMap};
use crate::error::{AppError, AppResult};

/// Greedy, commit-affinity-first bin packing: commits are resolved in the
/// order they are first seen across the change records, and each commit's
/// unassigned files are packed together until the bucket budget runs out.
/// A commit whose files span a bucket boundary continues into a fresh
/// bucket; no attempt is made to backfill the leftover space with other
/// commits' files.
pub struct Bucketizer {
    tokens_limit: usize,
}

impl Bucketizer {
    pub fn new(tokens_limit: usize) -> Self {
        Self { tokens_limit }
    }

    /// Consumes the change records and moves every one of them into exactly
    /// one bucket. Each emitted bucket's counted tokens stay strictly under
    /// the budget; a file that alone meets or exceeds the budget is
    /// force-included without joining the running total.
    pub fn bucketize(&self, records: Vec<ChangeRecord>) -> AppResult<Vec<Bucket>> {
        let total = records.len();
        let (mut queue, mut commit_files) = index_commits(&records);
        let mut slots: Vec<Option<ChangeRecord>> = records.into_iter().map(Some).collect();

        let mut buckets = Vec::new();
        let mut state = PackingState::new(self.tokens_limit);

        while let Some((commit, message)) = queue.pop_front() {
            let mut pending: VecDeque<usize> =
                commit_files.remove(&commit).unwrap_or_default().into();

            while let Some(idx) = pending.front().copied() {
                // Already pulled in by an earlier commit.
                let Some(record) = slots[idx].as_ref() else {
                    pending.pop_front();
                    continue;
                };

                match state.classify(record.tokens) {
                    Fit::Overflow => {
                        // The file fits an empty bucket but not this one:
                        // flush and continue the same commit's leftovers
                        // into the next bucket.
                        buckets.push(state.flush());
                    }
                    fit => {
                        pending.pop_front();
                        let Some(file) = slots[idx].take() else {
                            continue;
                        };
                        if matches!(fit, Fit::Oversized) {
                            warn!(
                                tokens = file.tokens,
                                filepath = %file.filepath,
                                "file exceeds the bucket budget, force-including"
                            );
                        }
                        state.admit(&commit, &message, file, matches!(fit, Fit::Within));
                    }
                }
            }
        }

        if !state.is_empty() {
            buckets.push(state.flush());
        }

        let bucketed: usize = buckets.iter().map(|bucket| bucket.files.len()).sum();
        if bucketed != total {
            return Err(AppError::InternalConsistency(format!(
                "bucketed {bucketed} of {total} extracted files"
            )));
        }

        Ok(buckets)
    }
}

/// One pass over the records builds the commit work queue (first-seen order)
/// and the commit-to-file index, so the main loop never rescans the input.
fn index_commits(
    records: &[ChangeRecord],
) -> (VecDeque<(String, String)>, HashMap<String, Vec<usize>>) {
    let mut queue = VecDeque::new();
    let mut commit_files: HashMap<String, Vec<usize>> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        for (id, message) in &record.commits {
            match commit_files.entry(id.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(vec![idx]);
                    queue.push_back((id.clone(), message.clone()));
                }
                Entry::Occupied(mut entry) => entry.get_mut().push(idx),
            }
        }
    }

    (queue, commit_files)
}

enum Fit {
    /// Fits on top of the running total.
    Within,
    /// Can never fit under the budget on its own.
    Oversized,
    /// Would fit an empty bucket, not this one.
    Overflow,
}

/// The in-progress bucket plus its running token total. Oversized files are
/// admitted without being counted so they never block progress.
struct PackingState {
    tokens_limit: usize,
    tokens_count: usize,
    commits: CommitMap,
    files: Vec<ChangeRecord>,
}

impl PackingState {
    fn new(tokens_limit: usize) -> Self {
        Self {
            tokens_limit,
            tokens_count: 0,
            commits: CommitMap::new(),
            files: Vec::new(),
        }
    }

    /// Strictly exclusive comparison: a file that lands the total exactly on
    /// the limit overflows.
    fn classify(&self, tokens: usize) -> Fit {
        if self.tokens_count + tokens < self.tokens_limit {
            Fit::Within
        } else if tokens >= self.tokens_limit {
            Fit::Oversized
        } else {
            Fit::Overflow
        }
    }

    fn admit(&mut self, commit: &str, message: &str, file: ChangeRecord, counted: bool) {
        if !self.commits.contains_key(commit) {
            self.commits.insert(commit.to_string(), message.to_string());
        }
        if counted {
            self.tokens_count += file.tokens;
        }
        self.files.push(file);
    }

    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.commits.is_empty()
    }

    fn flush(&mut self) -> Bucket {
        self.tokens_count = 0;
        Bucket {
            commits: mem::take(&mut self.commits),
            files: mem::take(&mut self.files),
        }
    }
}
