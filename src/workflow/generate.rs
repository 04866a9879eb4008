use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::bucket::Bucket;
use crate::error::{AppError, AppResult};
use crate::services::{GenerationOptions, LanguageModelService};
use crate::workflow::bucketize::Bucketizer;
use crate::workflow::extract::ChangeExtractor;

#[derive(Debug)]
pub struct GenerateOutcome {
    /// Per-bucket notes, in completion order.
    pub notes: Vec<String>,
    /// The merged document. Empty when the diff produced no buckets.
    pub document: String,
}

/// Runs the full pipeline: diff → change records → buckets → per-bucket
/// summaries → merged document.
pub async fn run(ctx: &AppContext) -> AppResult<GenerateOutcome> {
    info!("filtering files");
    let diff = ctx
        .version_control
        .diff_text(&ctx.config.git_range)
        .await?;
    let extractor = ChangeExtractor::new(
        ctx.version_control.as_ref(),
        ctx.token_counter.as_ref(),
        &ctx.config,
    );
    let records = extractor.extract(&diff).await?;

    info!("bucketing");
    let buckets = Bucketizer::new(ctx.config.tokens_limit()).bucketize(records)?;
    for (index, bucket) in buckets.iter().enumerate() {
        info!(
            bucket = index + 1,
            files = bucket.files.len(),
            tokens = bucket.token_total(),
            commits = bucket.commits.len(),
            "bucket ready"
        );
    }

    // An empty diff short-circuits: no summarize calls, no merge call.
    if buckets.is_empty() {
        return Ok(GenerateOutcome {
            notes: Vec::new(),
            document: String::new(),
        });
    }

    info!("generating release notes");
    let options = GenerationOptions {
        model: ctx.config.model.clone(),
        max_completion_tokens: ctx.config.max_completion_tokens,
        language: ctx.config.language.clone(),
        additional_context: ctx.config.additional_context.clone(),
    };
    let notes = summarize_buckets(&buckets, Arc::clone(&ctx.language_model), &options).await;

    info!("merging release notes");
    let document = ctx
        .language_model
        .merge(&notes, &options)
        .await
        .ok_or_else(|| {
            AppError::LanguageModel("failed to merge release notes".to_string())
        })?;

    Ok(GenerateOutcome { notes, document })
}

/// One task per bucket; a failed bucket contributes nothing and never
/// cancels its siblings.
async fn summarize_buckets(
    buckets: &[Bucket],
    language_model: Arc<dyn LanguageModelService>,
    options: &GenerationOptions,
) -> Vec<String> {
    let mut tasks = JoinSet::new();
    for bucket in buckets {
        let payload = bucket.payload();
        let service = Arc::clone(&language_model);
        let options = options.clone();
        tasks.spawn(async move { service.summarize(&payload, &options).await });
    }

    let mut notes = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Some(note)) => notes.push(note),
            Ok(None) => warn!("a bucket produced no release notes"),
            Err(err) => warn!("bucket summarization task failed: {err}"),
        }
    }
    notes
}
