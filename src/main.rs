mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::ResponseCache;
use crate::config::{
    DEFAULT_EXCLUDED_EXTENSIONS, DEFAULT_EXCLUDED_FILES, DEFAULT_LANGUAGE,
    DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_MODEL, GenerateConfig,
};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::git::GitCli;
use crate::infra::openai::OpenAiClient;
use crate::infra::tokenizer::TiktokenCounter;

#[derive(Parser)]
#[command(
    name = "relnotes",
    author,
    version,
    about = "Generate release notes from a git commit range with a language model"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a commit range into release notes.
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the project folder.
    #[arg(short = 'p', long)]
    project_path: PathBuf,

    /// Git range for commits (e.g., main..develop).
    #[arg(short = 'r', long)]
    git_range: String,

    /// Language to use for the release notes (e.g., english, spanish).
    #[arg(short = 'l', long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Output file where to store the release notes.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directory for cached token counts and completions.
    #[arg(short = 'c', long)]
    cache_path: Option<PathBuf>,

    /// Model to use for generation.
    #[arg(short = 'm', long, requires = "max_completion_tokens")]
    model: Option<String>,

    /// Maximum number of completion tokens (required when --model is set).
    #[arg(short = 't', long)]
    max_completion_tokens: Option<u32>,

    /// Additional context to give the model for better descriptions.
    #[arg(short = 'a', long)]
    additional_context: Option<String>,

    /// File name to exclude; repeatable, replaces the default set.
    #[arg(short = 'e', long = "exclude-file")]
    exclude_file: Vec<String>,

    /// Extension to exclude; repeatable, replaces the default set.
    #[arg(short = 'x', long = "exclude-ext")]
    exclude_ext: Vec<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
    }
}

async fn run_generate(args: GenerateArgs) -> AppResult<()> {
    init_logging(args.output.is_some());

    let config = GenerateConfig {
        project_path: args.project_path,
        git_range: args.git_range,
        model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        max_completion_tokens: args
            .max_completion_tokens
            .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS),
        language: args.language,
        additional_context: args.additional_context.unwrap_or_default(),
        excluded_files: non_empty_or_defaults(args.exclude_file, DEFAULT_EXCLUDED_FILES),
        excluded_extensions: non_empty_or_defaults(args.exclude_ext, DEFAULT_EXCLUDED_EXTENSIONS),
        output: args.output,
        cache_path: args.cache_path,
    };
    config.validate()?;

    let cache = Arc::new(ResponseCache::new(config.cache_path.clone()));
    let git = Arc::new(GitCli::new(config.project_path.clone()));
    let token_counter = Arc::new(TiktokenCounter::new(Arc::clone(&cache)));
    let language_model = Arc::new(OpenAiClient::new(args.api_key, cache));

    let context = AppContext::new(config, git, token_counter, language_model);
    cmd::generate::run(&context).await
}

/// Progress lands on stderr only when the document goes to a file; a plain
/// stdout run stays quiet apart from warnings. `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "relnotes=info" } else { "relnotes=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn non_empty_or_defaults(values: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if values.is_empty() {
        defaults.iter().map(|value| value.to_string()).collect()
    } else {
        values
    }
}
