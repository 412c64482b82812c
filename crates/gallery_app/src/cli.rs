//! Command-line arguments for the `gallery` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(name = "gallery", about = "Run machine-learning demos through a background worker")]
pub struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the demo catalog grouped by category.
    List {
        /// Treat an accelerator as present regardless of detection.
        #[arg(long)]
        accelerator: bool,
    },
    /// Run one request against a demo page, e.g. `/zero-shot`.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Demo route: a slug, an absolute path or a full URL.
    pub route: String,

    /// Reranking query.
    #[arg(long)]
    pub query: Option<String>,

    /// Document to rerank. Repeat for several.
    #[arg(long = "document")]
    pub documents: Vec<String>,

    /// Text to classify (one item per line) or to synthesize.
    #[arg(long)]
    pub text: Option<String>,

    /// Category label for zero-shot classification. Repeat for several.
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Speaker display name or embedding key.
    #[arg(long)]
    pub speaker: Option<String>,

    /// Where to write synthesized audio.
    #[arg(long, default_value = "speech.wav")]
    pub output: PathBuf,

    /// Cancel the request if it has not finished after this many seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Base URL that model artifacts are downloaded from.
    #[arg(long, requires = "artifacts")]
    pub artifact_base_url: Option<Url>,

    /// Artifact file below the base URL. Repeat for several.
    #[arg(long = "artifact", requires = "artifact_base_url")]
    pub artifacts: Vec<String>,
}
