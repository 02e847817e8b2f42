use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Vigil: line-level change detection and metric tracking for data extracts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute (or reload) the line digest of a file
    Digest(DigestArgs),
    /// Write the 1-based numbers of lines new in <next> to <output>
    Diff(DiffArgs),
    /// Record one metric value in a track document
    Track(TrackArgs),
    /// Persist a JSON list of metric blocks
    SaveTracks(SaveTracksArgs),
    /// Process a batch of data files with a configuration
    Run(RunArgs),
}

#[derive(Args)]
pub struct DigestArgs {
    pub file: PathBuf,
    /// Sidecar file suffix
    #[arg(long, default_value = vigil_digest::DEFAULT_SUFFIX)]
    pub suffix: String,
    /// Discard an existing sidecar and rehash
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub previous: PathBuf,
    pub next: PathBuf,
    pub output: PathBuf,
    #[arg(long, default_value = vigil_digest::DEFAULT_SUFFIX)]
    pub suffix: String,
}

#[derive(Args)]
pub struct TrackArgs {
    pub file: PathBuf,
    pub category: String,
    pub key: String,
    pub date: String,
    /// Parsed as an integer, then a float, else kept as text
    pub value: String,
    /// Append to the key's history instead of replacing it
    #[arg(long)]
    pub history: bool,
}

#[derive(Args)]
pub struct SaveTracksArgs {
    /// JSON file holding a list of metric blocks
    pub blocks: PathBuf,
    #[arg(long)]
    pub date: String,
    /// Directory that block outputs are relative to
    #[arg(long, default_value = ".")]
    pub storage: PathBuf,
}

#[derive(Args)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// Batch name carrying the batch timestamp; defaults to the first file name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
