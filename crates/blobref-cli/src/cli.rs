use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobref",
    about = "blobref: externalize large record fields into a blob store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a configuration file and print it normalized
    Config(ConfigArgs),
    /// Save, fetch, unlink and remove a sample document
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Configuration file; defaults to an in-memory store
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Keep the sample document and its blobs instead of removing them
    #[arg(long)]
    pub keep: bool,
}
