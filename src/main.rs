use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod batch;
mod config;
mod encode;
mod media;
mod plan;
mod probe;
mod progress;
mod select;

#[derive(Parser, Debug)]
#[command(
    name = "movie_converter",
    version,
    about = "Batch-convert movie containers with curated track selection and a progress UI"
)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Write a configuration skeleton to the given path
    Init { path: PathBuf },
    /// Run a batch conversion described by the configuration at the given path
    Run { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.mode {
        Mode::Init { path } => config::write_skeleton(&path),
        Mode::Run { path } => {
            let cfg = config::load(&path)?;
            let mut prompt = select::ConsolePrompt::new();
            batch::run_batch(&cfg, &mut prompt)
        }
    }
}
