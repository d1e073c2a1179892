//! Bpeel CLI - Command-line interface for subword segmentation.
//!
//! This is the main entry point for the `bpeel` command-line tool.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ApplyCommand, CharNgramsCommand, ChrfCommand, GetVocabCommand, JointVocabCommand,
};

#[derive(Parser)]
#[command(name = "bpeel")]
#[command(about = "Subword segmentation with learned merge tables", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a learned merge table to tokenized text
    Apply(ApplyCommand),
    /// Count the tokens of a corpus into a vocabulary file
    GetVocab(GetVocabCommand),
    /// Segment parallel corpora and write per-side piece vocabularies
    JointVocab(JointVocabCommand),
    /// Segment rare tokens into fixed-size character n-grams
    CharNgrams(CharNgramsCommand),
    /// Score a hypothesis against a reference with chrF
    Chrf(ChrfCommand),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(cmd) => commands::apply::run(cmd)?,
        Commands::GetVocab(cmd) => commands::get_vocab::run(cmd)?,
        Commands::JointVocab(cmd) => commands::joint_vocab::run(cmd)?,
        Commands::CharNgrams(cmd) => commands::char_ngrams::run(cmd)?,
        Commands::Chrf(cmd) => commands::chrf::run(cmd)?,
    }

    Ok(())
}
