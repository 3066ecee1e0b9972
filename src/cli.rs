use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Festival co-appearance graph enrichment and community analysis.
#[derive(Parser, Debug)]
#[clap(name = "festigraph", version, about, long_about = None)]
pub struct FestigraphArgs {
    /// Configuration file; defaults to the user config directory
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: FestigraphCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FestigraphCommand {
    /// Build the bipartite festival graph from a JSON list of [festival, artist] pairs
    Build(BuildArgs),
    /// Attach article text, language tier and sentiment to every artist
    Enrich(EnrichArgs),
    /// Detect communities and rank their characteristic terms
    Analyze(AnalyzeArgs),
    /// Build, enrich and analyze in one go
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    pub pairs: PathBuf,
    #[clap(short, long, value_name = "GRAPH")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct EnrichArgs {
    pub graph: PathBuf,
    #[clap(short, long, value_name = "GRAPH")]
    pub output: PathBuf,
}

/// Options shared by every command that runs the analysis stage.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Also write the report as JSON
    #[clap(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,
    /// Community detection seed; overrides the configured one
    #[clap(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeArgs {
    pub graph: PathBuf,
    #[command(flatten)]
    pub options: AnalysisOptions,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub pairs: PathBuf,
    /// Where the enriched graph is written
    #[clap(short, long, value_name = "GRAPH")]
    pub output: PathBuf,
    #[command(flatten)]
    pub options: AnalysisOptions,
}
