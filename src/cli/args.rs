//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate architecture docs from CDK infrastructure stacks
#[derive(Parser, Debug)]
#[command(name = "stackdoc")]
#[command(about = "Generate architecture docs from CDK infrastructure stacks")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether the chosen subcommand asked for verbose output
    pub fn verbose(&self) -> bool {
        matches!(self.command, Command::Generate { verbose: true, .. })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse the stacks and write the full documentation set
    Generate {
        /// Project root containing the CDK app
        root: PathBuf,

        /// Output directory (defaults to <root>/docs)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file path (defaults to <root>/stackdoc.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the analysis as JSON to this path
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Skip diagram generation
        #[arg(long)]
        no_diagrams: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print or export the infrastructure analysis
    Analyze {
        /// Project root containing the CDK app
        root: PathBuf,

        /// Config file path (defaults to <root>/stackdoc.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (json, summary)
        #[arg(long, default_value = "summary")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a single Mermaid diagram
    Diagram {
        /// Project root containing the CDK app
        root: PathBuf,

        /// Diagram kind (architecture, dependencies, services, data-flow,
        /// network, security, sequence, flowchart)
        kind: String,

        /// Process name for sequence diagrams and flowcharts
        #[arg(long)]
        name: Option<String>,

        /// Config file path (defaults to <root>/stackdoc.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}
