//! CLI module for stackdoc

mod args;

pub use args::{Args, Command};

use crate::analysis::{self, InfrastructureAnalysis, InfrastructureAnalyzer};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use crate::output::{DiagramGenerator, DiagramKind, DocumentGenerator, FileSink};
use crate::parser::ParsedInfrastructure;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.verbose());

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "stackdoc=debug" } else { "stackdoc=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Generate {
            root,
            output,
            config,
            export_json,
            no_diagrams,
            verbose,
        } => {
            let mut cfg = load_config(&root, config.as_deref())?;
            cfg.merge_cli(output, export_json, no_diagrams);
            cfg.validate()?;

            if verbose {
                println!("Project root: {}", root.display());
                println!("Entry file: {}", cfg.source.entry_file.display());
                println!("Stacks: {}/{}", cfg.source.stacks_dir.display(), cfg.source.stack_pattern);
                println!("Output: {}", cfg.output.directory.display());
                println!("Diagrams: {}", cfg.diagrams.enabled);
            }

            println!("Parsing CDK infrastructure...");
            let generator = DocumentGenerator::new(cfg.clone())?.with_verbose(verbose);
            let mut sink = FileSink::new(cfg.output.directory.clone());
            let report = generator.generate_all(&mut sink)?;

            if !report.warnings.is_empty() {
                println!("\nWarnings ({}):", report.warnings.len());
                for warning in report.warnings.iter().take(5) {
                    println!("  {}", warning);
                }
                if report.warnings.len() > 5 {
                    println!("  ... and {} more", report.warnings.len() - 5);
                }
            }

            let summary = report.summary;
            println!(
                "\nComponents: {} total, {} stacks, {} resources, {} AWS services",
                summary.total_components, summary.stacks, summary.resources, summary.aws_services
            );
            println!("{}", report.summary());
            if let Some(path) = &report.analysis_exported {
                println!("Analysis written to: {}", path.display());
            }
            println!("Documentation written to: {}", sink.root().display());

            Ok(())
        }

        Command::Analyze {
            root,
            config,
            format,
            output,
        } => {
            let cfg = load_config(&root, config.as_deref())?;
            cfg.validate()?;

            let analysis = InfrastructureAnalyzer::from_config(&cfg).analyze()?;

            match (format.as_str(), output) {
                ("json", Some(path)) => {
                    analysis::export_analysis(&analysis, &path)?;
                    println!("Analysis written to: {}", path.display());
                }
                ("json", None) => println!("{}", analysis.to_json()?),
                ("summary", Some(path)) => {
                    write_file(&path, &analysis_summary(&analysis))?;
                    println!("Summary written to: {}", path.display());
                }
                ("summary", None) => print!("{}", analysis_summary(&analysis)),
                (other, _) => {
                    return Err(Error::Other(format!("Unknown format: {}", other)));
                }
            }

            Ok(())
        }

        Command::Diagram {
            root,
            kind,
            name,
            config,
        } => {
            let kind: DiagramKind = kind.parse()?;
            let cfg = load_config(&root, config.as_deref())?;
            cfg.validate()?;

            let analysis = if kind.is_derived() {
                InfrastructureAnalyzer::from_config(&cfg).analyze()?
            } else {
                analysis::analyze_parsed(&ParsedInfrastructure::default())
            };

            let generator = DiagramGenerator::new().with_direction(&cfg.diagrams.direction);
            println!("{}", generator.render(kind, &analysis, name.as_deref()));
            Ok(())
        }

        Command::Version => {
            println!("stackdoc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config for a project root. An explicit path must load;
/// the default `stackdoc.toml` is optional.
fn load_config(root: &Path, explicit: Option<&Path>) -> Result<Config> {
    if !root.exists() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }

    let cfg = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&root.join(CONFIG_FILE_NAME)),
    };
    Ok(cfg.resolve(root))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Plain-text digest of the analysis
fn analysis_summary(analysis: &InfrastructureAnalysis) -> String {
    let overview = &analysis.overview;
    let mut out = String::new();

    out.push_str(&format!("Stacks: {}\n", overview.total_stacks));
    out.push_str(&format!("Resources: {}\n", overview.total_resources));
    out.push_str(&format!("AWS services: {}\n", overview.total_services));
    out.push_str(&format!(
        "Deployment order: {}\n",
        analysis.dependencies.deployment_order.join(" -> ")
    ));

    if !analysis.stacks.is_empty() {
        out.push_str("\nStacks:\n");
        for (name, stack) in &analysis.stacks {
            out.push_str(&format!(
                "  {} ({} resources): {}\n",
                name, stack.resource_count, stack.purpose
            ));
        }
    }

    if !analysis.services.is_empty() {
        out.push_str("\nServices:\n");
        for (name, service) in &analysis.services {
            let stacks: Vec<&str> = service.stacks_used_in.iter().map(String::as_str).collect();
            out.push_str(&format!(
                "  {}: {} resources in {}\n",
                name,
                service.resource_count,
                stacks.join(", ")
            ));
        }
    }

    if analysis.dependencies.has_cycles() {
        out.push_str("\nCircular dependencies:\n");
        for cycle in &analysis.dependencies.cycles {
            out.push_str(&format!("  {}\n", cycle.join(" <-> ")));
        }
    }

    out
}
