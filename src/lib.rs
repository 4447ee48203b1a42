//! stackdoc - Generate architecture docs from CDK infrastructure stacks
//!
//! Parses Python CDK stack definitions, derives dependency, service and
//! security views, and renders them as Markdown documentation with
//! Mermaid diagrams.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{analyze_parsed, InfrastructureAnalysis, InfrastructureAnalyzer};
pub use config::Config;
pub use error::{Error, Result};
pub use output::{
    ComponentSummary, DiagramGenerator, DiagramKind, DocumentGenerator, DocumentSink, FileSink,
    MemorySink,
};
pub use parser::{Component, ParsedInfrastructure, StackParser};
