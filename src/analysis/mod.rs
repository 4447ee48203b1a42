// Analysis module deriving aggregate views from parsed infrastructure

pub mod dependencies;
pub mod inventory;
pub mod naming;
pub mod posture;

pub use dependencies::{
    DependencyAnalysis, DependencyEntry, DependencyMap, DependencyMatrix, RiskLevel, StackImpact,
};
pub use inventory::{
    component_relationships, critical_resources, ComponentRelationships, CriticalResource,
    Overview, RelationshipGroup, ServiceSummary, StackSummary,
};
pub use naming::NamingConventions;
pub use posture::{DataFlow, FlowComponent, FlowStage, SecurityPosture};

use crate::config::Config;
use crate::error::Result;
use crate::parser::{ParsedInfrastructure, StackParser};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Every derived view, keyed the way it serializes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureAnalysis {
    pub overview: Overview,
    pub stacks: BTreeMap<String, StackSummary>,
    pub services: BTreeMap<String, ServiceSummary>,
    pub dependencies: DependencyAnalysis,
    pub relationships: BTreeMap<String, RelationshipGroup>,
    pub security: SecurityPosture,
    pub data_flow: DataFlow,
    pub naming_conventions: NamingConventions,
}

impl InfrastructureAnalysis {
    /// Stack names in map order
    pub fn stack_names(&self) -> Vec<String> {
        self.stacks.keys().cloned().collect()
    }

    /// Deployment phase of every stack
    pub fn deployment_phases(&self) -> BTreeMap<String, usize> {
        dependencies::deployment_phases(&self.stack_names(), &self.dependencies.dependency_map)
    }

    pub fn dependency_matrix(&self) -> DependencyMatrix {
        DependencyMatrix::build(&self.stack_names(), &self.dependencies.dependency_map)
    }

    /// Change impact for each stack
    pub fn impact_analysis(&self) -> Vec<StackImpact> {
        self.stacks
            .keys()
            .map(|stack| dependencies::impact_of(&self.dependencies.dependency_map, stack))
            .collect()
    }

    /// Pretty-printed JSON of the whole analysis
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Derive every view from one parse result
pub fn analyze_parsed(parsed: &ParsedInfrastructure) -> InfrastructureAnalysis {
    let stack_names: Vec<String> = parsed.stacks().map(|s| s.name.clone()).collect();

    InfrastructureAnalysis {
        overview: Overview::from_parsed(parsed),
        stacks: inventory::summarize_stacks(parsed),
        services: inventory::summarize_services(parsed),
        dependencies: DependencyAnalysis::build(&stack_names, &parsed.stack_dependencies),
        relationships: inventory::group_relationships(parsed),
        security: SecurityPosture::scan(&parsed.components),
        data_flow: DataFlow::classify(&parsed.components),
        naming_conventions: NamingConventions::collect(&parsed.components),
    }
}

/// Write the analysis as pretty JSON, creating parent directories
pub fn export_analysis(analysis: &InfrastructureAnalysis, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, analysis.to_json()?)?;
    tracing::info!("Infrastructure analysis exported to {}", path.display());
    Ok(())
}

/// Runs the parser over a project and derives the analysis views
pub struct InfrastructureAnalyzer {
    entry_file: PathBuf,
    stacks_dir: PathBuf,
    parser: StackParser,
}

impl InfrastructureAnalyzer {
    pub fn new(entry_file: impl Into<PathBuf>, stacks_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry_file: entry_file.into(),
            stacks_dir: stacks_dir.into(),
            parser: StackParser::new(),
        }
    }

    /// Build from resolved configuration paths
    pub fn from_config(config: &Config) -> Self {
        Self {
            entry_file: config.source.entry_file.clone(),
            stacks_dir: config.source.stacks_dir.clone(),
            parser: StackParser::from_config(&config.source),
        }
    }

    /// Show parse progress
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.parser = self.parser.with_verbose(verbose);
        self
    }

    pub fn stacks_dir(&self) -> &Path {
        &self.stacks_dir
    }

    /// Parse the project from scratch
    pub fn parse(&self) -> Result<ParsedInfrastructure> {
        self.parser.parse_all(&self.entry_file, &self.stacks_dir)
    }

    /// Parse and analyze. Every call re-reads the sources.
    pub fn analyze(&self) -> Result<InfrastructureAnalysis> {
        let parsed = self.parse()?;
        Ok(analyze_parsed(&parsed))
    }

    /// Analyze and write the result as JSON
    pub fn export_analysis(&self, path: &Path) -> Result<InfrastructureAnalysis> {
        let analysis = self.analyze()?;
        export_analysis(&analysis, path)?;
        Ok(analysis)
    }

    /// Relationships of one named component in a fresh parse
    pub fn component_relationships(&self, name: &str) -> Result<ComponentRelationships> {
        let parsed = self.parse()?;
        Ok(component_relationships(&parsed, name))
    }
}
