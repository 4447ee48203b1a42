// Markdown documentation generator
//
// Runs parse -> analyze -> render for every topic and hands each
// document to a sink at a fixed relative path.

use crate::analysis::{
    self, critical_resources, CriticalResource, DependencyEntry, FlowComponent,
    InfrastructureAnalysis, InfrastructureAnalyzer, StackImpact,
};
use crate::config::Config;
use crate::error::Result;
use crate::output::diagrams::DiagramGenerator;
use crate::output::sink::DocumentSink;
use crate::output::templates::TemplateEngine;
use crate::parser::{Component, ParsedInfrastructure};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tera::Context;
use tracing::{debug, info, warn};

/// Template name and output path of every generated document
pub const DOCUMENTS: [(&str, &str); 11] = [
    ("overview.md", "architecture/overview.md"),
    ("infrastructure-diagram.md", "architecture/infrastructure-diagram.md"),
    ("service-dependencies.md", "architecture/service-dependencies.md"),
    ("ingestion-pipeline.md", "data-flow/ingestion-pipeline.md"),
    ("etl-processing.md", "data-flow/etl-processing.md"),
    ("query-pipeline.md", "data-flow/query-pipeline.md"),
    ("monitoring-alerting.md", "data-flow/monitoring-alerting.md"),
    ("environment-setup.md", "deployment/environment-setup.md"),
    ("graphql-schema.md", "api/graphql-schema.md"),
    ("iam-policies.md", "security/iam-policies.md"),
    ("monitoring.md", "operations/monitoring.md"),
];

const API_SERVICES: [&str; 3] = ["AppSync", "Cognito", "API Gateway"];
const MONITORING_SERVICES: [&str; 4] = ["SNS", "SQS", "EventBridge", "CloudWatch"];
const PROVIDES_PREVIEW: usize = 3;

/// Component counts for external reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub total_components: usize,
    pub stacks: usize,
    pub resources: usize,
    pub aws_services: usize,
}

impl ComponentSummary {
    pub fn from_parsed(parsed: &ParsedInfrastructure) -> Self {
        let services: BTreeSet<&str> = parsed
            .components
            .iter()
            .filter(|c| c.has_known_service())
            .map(|c| c.service.as_str())
            .collect();

        Self {
            total_components: parsed.components.len(),
            stacks: parsed.stacks().count(),
            resources: parsed.resources().count(),
            aws_services: services.len(),
        }
    }
}

/// Report of what was generated
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Relative paths in write order
    pub written: Vec<String>,
    pub summary: ComponentSummary,
    pub warnings: Vec<String>,
    pub analysis_exported: Option<PathBuf>,
}

impl GenerationReport {
    pub fn summary(&self) -> String {
        format!(
            "Generated {} documents from {} components ({} stacks, {} resources, {} services), warnings: {}",
            self.written.len(),
            self.summary.total_components,
            self.summary.stacks,
            self.summary.resources,
            self.summary.aws_services,
            self.warnings.len()
        )
    }
}

#[derive(Debug, Serialize)]
struct ServiceRow {
    name: String,
    resource_count: usize,
    primary_purpose: String,
    stacks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ProvidedService {
    service: String,
    names: Vec<String>,
    more: usize,
}

#[derive(Debug, Serialize)]
struct StackDetail {
    name: String,
    purpose: String,
    dependencies: Vec<DependencyEntry>,
    consumed_by: Vec<String>,
    provides: Vec<ProvidedService>,
}

#[derive(Debug, Serialize)]
struct InteractionRow {
    source_service: String,
    target_service: String,
    source_component: String,
    target_component: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct RelationshipSection {
    relationship_type: String,
    interactions: Vec<InteractionRow>,
}

#[derive(Debug, Serialize)]
struct MatrixRow {
    stack: String,
    cells: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct DeploymentStep {
    stack: String,
    phase: usize,
    depends_on: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Entry {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct FunctionDetail {
    name: String,
    service: String,
    purpose: String,
    stack: String,
    configuration: Vec<Entry>,
    environment: Vec<Entry>,
}

impl From<&Component> for FunctionDetail {
    fn from(component: &Component) -> Self {
        Self {
            name: component.name.clone(),
            service: component.service.clone(),
            purpose: component.purpose.clone(),
            stack: component.stack_name.clone(),
            configuration: component
                .configuration
                .iter()
                .map(|(key, value)| Entry {
                    key: key.clone(),
                    value: value.to_string(),
                })
                .collect(),
            environment: component
                .environment_variables
                .iter()
                .map(|(key, value)| Entry {
                    key: key.clone(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

/// Orchestrates parsing, analysis, diagrams and templates
pub struct DocumentGenerator {
    config: Config,
    analyzer: InfrastructureAnalyzer,
    diagrams: DiagramGenerator,
    templates: TemplateEngine,
    timestamp: Option<String>,
}

impl DocumentGenerator {
    /// Create a generator from resolved configuration
    pub fn new(config: Config) -> Result<Self> {
        let templates = TemplateEngine::new()?;
        let diagrams = DiagramGenerator::new().with_direction(&config.diagrams.direction);
        let analyzer = InfrastructureAnalyzer::from_config(&config);
        Ok(Self {
            config,
            analyzer,
            diagrams,
            templates,
            timestamp: None,
        })
    }

    /// Show parse progress
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.analyzer = self.analyzer.with_verbose(verbose);
        self
    }

    /// Fix the "Generated on" stamp instead of using the clock
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse the project, falling back to an empty model when parsing fails
    pub fn load_model(&self) -> ParsedInfrastructure {
        match self.analyzer.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse infrastructure: {}", e);
                let mut empty = ParsedInfrastructure::default();
                empty.warnings.push(format!("Failed to parse infrastructure: {}", e));
                empty
            }
        }
    }

    /// Counts over a fresh parse
    pub fn component_summary(&self) -> ComponentSummary {
        ComponentSummary::from_parsed(&self.load_model())
    }

    /// Generate every document into `sink`
    pub fn generate_all(&self, sink: &mut dyn DocumentSink) -> Result<GenerationReport> {
        let parsed = self.load_model();
        info!("Found {} infrastructure components", parsed.components.len());
        let analysis = analysis::analyze_parsed(&parsed);

        let mut report = GenerationReport {
            summary: ComponentSummary::from_parsed(&parsed),
            warnings: parsed.warnings.clone(),
            ..GenerationReport::default()
        };

        for (relative_path, content) in self.render_all(&parsed, &analysis)? {
            sink.write(relative_path, &content)?;
            report.written.push(relative_path.to_string());
        }

        if let Some(path) = &self.config.output.export_json {
            analysis::export_analysis(&analysis, path)?;
            report.analysis_exported = Some(path.clone());
        }

        Ok(report)
    }

    /// Render every document without writing anything
    pub fn render_all(
        &self,
        parsed: &ParsedInfrastructure,
        analysis: &InfrastructureAnalysis,
    ) -> Result<Vec<(&'static str, String)>> {
        let context = self.build_context(parsed, analysis);
        DOCUMENTS
            .iter()
            .map(|(template, relative_path)| {
                debug!("Rendering {}", relative_path);
                let content = match self.process_diagram(template) {
                    Some((key, diagram)) => {
                        let mut document_context = context.clone();
                        document_context.insert(key, &diagram);
                        self.templates.render(template, &document_context)?
                    }
                    None => self.templates.render(template, &context)?,
                };
                Ok((*relative_path, content))
            })
            .collect()
    }

    fn generated_at(&self) -> String {
        self.timestamp.clone().unwrap_or_else(|| {
            chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
    }

    fn build_context(
        &self,
        parsed: &ParsedInfrastructure,
        analysis: &InfrastructureAnalysis,
    ) -> Context {
        let mut context = Context::new();
        context.insert("project_name", &self.config.project.name);
        context.insert("project_description", &self.config.project.description);
        context.insert("generated_at", &self.generated_at());
        context.insert("diagrams_enabled", &self.config.diagrams.enabled);
        context.insert("total_components", &parsed.components.len());
        context.insert("stacks_dir", &self.config.source.stacks_dir);
        context.insert("entry_file", &self.config.source.entry_file);
        context.insert("analysis", analysis);

        // diagrams
        context.insert("architecture_diagram", &self.diagrams.architecture_diagram(analysis));
        context.insert("dependency_diagram", &self.diagrams.dependency_graph(analysis));
        context.insert("service_diagram", &self.diagrams.service_relationship_diagram(analysis));
        context.insert("data_flow_diagram", &self.diagrams.data_flow_diagram(analysis));
        context.insert("network_diagram", &self.diagrams.network_diagram());
        context.insert("security_diagram", &self.diagrams.security_diagram());

        // overview
        context.insert("services_by_count", &services_by_count(analysis));
        context.insert("resources", &component_rows(parsed.resources()));

        // service dependencies
        let phases = analysis.deployment_phases();
        let phase_count = phases.values().collect::<BTreeSet<_>>().len();
        context.insert("phase_count", &phase_count);
        context.insert("relationship_count", &analysis.relationships.len());
        context.insert("stack_details", &stack_details(analysis));
        context.insert("relationship_sections", &relationship_sections(analysis));
        let critical: Vec<CriticalResource> = critical_resources(parsed);
        context.insert("critical_resources", &critical);
        let matrix = analysis.dependency_matrix();
        context.insert("matrix_stacks", &matrix.stacks);
        context.insert("matrix_rows", &matrix_rows(analysis));
        let impacts: Vec<StackImpact> = analysis.impact_analysis();
        context.insert("impacts", &impacts);

        // data flow and operations
        let ingestion_function: Option<FunctionDetail> = parsed
            .resources()
            .find(|c| c.service == "Lambda" && c.name.to_lowercase().contains("ingest"))
            .map(FunctionDetail::from);
        context.insert("ingestion_function", &ingestion_function);
        context.insert(
            "monitoring_components",
            &component_rows(
                parsed
                    .resources()
                    .filter(|c| MONITORING_SERVICES.contains(&c.service.as_str())),
            ),
        );
        context.insert(
            "health_checks",
            &component_rows(
                parsed
                    .resources()
                    .filter(|c| c.name.to_lowercase().contains("health")),
            ),
        );
        context.insert(
            "api_components",
            &component_rows(
                parsed
                    .components
                    .iter()
                    .filter(|c| API_SERVICES.contains(&c.service.as_str())),
            ),
        );
        context.insert("deployment_steps", &deployment_steps(analysis, &phases));
        context
    }

    /// Process diagram embedded by a single document
    fn process_diagram(&self, template: &str) -> Option<(&'static str, String)> {
        match template {
            "ingestion-pipeline.md" => {
                Some(("sequence_diagram", self.diagrams.sequence_diagram("data_ingestion")))
            }
            "etl-processing.md" => {
                Some(("sequence_diagram", self.diagrams.sequence_diagram("etl_processing")))
            }
            "query-pipeline.md" => {
                Some(("sequence_diagram", self.diagrams.sequence_diagram("query_processing")))
            }
            "monitoring-alerting.md" => Some(("flowchart", self.diagrams.flowchart("error_handling"))),
            "environment-setup.md" => Some(("flowchart", self.diagrams.flowchart("deployment"))),
            _ => None,
        }
    }
}

fn component_rows<'a>(components: impl Iterator<Item = &'a Component>) -> Vec<FlowComponent> {
    components.map(FlowComponent::from).collect()
}

/// Services sorted by resource count, largest first
fn services_by_count(analysis: &InfrastructureAnalysis) -> Vec<ServiceRow> {
    let mut rows: Vec<ServiceRow> = analysis
        .services
        .iter()
        .map(|(name, summary)| ServiceRow {
            name: name.clone(),
            resource_count: summary.resource_count,
            primary_purpose: summary.primary_purpose.clone(),
            stacks: summary.stacks_used_in.iter().cloned().collect(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.resource_count
            .cmp(&a.resource_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

fn stack_details(analysis: &InfrastructureAnalysis) -> Vec<StackDetail> {
    analysis
        .stacks
        .iter()
        .map(|(name, stack)| {
            let mut by_service: BTreeMap<&str, Vec<String>> = BTreeMap::new();
            for resource in &stack.resources {
                by_service
                    .entry(resource.service.as_str())
                    .or_default()
                    .push(resource.name.clone());
            }

            StackDetail {
                name: name.clone(),
                purpose: stack.purpose.clone(),
                dependencies: analysis
                    .dependencies
                    .dependency_map
                    .get(name)
                    .cloned()
                    .unwrap_or_default(),
                consumed_by: analysis.dependencies.dependents_of(name),
                provides: by_service
                    .into_iter()
                    .map(|(service, names)| ProvidedService {
                        service: service.to_string(),
                        more: names.len().saturating_sub(PROVIDES_PREVIEW),
                        names: names.into_iter().take(PROVIDES_PREVIEW).collect(),
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Interactions grouped by relationship type
fn relationship_sections(analysis: &InfrastructureAnalysis) -> Vec<RelationshipSection> {
    let mut by_type: BTreeMap<&str, Vec<InteractionRow>> = BTreeMap::new();
    for group in analysis.relationships.values() {
        for interaction in &group.interactions {
            by_type
                .entry(interaction.relationship_type.as_str())
                .or_default()
                .push(InteractionRow {
                    source_service: group.source_service.clone(),
                    target_service: group.target_service.clone(),
                    source_component: interaction.source_component.clone(),
                    target_component: interaction.target_component.clone(),
                    description: interaction.description.clone(),
                });
        }
    }

    by_type
        .into_iter()
        .map(|(relationship_type, interactions)| RelationshipSection {
            relationship_type: relationship_type.to_string(),
            interactions,
        })
        .collect()
}

fn matrix_rows(analysis: &InfrastructureAnalysis) -> Vec<MatrixRow> {
    let matrix = analysis.dependency_matrix();
    matrix
        .stacks
        .iter()
        .enumerate()
        .map(|(row, stack)| MatrixRow {
            stack: stack.clone(),
            cells: (0..matrix.stacks.len())
                .map(|col| if matrix.depends(row, col) { "✓" } else { "-" })
                .collect(),
        })
        .collect()
}

fn deployment_steps(
    analysis: &InfrastructureAnalysis,
    phases: &BTreeMap<String, usize>,
) -> Vec<DeploymentStep> {
    analysis
        .dependencies
        .deployment_order
        .iter()
        .map(|stack| DeploymentStep {
            stack: stack.clone(),
            phase: phases.get(stack).copied().unwrap_or(1),
            depends_on: analysis.dependencies.dependencies_of(stack),
        })
        .collect()
}
