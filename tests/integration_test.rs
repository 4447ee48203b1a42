// Integration tests for stackdoc

use assert_cmd::Command;
use predicates::prelude::*;
use stackdoc::output::DOCUMENTS;
use stackdoc::{
    Config, DiagramGenerator, DocumentGenerator, FileSink, InfrastructureAnalyzer, MemorySink,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn project_config(root: &Path) -> Config {
    Config::default().resolve(root)
}

fn fixture_analyzer() -> InfrastructureAnalyzer {
    InfrastructureAnalyzer::from_config(&project_config(&fixtures_path("cdk_project")))
}

/// Two single-bucket stacks, the second depending on the first
fn write_two_stack_project(root: &Path) {
    let stacks = root.join("infrastructure");
    fs::create_dir_all(&stacks).unwrap();
    fs::write(
        root.join("app.py"),
        "app = cdk.App()\n\
         data_stack = DataStack(app, \"Data\")\n\
         compute_stack = ComputeStack(app, \"Compute\")\n\
         compute_stack.add_dependency(data_stack)\n",
    )
    .unwrap();
    fs::write(
        stacks.join("data_stack.py"),
        "from aws_cdk import Stack, aws_s3 as s3\n\n\
         class DataStack(Stack):\n    \
             def __init__(self, scope, construct_id):\n        \
                 super().__init__(scope, construct_id)\n        \
                 self.raw_bucket = s3.Bucket(self, \"Raw\")\n",
    )
    .unwrap();
    fs::write(
        stacks.join("compute_stack.py"),
        "from aws_cdk import Stack, aws_s3 as s3\n\n\
         class ComputeStack(Stack):\n    \
             def __init__(self, scope, construct_id):\n        \
                 super().__init__(scope, construct_id)\n        \
                 self.work_bucket = s3.Bucket(self, \"Work\")\n",
    )
    .unwrap();
}

// ============================================================================
// Analysis Tests
// ============================================================================

#[test]
fn test_two_stack_dependency_and_order() {
    let dir = TempDir::new().unwrap();
    write_two_stack_project(dir.path());

    let analysis = InfrastructureAnalyzer::from_config(&project_config(dir.path()))
        .analyze()
        .expect("Analysis failed");

    let deps = &analysis.dependencies;
    assert_eq!(deps.dependency_map.len(), 1);
    let entries = &deps.dependency_map["ComputeStack"];
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].depends_on, "DataStack");
    assert_eq!(entries[0].dependency_type.to_string(), "explicit");
    assert_eq!(deps.deployment_order, vec!["DataStack", "ComputeStack"]);
    assert!(deps.cycles.is_empty());

    assert_eq!(analysis.overview.total_stacks, 2);
    assert_eq!(analysis.overview.total_resources, 2);
    assert_eq!(analysis.services["S3"].resource_count, 2);
}

#[test]
fn test_fixture_project_components() {
    let parsed = fixture_analyzer().parse().expect("Parse failed");

    assert_eq!(parsed.stacks().count(), 2);
    assert_eq!(parsed.resources().count(), 6);
    assert!(parsed.warnings.is_empty(), "Unexpected warnings: {:?}", parsed.warnings);

    // no aws_sqs import, resolved by construct name
    let jobs = parsed.find("jobs").unwrap();
    assert_eq!(jobs.service, "SQS");
    assert_eq!(jobs.stack_name, "ComputeStack");

    let alerts = parsed.find("alerts").unwrap();
    assert_eq!(alerts.service, "SNS");
    assert_eq!(alerts.permissions, vec!["grant_publish".to_string()]);

    let ingest = parsed.find("ingest_fn").unwrap();
    assert_eq!(ingest.service, "Lambda");
    assert!(ingest.environment_variables.contains_key("BUCKET_NAME"));

    let outputs = &parsed.stack_outputs["DataStack"];
    assert_eq!(outputs[0].name, "RawBucketName");
}

#[test]
fn test_fixture_project_relationships() {
    let parsed = fixture_analyzer().parse().unwrap();
    assert!(parsed
        .service_relationships
        .iter()
        .any(|r| r.source_service == "Lambda"
            && r.target_service == "S3"
            && r.relationship_type == "stores_in"));
}

#[test]
fn test_analyze_is_repeatable() {
    let analyzer = fixture_analyzer();
    let first = analyzer.analyze().unwrap();
    let second = analyzer.analyze().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_analysis_json_shape() {
    let json = fixture_analyzer().analyze().unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    for key in [
        "overview",
        "stacks",
        "services",
        "dependencies",
        "relationships",
        "security",
        "data_flow",
        "naming_conventions",
    ] {
        assert!(value.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(
        value["dependencies"]["dependency_map"]["ComputeStack"][0]["type"],
        "explicit"
    );
}

#[test]
fn test_export_analysis_writes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("analysis.json");

    let analysis = fixture_analyzer().export_analysis(&path).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, analysis.to_json().unwrap());
}

#[test]
fn test_missing_stacks_dir_is_error_for_analyzer() {
    let dir = TempDir::new().unwrap();
    assert!(InfrastructureAnalyzer::from_config(&project_config(dir.path()))
        .analyze()
        .is_err());
}

// ============================================================================
// Diagram Tests
// ============================================================================

#[test]
fn test_fixture_dependency_diagram() {
    let analysis = fixture_analyzer().analyze().unwrap();
    let diagram = DiagramGenerator::new().dependency_graph(&analysis);

    assert!(diagram.starts_with("graph TB"));
    assert!(diagram.contains("DataStack --> ComputeStack"));
    assert!(diagram.contains("class DataStack"));
}

#[test]
fn test_fixture_architecture_diagram() {
    let analysis = fixture_analyzer().analyze().unwrap();
    let diagram = DiagramGenerator::new().architecture_diagram(&analysis);

    assert!(diagram.contains("subgraph"));
    assert!(diagram.contains("SQS"));
    assert!(diagram.contains("Lambda"));
}

// ============================================================================
// Document Generation Tests
// ============================================================================

#[test]
fn test_generate_into_memory() {
    let root = fixtures_path("cdk_project");
    let generator = DocumentGenerator::new(project_config(&root))
        .unwrap()
        .with_timestamp("2024-01-01 00:00:00");
    let mut sink = MemorySink::new();

    let report = generator.generate_all(&mut sink).expect("Generation failed");

    assert_eq!(report.written.len(), DOCUMENTS.len());
    assert_eq!(sink.len(), DOCUMENTS.len());
    assert_eq!(report.summary.stacks, 2);
    assert_eq!(report.summary.resources, 6);
    assert_eq!(report.summary.total_components, 8);
    assert!(report.analysis_exported.is_none());

    let overview = sink.get("architecture/overview.md").unwrap();
    assert!(overview.contains("2024-01-01 00:00:00"));
    assert!(overview.contains("```mermaid"));

    let deps = sink.get("architecture/service-dependencies.md").unwrap();
    assert!(deps.contains("DataStack"));
    assert!(deps.contains("ComputeStack"));

    let ingestion = sink.get("data-flow/ingestion-pipeline.md").unwrap();
    assert!(ingestion.contains("sequenceDiagram"));
}

#[test]
fn test_generate_without_diagrams() {
    let root = fixtures_path("cdk_project");
    let mut config = project_config(&root);
    config.merge_cli(None, None, true);

    let generator = DocumentGenerator::new(config).unwrap();
    let mut sink = MemorySink::new();
    generator.generate_all(&mut sink).unwrap();

    for (_, content) in &sink.documents {
        assert!(!content.contains("```mermaid"));
    }
}

#[test]
fn test_generate_to_disk_with_export() {
    let out = TempDir::new().unwrap();
    let root = fixtures_path("cdk_project");
    let mut config = project_config(&root);
    let json_path = out.path().join("analysis.json");
    config.merge_cli(Some(out.path().join("docs")), Some(json_path.clone()), false);

    let generator = DocumentGenerator::new(config).unwrap();
    let mut sink = FileSink::new(out.path().join("docs"));
    let report = generator.generate_all(&mut sink).unwrap();

    for (_, relative_path) in DOCUMENTS {
        assert!(
            out.path().join("docs").join(relative_path).is_file(),
            "missing {}",
            relative_path
        );
    }
    assert_eq!(report.analysis_exported, Some(json_path.clone()));
    assert!(json_path.is_file());
}

#[test]
fn test_generate_degrades_without_stacks() {
    let dir = TempDir::new().unwrap();
    let generator = DocumentGenerator::new(project_config(dir.path())).unwrap();
    let mut sink = MemorySink::new();

    let report = generator.generate_all(&mut sink).expect("Generation should not fail");

    assert_eq!(sink.len(), DOCUMENTS.len());
    assert_eq!(report.summary.total_components, 0);
    assert_eq!(report.warnings.len(), 1);
    assert!(sink
        .get("architecture/overview.md")
        .unwrap()
        .contains("No stacks were found."));
}

// ============================================================================
// CLI Tests
// ============================================================================

fn stackdoc() -> Command {
    Command::cargo_bin("stackdoc").unwrap()
}

#[test]
fn test_cli_version() {
    stackdoc()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("stackdoc "));
}

#[test]
fn test_cli_generate() {
    let out = TempDir::new().unwrap();
    let docs = out.path().join("docs");

    stackdoc()
        .arg("generate")
        .arg(fixtures_path("cdk_project"))
        .arg("--output")
        .arg(&docs)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 stacks, 6 resources"))
        .stdout(predicate::str::contains(format!(
            "Documentation written to: {}",
            docs.display()
        )));

    assert!(docs.join("architecture/overview.md").is_file());
    assert!(docs.join("operations/monitoring.md").is_file());
}

#[test]
fn test_cli_analyze_json() {
    let output = stackdoc()
        .arg("analyze")
        .arg(fixtures_path("cdk_project"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value["dependencies"]["deployment_order"],
        serde_json::json!(["DataStack", "ComputeStack"])
    );
}

#[test]
fn test_cli_analyze_summary() {
    stackdoc()
        .arg("analyze")
        .arg(fixtures_path("cdk_project"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployment order: DataStack -> ComputeStack"));
}

#[test]
fn test_cli_analyze_unknown_format() {
    stackdoc()
        .arg("analyze")
        .arg(fixtures_path("cdk_project"))
        .args(["--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown format"));
}

#[test]
fn test_cli_diagram_sequence() {
    stackdoc()
        .arg("diagram")
        .arg(fixtures_path("cdk_project"))
        .arg("sequence")
        .args(["--name", "data_ingestion"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sequenceDiagram"));
}

#[test]
fn test_cli_diagram_dependencies() {
    stackdoc()
        .arg("diagram")
        .arg(fixtures_path("cdk_project"))
        .arg("dependencies")
        .assert()
        .success()
        .stdout(predicate::str::contains("DataStack --> ComputeStack"));
}

#[test]
fn test_cli_unknown_diagram_kind() {
    stackdoc()
        .arg("diagram")
        .arg(fixtures_path("cdk_project"))
        .arg("timeline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_cli_missing_root() {
    stackdoc()
        .arg("generate")
        .arg("/nonexistent/cdk/project")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}
