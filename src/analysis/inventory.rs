// Stack, service and relationship rollups

use crate::parser::{Configuration, ParsedInfrastructure, StackOutput};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub const ARCHITECTURE_PATTERN: &str = "Serverless Multi-Stack";
pub const PRIMARY_REGION: &str = "ap-southeast-2";
pub const DEPLOYMENT_MODEL: &str = "AWS CDK v2";

/// The `overview` view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total_stacks: usize,
    pub total_services: usize,
    pub total_resources: usize,
    pub architecture_pattern: String,
    pub primary_region: String,
    pub deployment_model: String,
}

impl Overview {
    pub fn from_parsed(parsed: &ParsedInfrastructure) -> Self {
        let stacks: BTreeSet<&str> = parsed.stacks().map(|c| c.name.as_str()).collect();
        let services: BTreeSet<&str> = parsed
            .resources()
            .filter(|c| c.has_known_service())
            .map(|c| c.service.as_str())
            .collect();

        Self {
            total_stacks: stacks.len(),
            total_services: services.len(),
            total_resources: parsed.resources().count(),
            architecture_pattern: ARCHITECTURE_PATTERN.to_string(),
            primary_region: PRIMARY_REGION.to_string(),
            deployment_model: DEPLOYMENT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub name: String,
    pub service: String,
    pub construct: String,
    pub purpose: String,
}

/// Per-stack rollup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackSummary {
    pub purpose: String,
    pub file_path: PathBuf,
    pub resource_count: usize,
    pub services_used: BTreeSet<String>,
    pub resources: Vec<ResourceSummary>,
    pub outputs: Vec<StackOutput>,
}

pub fn summarize_stacks(parsed: &ParsedInfrastructure) -> BTreeMap<String, StackSummary> {
    parsed
        .stacks()
        .map(|stack| {
            let resources: Vec<ResourceSummary> = parsed
                .components_in_stack(&stack.name)
                .map(|c| ResourceSummary {
                    name: c.name.clone(),
                    service: c.service.clone(),
                    construct: c.construct_type.clone(),
                    purpose: c.purpose.clone(),
                })
                .collect();

            let summary = StackSummary {
                purpose: stack.purpose.clone(),
                file_path: stack.source_location.file.clone(),
                resource_count: resources.len(),
                services_used: resources.iter().map(|r| r.service.clone()).collect(),
                resources,
                outputs: parsed
                    .stack_outputs
                    .get(&stack.name)
                    .cloned()
                    .unwrap_or_default(),
            };
            (stack.name.clone(), summary)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceResource {
    pub name: String,
    pub stack: String,
    pub construct: String,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceConfiguration {
    pub resource: String,
    pub config: Configuration,
}

/// Per-service rollup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub resource_count: usize,
    pub stacks_used_in: BTreeSet<String>,
    pub resources: Vec<ServiceResource>,
    pub primary_purpose: String,
    pub configurations: Vec<ResourceConfiguration>,
}

pub fn summarize_services(parsed: &ParsedInfrastructure) -> BTreeMap<String, ServiceSummary> {
    let mut services: BTreeMap<String, ServiceSummary> = BTreeMap::new();

    for component in parsed.resources() {
        let entry = services
            .entry(component.service.clone())
            .or_insert_with(|| ServiceSummary {
                resource_count: 0,
                stacks_used_in: BTreeSet::new(),
                resources: Vec::new(),
                primary_purpose: String::new(),
                configurations: Vec::new(),
            });

        entry.resource_count += 1;
        entry.stacks_used_in.insert(component.stack_name.clone());
        entry.resources.push(ServiceResource {
            name: component.name.clone(),
            stack: component.stack_name.clone(),
            construct: component.construct_type.clone(),
            purpose: component.purpose.clone(),
        });
        if !component.configuration.is_empty() {
            entry.configurations.push(ResourceConfiguration {
                resource: component.name.clone(),
                config: component.configuration.clone(),
            });
        }
    }

    for summary in services.values_mut() {
        summary.primary_purpose =
            service_purpose(summary.resources.iter().map(|r| r.purpose.as_str()));
    }

    services
}

const SERVICE_PURPOSES: &[(&[&str], &str)] = &[
    (&["storage"], "Data storage and management"),
    (&["compute", "function"], "Serverless compute and processing"),
    (&["api", "auth"], "API and authentication services"),
    (&["map", "location"], "Geographic and location services"),
];

/// Primary purpose of a service from its resources' purposes
pub fn service_purpose<'a>(purposes: impl Iterator<Item = &'a str>) -> String {
    let purposes: Vec<String> = purposes.map(str::to_lowercase).collect();
    SERVICE_PURPOSES
        .iter()
        .find(|(keywords, _)| {
            purposes
                .iter()
                .any(|p| keywords.iter().any(|k| p.contains(k)))
        })
        .map(|(_, purpose)| purpose.to_string())
        .unwrap_or_else(|| "Infrastructure services".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub source_component: String,
    pub target_component: String,
    pub description: String,
}

/// Relationships between one ordered pair of services
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipGroup {
    pub source_service: String,
    pub target_service: String,
    pub relationship_types: BTreeSet<String>,
    pub interactions: Vec<Interaction>,
}

/// Group relationships under `<source>_to_<target>`
pub fn group_relationships(parsed: &ParsedInfrastructure) -> BTreeMap<String, RelationshipGroup> {
    let mut groups: BTreeMap<String, RelationshipGroup> = BTreeMap::new();

    for rel in &parsed.service_relationships {
        let key = format!("{}_to_{}", rel.source_service, rel.target_service);
        let group = groups.entry(key).or_insert_with(|| RelationshipGroup {
            source_service: rel.source_service.clone(),
            target_service: rel.target_service.clone(),
            relationship_types: BTreeSet::new(),
            interactions: Vec::new(),
        });
        group.relationship_types.insert(rel.relationship_type.clone());
        group.interactions.push(Interaction {
            relationship_type: rel.relationship_type.clone(),
            source_component: rel.source_component.clone(),
            target_component: rel.target_component.clone(),
            description: rel.description.clone(),
        });
    }

    groups
}

/// Stack and service neighbours of a single component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentRelationships {
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
    pub interacts_with: Vec<String>,
}

/// Look up everything related to the first component named `name`.
/// Unknown names yield empty lists.
pub fn component_relationships(parsed: &ParsedInfrastructure, name: &str) -> ComponentRelationships {
    let mut related = ComponentRelationships::default();
    let Some(component) = parsed.find(name) else {
        return related;
    };
    let stack = component.owning_stack();

    for dep in &parsed.stack_dependencies {
        if dep.source_stack == stack {
            related.depends_on.push(dep.target_stack.clone());
        } else if dep.target_stack == stack {
            related.depended_by.push(dep.source_stack.clone());
        }
    }

    for rel in &parsed.service_relationships {
        if rel.source_component == name {
            related
                .interacts_with
                .push(format!("{} ({})", rel.target_component, rel.relationship_type));
        } else if rel.target_component == name {
            related
                .interacts_with
                .push(format!("{} ({})", rel.source_component, rel.relationship_type));
        }
    }

    related
}

const CRITICAL_PATTERNS: [&str; 5] = ["bucket", "table", "api", "function", "pool"];
const MAX_CRITICAL_RESOURCES: usize = 10;

/// A resource whose failure is likely to ripple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalResource {
    pub name: String,
    pub service: String,
    pub stack: String,
    pub purpose: String,
    /// Components this resource acts on
    pub dependencies: Vec<String>,
    /// Components acting on this resource
    pub dependents: Vec<String>,
}

/// Resources whose names suggest a central role, at most ten
pub fn critical_resources(parsed: &ParsedInfrastructure) -> Vec<CriticalResource> {
    parsed
        .resources()
        .filter(|c| {
            let lower = c.name.to_lowercase();
            CRITICAL_PATTERNS.iter().any(|p| lower.contains(p))
        })
        .take(MAX_CRITICAL_RESOURCES)
        .map(|c| CriticalResource {
            name: c.name.clone(),
            service: c.service.clone(),
            stack: c.stack_name.clone(),
            purpose: c.purpose.clone(),
            dependencies: linked_components(parsed, &c.name, true),
            dependents: linked_components(parsed, &c.name, false),
        })
        .collect()
}

/// Components on the other end of relationships leaving (or entering) `name`
fn linked_components(parsed: &ParsedInfrastructure, name: &str, outgoing: bool) -> Vec<String> {
    let mut linked: Vec<String> = Vec::new();
    for rel in &parsed.service_relationships {
        let (own, other) = if outgoing {
            (&rel.source_component, &rel.target_component)
        } else {
            (&rel.target_component, &rel.source_component)
        };
        if own == name && !linked.contains(other) {
            linked.push(other.clone());
        }
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{
        Component, ServiceRelationship, SourceLocation, StackDependency, UNKNOWN_SERVICE,
    };

    fn loc() -> SourceLocation {
        SourceLocation::new("infra/data_stack.py", 1)
    }

    fn fixture() -> ParsedInfrastructure {
        let mut parsed = ParsedInfrastructure::default();
        parsed.components.push(Component::stack("DataStack", "Storage", loc()));
        parsed.components.push(Component::stack("ComputeStack", "Compute", loc()));

        let mut bucket = Component::resource("raw_bucket", "DataStack", "S3", "Bucket", loc());
        bucket.purpose = "Data storage".into();
        parsed.components.push(bucket);

        let mut func = Component::resource("ingest_function", "ComputeStack", "Lambda", "Function", loc());
        func.purpose = "Serverless compute".into();
        parsed.components.push(func);

        let mut widget = Component::resource("widget", "ComputeStack", UNKNOWN_SERVICE, "Widget", loc());
        widget.purpose = "Unknown resource".into();
        parsed.components.push(widget);

        parsed.stack_dependencies.push(StackDependency::explicit("ComputeStack", "DataStack"));
        parsed.service_relationships.push(ServiceRelationship {
            source_service: "Lambda".into(),
            target_service: "S3".into(),
            relationship_type: "stores_in".into(),
            source_component: "ingest_function".into(),
            target_component: "raw_bucket".into(),
            description: "ingest_function stores_in raw_bucket".into(),
        });
        parsed.stack_outputs.insert(
            "DataStack".into(),
            vec![StackOutput {
                name: "RawBucketName".into(),
                description: "Raw bucket".into(),
            }],
        );
        parsed
    }

    #[test]
    fn test_overview_counts() {
        let overview = Overview::from_parsed(&fixture());
        assert_eq!(overview.total_stacks, 2);
        assert_eq!(overview.total_services, 2);
        assert_eq!(overview.total_resources, 3);
        assert_eq!(overview.architecture_pattern, ARCHITECTURE_PATTERN);
    }

    #[test]
    fn test_stack_summaries() {
        let stacks = summarize_stacks(&fixture());
        let data = &stacks["DataStack"];
        assert_eq!(data.resource_count, 1);
        assert!(data.services_used.contains("S3"));
        assert_eq!(data.resources[0].construct, "Bucket");
        assert_eq!(data.outputs[0].name, "RawBucketName");

        let compute = &stacks["ComputeStack"];
        assert_eq!(compute.resource_count, 2);
        assert!(compute.outputs.is_empty());
    }

    #[test]
    fn test_service_summaries() {
        let services = summarize_services(&fixture());
        assert_eq!(services.len(), 3);
        let s3 = &services["S3"];
        assert_eq!(s3.resource_count, 1);
        assert_eq!(s3.primary_purpose, "Data storage and management");
        assert!(s3.configurations.is_empty());
        assert_eq!(services["Lambda"].primary_purpose, "Serverless compute and processing");
        assert_eq!(services[UNKNOWN_SERVICE].primary_purpose, "Infrastructure services");
    }

    #[test]
    fn test_service_purpose_order() {
        let purposes = ["User authentication", "Data storage"];
        assert_eq!(
            service_purpose(purposes.iter().copied()),
            "Data storage and management"
        );
        assert_eq!(
            service_purpose(["Geographic maps"].iter().copied()),
            "Geographic and location services"
        );
    }

    #[test]
    fn test_group_relationships() {
        let groups = group_relationships(&fixture());
        let group = &groups["Lambda_to_S3"];
        assert!(group.relationship_types.contains("stores_in"));
        assert_eq!(group.interactions.len(), 1);
        let json = serde_json::to_value(group).unwrap();
        assert_eq!(json["interactions"][0]["type"], "stores_in");
    }

    #[test]
    fn test_component_relationships() {
        let parsed = fixture();
        let rel = component_relationships(&parsed, "ingest_function");
        assert_eq!(rel.depends_on, vec!["DataStack".to_string()]);
        assert!(rel.depended_by.is_empty());
        assert_eq!(rel.interacts_with, vec!["raw_bucket (stores_in)".to_string()]);

        let rel = component_relationships(&parsed, "raw_bucket");
        assert_eq!(rel.depended_by, vec!["ComputeStack".to_string()]);
        assert_eq!(rel.interacts_with, vec!["ingest_function (stores_in)".to_string()]);

        let stack = component_relationships(&parsed, "DataStack");
        assert_eq!(stack.depended_by, vec!["ComputeStack".to_string()]);

        assert_eq!(component_relationships(&parsed, "missing"), ComponentRelationships::default());
    }

    #[test]
    fn test_critical_resources() {
        let critical = critical_resources(&fixture());
        let names: Vec<&str> = critical.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["raw_bucket", "ingest_function"]);
        assert_eq!(critical[0].dependents, vec!["ingest_function".to_string()]);
        assert_eq!(critical[1].dependencies, vec!["raw_bucket".to_string()]);
    }
}
