// Diagram generation for stackdoc
//
// Generates Mermaid diagrams from the infrastructure analysis.

use crate::analysis::{FlowStage, InfrastructureAnalysis};
use crate::error::{Error, Result};
use crate::parser::UNKNOWN_SERVICE;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Prefix for node ids that would not start with a letter
const NODE_PREFIX: &str = "node_";

/// Style class per well-known stack name
const STACK_CLASSES: [(&str, &str); 5] = [
    ("DataStack", "data"),
    ("ComputeStack", "compute"),
    ("ApiStack", "api"),
    ("FrontendStack", "frontend"),
    ("LocationStack", "location"),
];

const CLASS_DEFS: [&str; 5] = [
    "classDef data fill:#e1f5fe,stroke:#0277bd",
    "classDef compute fill:#fff3e0,stroke:#ef6c00",
    "classDef api fill:#f3e5f5,stroke:#6a1b9a",
    "classDef frontend fill:#e8f5e9,stroke:#2e7d32",
    "classDef location fill:#fce4ec,stroke:#ad1457",
];

/// Diagram kinds selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Architecture,
    Dependencies,
    Services,
    DataFlow,
    Network,
    Security,
    Sequence,
    Flowchart,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 8] = [
        DiagramKind::Architecture,
        DiagramKind::Dependencies,
        DiagramKind::Services,
        DiagramKind::DataFlow,
        DiagramKind::Network,
        DiagramKind::Security,
        DiagramKind::Sequence,
        DiagramKind::Flowchart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "architecture",
            DiagramKind::Dependencies => "dependencies",
            DiagramKind::Services => "services",
            DiagramKind::DataFlow => "data-flow",
            DiagramKind::Network => "network",
            DiagramKind::Security => "security",
            DiagramKind::Sequence => "sequence",
            DiagramKind::Flowchart => "flowchart",
        }
    }

    /// Whether the diagram is built from the analysis rather than a template
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            DiagramKind::Architecture
                | DiagramKind::Dependencies
                | DiagramKind::Services
                | DiagramKind::DataFlow
        )
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                Error::other(format!(
                    "unknown diagram kind '{}' (expected one of {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Diagram generator for creating Mermaid diagrams
pub struct DiagramGenerator {
    /// Layout direction for derived graphs (TB, TD, LR, BT, RL)
    direction: String,
}

impl DiagramGenerator {
    /// Create a new diagram generator
    pub fn new() -> Self {
        Self {
            direction: "TB".to_string(),
        }
    }

    /// Set layout direction
    pub fn with_direction(mut self, dir: &str) -> Self {
        self.direction = dir.to_string();
        self
    }

    pub fn direction(&self) -> &str {
        &self.direction
    }

    /// Render one diagram by kind. `name` selects the process for
    /// sequence diagrams and flowcharts.
    pub fn render(
        &self,
        kind: DiagramKind,
        analysis: &InfrastructureAnalysis,
        name: Option<&str>,
    ) -> String {
        match kind {
            DiagramKind::Architecture => self.architecture_diagram(analysis),
            DiagramKind::Dependencies => self.dependency_graph(analysis),
            DiagramKind::Services => self.service_relationship_diagram(analysis),
            DiagramKind::DataFlow => self.data_flow_diagram(analysis),
            DiagramKind::Network => self.network_diagram(),
            DiagramKind::Security => self.security_diagram(),
            DiagramKind::Sequence => self.sequence_diagram(name.unwrap_or_default()),
            DiagramKind::Flowchart => self.flowchart(name.unwrap_or_default()),
        }
    }

    /// One subgraph per stack holding its purpose and a node per service,
    /// with stack dependency edges and the external systems
    pub fn architecture_diagram(&self, analysis: &InfrastructureAnalysis) -> String {
        let mut lines = Vec::new();
        lines.push(format!("graph {}", self.direction));

        for (stack_name, stack) in &analysis.stacks {
            let stack_id = sanitize_id(stack_name);
            lines.push(format!("    subgraph {}[\"{}\"]", stack_id, label(stack_name)));
            lines.push(format!(
                "        {}_purpose[\"{}\"]",
                stack_id,
                label(&stack.purpose)
            ));

            let mut services: BTreeMap<&str, usize> = BTreeMap::new();
            for resource in &stack.resources {
                *services.entry(resource.service.as_str()).or_default() += 1;
            }
            for (service, count) in services {
                if service == UNKNOWN_SERVICE {
                    continue;
                }
                lines.push(format!(
                    "        {}_{}[\"{}<br/>{}\"]",
                    stack_id,
                    sanitize_id(service),
                    label(service),
                    resource_count(count)
                ));
            }
            lines.push("    end".to_string());
        }

        lines.push("    subgraph external[\"External Systems\"]".to_string());
        lines.push("        data_sources[\"External Data Sources\"]".to_string());
        lines.push("        end_users[\"End Users\"]".to_string());
        lines.push("        mcp_clients[\"MCP Clients\"]".to_string());
        lines.push("    end".to_string());

        // the dependency points at its dependent
        for (source, deps) in &analysis.dependencies.dependency_map {
            for dep in deps {
                lines.push(format!(
                    "    {}_purpose --> {}_purpose",
                    sanitize_id(&dep.depends_on),
                    sanitize_id(source)
                ));
            }
        }

        lines.join("\n")
    }

    /// One subgraph per non-empty data-flow stage, chained in stage order
    pub fn data_flow_diagram(&self, analysis: &InfrastructureAnalysis) -> String {
        let mut lines = Vec::new();
        lines.push("flowchart LR".to_string());

        let mut present = Vec::new();
        for stage in FlowStage::ALL {
            let components = analysis.data_flow.stage(stage);
            if components.is_empty() {
                continue;
            }

            lines.push(format!("    subgraph {}[\"{}\"]", stage.as_str(), label(stage.title())));
            for component in components {
                lines.push(format!(
                    "        {}_{}[\"{}<br/>{}\"]",
                    stage.as_str(),
                    sanitize_id(&component.name),
                    label(&component.name),
                    label(&component.service)
                ));
            }
            lines.push("    end".to_string());
            present.push(stage.as_str());
        }

        for pair in present.windows(2) {
            lines.push(format!("    {} --> {}", pair[0], pair[1]));
        }

        lines.join("\n")
    }

    /// Stack dependency edges plus the style classes of known stacks
    pub fn dependency_graph(&self, analysis: &InfrastructureAnalysis) -> String {
        let mut lines = Vec::new();
        lines.push(format!("graph {}", self.direction));

        let mut stacks: BTreeSet<&str> = analysis.stacks.keys().map(String::as_str).collect();
        for (source, deps) in &analysis.dependencies.dependency_map {
            stacks.insert(source);
            stacks.extend(deps.iter().map(|d| d.depends_on.as_str()));
        }

        for stack in &stacks {
            lines.push(format!("    {}[\"{}\"]", sanitize_id(stack), label(stack)));
        }

        for (source, deps) in &analysis.dependencies.dependency_map {
            for dep in deps {
                lines.push(format!(
                    "    {} --> {}",
                    sanitize_id(&dep.depends_on),
                    sanitize_id(source)
                ));
            }
        }

        for class_def in CLASS_DEFS {
            lines.push(format!("    {}", class_def));
        }
        for (stack, class) in STACK_CLASSES {
            if stacks.contains(stack) {
                lines.push(format!("    class {} {}", stack, class));
            }
        }

        lines.join("\n")
    }

    /// Services with resource counts, one labelled edge per service pair
    pub fn service_relationship_diagram(&self, analysis: &InfrastructureAnalysis) -> String {
        let mut lines = Vec::new();
        lines.push("graph LR".to_string());

        for (service, summary) in &analysis.services {
            if service == UNKNOWN_SERVICE {
                continue;
            }
            lines.push(format!(
                "    {}[\"{}<br/>{}\"]",
                sanitize_id(service),
                label(service),
                resource_count(summary.resource_count)
            ));
        }

        for group in analysis.relationships.values() {
            if !analysis.services.contains_key(&group.source_service)
                || !analysis.services.contains_key(&group.target_service)
            {
                continue;
            }
            let types: Vec<&str> = group.relationship_types.iter().map(String::as_str).collect();
            lines.push(format!(
                "    {} -->|{}| {}",
                sanitize_id(&group.source_service),
                types.join(", "),
                sanitize_id(&group.target_service)
            ));
        }

        lines.join("\n")
    }

    /// Illustrative network topology
    pub fn network_diagram(&self) -> String {
        NETWORK_DIAGRAM.to_string()
    }

    /// Illustrative security layering
    pub fn security_diagram(&self) -> String {
        SECURITY_DIAGRAM.to_string()
    }

    /// Sequence diagram for a named process, generic when the name is unknown
    pub fn sequence_diagram(&self, process: &str) -> String {
        match process {
            "data_ingestion" => DATA_INGESTION_SEQUENCE,
            "etl_processing" => ETL_PROCESSING_SEQUENCE,
            "query_processing" => QUERY_PROCESSING_SEQUENCE,
            _ => GENERIC_SEQUENCE,
        }
        .to_string()
    }

    /// Flowchart for a named process, generic when the name is unknown
    pub fn flowchart(&self, process: &str) -> String {
        match process {
            "deployment" => DEPLOYMENT_FLOWCHART,
            "error_handling" => ERROR_HANDLING_FLOWCHART,
            _ => GENERIC_FLOWCHART,
        }
        .to_string()
    }
}

impl Default for DiagramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize a string for use as a Mermaid node ID
pub fn sanitize_id(s: &str) -> String {
    let id: String = s
        .chars()
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            other => other,
        })
        .collect();

    if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id
    } else {
        format!("{}{}", NODE_PREFIX, id)
    }
}

/// Escape text for a quoted Mermaid label
fn label(s: &str) -> String {
    s.replace('"', "#quot;")
}

fn resource_count(count: usize) -> String {
    if count == 1 {
        "1 resource".to_string()
    } else {
        format!("{} resources", count)
    }
}

const NETWORK_DIAGRAM: &str = r#"graph TB
    subgraph internet["Internet"]
        users["End Users"]
        sources["External Data APIs"]
    end
    subgraph edge["Edge"]
        cdn["CloudFront<br/>TLS termination"]
        waf["AWS WAF<br/>Rate limiting"]
    end
    subgraph region["AWS Region"]
        subgraph az_a["Availability Zone A"]
            compute_a["Lambda Functions"]
        end
        subgraph az_b["Availability Zone B"]
            compute_b["Lambda Functions"]
        end
        subgraph regional["Regional Services"]
            storage["S3 Buckets"]
            table["DynamoDB Tables"]
            api["AppSync API"]
        end
    end
    users -->|HTTPS 443| cdn
    users -->|HTTPS 443| waf
    waf --> api
    cdn --> api
    sources -->|HTTPS 443| compute_a
    sources -->|HTTPS 443| compute_b
    compute_a --> storage
    compute_b --> table
    api --> table
    compute_a -.->|Failover| compute_b"#;

const SECURITY_DIAGRAM: &str = r#"graph TB
    subgraph access["External Access"]
        internet["Internet Users"]
        clients["API Clients"]
    end
    subgraph edge["Edge Security"]
        waf["AWS WAF"]
        cdn["CloudFront"]
    end
    subgraph authn["Authentication"]
        user_pool["Cognito User Pool<br/>MFA"]
        identity_pool["Cognito Identity Pool<br/>Temporary credentials"]
    end
    subgraph authz["Authorization"]
        api_auth["AppSync Authorization"]
        roles["IAM Roles<br/>Least privilege"]
    end
    subgraph protection["Data Protection"]
        s3_sse["S3 Server-Side Encryption"]
        ddb_sse["DynamoDB Encryption at Rest"]
        kms["KMS Keys"]
    end
    subgraph audit["Monitoring"]
        trail["CloudTrail"]
        logs["CloudWatch Logs"]
    end
    internet -->|HTTPS| cdn
    internet -->|HTTPS| waf
    clients -->|HTTPS| waf
    waf --> api_auth
    cdn --> api_auth
    api_auth --> user_pool
    user_pool --> identity_pool
    identity_pool --> roles
    roles --> s3_sse
    roles --> ddb_sse
    s3_sse --> kms
    ddb_sse --> kms
    api_auth -.->|Audit| trail
    roles -.->|Logs| logs"#;

const DATA_INGESTION_SEQUENCE: &str = r#"sequenceDiagram
    participant Scheduler as EventBridge Rule
    participant Ingest as Ingest Function
    participant Source as External Data API
    participant Raw as Raw Data Bucket
    participant DLQ as Dead Letter Queue
    Scheduler->>Ingest: Scheduled trigger
    Ingest->>Source: Fetch latest records
    Source-->>Ingest: Response payload
    alt Fetch succeeded
        Ingest->>Raw: Store partitioned JSON
        Raw-->>Ingest: Object written
    else Fetch failed
        Ingest->>DLQ: Send failed event
    end"#;

const ETL_PROCESSING_SEQUENCE: &str = r#"sequenceDiagram
    participant Raw as Raw Data Bucket
    participant ETL as ETL Function
    participant Curated as Curated Data Bucket
    participant Table as DynamoDB Table
    participant Topic as SNS Topic
    Raw->>ETL: Object created event
    ETL->>Raw: Read raw object
    ETL->>ETL: Validate and transform
    ETL->>Curated: Write Parquet output
    ETL->>Table: Update hot aggregates
    ETL->>Topic: Publish completion notice"#;

const QUERY_PROCESSING_SEQUENCE: &str = r#"sequenceDiagram
    participant Client
    participant Auth as Cognito
    participant API as AppSync API
    participant Table as DynamoDB Table
    participant Athena
    Client->>Auth: Authenticate
    Auth-->>Client: JWT token
    Client->>API: GraphQL query
    API->>Auth: Validate token
    alt Recent data
        API->>Table: Query aggregates
        Table-->>API: Items
    else Historical data
        API->>Athena: Run SQL query
        Athena-->>API: Result set
    end
    API-->>Client: Response"#;

const GENERIC_SEQUENCE: &str = r#"sequenceDiagram
    participant User as User/Client
    participant API as API Layer
    participant Compute as Compute Layer
    participant Data as Data Layer
    User->>API: Request
    API->>Compute: Invoke
    Compute->>Data: Read or write
    Data-->>Compute: Result
    Compute-->>API: Response
    API-->>User: Response"#;

const DEPLOYMENT_FLOWCHART: &str = r#"flowchart TD
    start([Start deployment]) --> synth[cdk synth]
    synth --> diff[cdk diff]
    diff --> review{Changes approved?}
    review -->|No| abort([Abort])
    review -->|Yes| deploy[cdk deploy --all]
    deploy --> verify{Stacks healthy?}
    verify -->|Yes| done([Deployment complete])
    verify -->|No| rollback[Roll back failed stack]
    rollback --> diff"#;

const ERROR_HANDLING_FLOWCHART: &str = r#"flowchart TD
    invoke[Function invocation] --> ok{Succeeded?}
    ok -->|Yes| metrics[Publish CloudWatch metrics]
    ok -->|No| retry{Retries left?}
    retry -->|Yes| invoke
    retry -->|No| dlq[Send to dead letter queue]
    dlq --> alarm[CloudWatch alarm]
    alarm --> notify[SNS notification]
    metrics --> threshold{Threshold breached?}
    threshold -->|Yes| alarm
    threshold -->|No| healthy([Healthy])"#;

const GENERIC_FLOWCHART: &str = r#"flowchart TD
    start([Start]) --> process[Process]
    process --> check{Success?}
    check -->|Yes| finish([End])
    check -->|No| failure[Handle error]
    failure --> finish"#;
