// Model types for parsed infrastructure
//
// These records are produced by one parse pass and treated as an immutable
// snapshot by the analyzer and the generators.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Service label used when nothing could be inferred
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Service label carried by stack components
pub const STACK_SERVICE: &str = "CloudFormation";

/// Placeholder for values the parser does not evaluate
pub const COMPLEX_VALUE: &str = "complex_value";

/// Keyword arguments of a construct call, by keyword name
pub type Configuration = BTreeMap<String, ConfigValue>;

/// A keyword argument value as recovered from source.
///
/// Literals pass through, names and attribute chains become `$`-prefixed
/// markers, and anything else collapses to `complex_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A bare identifier or dotted access chain, stored without the `$`
    Reference(String),
    Complex,
}

impl ConfigValue {
    pub fn reference(chain: &str) -> Self {
        ConfigValue::Reference(chain.to_string())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::None => write!(f, "None"),
            ConfigValue::Bool(true) => write!(f, "True"),
            ConfigValue::Bool(false) => write!(f, "False"),
            ConfigValue::Int(n) => write!(f, "{}", n),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Str(s) => write!(f, "{}", s),
            ConfigValue::Reference(chain) => write!(f, "${}", chain),
            ConfigValue::Complex => write!(f, "{}", COMPLEX_VALUE),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::None => serializer.serialize_none(),
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Int(n) => serializer.serialize_i64(*n),
            ConfigValue::Float(x) => serializer.serialize_f64(*x),
            ConfigValue::Str(s) => serializer.serialize_str(s),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// Whether a component is a stack or a resource inside one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Stack,
    Resource,
}

/// Where a declaration was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// A declared stack or resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
    pub service: String,
    pub construct_type: String,
    pub purpose: String,
    pub configuration: Configuration,
    /// Owning stack, empty for the stack component itself
    pub stack_name: String,
    pub source_location: SourceLocation,
    /// Output names, only set on stack components
    pub outputs: Vec<String>,
    pub environment_variables: BTreeMap<String, ConfigValue>,
    /// Grant verbs invoked on this resource
    pub permissions: Vec<String>,
}

impl Component {
    /// Create a stack component
    pub fn stack(name: &str, purpose: &str, location: SourceLocation) -> Self {
        Self {
            id: format!("stack_{}", name.to_lowercase()),
            name: name.to_string(),
            kind: ComponentKind::Stack,
            service: STACK_SERVICE.to_string(),
            construct_type: "Stack".to_string(),
            purpose: purpose.to_string(),
            configuration: Configuration::new(),
            stack_name: String::new(),
            source_location: location,
            outputs: Vec::new(),
            environment_variables: BTreeMap::new(),
            permissions: Vec::new(),
        }
    }

    /// Create a resource component owned by `stack_name`
    pub fn resource(
        name: &str,
        stack_name: &str,
        service: &str,
        construct_type: &str,
        location: SourceLocation,
    ) -> Self {
        let service = if service.is_empty() {
            UNKNOWN_SERVICE
        } else {
            service
        };
        Self {
            id: format!("{}_{}", stack_name.to_lowercase(), name),
            name: name.to_string(),
            kind: ComponentKind::Resource,
            service: service.to_string(),
            construct_type: construct_type.to_string(),
            purpose: String::new(),
            configuration: Configuration::new(),
            stack_name: stack_name.to_string(),
            source_location: location,
            outputs: Vec::new(),
            environment_variables: BTreeMap::new(),
            permissions: Vec::new(),
        }
    }

    pub fn is_stack(&self) -> bool {
        self.kind == ComponentKind::Stack
    }

    pub fn is_resource(&self) -> bool {
        self.kind == ComponentKind::Resource
    }

    pub fn has_known_service(&self) -> bool {
        self.service != UNKNOWN_SERVICE
    }

    /// The stack this component belongs to (its own name for stacks)
    pub fn owning_stack(&self) -> &str {
        if self.is_stack() {
            &self.name
        } else {
            &self.stack_name
        }
    }

    /// Lower-cased `{key: value}` rendering of the configuration, used for
    /// substring heuristics
    pub fn configuration_text(&self) -> String {
        let pairs: Vec<String> = self
            .configuration
            .iter()
            .map(|(k, v)| format!("'{}': '{}'", k, v))
            .collect();
        format!("{{{}}}", pairs.join(", ")).to_lowercase()
    }
}

/// How a stack dependency was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Explicit,
    ResourceReference,
    OutputImport,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Explicit => "explicit",
            DependencyType::ResourceReference => "resource_reference",
            DependencyType::OutputImport => "output_import",
        };
        write!(f, "{}", s)
    }
}

/// Directed edge: `source_stack` depends on `target_stack`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackDependency {
    pub source_stack: String,
    pub target_stack: String,
    pub dependency_type: DependencyType,
    pub description: String,
}

impl StackDependency {
    pub fn explicit(source: &str, target: &str) -> Self {
        Self {
            source_stack: source.to_string(),
            target_stack: target.to_string(),
            dependency_type: DependencyType::Explicit,
            description: format!("{} depends on {}", source, target),
        }
    }
}

/// Inferred, typed edge between two services
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRelationship {
    pub source_service: String,
    pub target_service: String,
    pub relationship_type: String,
    pub source_component: String,
    pub target_component: String,
    pub description: String,
}

/// A stack-level output declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub name: String,
    pub description: String,
}

/// Everything one parse pass recovers
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedInfrastructure {
    pub components: Vec<Component>,
    pub stack_dependencies: Vec<StackDependency>,
    pub service_relationships: Vec<ServiceRelationship>,
    /// Outputs keyed by stack name
    pub stack_outputs: BTreeMap<String, Vec<StackOutput>>,
    /// Units that were skipped, as human-readable messages
    pub warnings: Vec<String>,
}

impl ParsedInfrastructure {
    pub fn stacks(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.is_stack())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.is_resource())
    }

    pub fn components_in_stack<'a>(&'a self, stack: &'a str) -> impl Iterator<Item = &'a Component> {
        self.resources().filter(move |c| c.stack_name == stack)
    }

    pub fn components_for_service<'a>(
        &'a self,
        service: &'a str,
    ) -> impl Iterator<Item = &'a Component> {
        self.components.iter().filter(move |c| c.service == service)
    }

    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("infra/data_stack.py", 12)
    }

    #[test]
    fn test_stack_component() {
        let stack = Component::stack("DataStack", "Storage", loc());
        assert_eq!(stack.id, "stack_datastack");
        assert!(stack.is_stack());
        assert_eq!(stack.service, STACK_SERVICE);
        assert!(stack.stack_name.is_empty());
        assert_eq!(stack.owning_stack(), "DataStack");
    }

    #[test]
    fn test_resource_component() {
        let bucket = Component::resource("raw_bucket", "DataStack", "S3", "Bucket", loc());
        assert_eq!(bucket.id, "datastack_raw_bucket");
        assert!(bucket.is_resource());
        assert_eq!(bucket.owning_stack(), "DataStack");
    }

    #[test]
    fn test_resource_service_never_empty() {
        let res = Component::resource("thing", "DataStack", "", "Thing", loc());
        assert_eq!(res.service, UNKNOWN_SERVICE);
        assert!(!res.has_known_service());
    }

    #[test]
    fn test_config_value_display() {
        assert_eq!(ConfigValue::Str("x".into()).to_string(), "x");
        assert_eq!(ConfigValue::reference("cdk.Aws.ACCOUNT_ID").to_string(), "$cdk.Aws.ACCOUNT_ID");
        assert_eq!(ConfigValue::Complex.to_string(), "complex_value");
        assert_eq!(ConfigValue::Bool(true).to_string(), "True");
        assert_eq!(ConfigValue::None.to_string(), "None");
    }

    #[test]
    fn test_config_value_serialization() {
        let mut config = Configuration::new();
        config.insert("versioned".into(), ConfigValue::Bool(true));
        config.insert("memory_size".into(), ConfigValue::Int(512));
        config.insert("encryption".into(), ConfigValue::reference("s3.BucketEncryption.S3_MANAGED"));
        config.insert("lifecycle_rules".into(), ConfigValue::Complex);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["versioned"], true);
        assert_eq!(json["memory_size"], 512);
        assert_eq!(json["encryption"], "$s3.BucketEncryption.S3_MANAGED");
        assert_eq!(json["lifecycle_rules"], "complex_value");
    }

    #[test]
    fn test_configuration_text_is_lowercase() {
        let mut bucket = Component::resource("raw_bucket", "DataStack", "S3", "Bucket", loc());
        bucket
            .configuration
            .insert("encryption".into(), ConfigValue::reference("s3.BucketEncryption.S3_MANAGED"));
        let text = bucket.configuration_text();
        assert!(text.contains("'encryption'"));
        assert!(text.contains("s3_managed"));
    }

    #[test]
    fn test_explicit_dependency() {
        let dep = StackDependency::explicit("ComputeStack", "DataStack");
        assert_eq!(dep.dependency_type, DependencyType::Explicit);
        assert_eq!(dep.description, "ComputeStack depends on DataStack");
        assert_eq!(dep.dependency_type.to_string(), "explicit");
    }

    #[test]
    fn test_parsed_queries() {
        let mut parsed = ParsedInfrastructure::default();
        assert!(parsed.is_empty());
        parsed.components.push(Component::stack("DataStack", "Storage", loc()));
        parsed
            .components
            .push(Component::resource("raw_bucket", "DataStack", "S3", "Bucket", loc()));
        assert_eq!(parsed.stacks().count(), 1);
        assert_eq!(parsed.resources().count(), 1);
        assert_eq!(parsed.components_in_stack("DataStack").count(), 1);
        assert_eq!(parsed.components_for_service("S3").count(), 1);
        assert!(parsed.find("raw_bucket").is_some());
    }
}
