// Security posture and data-flow classification

use crate::parser::Component;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRecord {
    pub name: String,
    pub stack: String,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionRecord {
    pub resource: String,
    pub service: String,
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticationRecord {
    pub resource: String,
    #[serde(rename = "type")]
    pub construct: String,
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessControlRecord {
    pub resource: String,
    pub service: String,
    pub permissions: Vec<String>,
    pub stack: String,
}

/// The `security` view: four independent scans over all components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityPosture {
    pub iam_roles: Vec<RoleRecord>,
    pub encryption_enabled: Vec<EncryptionRecord>,
    pub authentication_methods: Vec<AuthenticationRecord>,
    pub access_controls: Vec<AccessControlRecord>,
}

impl SecurityPosture {
    pub fn scan(components: &[Component]) -> Self {
        let mut posture = Self::default();

        for component in components {
            if component.service == "IAM" {
                posture.iam_roles.push(RoleRecord {
                    name: component.name.clone(),
                    stack: component.stack_name.clone(),
                    purpose: component.purpose.clone(),
                });
            }

            if component.configuration_text().contains("encryption") {
                posture.encryption_enabled.push(EncryptionRecord {
                    resource: component.name.clone(),
                    service: component.service.clone(),
                    stack: component.stack_name.clone(),
                });
            }

            if component.service == "Cognito" {
                posture.authentication_methods.push(AuthenticationRecord {
                    resource: component.name.clone(),
                    construct: component.construct_type.clone(),
                    stack: component.stack_name.clone(),
                });
            }

            if !component.permissions.is_empty() {
                posture.access_controls.push(AccessControlRecord {
                    resource: component.name.clone(),
                    service: component.service.clone(),
                    permissions: component.permissions.clone(),
                    stack: component.stack_name.clone(),
                });
            }
        }

        posture
    }

    pub fn is_empty(&self) -> bool {
        self.iam_roles.is_empty()
            && self.encryption_enabled.is_empty()
            && self.authentication_methods.is_empty()
            && self.access_controls.is_empty()
    }
}

/// A component placed in a data-flow stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowComponent {
    pub name: String,
    pub service: String,
    pub purpose: String,
    pub stack: String,
}

impl From<&Component> for FlowComponent {
    fn from(component: &Component) -> Self {
        Self {
            name: component.name.clone(),
            service: component.service.clone(),
            purpose: component.purpose.clone(),
            stack: component.stack_name.clone(),
        }
    }
}

/// Data-flow stage a component is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Ingestion,
    Storage,
    Processing,
    Api,
}

impl FlowStage {
    /// Stages in the order data moves through them
    pub const ALL: [FlowStage; 4] = [
        FlowStage::Ingestion,
        FlowStage::Storage,
        FlowStage::Processing,
        FlowStage::Api,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStage::Ingestion => "ingestion",
            FlowStage::Storage => "storage",
            FlowStage::Processing => "processing",
            FlowStage::Api => "api",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FlowStage::Ingestion => "Ingestion",
            FlowStage::Storage => "Storage",
            FlowStage::Processing => "Processing",
            FlowStage::Api => "Query & API",
        }
    }
}

/// First matching stage, or none
pub fn classify(component: &Component) -> Option<FlowStage> {
    let service = component.service.as_str();
    if component.name.to_lowercase().contains("ingest")
        || component.purpose.to_lowercase().contains("api")
    {
        Some(FlowStage::Ingestion)
    } else if matches!(service, "S3" | "DynamoDB") {
        Some(FlowStage::Storage)
    } else if matches!(service, "Lambda" | "Glue") {
        Some(FlowStage::Processing)
    } else if matches!(service, "AppSync" | "API Gateway") {
        Some(FlowStage::Api)
    } else {
        None
    }
}

/// The `data_flow` view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataFlow {
    pub ingestion_sources: Vec<FlowComponent>,
    pub storage_layers: Vec<FlowComponent>,
    pub processing_components: Vec<FlowComponent>,
    pub api_endpoints: Vec<FlowComponent>,
}

impl DataFlow {
    pub fn classify(components: &[Component]) -> Self {
        let mut flow = Self::default();
        for component in components {
            let bucket = match classify(component) {
                Some(FlowStage::Ingestion) => &mut flow.ingestion_sources,
                Some(FlowStage::Storage) => &mut flow.storage_layers,
                Some(FlowStage::Processing) => &mut flow.processing_components,
                Some(FlowStage::Api) => &mut flow.api_endpoints,
                None => continue,
            };
            bucket.push(component.into());
        }
        flow
    }

    pub fn stage(&self, stage: FlowStage) -> &[FlowComponent] {
        match stage {
            FlowStage::Ingestion => &self.ingestion_sources,
            FlowStage::Storage => &self.storage_layers,
            FlowStage::Processing => &self.processing_components,
            FlowStage::Api => &self.api_endpoints,
        }
    }

    pub fn len(&self) -> usize {
        self.ingestion_sources.len()
            + self.storage_layers.len()
            + self.processing_components.len()
            + self.api_endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
