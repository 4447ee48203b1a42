// Service label inference tables

use crate::parser::model::UNKNOWN_SERVICE;
use crate::parser::python::{Callee, ImportedName};
use std::collections::HashMap;

/// CDK module fragment -> service label, checked in order
const MODULE_SERVICES: &[(&str, &str)] = &[
    ("aws_s3", "S3"),
    ("aws_dynamodb", "DynamoDB"),
    ("aws_lambda", "Lambda"),
    ("aws_apigateway", "API Gateway"),
    ("aws_appsync", "AppSync"),
    ("aws_cognito", "Cognito"),
    ("aws_events", "EventBridge"),
    ("aws_sqs", "SQS"),
    ("aws_sns", "SNS"),
    ("aws_glue", "Glue"),
    ("aws_athena", "Athena"),
    ("aws_amplify", "Amplify"),
    ("aws_cloudfront", "CloudFront"),
    ("aws_location", "Location Service"),
    ("aws_iam", "IAM"),
    ("aws_wafv2", "WAF"),
];

/// Lower-cased construct fragment -> service label, checked in order.
/// More specific fragments come first (`cfnworkgroup` before `table`).
const CONSTRUCT_SERVICES: &[(&str, &str)] = &[
    ("cfnworkgroup", "Athena"),
    ("cfndatabase", "Glue"),
    ("cfnplaceindex", "Location Service"),
    ("cfnmap", "Location Service"),
    ("cfnbranch", "Amplify"),
    ("cfnapp", "Amplify"),
    ("cfnwebacl", "WAF"),
    ("graphqlapi", "AppSync"),
    ("userpool", "Cognito"),
    ("identitypool", "Cognito"),
    ("bucket", "S3"),
    ("table", "DynamoDB"),
    ("function", "Lambda"),
    ("queue", "SQS"),
    ("topic", "SNS"),
    ("rule", "EventBridge"),
    ("role", "IAM"),
];

/// Resource name/construct fragment -> purpose, checked in order
const RESOURCE_PURPOSES: &[(&str, &str)] = &[
    ("bucket", "Data storage"),
    ("table", "Data storage and retrieval"),
    ("function", "Serverless compute"),
    ("api", "API endpoint"),
    ("pool", "User authentication"),
    ("queue", "Message queuing"),
    ("topic", "Event notifications"),
    ("rule", "Event scheduling"),
    ("role", "Access control"),
    ("policy", "Permission management"),
];

/// Class-name fragment -> stack purpose, checked in order
const STACK_PURPOSES: &[(&str, &str)] = &[
    ("data", "Data storage and management services"),
    ("compute", "Compute and processing services"),
    ("api", "API and authentication services"),
    ("frontend", "Frontend hosting and distribution"),
    ("location", "Geographic and location services"),
];

const DEFAULT_STACK_PURPOSE: &str = "AWS infrastructure stack";

/// Map a `<module>.<name>` import to a service label
pub fn service_for_import(module: &str, name: &str) -> &'static str {
    let qualified = format!("{}.{}", module, name);
    MODULE_SERVICES
        .iter()
        .find(|(fragment, _)| qualified.contains(fragment))
        .map(|(_, service)| *service)
        .unwrap_or(UNKNOWN_SERVICE)
}

/// Map a construct class name to a service label by naming heuristic
pub fn service_for_construct(construct: &str) -> Option<&'static str> {
    let lower = construct.to_lowercase();
    CONSTRUCT_SERVICES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, service)| *service)
}

/// Imported names of one file, keyed by the name they are visible as
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    services: HashMap<String, &'static str>,
}

impl ImportTable {
    /// Build from the file's `from ... import ...` statements. Only
    /// modules under `aws_cdk` contribute.
    pub fn from_imports(imports: &[ImportedName]) -> Self {
        let services = imports
            .iter()
            .filter(|imp| imp.module.contains("aws_cdk"))
            .map(|imp| {
                (
                    imp.used_name().to_string(),
                    service_for_import(&imp.module, &imp.name),
                )
            })
            .collect();
        Self { services }
    }

    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.services.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Service for a construct call: import table on the alias (or bare
    /// name), then the construct-name heuristic
    pub fn resolve(&self, callee: &Callee) -> &'static str {
        let key = callee.alias.as_deref().unwrap_or(&callee.name);
        match self.get(key) {
            Some(service) if service != UNKNOWN_SERVICE => service,
            _ => service_for_construct(&callee.name).unwrap_or(UNKNOWN_SERVICE),
        }
    }
}

/// Purpose of a resource from its attribute name and construct type
pub fn resource_purpose(name: &str, construct: &str, service: &str) -> String {
    let name = name.to_lowercase();
    let construct = construct.to_lowercase();
    RESOURCE_PURPOSES
        .iter()
        .find(|(fragment, _)| name.contains(fragment) || construct.contains(fragment))
        .map(|(_, purpose)| purpose.to_string())
        .unwrap_or_else(|| format!("{} resource", service))
}

/// Fallback purpose of a stack without a docstring
pub fn stack_purpose(class_name: &str) -> String {
    let lower = class_name.to_lowercase();
    STACK_PURPOSES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, purpose)| *purpose)
        .unwrap_or(DEFAULT_STACK_PURPOSE)
        .to_string()
}
