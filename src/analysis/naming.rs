// Resource naming convention report

use crate::parser::Component;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const CONVENTIONS: [&str; 5] = [
    "Resources use descriptive names indicating their purpose",
    "Stack names follow the {Project}{Purpose}Stack pattern",
    "S3 buckets include the account ID for global uniqueness",
    "Lambda functions use the {Purpose}Function naming pattern",
    "DynamoDB tables use kebab-case naming",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingPattern {
    pub name: String,
    pub construct: String,
    pub stack: String,
}

/// The `naming_conventions` view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamingConventions {
    pub patterns: BTreeMap<String, Vec<NamingPattern>>,
    pub prefixes: BTreeSet<String>,
    pub suffixes: BTreeSet<String>,
    pub conventions: Vec<String>,
}

impl NamingConventions {
    pub fn collect(components: &[Component]) -> Self {
        let mut naming = Self {
            conventions: CONVENTIONS.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        };

        for component in components.iter().filter(|c| c.is_resource()) {
            let lower = component.name.to_lowercase();
            let parts: Vec<&str> = lower.split('_').collect();
            if let [first, .., last] = parts.as_slice() {
                naming.prefixes.insert(first.to_string());
                naming.suffixes.insert(last.to_string());
            }

            naming
                .patterns
                .entry(component.service.clone())
                .or_default()
                .push(NamingPattern {
                    name: component.name.clone(),
                    construct: component.construct_type.clone(),
                    stack: component.stack_name.clone(),
                });
        }

        naming
    }
}
