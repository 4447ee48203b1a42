// Service relationship inference

use crate::parser::model::{Component, ServiceRelationship};

/// One inference rule: when a `source_service` component and a
/// `target_service` component coexist and the predicate holds for either of
/// them, they are related by `relationship_type`.
pub struct RelationshipRule {
    pub source_service: &'static str,
    pub target_service: &'static str,
    pub relationship_type: &'static str,
    pub predicate: fn(&Component) -> bool,
}

fn construct_contains(component: &Component, fragment: &str) -> bool {
    component.construct_type.to_lowercase().contains(fragment)
}

fn config_contains(component: &Component, fragment: &str) -> bool {
    component.configuration_text().contains(fragment)
}

/// Ordered rule table
pub const RULES: &[RelationshipRule] = &[
    RelationshipRule {
        source_service: "EventBridge",
        target_service: "Lambda",
        relationship_type: "triggers",
        predicate: |c| construct_contains(c, "rule") || config_contains(c, "schedule"),
    },
    RelationshipRule {
        source_service: "Lambda",
        target_service: "S3",
        relationship_type: "stores_in",
        predicate: |c| config_contains(c, "bucket"),
    },
    RelationshipRule {
        source_service: "Lambda",
        target_service: "DynamoDB",
        relationship_type: "stores_in",
        predicate: |c| config_contains(c, "table"),
    },
    RelationshipRule {
        source_service: "AppSync",
        target_service: "DynamoDB",
        relationship_type: "reads_from",
        predicate: |c| construct_contains(c, "graphqlapi"),
    },
    RelationshipRule {
        source_service: "Cognito",
        target_service: "AppSync",
        relationship_type: "authenticates_with",
        predicate: |c| config_contains(c, "user_pool"),
    },
    RelationshipRule {
        source_service: "S3",
        target_service: "Glue",
        relationship_type: "processed_by",
        predicate: |c| construct_contains(c, "cfndatabase"),
    },
    RelationshipRule {
        source_service: "Glue",
        target_service: "Athena",
        relationship_type: "queried_by",
        predicate: |c| construct_contains(c, "workgroup"),
    },
];

/// Apply every rule to every (source, target) component pair
pub fn infer_relationships(components: &[Component]) -> Vec<ServiceRelationship> {
    let mut relationships = Vec::new();

    for rule in RULES {
        for source in components.iter().filter(|c| c.service == rule.source_service) {
            for target in components.iter().filter(|c| c.service == rule.target_service) {
                if (rule.predicate)(source) || (rule.predicate)(target) {
                    relationships.push(ServiceRelationship {
                        source_service: rule.source_service.to_string(),
                        target_service: rule.target_service.to_string(),
                        relationship_type: rule.relationship_type.to_string(),
                        source_component: source.name.clone(),
                        target_component: target.name.clone(),
                        description: format!(
                            "{} {} {}",
                            source.name, rule.relationship_type, target.name
                        ),
                    });
                }
            }
        }
    }

    relationships
}
