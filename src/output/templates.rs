// Template engine for generating Markdown output

use crate::error::Result;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Embedded document templates, keyed by template name
const TEMPLATES: [(&str, &str); 11] = [
    ("overview.md", include_str!("../../templates/overview.md.tera")),
    (
        "infrastructure-diagram.md",
        include_str!("../../templates/infrastructure-diagram.md.tera"),
    ),
    (
        "service-dependencies.md",
        include_str!("../../templates/service-dependencies.md.tera"),
    ),
    (
        "ingestion-pipeline.md",
        include_str!("../../templates/ingestion-pipeline.md.tera"),
    ),
    ("etl-processing.md", include_str!("../../templates/etl-processing.md.tera")),
    ("query-pipeline.md", include_str!("../../templates/query-pipeline.md.tera")),
    (
        "monitoring-alerting.md",
        include_str!("../../templates/monitoring-alerting.md.tera"),
    ),
    (
        "environment-setup.md",
        include_str!("../../templates/environment-setup.md.tera"),
    ),
    ("graphql-schema.md", include_str!("../../templates/graphql-schema.md.tera")),
    ("iam-policies.md", include_str!("../../templates/iam-policies.md.tera")),
    ("monitoring.md", include_str!("../../templates/monitoring.md.tera")),
];

/// Template engine wrapping Tera with custom filters and templates
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;

        tera.register_filter("pluralize", pluralize);
        tera.register_filter("slugify", slugify_filter);
        tera.register_filter("humanize", humanize_filter);

        Ok(Self { tera })
    }

    /// Names of all embedded templates
    pub fn template_names() -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|(name, _)| *name)
    }

    /// Render a template with context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Pluralize a word based on count
fn pluralize(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let count = value.as_u64().unwrap_or(0);
    let singular = args
        .get("singular")
        .and_then(|v| v.as_str())
        .unwrap_or("item");
    let default_plural = format!("{}s", singular);
    let plural = args
        .get("plural")
        .and_then(|v| v.as_str())
        .unwrap_or(&default_plural);

    if count == 1 {
        Ok(Value::String(format!("{} {}", count, singular)))
    } else {
        Ok(Value::String(format!("{} {}", count, plural)))
    }
}

fn slugify_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value.as_str().unwrap_or("");
    Ok(Value::String(slugify(s)))
}

fn humanize_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value.as_str().unwrap_or("");
    Ok(Value::String(humanize(s)))
}

/// Convert text to a Markdown anchor slug
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `stores_in` -> `Stores In`
pub fn humanize(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
