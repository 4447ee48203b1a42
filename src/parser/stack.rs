// Stack file parsing

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::parser::entry::parse_entry_file;
use crate::parser::model::{
    Component, ConfigValue, ParsedInfrastructure, SourceLocation, StackOutput,
};
use crate::parser::python::{
    self, callee, descendants, dict_string_entries, docstring_first_line, extract_value,
    from_imports, init_method, keyword_arguments, line_of, node_text, positional_arguments,
    self_attribute, string_literal, Callee, PythonParser,
};
use crate::parser::relationships::infer_relationships;
use crate::parser::services::{resource_purpose, stack_purpose, ImportTable};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

const DEFAULT_PATTERN: &str = "*_stack.py";

/// Recovers the component graph from an entry file and a stacks directory
pub struct StackParser {
    pattern: String,
    verbose: bool,
}

impl Default for StackParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StackParser {
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            verbose: false,
        }
    }

    pub fn from_config(source: &SourceConfig) -> Self {
        Self::new().with_pattern(&source.stack_pattern)
    }

    /// Glob matched against file names in the stacks directory
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    /// Show a progress bar while parsing stack files
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Stack files in sorted path order
    pub fn stack_files(&self, stacks_dir: &Path) -> Result<Vec<PathBuf>> {
        if !stacks_dir.is_dir() {
            return Err(Error::DirectoryNotFound(stacks_dir.to_path_buf()));
        }

        // the directory is literal, only the file name part is a pattern
        let dir = glob::Pattern::escape(&stacks_dir.to_string_lossy());
        let pattern = Path::new(&dir).join(&self.pattern);
        let mut files = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable path: {}", e),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse the entry file, then every stack file, then infer relationships
    pub fn parse_all(&self, entry_file: &Path, stacks_dir: &Path) -> Result<ParsedInfrastructure> {
        let files = self.stack_files(stacks_dir)?;
        let mut parser = PythonParser::new()?;
        let mut state = ParseState::default();

        match parse_entry_file(&mut parser, entry_file) {
            Ok(deps) => state.parsed.stack_dependencies = deps,
            Err(e) if e.is_recoverable() => state.warn(format!("Skipping entry file: {}", e)),
            Err(e) => return Err(e),
        }

        let progress = if self.verbose {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        for path in &files {
            if let Some(ref pb) = progress {
                let msg = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                pb.set_message(msg);
                pb.inc(1);
            }

            tracing::debug!("Parsing {}", path.display());
            match parse_stack_file(&mut parser, path, &mut state) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => state.warn(format!("Skipping stack file: {}", e)),
                Err(e) => return Err(e),
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Parsing complete");
        }

        let mut parsed = state.parsed;
        parsed.service_relationships = infer_relationships(&parsed.components);
        tracing::debug!(
            "Parsed {} components, {} dependencies, {} relationships",
            parsed.components.len(),
            parsed.stack_dependencies.len(),
            parsed.service_relationships.len()
        );
        Ok(parsed)
    }
}

#[derive(Default)]
struct ParseState {
    parsed: ParsedInfrastructure,
    used_ids: HashSet<String>,
}

impl ParseState {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.parsed.warnings.push(message);
    }

    /// Add a component, suffixing its id until it is unique
    fn push(&mut self, mut component: Component) -> usize {
        if self.used_ids.contains(&component.id) {
            let base = component.id.clone();
            let mut n = 2;
            while self.used_ids.contains(&format!("{}_{}", base, n)) {
                n += 1;
            }
            component.id = format!("{}_{}", base, n);
        }
        self.used_ids.insert(component.id.clone());
        self.parsed.components.push(component);
        self.parsed.components.len() - 1
    }
}

fn parse_stack_file(parser: &mut PythonParser, path: &Path, state: &mut ParseState) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::parse(path, format!("cannot read file: {}", e)))?;
    parse_stack_source(parser, &source, path, state)
}

fn parse_stack_source(
    parser: &mut PythonParser,
    source: &str,
    path: &Path,
    state: &mut ParseState,
) -> Result<()> {
    let tree = parser.parse_source(source, path)?;
    let bytes = source.as_bytes();
    let root = tree.root_node();

    let imports = ImportTable::from_imports(&from_imports(root, bytes));

    let Some(class) = descendants(root)
        .into_iter()
        .find(|n| n.kind() == "class_definition" && python::derives_from_stack(*n, bytes))
    else {
        tracing::debug!("No stack class in {}", path.display());
        return Ok(());
    };

    let stack_name = python::display_name_from_path(path);
    let class_name = class
        .child_by_field_name("name")
        .map(|n| node_text(n, bytes))
        .unwrap_or(stack_name.as_str());
    let purpose = docstring_first_line(class, bytes).unwrap_or_else(|| stack_purpose(class_name));

    let stack_index = state.push(Component::stack(
        &stack_name,
        &purpose,
        SourceLocation::new(path, line_of(class)),
    ));

    let Some(init) = init_method(class, bytes) else {
        return Ok(());
    };

    let mut outputs = Vec::new();
    let mut grants: Vec<(String, String)> = Vec::new();

    for node in descendants(init) {
        match node.kind() {
            "assignment" => {
                if let Some(component) = resource_assignment(node, bytes, &imports, &stack_name, path) {
                    state.push(component);
                }
            }
            "call" => {
                if let Some(output) = cfn_output(node, bytes) {
                    outputs.push(output);
                } else if let Some(grant) = grant_call(node, bytes) {
                    grants.push(grant);
                }
            }
            _ => {}
        }
    }

    for (resource, verb) in grants {
        let targets = state
            .parsed
            .components
            .iter_mut()
            .filter(|c| c.is_resource() && c.stack_name == stack_name && c.name == resource);
        for target in targets {
            target.permissions.push(verb.clone());
        }
    }

    if !outputs.is_empty() {
        state.parsed.components[stack_index].outputs =
            outputs.iter().map(|o: &StackOutput| o.name.clone()).collect();
        state
            .parsed
            .stack_outputs
            .entry(stack_name.clone())
            .or_default()
            .extend(outputs);
    }

    Ok(())
}

/// `self.<attr> = <call>(...)` with a single plain target
fn resource_assignment(
    node: Node<'_>,
    source: &[u8],
    imports: &ImportTable,
    stack_name: &str,
    path: &Path,
) -> Option<Component> {
    if node.child_by_field_name("type").is_some() {
        return None;
    }
    if node.parent().map(|p| p.kind() == "assignment").unwrap_or(false) {
        return None;
    }
    let name = self_attribute(node.child_by_field_name("left")?, source)?;
    let call = node.child_by_field_name("right")?;
    if call.kind() != "call" {
        return None;
    }

    let callee = callee(call, source).unwrap_or(Callee {
        alias: None,
        name: String::new(),
    });
    let service = imports.resolve(&callee);

    let mut component = Component::resource(
        name,
        stack_name,
        service,
        &callee.name,
        SourceLocation::new(path, line_of(node)),
    );

    for (keyword, value) in keyword_arguments(call, source) {
        let extracted = extract_value(value, source);
        if keyword == "environment" && component.service == "Lambda" {
            match dict_string_entries(value, source) {
                Some(entries) => component.environment_variables.extend(entries),
                None => {
                    component
                        .environment_variables
                        .insert(keyword.clone(), extracted.clone());
                }
            }
        }
        component.configuration.insert(keyword, extracted);
    }

    component.purpose = resource_purpose(name, &callee.name, &component.service);
    Some(component)
}

/// `CfnOutput(scope, "LogicalId", description=...)`
fn cfn_output(call: Node<'_>, source: &[u8]) -> Option<StackOutput> {
    if callee(call, source)?.name != "CfnOutput" {
        return None;
    }
    let name = positional_arguments(call)
        .into_iter()
        .find_map(|arg| string_literal(arg, source))?;
    let description = keyword_arguments(call, source)
        .into_iter()
        .find(|(k, _)| k == "description")
        .map(|(_, v)| match extract_value(v, source) {
            ConfigValue::Str(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_default();
    Some(StackOutput { name, description })
}

/// `self.<attr>.grant_*(...)` as (attr, verb)
fn grant_call(call: Node<'_>, source: &[u8]) -> Option<(String, String)> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    let verb = node_text(function.child_by_field_name("attribute")?, source);
    if !verb.contains("grant") {
        return None;
    }
    let resource = self_attribute(function.child_by_field_name("object")?, source)?;
    Some((resource.to_string(), verb.to_string()))
}
