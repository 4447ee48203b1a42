// Entry-file pass: stack instantiations and explicit dependencies

use crate::error::{Error, Result};
use crate::parser::model::StackDependency;
use crate::parser::python::{
    callee, descendants, node_text, positional_arguments, PythonParser,
};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Node;

/// Read and parse the entry file, returning the declared dependencies
pub fn parse_entry_file(parser: &mut PythonParser, path: &Path) -> Result<Vec<StackDependency>> {
    if !path.is_file() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::parse(path, format!("cannot read entry file: {}", e)))?;
    parse_entry_source(parser, &source, path)
}

/// Collect `<a>.add_dependency(<b>)` edges where both variables hold stacks
pub fn parse_entry_source(
    parser: &mut PythonParser,
    source: &str,
    path: &Path,
) -> Result<Vec<StackDependency>> {
    let tree = parser.parse_source(source, path)?;
    let bytes = source.as_bytes();

    // variable -> instantiated stack class
    let mut stacks: HashMap<String, String> = HashMap::new();
    let mut dependencies = Vec::new();

    for node in descendants(tree.root_node()) {
        match node.kind() {
            "assignment" => {
                if let Some((var, class)) = stack_instantiation(node, bytes) {
                    stacks.insert(var, class);
                }
            }
            "call" => {
                let Some((receiver, argument)) = add_dependency_call(node, bytes) else {
                    continue;
                };
                match (stacks.get(receiver), stacks.get(argument)) {
                    (Some(source_stack), Some(target_stack)) => {
                        dependencies.push(StackDependency::explicit(source_stack, target_stack));
                    }
                    _ => tracing::debug!(
                        "Unresolved dependency {}.add_dependency({})",
                        receiver,
                        argument
                    ),
                }
            }
            _ => {}
        }
    }

    Ok(dependencies)
}

fn stack_instantiation(node: Node<'_>, source: &[u8]) -> Option<(String, String)> {
    let left = node.child_by_field_name("left")?;
    let right = node.child_by_field_name("right")?;
    if left.kind() != "identifier" || right.kind() != "call" {
        return None;
    }
    let var = node_text(left, source);
    if !var.to_lowercase().contains("stack") {
        return None;
    }
    let class = callee(right, source)?.name;
    Some((var.to_string(), class))
}

fn add_dependency_call<'s>(node: Node<'_>, source: &'s [u8]) -> Option<(&'s str, &'s str)> {
    let function = node.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    if node_text(function.child_by_field_name("attribute")?, source) != "add_dependency" {
        return None;
    }
    let receiver = function.child_by_field_name("object")?;
    if receiver.kind() != "identifier" {
        return None;
    }
    let args = positional_arguments(node);
    let [argument] = args.as_slice() else {
        return None;
    };
    if argument.kind() != "identifier" {
        return None;
    }
    Some((node_text(receiver, source), node_text(*argument, source)))
}
