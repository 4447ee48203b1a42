// Python syntax helpers built on tree-sitter

use crate::error::{Error, Result};
use crate::parser::model::ConfigValue;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Thin wrapper over a tree-sitter parser configured for Python
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse source text, rejecting trees that contain syntax errors
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parse(path, "tree-sitter returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            return Err(Error::parse(path, format!("syntax error at line {}", line)));
        }

        Ok(tree)
    }
}

/// An imported name from `from <module> import <name> [as <alias>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub module: String,
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// The name the import is visible as in the module
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The callee of a call expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callee {
    /// Module alias when the callee is `<alias>.<Name>`
    pub alias: Option<String>,
    pub name: String,
}

/// Text of a node, empty when it is not valid UTF-8
pub fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based line of a node
pub fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Named children of a node, collected so callers can hold them freely
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// All nodes under `node` (inclusive) in preorder
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
    out
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(line_of(node));
        }
        let mut cursor = node.walk();
        let mut children: Vec<Node> = node.children(&mut cursor).filter(|c| c.has_error() || c.is_missing()).collect();
        children.reverse();
        stack.extend(children);
    }
    None
}

/// Collect every `from <module> import ...` in the file
pub fn from_imports(root: Node<'_>, source: &[u8]) -> Vec<ImportedName> {
    let mut imports = Vec::new();

    for node in descendants(root) {
        if node.kind() != "import_from_statement" {
            continue;
        }
        let module = match node.child_by_field_name("module_name") {
            Some(m) => node_text(m, source).to_string(),
            None => continue,
        };

        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            match name_node.kind() {
                "dotted_name" => imports.push(ImportedName {
                    module: module.clone(),
                    name: node_text(name_node, source).to_string(),
                    alias: None,
                }),
                "aliased_import" => {
                    let name = name_node
                        .child_by_field_name("name")
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_default();
                    let alias = name_node
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, source).to_string());
                    if !name.is_empty() {
                        imports.push(ImportedName {
                            module: module.clone(),
                            name,
                            alias,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    imports
}

/// Resolve the callee of a `call` node
pub fn callee(call: Node<'_>, source: &[u8]) -> Option<Callee> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(Callee {
            alias: None,
            name: node_text(function, source).to_string(),
        }),
        "attribute" => {
            let name = node_text(function.child_by_field_name("attribute")?, source).to_string();
            let alias = function
                .child_by_field_name("object")
                .filter(|o| o.kind() == "identifier")
                .map(|o| node_text(o, source).to_string());
            Some(Callee { alias, name })
        }
        _ => None,
    }
}

/// Whether `node` is exactly `self.<attr>`, returning the attribute name
pub fn self_attribute<'s>(node: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    if node.kind() != "attribute" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if object.kind() != "identifier" || node_text(object, source) != "self" {
        return None;
    }
    Some(node_text(node.child_by_field_name("attribute")?, source))
}

/// Keyword arguments of a call as `(keyword, value node)` pairs.
/// `**kwargs` splats are skipped.
pub fn keyword_arguments<'t>(call: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    named_children(args)
        .into_iter()
        .filter(|n| n.kind() == "keyword_argument")
        .filter_map(|kw| {
            let name = kw.child_by_field_name("name")?;
            let value = kw.child_by_field_name("value")?;
            Some((node_text(name, source).to_string(), value))
        })
        .collect()
}

/// Positional arguments of a call
pub fn positional_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    named_children(args)
        .into_iter()
        .filter(|n| {
            !matches!(
                n.kind(),
                "keyword_argument" | "list_splat" | "dictionary_splat" | "comment"
            )
        })
        .collect()
}

/// Content of a plain string literal. Any f-string is not plain, even
/// without placeholders.
pub fn string_literal(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {
            let text = node_text(node, source);
            if is_f_string(text)
                || named_children(node).iter().any(|c| c.kind() == "interpolation")
            {
                return None;
            }
            Some(strip_quotes(text).to_string())
        }
        "concatenated_string" => {
            let mut joined = String::new();
            for part in named_children(node) {
                joined.push_str(&string_literal(part, source)?);
            }
            Some(joined)
        }
        _ => None,
    }
}

fn is_f_string(text: &str) -> bool {
    text.chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .any(|c| c.eq_ignore_ascii_case(&'f'))
}

fn strip_quotes(text: &str) -> &str {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    body
}

/// Recover a configuration value from an expression node.
///
/// Literals pass through, names and attribute chains become references,
/// everything else is `Complex`.
pub fn extract_value(node: Node<'_>, source: &[u8]) -> ConfigValue {
    match node.kind() {
        "string" | "concatenated_string" => match string_literal(node, source) {
            Some(s) => ConfigValue::Str(s),
            None => ConfigValue::Complex,
        },
        "integer" => parse_int(node_text(node, source))
            .map(ConfigValue::Int)
            .unwrap_or(ConfigValue::Complex),
        "float" => node_text(node, source)
            .replace('_', "")
            .parse::<f64>()
            .map(ConfigValue::Float)
            .unwrap_or(ConfigValue::Complex),
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        "none" => ConfigValue::None,
        "identifier" => ConfigValue::reference(node_text(node, source)),
        "attribute" => {
            let chain: String = node_text(node, source)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            ConfigValue::Reference(chain)
        }
        "parenthesized_expression" => match named_children(node).as_slice() {
            [inner] => extract_value(*inner, source),
            _ => ConfigValue::Complex,
        },
        _ => ConfigValue::Complex,
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let digits = text.replace('_', "").to_lowercase();
    if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        digits.parse().ok()
    }
}

/// Entries of a dict literal with string keys, values extracted
pub fn dict_string_entries(node: Node<'_>, source: &[u8]) -> Option<Vec<(String, ConfigValue)>> {
    if node.kind() != "dictionary" {
        return None;
    }
    let entries = named_children(node)
        .into_iter()
        .filter(|n| n.kind() == "pair")
        .filter_map(|pair| {
            let key = string_literal(pair.child_by_field_name("key")?, source)?;
            let value = pair.child_by_field_name("value")?;
            Some((key, extract_value(value, source)))
        })
        .collect();
    Some(entries)
}

/// Whether a class derives from `Stack` or `<something>.Stack`
pub fn derives_from_stack(class: Node<'_>, source: &[u8]) -> bool {
    let Some(bases) = class.child_by_field_name("superclasses") else {
        return false;
    };
    named_children(bases).into_iter().any(|base| match base.kind() {
        "identifier" => node_text(base, source) == "Stack",
        "attribute" => base
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source) == "Stack")
            .unwrap_or(false),
        _ => false,
    })
}

/// First line of a class or function docstring
pub fn docstring_first_line(definition: Node<'_>, source: &[u8]) -> Option<String> {
    let body = definition.child_by_field_name("body")?;
    let first = named_children(body).into_iter().find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(first).into_iter().next()?;
    let text = string_literal(expr, source)?;
    text.trim()
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

/// The `__init__` method defined directly in a class body
pub fn init_method<'t>(class: Node<'t>, source: &[u8]) -> Option<Node<'t>> {
    let body = class.child_by_field_name("body")?;
    named_children(body).into_iter().find_map(|stmt| {
        let func = match stmt.kind() {
            "function_definition" => stmt,
            "decorated_definition" => stmt.child_by_field_name("definition")?,
            _ => return None,
        };
        let name = func.child_by_field_name("name")?;
        (func.kind() == "function_definition" && node_text(name, source) == "__init__")
            .then_some(func)
    })
}

/// Python `str.title()`: upper-case a letter after a non-letter,
/// lower-case every other letter
pub fn title_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut prev_is_letter = false;
    for c in segment.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// `data_stack.py` -> `DataStack`
pub fn display_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.split('_').map(title_case).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> Tree {
        let mut parser = PythonParser::new().unwrap();
        parser.parse_source(source, Path::new("test.py")).unwrap()
    }

    fn first_of_kind<'t>(tree: &'t Tree, kind: &str) -> Node<'t> {
        descendants(tree.root_node())
            .into_iter()
            .find(|n| n.kind() == kind)
            .unwrap()
    }

    fn value_of(expr: &str) -> ConfigValue {
        let source = format!("f(x={})", expr);
        let tree = parse(&source);
        let call = first_of_kind(&tree, "call");
        let kwargs = keyword_arguments(call, source.as_bytes());
        extract_value(kwargs[0].1, source.as_bytes())
    }

    #[test]
    fn test_parser_new() {
        assert!(PythonParser::new().is_ok());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let mut parser = PythonParser::new().unwrap();
        let err = parser
            .parse_source("x = 1\ndef broken(:\n", Path::new("bad.py"))
            .unwrap_err();
        assert!(err.to_string().contains("bad.py"));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_from_imports_with_alias() {
        let source = "from aws_cdk import (\n    aws_s3 as s3,\n    Stack,\n)\n";
        let tree = parse(source);
        let imports = from_imports(tree.root_node(), source.as_bytes());
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].module, "aws_cdk");
        assert_eq!(imports[0].name, "aws_s3");
        assert_eq!(imports[0].used_name(), "s3");
        assert_eq!(imports[1].used_name(), "Stack");
    }

    #[test]
    fn test_callee_forms() {
        let source = "s3.Bucket(self, 'B')\nQueue(self, 'Q')\nself.make().Thing()\n";
        let tree = parse(source);
        let calls: Vec<Node> = descendants(tree.root_node())
            .into_iter()
            .filter(|n| n.kind() == "call")
            .collect();
        let first = callee(calls[0], source.as_bytes()).unwrap();
        assert_eq!(first.alias.as_deref(), Some("s3"));
        assert_eq!(first.name, "Bucket");
        let second = callee(calls[1], source.as_bytes()).unwrap();
        assert_eq!(second.alias, None);
        assert_eq!(second.name, "Queue");
        let third = callee(calls[2], source.as_bytes()).unwrap();
        assert_eq!(third.alias, None);
        assert_eq!(third.name, "Thing");
    }

    #[test]
    fn test_extract_literals() {
        assert_eq!(value_of("'raw'"), ConfigValue::Str("raw".into()));
        assert_eq!(value_of("\"\"\"doc\"\"\""), ConfigValue::Str("doc".into()));
        assert_eq!(value_of("'a' 'b'"), ConfigValue::Str("ab".into()));
        assert_eq!(value_of("512"), ConfigValue::Int(512));
        assert_eq!(value_of("1_000"), ConfigValue::Int(1000));
        assert_eq!(value_of("0.5"), ConfigValue::Float(0.5));
        assert_eq!(value_of("True"), ConfigValue::Bool(true));
        assert_eq!(value_of("None"), ConfigValue::None);
    }

    #[test]
    fn test_extract_references() {
        assert_eq!(value_of("bucket"), ConfigValue::reference("bucket"));
        assert_eq!(
            value_of("s3.BucketEncryption.S3_MANAGED"),
            ConfigValue::reference("s3.BucketEncryption.S3_MANAGED")
        );
    }

    #[test]
    fn test_extract_complex() {
        assert_eq!(value_of("f'{name}-bucket'"), ConfigValue::Complex);
        assert_eq!(value_of("Duration.minutes(5)"), ConfigValue::Complex);
        assert_eq!(value_of("[1, 2]"), ConfigValue::Complex);
        assert_eq!(value_of("{'a': 1}"), ConfigValue::Complex);
        assert_eq!(value_of("-1"), ConfigValue::Complex);
    }

    #[test]
    fn test_f_string_without_placeholders_is_complex() {
        assert_eq!(value_of("f\"bucket\""), ConfigValue::Complex);
        assert_eq!(value_of("F'bucket'"), ConfigValue::Complex);
        assert_eq!(value_of("rf'raw'"), ConfigValue::Complex);
        assert_eq!(value_of("'prefix-' f'suffix'"), ConfigValue::Complex);
        assert_eq!(value_of("r'raw'"), ConfigValue::Str("raw".into()));
    }

    #[test]
    fn test_keyword_arguments_skip_splat() {
        let source = "f(a, b=1, **extra)";
        let tree = parse(source);
        let call = first_of_kind(&tree, "call");
        let kwargs = keyword_arguments(call, source.as_bytes());
        assert_eq!(kwargs.len(), 1);
        assert_eq!(kwargs[0].0, "b");
        assert_eq!(positional_arguments(call).len(), 1);
    }

    #[test]
    fn test_dict_entries() {
        let source = "f(environment={'TABLE': table.table_name, 'STAGE': 'dev', 3: 'x'})";
        let tree = parse(source);
        let dict = first_of_kind(&tree, "dictionary");
        let entries = dict_string_entries(dict, source.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "TABLE");
        assert_eq!(entries[0].1, ConfigValue::reference("table.table_name"));
        assert_eq!(entries[1].1, ConfigValue::Str("dev".into()));
    }

    #[test]
    fn test_derives_from_stack() {
        let source = "class A(Stack): pass\nclass B(cdk.Stack): pass\nclass C(Construct): pass\n";
        let tree = parse(source);
        let classes: Vec<Node> = descendants(tree.root_node())
            .into_iter()
            .filter(|n| n.kind() == "class_definition")
            .collect();
        assert!(derives_from_stack(classes[0], source.as_bytes()));
        assert!(derives_from_stack(classes[1], source.as_bytes()));
        assert!(!derives_from_stack(classes[2], source.as_bytes()));
    }

    #[test]
    fn test_docstring_first_line() {
        let source = "class A(Stack):\n    \"\"\"Stores raw data.\n\n    More detail.\n    \"\"\"\n";
        let tree = parse(source);
        let class = first_of_kind(&tree, "class_definition");
        assert_eq!(
            docstring_first_line(class, source.as_bytes()),
            Some("Stores raw data.".to_string())
        );
    }

    #[test]
    fn test_init_method() {
        let source = "class A(Stack):\n    def helper(self): pass\n    def __init__(self, scope):\n        pass\n";
        let tree = parse(source);
        let class = first_of_kind(&tree, "class_definition");
        let init = init_method(class, source.as_bytes()).unwrap();
        assert_eq!(line_of(init), 3);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("data"), "Data");
        assert_eq!(title_case("API"), "Api");
        assert_eq!(title_case("v2api"), "V2Api");
    }

    #[test]
    fn test_display_name_from_path() {
        assert_eq!(display_name_from_path(&PathBuf::from("infra/data_stack.py")), "DataStack");
        assert_eq!(
            display_name_from_path(&PathBuf::from("etl_pipeline_stack.py")),
            "EtlPipelineStack"
        );
    }
}
