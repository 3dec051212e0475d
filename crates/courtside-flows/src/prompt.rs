//! Prompt templates with `{{field}}` placeholders and `#each` / `#if` blocks.
//!
//! Templates are parsed once into a node tree, so a malformed template is
//! caught when its flow is registered, not when a request arrives.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::TemplateError;
use crate::schema::Shape;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("Invalid template tag regex"));

/// A dotted reference, either from the input root or from the current
/// `#each` item (`this`, `this.field`).
#[derive(Debug, Clone, PartialEq)]
struct FieldPath {
    raw: String,
    relative: bool,
    segments: Vec<String>,
}

impl FieldPath {
    fn parse(raw: &str) -> Result<Self, TemplateError> {
        let relative = raw == "this" || raw.starts_with("this.");
        let segments: Vec<String> = raw
            .split('.')
            .skip(usize::from(relative))
            .map(str::to_string)
            .collect();
        if segments.iter().any(|s| s.is_empty() || s.contains(char::is_whitespace)) {
            return Err(TemplateError::EmptyTag);
        }
        Ok(Self {
            raw: raw.to_string(),
            relative,
            segments,
        })
    }

    fn resolve<'a>(&self, root: &'a Value, scope: &[&'a Value]) -> Option<&'a Value> {
        let mut current = if self.relative {
            *scope.last()?
        } else {
            root
        };
        for segment in &self.segments {
            current = current.get(segment.as_str())?;
        }
        Some(current)
    }

    /// The declared shape this path reads, if the input shape has it.
    fn declared<'a>(
        &self,
        root: &'a Shape,
        scope: &[&'a Shape],
    ) -> Result<&'a Shape, TemplateError> {
        let missing = || TemplateError::MissingField(self.raw.clone());
        let mut current = if self.relative {
            *scope.last().ok_or_else(missing)?
        } else {
            root
        };
        for segment in &self.segments {
            current = &current.field(segment).ok_or_else(missing)?.shape;
        }
        Ok(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Each,
    If,
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            BlockKind::Each => "each",
            BlockKind::If => "if",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(FieldPath),
    Each { list: FieldPath, body: Vec<Node> },
    If { cond: FieldPath, body: Vec<Node> },
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    source: String,
    nodes: Vec<Node>,
}

type OpenBlock = (BlockKind, FieldPath, Vec<Node>);

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut root = Vec::new();
        let mut stack: Vec<OpenBlock> = Vec::new();
        let mut cursor = 0;

        for caps in TAG.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            let text = &source[cursor..whole.start()];
            if !text.is_empty() {
                current(&mut root, &mut stack).push(Node::Text(text.to_string()));
            }
            cursor = whole.end();

            let tag = caps.get(1).map_or("", |m| m.as_str());
            if tag.is_empty() {
                return Err(TemplateError::EmptyTag);
            }

            if let Some(rest) = tag.strip_prefix('#') {
                let (keyword, arg) = rest
                    .split_once(char::is_whitespace)
                    .map(|(k, a)| (k, a.trim()))
                    .unwrap_or((rest, ""));
                let kind = match keyword {
                    "each" => BlockKind::Each,
                    "if" => BlockKind::If,
                    other => return Err(TemplateError::UnknownBlock(other.to_string())),
                };
                if arg.is_empty() {
                    return Err(TemplateError::EmptyTag);
                }
                stack.push((kind, FieldPath::parse(arg)?, Vec::new()));
            } else if let Some(rest) = tag.strip_prefix('/') {
                let closed = rest.trim();
                let Some((kind, path, body)) = stack.pop() else {
                    return Err(TemplateError::UnexpectedClose(closed.to_string()));
                };
                if kind.name() != closed {
                    return Err(TemplateError::MismatchedClose {
                        opened: kind.name().to_string(),
                        closed: closed.to_string(),
                    });
                }
                let node = match kind {
                    BlockKind::Each => Node::Each { list: path, body },
                    BlockKind::If => Node::If { cond: path, body },
                };
                current(&mut root, &mut stack).push(node);
            } else {
                current(&mut root, &mut stack).push(Node::Var(FieldPath::parse(tag)?));
            }
        }

        if let Some((kind, _, _)) = stack.pop() {
            return Err(TemplateError::Unclosed(kind.name().to_string()));
        }
        if cursor < source.len() {
            root.push(Node::Text(source[cursor..].to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            nodes: root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check that every field the template reads, including `#if`
    /// conditions, is declared by `input`.
    pub fn check_fields(&self, input: &Shape) -> Result<(), TemplateError> {
        let mut scope = Vec::new();
        check_nodes(&self.nodes, input, &mut scope)
    }

    /// Fill the template from a validated input object.
    pub fn render(&self, input: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut scope = Vec::new();
        render_nodes(&self.nodes, input, &mut scope, &mut out)?;
        Ok(out)
    }
}

fn current<'a>(root: &'a mut Vec<Node>, stack: &'a mut [OpenBlock]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some((_, _, body)) => body,
        None => root,
    }
}

fn render_nodes<'a>(
    nodes: &[Node],
    root: &'a Value,
    scope: &mut Vec<&'a Value>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => match path.resolve(root, scope) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) | None => {
                    return Err(TemplateError::MissingField(path.raw.clone()))
                }
                Some(other) => out.push_str(&other.to_string()),
            },
            Node::Each { list, body } => {
                let items = match list.resolve(root, scope) {
                    Some(Value::Array(items)) => items,
                    Some(Value::Null) | None => {
                        return Err(TemplateError::MissingField(list.raw.clone()))
                    }
                    Some(_) => return Err(TemplateError::NotAList(list.raw.clone())),
                };
                for item in items {
                    scope.push(item);
                    render_nodes(body, root, scope, out)?;
                    scope.pop();
                }
            }
            Node::If { cond, body } => {
                if cond.resolve(root, scope).is_some_and(truthy) {
                    render_nodes(body, root, scope, out)?;
                }
            }
        }
    }
    Ok(())
}

fn check_nodes<'a>(
    nodes: &[Node],
    root: &'a Shape,
    scope: &mut Vec<&'a Shape>,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var(path) => {
                path.declared(root, scope)?;
            }
            Node::Each { list, body } => match list.declared(root, scope)? {
                Shape::Array { items, .. } => {
                    scope.push(items.as_ref());
                    check_nodes(body, root, scope)?;
                    scope.pop();
                }
                _ => return Err(TemplateError::NotAList(list.raw.clone())),
            },
            Node::If { cond, body } => {
                cond.declared(root, scope)?;
                check_nodes(body, root, scope)?;
            }
        }
    }
    Ok(())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}
