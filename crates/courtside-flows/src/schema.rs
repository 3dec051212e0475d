//! Declarative shapes and the validator that checks JSON values against them.
//!
//! A `Shape` describes what a flow accepts or what a model must answer with.
//! Validation is side-effect free: it returns the value narrowed to the shape
//! or a `ValidationError` listing every failing field, never just the first.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// What to do with object keys the shape does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFields {
    /// Drop them from the narrowed value.
    Strip,
    /// Report each one as a validation issue.
    #[default]
    Reject,
}

/// Refinements on a string value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub one_of: Option<Vec<String>>,
    pub prefix: Option<String>,
}

impl StringRules {
    pub fn min_len(mut self, min: usize) -> Self {
        self.min_len = Some(min);
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    pub fn one_of<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String(StringRules),
    Number { non_negative: bool },
    /// Whole numbers. A float with no fractional part is narrowed to an integer.
    Integer { non_negative: bool },
    Boolean,
    Array { items: Box<Shape>, min_items: usize },
    Object(ObjectShape),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub fields: Vec<Field>,
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
    /// Optional fields may be absent or `null`.
    pub required: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn required(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            required: false,
            ..Self::required(name, shape)
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

impl Shape {
    pub fn string() -> Self {
        Shape::String(StringRules::default())
    }

    pub fn string_min(min: usize) -> Self {
        Shape::String(StringRules::default().min_len(min))
    }

    pub fn string_with(rules: StringRules) -> Self {
        Shape::String(rules)
    }

    pub fn number() -> Self {
        Shape::Number {
            non_negative: false,
        }
    }

    pub fn non_negative_number() -> Self {
        Shape::Number { non_negative: true }
    }

    /// Non-negative integer.
    pub fn count() -> Self {
        Shape::Integer { non_negative: true }
    }

    pub fn array(items: Shape) -> Self {
        Shape::Array {
            items: Box::new(items),
            min_items: 0,
        }
    }

    pub fn non_empty_array(items: Shape) -> Self {
        Shape::Array {
            items: Box::new(items),
            min_items: 1,
        }
    }

    /// Object that rejects undeclared keys.
    pub fn object(fields: Vec<Field>) -> Self {
        Shape::Object(ObjectShape {
            fields,
            unknown: UnknownFields::Reject,
        })
    }

    /// Switch a top-level object shape to strip undeclared keys. Nested
    /// objects keep their own policy.
    pub fn strip_unknown(self) -> Self {
        match self {
            Shape::Object(obj) => Shape::Object(ObjectShape {
                unknown: UnknownFields::Strip,
                ..obj
            }),
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::String(_) => "string",
            Shape::Number { .. } => "number",
            Shape::Integer { .. } => "integer",
            Shape::Boolean => "boolean",
            Shape::Array { .. } => "array",
            Shape::Object(_) => "object",
        }
    }

    /// Look up a declared field of an object shape.
    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Shape::Object(obj) => obj.fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Validate `value`, returning it narrowed to this shape.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let narrowed = check(self, value, "", &mut issues);
        if issues.is_empty() {
            Ok(narrowed)
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Render as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Shape::String(rules) => {
                let mut schema = json!({ "type": "string" });
                if let Some(min) = rules.min_len {
                    schema["minLength"] = json!(min);
                }
                if let Some(max) = rules.max_len {
                    schema["maxLength"] = json!(max);
                }
                if let Some(ref allowed) = rules.one_of {
                    schema["enum"] = json!(allowed);
                }
                if let Some(ref prefix) = rules.prefix {
                    schema["pattern"] = json!(format!("^{}", regex::escape(prefix)));
                }
                schema
            }
            Shape::Number { non_negative } => {
                let mut schema = json!({ "type": "number" });
                if *non_negative {
                    schema["minimum"] = json!(0);
                }
                schema
            }
            Shape::Integer { non_negative } => {
                let mut schema = json!({ "type": "integer" });
                if *non_negative {
                    schema["minimum"] = json!(0);
                }
                schema
            }
            Shape::Boolean => json!({ "type": "boolean" }),
            Shape::Array { items, min_items } => {
                let mut schema = json!({ "type": "array", "items": items.to_json_schema() });
                if *min_items > 0 {
                    schema["minItems"] = json!(min_items);
                }
                schema
            }
            Shape::Object(obj) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in &obj.fields {
                    let mut prop = field.shape.to_json_schema();
                    if let Some(ref text) = field.description {
                        prop["description"] = json!(text);
                    }
                    properties.insert(field.name.clone(), prop);
                    if field.required {
                        required.push(field.name.clone());
                    }
                }
                let mut schema = json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                });
                if obj.unknown == UnknownFields::Reject {
                    schema["additionalProperties"] = json!(false);
                }
                schema
            }
        }
    }
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    Missing,
    Unknown,
    TooShort {
        min: usize,
        actual: usize,
    },
    TooLong {
        max: usize,
        actual: usize,
    },
    NotAllowed {
        allowed: Vec<String>,
    },
    MissingPrefix {
        prefix: String,
    },
    TooFewItems {
        min: usize,
        actual: usize,
    },
    Negative,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            IssueKind::Missing => write!(f, "required field is missing"),
            IssueKind::Unknown => write!(f, "unknown field"),
            IssueKind::TooShort { min, actual } => write!(
                f,
                "must be at least {} characters (got {})",
                min, actual
            ),
            IssueKind::TooLong { max, actual } => {
                write!(f, "must be at most {} characters (got {})", max, actual)
            }
            IssueKind::NotAllowed { allowed } => {
                write!(f, "must be one of: {}", allowed.join(", "))
            }
            IssueKind::MissingPrefix { prefix } => write!(f, "must start with '{}'", prefix),
            IssueKind::TooFewItems { min, actual } => write!(
                f,
                "must contain at least {} item(s) (got {})",
                min, actual
            ),
            IssueKind::Negative => write!(f, "must not be negative"),
        }
    }
}

/// One failing field. `path` uses `a.b[0].c` notation; empty means the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

/// Every field that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            issues: vec![FieldIssue {
                path: path.into(),
                kind,
            }],
        }
    }

    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// Validation
// =============================================================================

fn check(shape: &Shape, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
    match (shape, value) {
        (Shape::String(rules), Value::String(s)) => {
            check_string(rules, s, path, issues);
            value.clone()
        }
        (Shape::Number { non_negative }, Value::Number(n)) => {
            if *non_negative && n.as_f64().is_some_and(|f| f < 0.0) {
                push(issues, path, IssueKind::Negative);
            }
            value.clone()
        }
        (Shape::Integer { non_negative }, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                if *non_negative && i < 0 {
                    push(issues, path, IssueKind::Negative);
                }
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                    if *non_negative && f < 0.0 {
                        push(issues, path, IssueKind::Negative);
                    }
                    Value::from(f as i64)
                } else {
                    push(
                        issues,
                        path,
                        IssueKind::WrongType {
                            expected: "integer",
                            found: "number",
                        },
                    );
                    Value::Null
                }
            }
        }
        (Shape::Boolean, Value::Bool(_)) => value.clone(),
        (Shape::Array { items, min_items }, Value::Array(elems)) => {
            if elems.len() < *min_items {
                push(
                    issues,
                    path,
                    IssueKind::TooFewItems {
                        min: *min_items,
                        actual: elems.len(),
                    },
                );
            }
            Value::Array(
                elems
                    .iter()
                    .enumerate()
                    .map(|(i, elem)| check(items, elem, &format!("{}[{}]", path, i), issues))
                    .collect(),
            )
        }
        (Shape::Object(obj), Value::Object(map)) => check_object(obj, map, path, issues),
        (shape, other) => {
            push(
                issues,
                path,
                IssueKind::WrongType {
                    expected: shape.type_name(),
                    found: json_type_name(other),
                },
            );
            Value::Null
        }
    }
}

fn check_string(rules: &StringRules, s: &str, path: &str, issues: &mut Vec<FieldIssue>) {
    let len = s.chars().count();
    if let Some(min) = rules.min_len {
        if len < min {
            push(issues, path, IssueKind::TooShort { min, actual: len });
        }
    }
    if let Some(max) = rules.max_len {
        if len > max {
            push(issues, path, IssueKind::TooLong { max, actual: len });
        }
    }
    if let Some(ref allowed) = rules.one_of {
        if !allowed.iter().any(|a| a == s) {
            push(
                issues,
                path,
                IssueKind::NotAllowed {
                    allowed: allowed.clone(),
                },
            );
        }
    }
    if let Some(ref prefix) = rules.prefix {
        if !s.starts_with(prefix.as_str()) {
            push(
                issues,
                path,
                IssueKind::MissingPrefix {
                    prefix: prefix.clone(),
                },
            );
        }
    }
}

fn check_object(
    obj: &ObjectShape,
    map: &Map<String, Value>,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Value {
    let mut out = Map::new();

    for field in &obj.fields {
        let child = join(path, &field.name);
        match map.get(&field.name) {
            None | Some(Value::Null) if !field.required => {}
            None => push(issues, &child, IssueKind::Missing),
            Some(v) => {
                let narrowed = check(&field.shape, v, &child, issues);
                out.insert(field.name.clone(), narrowed);
            }
        }
    }

    if obj.unknown == UnknownFields::Reject {
        for key in map.keys() {
            if !obj.fields.iter().any(|f| &f.name == key) {
                push(issues, &join(path, key), IssueKind::Unknown);
            }
        }
    }

    Value::Object(out)
}

fn push(issues: &mut Vec<FieldIssue>, path: &str, kind: IssueKind) {
    issues.push(FieldIssue {
        path: path.to_string(),
        kind,
    });
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
