//! Parameter access and the table-driven optional field copier.

use crate::error::NodeError;
use serde_json::{Map, Value};

/// Host capability for reading node parameters for an input item.
pub trait Parameters: Send + Sync {
    fn get(&self, name: &str, item: usize) -> Option<Value>;
}

/// Parameters supplied as JSON: node-level values overridden per item.
#[derive(Debug, Clone, Default)]
pub struct JsonParameters {
    node: Map<String, Value>,
    items: Vec<Map<String, Value>>,
}

impl JsonParameters {
    pub fn new(node: Map<String, Value>, items: Vec<Map<String, Value>>) -> Self {
        Self { node, items }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl Parameters for JsonParameters {
    fn get(&self, name: &str, item: usize) -> Option<Value> {
        self.items
            .get(item)
            .and_then(|m| m.get(name))
            .or_else(|| self.node.get(name))
            .filter(|v| !v.is_null())
            .cloned()
    }
}

/// Item-scoped view over a [`Parameters`] source.
pub struct ItemParams<'a> {
    source: &'a dyn Parameters,
    pub item: usize,
}

impl<'a> ItemParams<'a> {
    pub fn new(source: &'a dyn Parameters, item: usize) -> Self {
        Self { source, item }
    }

    pub fn raw(&self, name: &str) -> Option<Value> {
        self.source.get(name, self.item)
    }

    /// String parameter; numbers are rendered, missing becomes "".
    pub fn string(&self, name: &str) -> String {
        self.raw(name).as_ref().map(value_string).unwrap_or_default()
    }

    pub fn string_or(&self, name: &str, default: &str) -> String {
        let s = self.string(name);
        if s.is_empty() {
            default.to_string()
        } else {
            s
        }
    }

    /// Required numeric parameter accepting numbers or numeric strings.
    pub fn number(&self, name: &str, label: &str) -> Result<f64, NodeError> {
        let parsed = match self.raw(name) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(n),
            _ => Err(self.invalid(format!("{} must be a valid integer", label))),
        }
    }

    /// A `collection` parameter (e.g. `additionalFields`); missing → empty.
    pub fn collection(&self, name: &str) -> Map<String, Value> {
        match self.raw(name) {
            Some(Value::Object(m)) => m,
            _ => Map::new(),
        }
    }

    pub fn invalid(&self, message: impl Into<String>) -> NodeError {
        NodeError::validation(message, self.item)
    }
}

/// Value transform applied when copying an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Copy,
    /// `true`/`false` → `1`/`0`.
    Flag,
    /// Multi-select list → comma-joined string.
    CommaList,
    /// Backlinks mode synonyms.
    Mode,
}

/// When an optional field is left out of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Omit {
    /// Missing, `0`, `""`, `false` or an empty list.
    Falsy,
    /// Only when missing.
    Absent,
}

/// One row of a declarative field-mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub source: &'static str,
    pub target: &'static str,
    pub transform: Transform,
    pub omit: Omit,
}

impl FieldSpec {
    pub const fn copy(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            transform: Transform::Copy,
            omit: Omit::Falsy,
        }
    }

    pub const fn flag(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            transform: Transform::Flag,
            omit: Omit::Absent,
        }
    }

    pub const fn list(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            transform: Transform::CommaList,
            omit: Omit::Falsy,
        }
    }

    pub const fn mode(source: &'static str) -> Self {
        Self {
            source,
            target: "mode",
            transform: Transform::Mode,
            omit: Omit::Falsy,
        }
    }

    pub const fn keep_present(mut self) -> Self {
        self.omit = Omit::Absent;
        self
    }
}

/// Render a scalar parameter value as text; lists and objects become "".
pub fn value_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(_) => false,
    }
}

pub fn truthy(v: &Value) -> bool {
    !is_falsy(v)
}

/// Map UI mode values to the API's `mode` vocabulary.
pub fn map_mode(mode: &str) -> String {
    match mode {
        "as_root" => "domain",
        "as_subdomain" => "host",
        "one_unit" => "url",
        other => other,
    }
    .to_string()
}

pub fn comma_join(v: &Value) -> Value {
    match v {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(|i| match i {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => other.clone(),
    }
}

fn apply(transform: Transform, v: &Value) -> Value {
    match transform {
        Transform::Copy => v.clone(),
        Transform::Flag => Value::from(if truthy(v) { 1 } else { 0 }),
        Transform::CommaList => comma_join(v),
        Transform::Mode => match v {
            Value::String(s) => Value::String(map_mode(s)),
            other => other.clone(),
        },
    }
}

/// Copy optional fields from a collection into `out` according to `table`.
pub fn copy_fields(from: &Map<String, Value>, table: &[FieldSpec], out: &mut Map<String, Value>) {
    for spec in table {
        let Some(v) = from.get(spec.source) else {
            continue;
        };
        let skip = match spec.omit {
            Omit::Falsy => is_falsy(v),
            Omit::Absent => v.is_null(),
        };
        if skip {
            continue;
        }
        out.insert(spec.target.to_string(), apply(spec.transform, v));
    }
}
