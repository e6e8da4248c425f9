//! `Value` - the tagged-union scalar used in instance/template field maps and
//! in the Interaction DSL's literals and resolved references.
//!
//! Request bodies and DSL tuples arrive as schemaless JSON; everything past
//! the HTTP boundary works with this closed, exhaustively-matchable enum
//! instead of raw `serde_json::Value`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar field value: string, number, bool, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric accumulation treats missing/non-numeric as zero (per the DSL
    /// `add` effect's semantics).
    pub fn numeric_or_zero(&self) -> f64 {
        self.as_num().unwrap_or(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, ""),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            _ => Value::Null,
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Str(s) => serde_json::Value::String(s),
            Value::Num(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Null => serde_json::Value::Null,
        }
    }
}

/// A field map: custom, user-defined keys on a template or instance.
pub type FieldMap = BTreeMap<String, Value>;

/// Convert a JSON object into a `FieldMap`, dropping non-scalar values (the
/// DSL and field merges only ever deal in scalars).
pub fn field_map_from_json(v: &serde_json::Value) -> FieldMap {
    v.as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
        .unwrap_or_default()
}

pub fn field_map_to_json(fields: &FieldMap) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_or_zero_treats_missing_as_zero() {
        assert_eq!(Value::Null.numeric_or_zero(), 0.0);
        assert_eq!(Value::Str("x".into()).numeric_or_zero(), 0.0);
        assert_eq!(Value::Num(4.5).numeric_or_zero(), 4.5);
    }

    #[test]
    fn field_map_round_trips_through_json() {
        let json = serde_json::json!({"locked": true, "destination": "abc", "count": 3});
        let fields = field_map_from_json(&json);
        assert_eq!(fields.get("locked"), Some(&Value::Bool(true)));
        assert_eq!(fields.get("count"), Some(&Value::Num(3.0)));
        let back = field_map_to_json(&fields);
        assert_eq!(back["destination"], serde_json::json!("abc"));
    }
}
