use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One repository's grade record: an identity field plus named items, each
/// carrying at least a numeric `mark`. Unknown fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeFragment {
    fields: Map<String, Value>,
}

impl GradeFragment {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Parse a fragment file. The file must hold a JSON object with a string
    /// `identity_field`.
    pub fn load(path: &Path, identity_field: &str) -> Result<Self> {
        let malformed = |reason: String| GradeError::MalformedFragment {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data).map_err(|e| malformed(e.to_string()))?;
        let fragment =
            Self::from_value(value).ok_or_else(|| malformed("not a JSON object".to_string()))?;
        if fragment.identity(identity_field).is_none() {
            return Err(malformed(format!("missing string field '{identity_field}'")));
        }
        Ok(fragment)
    }

    pub fn identity(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn set_identity(&mut self, field: &str, id: &str) {
        self.fields.insert(field.to_string(), Value::String(id.to_string()));
    }

    /// Total score: the `mark` of every item except the identity field.
    /// Marks may be JSON numbers or numeric strings; items without a usable
    /// mark count as zero.
    pub fn sum_marks(&self, identity_field: &str) -> f64 {
        self.fields
            .iter()
            .filter(|(k, _)| k.as_str() != identity_field)
            .filter_map(|(_, v)| v.get("mark"))
            .filter_map(mark_value)
            .sum()
    }
}

fn mark_value(mark: &Value) -> Option<f64> {
    match mark {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
