//! Raw and canonical record types.
//!
//! [`RawRecord`] is the untyped shape the source API hands back; it makes
//! no promises beyond "JSON object". [`HealthRecord`] is the validated
//! output of the transform stage and the only shape the loader accepts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One untyped record from a source API page.
///
/// Lookups distinguish a key that is absent from a key that is present
/// with a JSON `null` value; the transformer needs both signals (its
/// batch-level column check cares about presence, its per-record filter
/// cares about nulls).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Value under `key`, if the key is present (may be `Value::Null`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the key is present at all, null or not.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A validated, deduplicated health indicator observation.
///
/// Unique on `(country_code, indicator_code, year)`. The transformer
/// enforces this with first-wins dedup; the loader enforces it again with
/// an `ON CONFLICT` upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub country_code: String,
    pub indicator_code: String,
    pub indicator_name: String,
    pub year: i32,
    pub value: f64,
    pub source_url: String,
}
