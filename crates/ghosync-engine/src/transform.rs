//! Batch cleaning and validation.
//!
//! [`transform`] is a pure function: raw records in, canonical records
//! plus per-stage drop counts out. The caller decides what to log. Order
//! is preserved throughout, which is what makes first-wins dedup
//! deterministic.

use std::collections::HashSet;

use serde_json::Value;

use ghosync_types::record::{HealthRecord, RawRecord};

/// Source field holding the country code.
pub const FIELD_COUNTRY: &str = "SpatialDim";
/// Source field holding the observation year.
pub const FIELD_YEAR: &str = "TimeDim";
/// Source field holding the measured value.
pub const FIELD_VALUE: &str = "NumericValue";
/// Optional sub-dimension field. Captured and counted, not yet persisted.
pub const FIELD_DIMENSION: &str = "Dim1";

/// Constant metadata attached to every canonical record.
pub const INDICATOR_CODE: &str = "WHOSIS_000001";
pub const INDICATOR_NAME: &str = "Life expectancy at birth (years)";
pub const SOURCE_URL: &str = "https://ghoapi.azureedge.net/api";

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2030;

/// Per-stage accounting for one transform pass.
///
/// Informational only — tests and logs read it, nothing branches on it
/// downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub input: usize,
    /// Required columns absent from the whole batch; non-empty means the
    /// batch was rejected outright.
    pub missing_columns: Vec<String>,
    /// Records carrying the optional sub-dimension field.
    pub with_dimension: usize,
    pub dropped_null: usize,
    pub dropped_coercion: usize,
    pub dropped_year_range: usize,
    pub dropped_negative: usize,
    pub dropped_duplicate: usize,
    pub output: usize,
}

/// Result of one transform pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    pub records: Vec<HealthRecord>,
    pub stats: TransformStats,
}

/// Clean a raw batch into canonical records.
///
/// Stages, in order: batch-level required-column check (a structurally
/// absent column rejects the whole batch), per-record null filtering,
/// type coercion, year-range and non-negative filters, first-wins dedup
/// on `(country_code, year)`, constant metadata attach.
#[must_use]
pub fn transform(raw: &[RawRecord]) -> TransformOutput {
    let mut stats = TransformStats {
        input: raw.len(),
        ..TransformStats::default()
    };
    if raw.is_empty() {
        return TransformOutput {
            records: Vec::new(),
            stats,
        };
    }

    // Column presence is a batch property: a field the source never sent
    // at all means the payload shape changed, which is different from
    // individual records having nulls.
    let missing: Vec<String> = [FIELD_COUNTRY, FIELD_YEAR, FIELD_VALUE]
        .iter()
        .filter(|field| !raw.iter().any(|record| record.contains_key(field)))
        .map(|field| (*field).to_owned())
        .collect();
    if !missing.is_empty() {
        stats.missing_columns = missing;
        return TransformOutput {
            records: Vec::new(),
            stats,
        };
    }

    let mut seen: HashSet<(String, i32)> = HashSet::new();
    let mut records = Vec::new();

    for record in raw {
        if non_null(record, FIELD_DIMENSION).is_some() {
            stats.with_dimension += 1;
        }

        let (Some(country_raw), Some(year_raw), Some(value_raw)) = (
            non_null(record, FIELD_COUNTRY),
            non_null(record, FIELD_YEAR),
            non_null(record, FIELD_VALUE),
        ) else {
            stats.dropped_null += 1;
            continue;
        };

        let (Some(country_code), Some(year), Some(value)) = (
            coerce_country(country_raw),
            coerce_year(year_raw),
            coerce_value(value_raw),
        ) else {
            stats.dropped_coercion += 1;
            continue;
        };

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            stats.dropped_year_range += 1;
            continue;
        }
        if value < 0.0 {
            stats.dropped_negative += 1;
            continue;
        }
        if !seen.insert((country_code.clone(), year)) {
            stats.dropped_duplicate += 1;
            continue;
        }

        records.push(HealthRecord {
            country_code,
            indicator_code: INDICATOR_CODE.to_owned(),
            indicator_name: INDICATOR_NAME.to_owned(),
            year,
            value,
            source_url: SOURCE_URL.to_owned(),
        });
    }

    stats.output = records.len();
    TransformOutput { records, stats }
}

/// Field value if present and not JSON null.
fn non_null<'a>(record: &'a RawRecord, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|value| !value.is_null())
}

/// Country codes must be non-empty strings; the canonical key depends on it.
fn coerce_country(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Years accept integers, integral floats, and numeric strings.
fn coerce_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).ok()
            } else {
                n.as_f64().and_then(integral_f64_to_i32)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i32>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_f64_to_i32))
        }
        _ => None,
    }
}

fn integral_f64_to_i32(f: f64) -> Option<i32> {
    if f.is_finite() && f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) {
        Some(f as i32)
    } else {
        None
    }
}

/// Values accept numbers and numeric strings. Non-finite parses (`"NaN"`,
/// `"inf"`) are rejected here so the sign filter sees only real numbers.
fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
