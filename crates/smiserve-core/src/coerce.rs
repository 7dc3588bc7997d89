//! Conversion of raw nvidia-smi cells into typed JSON values.

use serde::{Deserialize, Serialize};

/// Markers nvidia-smi prints for fields it cannot report.
const NULL_SENTINELS: [&str; 4] = ["[Not Supported]", "N/A", "[N/A]", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Text,
}

/// Field-name prefix to target type. First match wins; anything unmatched is text.
static COERCION_RULES: &[(&str, ValueKind)] = &[
    ("utilization.", ValueKind::Float),
    ("fan.", ValueKind::Float),
    ("memory.", ValueKind::Float),
    ("power.", ValueKind::Float),
    ("temperature.", ValueKind::Int),
    ("clocks.", ValueKind::Int),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl MetricValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetricValue::Null)
    }
}

pub fn kind_for(field: &str) -> ValueKind {
    COERCION_RULES
        .iter()
        .find(|(prefix, _)| field.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(ValueKind::Text)
}

pub fn is_null_sentinel(raw: &str) -> bool {
    let raw = raw.trim();
    NULL_SENTINELS.iter().any(|sentinel| *sentinel == raw)
}

/// Coerces one cell. Sentinels become `Null` for every field; a numeric field
/// whose text does not parse keeps the original string, untrimmed.
pub fn coerce(field: &str, raw: &str) -> MetricValue {
    if is_null_sentinel(raw) {
        return MetricValue::Null;
    }

    let value = raw.trim();
    match kind_for(field) {
        ValueKind::Int => value
            .parse::<i64>()
            .map(MetricValue::Int)
            .unwrap_or_else(|_| MetricValue::Text(raw.to_string())),
        ValueKind::Float => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(MetricValue::Float)
            .unwrap_or_else(|| MetricValue::Text(raw.to_string())),
        ValueKind::Text => MetricValue::Text(raw.to_string()),
    }
}
