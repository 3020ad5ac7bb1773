//! Value normalization: raw source values to graph property values.
//!
//! Fixed-precision decimals become `f64`. This is lossy for values beyond
//! 53 bits of mantissa (and for most decimal fractions) and there is no
//! lossless alternative; graph stores have no decimal property type. Every
//! other scalar passes through unchanged.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sync_core::{GraphValue, Properties, SourceRow, SourceValue};

/// Convert one source value.
pub fn normalize_value(value: &SourceValue) -> GraphValue {
    match value {
        SourceValue::Null => GraphValue::Null,
        SourceValue::Int(i) => GraphValue::Int(*i),
        SourceValue::Float(f) => GraphValue::Float(*f),
        SourceValue::Decimal(d) => GraphValue::Float(decimal_to_f64(d)),
        SourceValue::String(s) => GraphValue::String(s.clone()),
        SourceValue::Bool(b) => GraphValue::Bool(*b),
        SourceValue::DateTime(dt) => GraphValue::DateTime(*dt),
    }
}

fn decimal_to_f64(d: &Decimal) -> f64 {
    d.to_f64()
        .or_else(|| d.to_string().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Convert a row into a property map, keeping column order.
///
/// Null columns are kept as `GraphValue::Null` entries so callers can tell
/// "column is null" from "column does not exist"; sinks never persist them.
pub fn normalize_row(row: &SourceRow) -> Properties {
    row.iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}
