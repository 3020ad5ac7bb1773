//! PostgreSQL row conversion
//!
//! Maps PostgreSQL column values onto `SourceValue`. NUMERIC stays a
//! `rust_decimal::Decimal` here; turning it into a float is the normalizer's
//! decision, not the source's.
//!
//! One-dimensional arrays of the scalar types below become a JSON array
//! string. Columns of any other type are selected as `::text` by the scan
//! (see [`is_supported_type`]), so enums, intervals, network addresses and
//! ranges arrive in their PostgreSQL text form.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use relational_source::SourceError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use sync_core::{SourceRow, SourceValue};
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::Row;

/// Whether [`convert_postgres_value`] can decode values of `ty` directly.
pub fn is_supported_type(ty: &Type) -> bool {
    match ty.kind() {
        Kind::Array(member) => is_array_member(member),
        _ => is_scalar(ty),
    }
}

fn is_scalar(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::NUMERIC
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::DATE
            | Type::TIME
            | Type::UUID
            | Type::JSON
            | Type::JSONB
            | Type::BYTEA
    ) || <String as FromSql>::accepts(ty)
}

fn is_array_member(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::NUMERIC
            | Type::UUID
    ) || <String as FromSql>::accepts(ty)
}

/// Convert a PostgreSQL row into a `SourceRow` over `columns`.
pub fn convert_row(columns: &Arc<[String]>, row: &Row) -> Result<SourceRow, SourceError> {
    let values = (0..row.len())
        .map(|i| convert_postgres_value(row, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SourceRow::new(Arc::clone(columns), values))
}

/// Convert one PostgreSQL column value to a `SourceValue`.
pub fn convert_postgres_value(row: &Row, index: usize) -> Result<SourceValue, SourceError> {
    let column = &row.columns()[index];
    let pg_type = column.type_();
    let read_error = |e: tokio_postgres::Error| {
        SourceError::Query(format!("failed to read column '{}': {e}", column.name()))
    };

    if let Kind::Array(member) = pg_type.kind() {
        // Multi-dimensional arrays do not decode into a Vec.
        return Ok(array_to_json(row, index, member).unwrap_or_else(|e| {
            tracing::debug!("Reading array column '{}' as NULL: {e}", column.name());
            SourceValue::Null
        }));
    }

    let value: SourceValue = match *pg_type {
        Type::BOOL => row.try_get::<_, Option<bool>>(index).map_err(read_error)?.into(),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)
            .map_err(read_error)?
            .map(|i| i as i64)
            .into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(index).map_err(read_error)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(index).map_err(read_error)?.into(),
        Type::OID => row
            .try_get::<_, Option<u32>>(index)
            .map_err(read_error)?
            .map(|i| i as i64)
            .into(),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)
            .map_err(read_error)?
            .map(|f| f as f64)
            .into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index).map_err(read_error)?.into(),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)
            .map_err(read_error)?
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map_err(read_error)?
            .map(|ts| DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc))
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map_err(read_error)?
            .into(),
        Type::DATE => match row.try_get::<_, Option<NaiveDate>>(index).map_err(read_error)? {
            Some(date) => SourceValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(
                date.and_time(NaiveTime::MIN),
                Utc,
            )),
            None => SourceValue::Null,
        },
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(index)
            .map_err(read_error)?
            .map(|t| t.to_string())
            .into(),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(index)
            .map_err(read_error)?
            .map(|u| u.to_string())
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map_err(read_error)?
            .map(|json| json.to_string())
            .into(),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(index)
            .map_err(read_error)?
            .map(|bytes| {
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
            })
            .into(),
        _ if <String as FromSql>::accepts(pg_type) => row
            .try_get::<_, Option<String>>(index)
            .map_err(read_error)?
            .into(),
        _ => {
            return Err(SourceError::UnsupportedType {
                column: column.name().to_string(),
                type_name: pg_type.name().to_string(),
            })
        }
    };

    Ok(value)
}

/// Read a one-dimensional array as a JSON array string.
fn array_to_json(row: &Row, index: usize, member: &Type) -> Result<SourceValue, SourceError> {
    match *member {
        Type::BOOL => json_array(row, index, |b: bool| b),
        Type::INT2 => json_array(row, index, |i: i16| i64::from(i)),
        Type::INT4 => json_array(row, index, |i: i32| i64::from(i)),
        Type::INT8 => json_array(row, index, |i: i64| i),
        Type::FLOAT4 => json_array(row, index, |f: f32| f64::from(f)),
        Type::FLOAT8 => json_array(row, index, |f: f64| f),
        Type::NUMERIC => json_array(row, index, |d: Decimal| d.to_f64()),
        Type::UUID => json_array(row, index, |u: uuid::Uuid| u.to_string()),
        _ => json_array(row, index, |s: String| s),
    }
}

fn json_array<'a, T, U>(
    row: &'a Row,
    index: usize,
    element: impl Fn(T) -> U,
) -> Result<SourceValue, SourceError>
where
    T: FromSql<'a>,
    U: Serialize,
{
    let Some(values) = row
        .try_get::<_, Option<Vec<Option<T>>>>(index)
        .map_err(SourceError::query)?
    else {
        return Ok(SourceValue::Null);
    };
    let values: Vec<Option<U>> = values.into_iter().map(|v| v.map(&element)).collect();
    serde_json::to_string(&values)
        .map(SourceValue::String)
        .map_err(SourceError::query)
}
