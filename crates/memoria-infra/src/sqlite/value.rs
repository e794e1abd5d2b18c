//! Conversions between `SqlValue` and sqlx's SQLite bindings.

use memoria_types::error::StoreError;
use memoria_types::value::{Row, SqlValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Decode, Row as _, Sqlite, TypeInfo, ValueRef};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind one dynamic value as the next positional parameter.
pub(crate) fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Blob(v) => query.bind(v.clone()),
    }
}

/// Decode a result row into an ordered `Row`, following each value's
/// storage class rather than the declared column type.
pub(crate) fn decode_row(row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        out.set(column.name(), decode_value(row, index)?);
    }
    Ok(out)
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<SqlValue, StoreError> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| StoreError::Query(e.to_string()))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let storage_class = raw.type_info().name().to_string();
    let decoded = match storage_class.as_str() {
        "INTEGER" => <i64 as Decode<'_, Sqlite>>::decode(raw).map(SqlValue::Integer),
        "REAL" => <f64 as Decode<'_, Sqlite>>::decode(raw).map(SqlValue::Real),
        "BLOB" => <Vec<u8> as Decode<'_, Sqlite>>::decode(raw).map(SqlValue::Blob),
        _ => <String as Decode<'_, Sqlite>>::decode(raw).map(SqlValue::Text),
    };
    decoded.map_err(|e| StoreError::Query(format!("column {index}: {e}")))
}
