use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, Row, ToSql};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::{Order, Promotion};

pub const ORDER_COLS: &str = "id, customer_name, email, total_cents, status, items, date, \
     payment_ref, shipping_address, checklist, notes, created_at, updated_at";

pub const PROMOTION_COLS: &str = "id, code, type, value, uses_count, created_at";

/// Maps a row (selected with the matching `*_COLS` list) to a model.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_col_opt<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| {
        serde_json::from_str(&r)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parsed_col<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: T::Err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl FromRow for Order {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            email: row.get(2)?,
            total_cents: row.get(3)?,
            status: parsed_col(row, 4)?,
            items: json_col(row, 5)?,
            date: row.get(6)?,
            payment_ref: row.get(7)?,
            shipping_address: json_col_opt(row, 8)?,
            checklist: json_col(row, 9)?,
            notes: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl FromRow for Promotion {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Promotion {
            id: row.get(0)?,
            code: row.get(1)?,
            kind: parsed_col(row, 2)?,
            value: row.get(3)?,
            uses_count: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| T::from_row(row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
