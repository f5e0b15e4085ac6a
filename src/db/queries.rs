use chrono::Utc;
use rusqlite::{Connection, params, types::Value};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{ORDER_COLS, PROMOTION_COLS, query_all, query_one};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize column: {e}")))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Orders ============

/// Outcome of inserting an order. The unique index on `payment_ref` is
/// what makes webhook replays safe: a second insert for the same
/// session surfaces here instead of as a duplicate row.
#[derive(Debug)]
pub enum OrderInsert {
    Created(Order),
    DuplicatePaymentRef,
}

pub fn create_order(conn: &Connection, input: &NewOrder) -> Result<OrderInsert> {
    let id = gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO orders (id, customer_name, email, total_cents, status, items, date,
                             payment_ref, shipping_address, checklist, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            &id,
            &input.customer_name,
            &input.email,
            input.total_cents,
            input.status.as_ref(),
            to_json(&input.items)?,
            input.date,
            &input.payment_ref,
            input
                .shipping_address
                .as_ref()
                .map(to_json)
                .transpose()?,
            to_json(&input.checklist)?,
            &input.notes,
            now,
            now
        ],
    );

    match inserted {
        Ok(_) => Ok(OrderInsert::Created(Order {
            id,
            customer_name: input.customer_name.clone(),
            email: input.email.clone(),
            total_cents: input.total_cents,
            status: input.status,
            items: input.items.clone(),
            date: input.date,
            payment_ref: input.payment_ref.clone(),
            shipping_address: input.shipping_address.clone(),
            checklist: input.checklist.clone(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        })),
        Err(e) if is_unique_violation(&e) && input.payment_ref.is_some() => {
            Ok(OrderInsert::DuplicatePaymentRef)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

pub fn get_order_by_payment_ref(conn: &Connection, payment_ref: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE payment_ref = ?1", ORDER_COLS),
        &[&payment_ref],
    )
}

pub fn list_orders(conn: &Connection) -> Result<Vec<Order>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM orders ORDER BY date DESC, created_at DESC",
            ORDER_COLS
        ),
        &[],
    )
}

pub fn update_order(conn: &Connection, id: &str, input: &UpdateOrderRequest) -> Result<bool> {
    let checklist = input.checklist.as_ref().map(to_json).transpose()?;
    UpdateBuilder::new("orders", id)
        .with_updated_at()
        .set_opt("status", input.status.map(|s| s.as_ref().to_string()))
        .set_opt("checklist", checklist)
        .set_opt("notes", input.notes.clone())
        .execute(conn)
}

pub fn delete_order(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ============ Promotions ============

pub fn create_promotion(conn: &Connection, input: &CreatePromotion) -> Result<Promotion> {
    let id = gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO promotions (id, code, type, value, uses_count, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![&id, &input.code, input.kind.as_ref(), input.value, now],
    );

    match inserted {
        Ok(_) => Ok(Promotion {
            id,
            code: input.code.clone(),
            kind: input.kind,
            value: input.value,
            uses_count: 0,
            created_at: now,
        }),
        Err(e) if is_unique_violation(&e) => Err(AppError::BadRequest(
            "A promotion with this code already exists".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Case-insensitive lookup; the `code` column collates NOCASE.
pub fn get_promotion_by_code(conn: &Connection, code: &str) -> Result<Option<Promotion>> {
    query_one(
        conn,
        &format!("SELECT {} FROM promotions WHERE code = ?1", PROMOTION_COLS),
        &[&code],
    )
}

pub fn list_promotions(conn: &Connection) -> Result<Vec<Promotion>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM promotions ORDER BY created_at DESC",
            PROMOTION_COLS
        ),
        &[],
    )
}

/// Single-statement counter bump; safe under concurrent webhooks.
pub fn increment_promotion_uses(conn: &Connection, code: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE promotions SET uses_count = uses_count + 1 WHERE code = ?1",
        params![code],
    )?;
    Ok(affected > 0)
}

pub fn delete_promotion(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM promotions WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
