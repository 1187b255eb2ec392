//! Raw order record → typed [`Order`]
//!
//! The external store exposes loosely-typed JSON records with several
//! alias spellings per logical field. This adapter resolves each field
//! through an explicit, ordered precedence list so exactly one
//! normalization step exists and no component downstream ever touches a
//! raw record. Missing or malformed fields degrade to defaults — a
//! broken field must never drop the order; only a record without an id
//! is rejected.

use serde_json::Value;

use crate::util::normalize_phone;

use super::{Order, OrderStatus, OrderType};

// Alias precedence per logical field, first match wins.
const ID_KEYS: &[&str] = &["id", "orderId", "order_id", "_id"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at", "timestamp"];
const STATUS_KEYS: &[&str] = &["status", "orderStatus", "situacao"];
const TYPE_KEYS: &[&str] = &["orderType", "order_type", "type", "tipo"];
const PHONE_KEYS: &[&str] = &["customerPhone", "customer_phone", "phone", "telefone"];
const AMOUNT_KEYS: &[&str] = &["totalAmount", "total_amount", "total", "valorTotal"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("order record has no usable id")]
    MissingId,
}

/// Normalize one raw store record into a typed [`Order`].
pub fn from_raw(raw: &Value) -> Result<Order, NormalizeError> {
    let id = first_string(raw, ID_KEYS)
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingId)?;

    let created_at = first_i64(raw, CREATED_AT_KEYS).unwrap_or(0);

    let status = first_string(raw, STATUS_KEYS)
        .and_then(|s| OrderStatus::parse(&s))
        .unwrap_or_default();

    let order_type = first_string(raw, TYPE_KEYS)
        .and_then(|s| OrderType::parse(&s))
        .unwrap_or_default();

    let customer_phone = first_string(raw, PHONE_KEYS)
        .map(|p| normalize_phone(&p))
        .filter(|p| !p.is_empty());

    let total_amount = first_f64(raw, AMOUNT_KEYS).unwrap_or(0.0);

    Ok(Order { id, created_at, status, order_type, customer_phone, total_amount })
}

/// First key that resolves to a non-null string or number.
fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match raw.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            // Some stores write numeric ids/phones as JSON numbers
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

fn first_i64(raw: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_i64() {
                    return Some(v);
                }
                if let Some(v) = n.as_f64() {
                    return Some(v as i64);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(v) = s.trim().parse::<i64>() {
                    return Some(v);
                }
            }
            _ => continue,
        }
    }
    None
}

fn first_f64(raw: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_f64() {
                    return Some(v);
                }
            }
            Some(Value::String(s)) => {
                // Accept "42.50" and the comma-decimal form "42,50"
                let cleaned = s.trim().replace(',', ".");
                if let Ok(v) = cleaned.parse::<f64>() {
                    return Some(v);
                }
            }
            _ => continue,
        }
    }
    None
}
