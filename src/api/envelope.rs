//! List responses come in three documented shapes. They are decoded
//! explicitly into [`ListEnvelope`] and normalized into [`Page`]; anything
//! else is a decode error rather than an empty list.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum ListEnvelope<T> {
    /// `[ ... ]`
    Bare(Vec<T>),
    /// `{ "data": [...], "page", "limit", "total", "pages" }`
    Data {
        data: Vec<T>,
        page: Option<u32>,
        limit: Option<u32>,
        total: Option<u64>,
    },
    /// `{ "items": [...], "pagination": { "total" } }`, or `total` at the top
    Items { items: Vec<T>, total: Option<u64> },
}

#[derive(Deserialize)]
struct DataShape {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct ItemsShape {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl<T: DeserializeOwned> ListEnvelope<T> {
    pub fn decode(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Array(_) => Ok(ListEnvelope::Bare(decode_items(value)?)),
            Value::Object(mut map) => {
                if let Some(data) = map.remove("data").filter(Value::is_array) {
                    let meta: DataShape = serde_json::from_value(Value::Object(map))
                        .map_err(|e| AppError::Decode(format!("pagination fields: {e}")))?;
                    Ok(ListEnvelope::Data {
                        data: decode_items(data)?,
                        page: meta.page,
                        limit: meta.limit,
                        total: meta.total,
                    })
                } else if let Some(items) = map.remove("items").filter(Value::is_array) {
                    let meta: ItemsShape = serde_json::from_value(Value::Object(map))
                        .map_err(|e| AppError::Decode(format!("pagination fields: {e}")))?;
                    Ok(ListEnvelope::Items {
                        items: decode_items(items)?,
                        total: meta.total.or(meta.pagination.and_then(|p| p.total)),
                    })
                } else {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    Err(AppError::Decode(format!(
                        "list response has neither `data` nor `items` array (keys: {})",
                        keys.join(", ")
                    )))
                }
            }
            other => Err(AppError::Decode(format!(
                "expected a list response, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn decode_items<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Decode(format!("list item: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Array-plus-optional-total shape the rest of the crate consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl<T> Page<T> {
    /// `max(1, ceil(total / limit))` when both are known.
    pub fn page_count(&self) -> Option<u32> {
        page_count(self.total, self.limit)
    }
}

impl<T: DeserializeOwned> Page<T> {
    pub fn decode(value: Value) -> Result<Self, AppError> {
        ListEnvelope::decode(value).map(Page::from)
    }
}

impl<T> From<ListEnvelope<T>> for Page<T> {
    fn from(envelope: ListEnvelope<T>) -> Self {
        match envelope {
            ListEnvelope::Bare(items) => Page {
                items,
                total: None,
                page: None,
                limit: None,
            },
            ListEnvelope::Data {
                data,
                page,
                limit,
                total,
            } => Page {
                items: data,
                total,
                page,
                limit,
            },
            ListEnvelope::Items { items, total } => Page {
                items,
                total,
                page: None,
                limit: None,
            },
        }
    }
}

pub fn page_count(total: Option<u64>, limit: Option<u32>) -> Option<u32> {
    match (total, limit) {
        (Some(total), Some(limit)) if total > 0 && limit > 0 => {
            let pages = total.div_ceil(u64::from(limit));
            Some(pages.clamp(1, u64::from(u32::MAX)) as u32)
        }
        _ => None,
    }
}
