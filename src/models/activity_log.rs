use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogEntry {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub status: Option<LogStatus>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(rename = "createdAt", alias = "timestamp", default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ActivityLogEntry {
    /// Free-text message, else the structured details as compact JSON.
    pub fn summary(&self) -> String {
        match (&self.message, &self.details) {
            (Some(message), _) if !message.is_empty() => message.clone(),
            (_, Some(details)) if !details.is_null() => details.to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    Success,
    Fail,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "SUCCESS",
            LogStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUCCESS" => Ok(LogStatus::Success),
            "FAIL" => Ok(LogStatus::Fail),
            other => Err(format!("unknown log status `{other}` (expected SUCCESS or FAIL)")),
        }
    }
}
