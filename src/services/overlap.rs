use serde_json::Value;

use super::catalog::VehicleCatalog;
use super::pricing::parse_local_datetime;

pub const OVERLAP_HEADLINE: &str =
    "The vehicle is already booked for the period you selected. Please choose again.";

/// Scheduling collision reported by the backend in an error's `details`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapConflict {
    pub reason: String,
    /// `None` when the backend did not say which vehicles collided.
    pub vehicle_ids: Option<Vec<String>>,
    pub booking_ids: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl OverlapConflict {
    pub fn from_details(details: &Value) -> Option<Self> {
        let reason = details.get("reason")?.as_str()?;
        if !reason.to_lowercase().contains("overlap") {
            return None;
        }
        Some(Self {
            reason: reason.to_string(),
            vehicle_ids: details.get("vehicles").and_then(string_list),
            booking_ids: details
                .get("conflicts")
                .and_then(string_list)
                .unwrap_or_default(),
            start: string_field(details, "startDate"),
            end: string_field(details, "endDate"),
        })
    }

    /// Multi-line operator message. The requested range falls back to the
    /// form's own values when the backend omitted it.
    pub fn render(&self, catalog: &VehicleCatalog, requested_start: &str, requested_end: &str) -> String {
        let plates = match &self.vehicle_ids {
            Some(ids) => ids
                .iter()
                .map(|id| catalog.plate_or_id(id))
                .collect::<Vec<_>>()
                .join(", "),
            None => "(unknown)".to_string(),
        };
        let start = self.start.as_deref().unwrap_or(requested_start);
        let end = self.end.as_deref().unwrap_or(requested_end);

        let mut message = format!(
            "{OVERLAP_HEADLINE}\nConflicting vehicles: {plates}\nPeriod: {} → {}",
            display_datetime(start),
            display_datetime(end)
        );
        if !self.booking_ids.is_empty() {
            message.push_str("\nConflicting bookings: ");
            message.push_str(&self.booking_ids.join(", "));
        }
        message
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("_id")
                    .or_else(|| obj.get("id"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}

fn string_field(details: &Value, key: &str) -> Option<String> {
    details
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn display_datetime(raw: &str) -> String {
    parse_local_datetime(raw)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}
