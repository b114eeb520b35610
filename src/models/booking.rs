use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerRef;
use super::vehicle::{Vehicle, VehicleRef};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub vehicles: Vec<VehicleRef>,
    /// Single-vehicle shape still returned by older backend builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Vehicle>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub total_price: f64,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Vehicle ids from the multi-vehicle list, falling back to the legacy field.
    pub fn vehicle_ids(&self) -> Vec<String> {
        if !self.vehicles.is_empty() {
            return self
                .vehicles
                .iter()
                .map(|v| v.id().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }
        self.vehicle.iter().map(|v| v.id.clone()).collect()
    }

    /// Populated vehicles only; bare ids are skipped.
    pub fn embedded_vehicles(&self) -> Vec<&Vehicle> {
        if !self.vehicles.is_empty() {
            return self.vehicles.iter().filter_map(VehicleRef::vehicle).collect();
        }
        self.vehicle.iter().collect()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(CustomerRef::id)
    }

    /// "name (phone)" when the customer is populated, otherwise `None`.
    pub fn customer_label(&self) -> Option<String> {
        let customer = self.customer.as_ref()?.customer()?;
        if customer.name.is_empty() && customer.phone.as_deref().unwrap_or("").is_empty() {
            return None;
        }
        Some(customer.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Active,
    Completed,
    Overdue,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown booking status `{s}` (expected pending, active, completed or overdue)")
            })
    }
}
