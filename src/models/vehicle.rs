use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub license_plate: String,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "type", default)]
    pub vehicle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub status: VehicleStatus,
    #[serde(default)]
    pub price_per_day: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Available,
    Rented,
    Maintenance,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Rented => "rented",
            VehicleStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(VehicleStatus::Available),
            "rented" => Ok(VehicleStatus::Rented),
            "maintenance" => Ok(VehicleStatus::Maintenance),
            other => Err(format!(
                "unknown vehicle status `{other}` (expected available, rented or maintenance)"
            )),
        }
    }
}

/// Per-status vehicle counts shown above the fleet list.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct FleetSummary {
    pub total: usize,
    pub available: usize,
    pub rented: usize,
    pub maintenance: usize,
}

impl FleetSummary {
    pub fn from_vehicles<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        vehicles.into_iter().fold(Self::default(), |mut acc, v| {
            acc.total += 1;
            match v.status {
                VehicleStatus::Available => acc.available += 1,
                VehicleStatus::Rented => acc.rented += 1,
                VehicleStatus::Maintenance => acc.maintenance += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VehicleRef {
    Id(String),
    Embedded(Box<Vehicle>),
}

impl VehicleRef {
    pub fn id(&self) -> &str {
        match self {
            VehicleRef::Id(id) => id,
            VehicleRef::Embedded(v) => &v.id,
        }
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        match self {
            VehicleRef::Id(_) => None,
            VehicleRef::Embedded(v) => Some(v),
        }
    }
}
