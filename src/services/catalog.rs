use std::collections::HashMap;

use crate::models::Vehicle;

/// Locally cached vehicles used for price lookup and plate labels.
///
/// `all` is loaded once per session; `listed` mirrors whatever the vehicle
/// dropdown currently shows and is consulted only when `all` misses.
#[derive(Debug, Clone, Default)]
pub struct VehicleCatalog {
    all: HashMap<String, Vehicle>,
    listed: HashMap<String, Vehicle>,
}

impl VehicleCatalog {
    pub fn from_vehicles(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        Self {
            all: index(vehicles),
            listed: HashMap::new(),
        }
    }

    pub fn set_listed(&mut self, vehicles: impl IntoIterator<Item = Vehicle>) {
        self.listed = index(vehicles);
    }

    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.all.get(id).or_else(|| self.listed.get(id))
    }

    pub fn price_of(&self, id: &str) -> Option<f64> {
        self.get(id).map(|v| v.price_per_day)
    }

    /// Licence plate, or the raw id when the vehicle is unknown.
    pub fn plate_or_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|v| v.license_plate.as_str()).unwrap_or(id)
    }

    /// Maps a vehicle id or licence plate to the vehicle id. Unknown keys
    /// come back unchanged.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        if self.get(key).is_some() {
            return key;
        }
        self.all
            .values()
            .chain(self.listed.values())
            .find(|v| v.license_plate.eq_ignore_ascii_case(key))
            .map(|v| v.id.as_str())
            .unwrap_or(key)
    }
}

fn index(vehicles: impl IntoIterator<Item = Vehicle>) -> HashMap<String, Vehicle> {
    vehicles.into_iter().map(|v| (v.id.clone(), v)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::VehicleStatus;

    pub(crate) fn vehicle(id: &str, plate: &str, price: f64) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            license_plate: plate.to_string(),
            brand: "Honda".to_string(),
            vehicle_type: "Scooter".to_string(),
            color: None,
            year: None,
            status: VehicleStatus::Available,
            price_per_day: price,
            images: vec![],
        }
    }

    #[test]
    fn test_full_map_wins_over_listed() {
        let mut catalog = VehicleCatalog::from_vehicles(vec![vehicle("v1", "P1", 100.0)]);
        catalog.set_listed(vec![vehicle("v1", "P1-old", 1.0), vehicle("v2", "P2", 50.0)]);
        assert_eq!(catalog.price_of("v1"), Some(100.0));
        assert_eq!(catalog.price_of("v2"), Some(50.0));
        assert_eq!(catalog.price_of("v3"), None);
        assert_eq!(catalog.plate_or_id("v1"), "P1");
        assert_eq!(catalog.plate_or_id("v3"), "v3");
    }

    #[test]
    fn test_resolve_by_id_or_plate() {
        let mut catalog = VehicleCatalog::from_vehicles(vec![vehicle("v1", "49B1-123.45", 100.0)]);
        catalog.set_listed(vec![vehicle("v9", "59X2-999.99", 80.0)]);
        assert_eq!(catalog.resolve("v1"), "v1");
        assert_eq!(catalog.resolve("49b1-123.45"), "v1");
        assert_eq!(catalog.resolve("59X2-999.99"), "v9");
        assert_eq!(catalog.resolve("nope"), "nope");
    }
}
