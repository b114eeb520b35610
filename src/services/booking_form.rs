use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

use super::bookings::{CreateBooking, UpdateBooking};
use super::catalog::VehicleCatalog;
use super::pricing::{self, RangeStatus};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

pub const DEFAULT_COLOR: &str = "#3b82f6";

const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Editable booking form state. Every change to the date range or the
/// vehicle selection recomputes the total price.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub customer: String,
    vehicles: Vec<String>,
    start: String,
    end: String,
    total_price: f64,
    pub status: Option<BookingStatus>,
    pub color: Option<String>,
    editing_id: Option<String>,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            customer: String::new(),
            vehicles: Vec::new(),
            start: String::new(),
            end: String::new(),
            total_price: 0.0,
            status: None,
            color: Some(DEFAULT_COLOR.to_string()),
            editing_id: None,
        }
    }
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(booking: &Booking) -> Self {
        Self {
            customer: booking.customer_id().unwrap_or_default().to_string(),
            vehicles: booking.vehicle_ids(),
            start: to_input_value(booking.start_date),
            end: to_input_value(booking.end_date),
            total_price: booking.total_price,
            status: Some(booking.status),
            color: booking.color.clone(),
            editing_id: Some(booking.id.clone()),
        }
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    pub fn vehicles(&self) -> &[String] {
        &self.vehicles
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn set_start(&mut self, start: &str, catalog: &VehicleCatalog) {
        self.start = start.trim().to_string();
        self.recompute(catalog);
    }

    pub fn set_end(&mut self, end: &str, catalog: &VehicleCatalog) {
        self.end = end.trim().to_string();
        self.recompute(catalog);
    }

    pub fn set_vehicles(&mut self, ids: impl IntoIterator<Item = String>, catalog: &VehicleCatalog) {
        self.vehicles.clear();
        for id in ids {
            if !id.is_empty() && !self.vehicles.contains(&id) {
                self.vehicles.push(id);
            }
        }
        self.recompute(catalog);
    }

    pub fn toggle_vehicle(&mut self, id: &str, catalog: &VehicleCatalog) {
        match self.vehicles.iter().position(|v| v == id) {
            Some(idx) => {
                self.vehicles.remove(idx);
            }
            None => self.vehicles.push(id.to_string()),
        }
        self.recompute(catalog);
    }

    /// Manual override. Holds until the range or selection changes again.
    pub fn set_total_price(&mut self, total: f64) {
        self.total_price = total.max(0.0);
    }

    /// Rounds `now` up to the next quarter hour and uses it as the start.
    pub fn start_now(&mut self, now: NaiveDateTime, catalog: &VehicleCatalog) {
        let quarter = Duration::minutes(15).num_seconds();
        let secs = now.and_utc().timestamp();
        let rounded = (secs + quarter - 1).div_euclid(quarter) * quarter;
        let start = DateTime::from_timestamp(rounded, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(now);
        self.set_start(&start.format(INPUT_FORMAT).to_string(), catalog);
    }

    /// End = start + `days`, counting from `now` when no start is set.
    /// An out-of-range offset leaves `end` untouched.
    pub fn end_plus_days(
        &mut self,
        days: i64,
        now: NaiveDateTime,
        catalog: &VehicleCatalog,
    ) -> Result<(), AppError> {
        let base = pricing::parse_local_datetime(&self.start).unwrap_or(now);
        let end = Duration::try_days(days)
            .and_then(|offset| base.checked_add_signed(offset))
            .ok_or_else(|| AppError::Invalid(format!("cannot end {days} day(s) after {base}")))?;
        self.set_end(&end.format(INPUT_FORMAT).to_string(), catalog);
        Ok(())
    }

    pub fn recompute(&mut self, catalog: &VehicleCatalog) {
        if self.vehicles.is_empty() {
            self.total_price = 0.0;
            return;
        }
        if let RangeStatus::Valid { days } = self.range_status() {
            let rate = pricing::daily_rate(&self.vehicles, |id| catalog.price_of(id));
            self.total_price = pricing::total_price(days, rate);
        }
    }

    pub fn range_status(&self) -> RangeStatus {
        RangeStatus::evaluate(&self.start, &self.end)
    }

    pub fn invalid_range(&self) -> bool {
        self.range_status().is_invalid()
    }

    /// Soft warning only; does not block submission.
    pub fn start_in_past(&self, now: NaiveDateTime) -> bool {
        pricing::parse_local_datetime(&self.start).is_some_and(|start| start < now)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.editing_id.is_none() && self.customer.trim().is_empty() {
            return Err(AppError::Invalid("a customer is required".into()));
        }
        if self.vehicles.is_empty() {
            return Err(AppError::Invalid("select at least one vehicle".into()));
        }
        match self.range_status() {
            RangeStatus::Valid { .. } => Ok(()),
            RangeStatus::Incomplete => Err(AppError::Invalid(
                "start and end time are required".into(),
            )),
            RangeStatus::Invalid => Err(AppError::Invalid(
                "end time must be after start time".into(),
            )),
        }
    }

    pub fn create_payload(&self) -> Result<CreateBooking, AppError> {
        self.validate()?;
        Ok(CreateBooking {
            customer: self.customer.trim().to_string(),
            vehicles: self.vehicles.clone(),
            start_date: wire_datetime(&self.start)?,
            end_date: wire_datetime(&self.end)?,
            total_price: self.total_price,
            color: self.color.clone(),
        })
    }

    pub fn update_payload(&self) -> Result<UpdateBooking, AppError> {
        self.validate()?;
        Ok(UpdateBooking {
            start_date: wire_datetime(&self.start)?,
            end_date: wire_datetime(&self.end)?,
            total_price: self.total_price,
            status: self.status.unwrap_or(BookingStatus::Pending),
            vehicles: Some(self.vehicles.clone()),
            color: self.color.clone(),
        })
    }
}

/// `YYYY-MM-DDTHH:MM` in local time, the format the form inputs use.
pub fn to_input_value(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format(INPUT_FORMAT).to_string()
}

/// Form value to RFC 3339 with the local offset, so the backend never has
/// to guess the timezone.
fn wire_datetime(value: &str) -> Result<String, AppError> {
    let naive = pricing::parse_local_datetime(value)
        .ok_or_else(|| AppError::Invalid(format!("unrecognized date `{value}`")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.to_rfc3339())
        .ok_or_else(|| AppError::Invalid(format!("`{value}` does not exist in the local timezone")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::tests::vehicle;

    fn catalog() -> VehicleCatalog {
        VehicleCatalog::from_vehicles(vec![
            vehicle("v1", "P1", 100_000.0),
            vehicle("v2", "P2", 80_000.0),
        ])
    }

    fn dt(s: &str) -> NaiveDateTime {
        pricing::parse_local_datetime(s).unwrap()
    }

    #[test]
    fn test_one_day_one_vehicle() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);
        assert_eq!(draft.total_price(), 100_000.0);
        assert!(!draft.invalid_range());
    }

    #[test]
    fn test_partial_day_charges_full_day_for_each_vehicle() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-03T09:00", &catalog);
        draft.set_vehicles(vec!["v1".to_string(), "v2".to_string()], &catalog);
        assert_eq!(draft.total_price(), 2.0 * 180_000.0);
    }

    #[test]
    fn test_invalid_range_leaves_total_unchanged() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-03T10:00", &catalog);
        assert_eq!(draft.total_price(), 200_000.0);

        draft.set_end("2024-01-01T09:00", &catalog);
        assert!(draft.invalid_range());
        assert_eq!(draft.total_price(), 200_000.0);

        draft.set_end("not a date", &catalog);
        assert!(draft.invalid_range());
        assert_eq!(draft.total_price(), 200_000.0);
        assert!(matches!(draft.validate(), Err(AppError::Invalid(_))));
    }

    #[test]
    fn test_empty_selection_is_zero() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-05T10:00", &catalog);
        assert_eq!(draft.total_price(), 400_000.0);

        draft.toggle_vehicle("v1", &catalog);
        assert_eq!(draft.total_price(), 0.0);
    }

    #[test]
    fn test_unknown_vehicle_contributes_nothing() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);
        draft.set_vehicles(vec!["v1".to_string(), "ghost".to_string()], &catalog);
        assert_eq!(draft.total_price(), 100_000.0);
    }

    #[test]
    fn test_manual_override_until_next_change() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);
        draft.set_total_price(90_000.0);
        assert_eq!(draft.total_price(), 90_000.0);

        draft.toggle_vehicle("v2", &catalog);
        assert_eq!(draft.total_price(), 180_000.0);
    }

    #[test]
    fn test_duplicate_selection_ignored() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string(), "v1".to_string()], &catalog);
        assert_eq!(draft.vehicles(), ["v1".to_string()]);
    }

    #[test]
    fn test_start_in_past_is_soft() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.customer = "c1".into();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);
        assert!(draft.start_in_past(dt("2024-06-01T00:00")));
        assert!(!draft.start_in_past(dt("2023-06-01T00:00")));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_incomplete_range_blocks_without_flagging() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.customer = "c1".into();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        assert!(!draft.invalid_range());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_start_now_rounds_up_to_quarter_hour() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.start_now(dt("2024-01-01T10:01"), &catalog);
        assert_eq!(draft.start(), "2024-01-01T10:15");
        draft.start_now(dt("2024-01-01T10:45"), &catalog);
        assert_eq!(draft.start(), "2024-01-01T10:45");
        draft.start_now(dt("2024-01-01T23:50"), &catalog);
        assert_eq!(draft.start(), "2024-01-02T00:00");
    }

    #[test]
    fn test_end_plus_days() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.end_plus_days(1, dt("2024-03-01T08:00"), &catalog).unwrap();
        assert_eq!(draft.end(), "2024-03-02T08:00");

        draft.set_start("2024-01-31T10:00", &catalog);
        draft.end_plus_days(3, dt("2024-03-01T08:00"), &catalog).unwrap();
        assert_eq!(draft.end(), "2024-02-03T10:00");
    }

    #[test]
    fn test_end_plus_days_out_of_range_keeps_end() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);

        for days in [100_000_000, i64::MAX, i64::MIN] {
            let err = draft
                .end_plus_days(days, dt("2024-01-01T08:00"), &catalog)
                .unwrap_err();
            assert!(matches!(err, AppError::Invalid(_)));
            assert_eq!(draft.end(), "2024-01-02T10:00");
            assert_eq!(draft.total_price(), 100_000.0);
        }
    }

    #[test]
    fn test_end_plus_negative_days_is_invalid_range() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-10T10:00", &catalog);
        draft
            .end_plus_days(-2, dt("2024-01-01T08:00"), &catalog)
            .unwrap();
        assert_eq!(draft.end(), "2024-01-08T10:00");
        assert!(draft.invalid_range());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_create_payload_requires_customer() {
        let catalog = catalog();
        let mut draft = BookingDraft::new();
        draft.set_vehicles(vec!["v1".to_string()], &catalog);
        draft.set_start("2024-01-01T10:00", &catalog);
        draft.set_end("2024-01-02T10:00", &catalog);
        assert!(draft.create_payload().is_err());

        draft.customer = "c1".into();
        let payload = draft.create_payload().unwrap();
        assert_eq!(payload.customer, "c1");
        assert_eq!(payload.vehicles, vec!["v1"]);
        assert_eq!(payload.total_price, 100_000.0);
        assert_eq!(payload.color.as_deref(), Some(DEFAULT_COLOR));
        assert!(payload.start_date.starts_with("2024-01-01T10:00:00"));
    }

    #[test]
    fn test_edit_prefills_and_defaults_status() {
        let booking: Booking = serde_json::from_value(serde_json::json!({
            "_id": "b1",
            "customer": {"_id": "c1", "name": "An"},
            "vehicles": ["v2"],
            "startDate": "2024-01-01T03:00:00Z",
            "endDate": "2024-01-02T03:00:00Z",
            "totalPrice": 80000,
            "status": "active"
        }))
        .unwrap();
        let mut draft = BookingDraft::edit(&booking);
        assert_eq!(draft.editing_id(), Some("b1"));
        assert_eq!(draft.customer, "c1");
        assert_eq!(draft.vehicles(), ["v2".to_string()]);
        assert_eq!(draft.total_price(), 80_000.0);

        let payload = draft.update_payload().unwrap();
        assert_eq!(payload.status, BookingStatus::Active);
        assert_eq!(payload.vehicles, Some(vec!["v2".to_string()]));

        draft.status = None;
        assert_eq!(draft.update_payload().unwrap().status, BookingStatus::Pending);
    }
}
