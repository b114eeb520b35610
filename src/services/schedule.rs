use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::{Booking, BookingStatus, Vehicle};
use crate::output::format_vnd;

pub const OTHER_TYPE: &str = "Other";
pub const GUEST_TITLE: &str = "Guest";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub vehicle_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// `{booking id}-{vehicle index}`
    pub id: String,
    pub booking_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resource_id: String,
    pub status: BookingStatus,
    pub total_price: f64,
    pub color: Option<String>,
}

impl TimelineEvent {
    pub fn tooltip(&self) -> String {
        let mut text = format!(
            "{}\n{} → {}",
            self.title,
            self.start.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
            self.end.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
        );
        if self.total_price > 0.0 {
            text.push_str(&format!("\nPrice: {}", format_vnd(self.total_price)));
        }
        text
    }

    /// Whether the event overlaps the half-open local window `[from, to)`.
    pub fn intersects(&self, from: NaiveDateTime, to: NaiveDateTime) -> bool {
        let start = self.start.with_timezone(&Local).naive_local();
        let end = self.end.with_timezone(&Local).naive_local();
        start < to && end > from
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleFilter {
    /// `None` shows every vehicle type.
    pub types: Option<HashSet<String>>,
    pub statuses: HashSet<BookingStatus>,
    pub search: String,
}

impl Default for ScheduleFilter {
    fn default() -> Self {
        Self {
            types: None,
            statuses: BookingStatus::ALL.into_iter().collect(),
            search: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub resources: Vec<Resource>,
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSlice<'a> {
    pub resources: Vec<&'a Resource>,
    pub events: Vec<&'a TimelineEvent>,
}

impl Schedule {
    pub fn build(vehicles: &[Vehicle], bookings: &[Booking]) -> Self {
        let resources = vehicles
            .iter()
            .map(|v| Resource {
                id: v.id.clone(),
                title: v.license_plate.clone(),
                vehicle_type: type_label(&v.vehicle_type),
            })
            .collect();

        let events = bookings
            .iter()
            .flat_map(|b| {
                let title = event_title(b);
                b.vehicle_ids()
                    .into_iter()
                    .enumerate()
                    .map(move |(i, vehicle_id)| TimelineEvent {
                        id: format!("{}-{i}", b.id),
                        booking_id: b.id.clone(),
                        title: title.clone(),
                        start: b.start_date,
                        end: b.end_date,
                        resource_id: vehicle_id,
                        status: b.status,
                        total_price: b.total_price,
                        color: b.color.clone(),
                    })
            })
            .collect();

        Self { resources, events }
    }

    pub fn vehicle_types(&self) -> Vec<String> {
        self.resources
            .iter()
            .map(|r| r.vehicle_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn filtered(&self, filter: &ScheduleFilter) -> ScheduleSlice<'_> {
        let query = filter.search.trim().to_lowercase();
        let by_id: HashMap<&str, &Resource> =
            self.resources.iter().map(|r| (r.id.as_str(), r)).collect();
        let type_visible = |r: &Resource| {
            filter
                .types
                .as_ref()
                .map_or(true, |types| types.contains(&r.vehicle_type))
        };

        let events: Vec<&TimelineEvent> = self
            .events
            .iter()
            .filter(|e| filter.statuses.contains(&e.status))
            .filter(|e| by_id.get(e.resource_id.as_str()).map_or(true, |r| type_visible(*r)))
            .filter(|e| {
                if query.is_empty() {
                    return true;
                }
                let plate = by_id
                    .get(e.resource_id.as_str())
                    .map(|r| r.title.to_lowercase())
                    .unwrap_or_default();
                plate.contains(&query) || e.title.to_lowercase().contains(&query)
            })
            .collect();

        let resources = self
            .resources
            .iter()
            .filter(|r| type_visible(*r))
            .filter(|r| {
                query.is_empty()
                    || r.title.to_lowercase().contains(&query)
                    || events.iter().any(|e| e.resource_id == r.id)
            })
            .collect();

        ScheduleSlice { resources, events }
    }
}

fn type_label(vehicle_type: &str) -> String {
    let trimmed = vehicle_type.trim();
    if trimmed.is_empty() {
        OTHER_TYPE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn event_title(booking: &Booking) -> String {
    let customer = booking.customer.as_ref().and_then(|c| c.customer());
    let name = customer
        .map(|c| c.name.trim())
        .filter(|n| !n.is_empty())
        .unwrap_or(GUEST_TITLE);
    match customer.and_then(|c| c.phone.as_deref()).filter(|p| !p.is_empty()) {
        Some(phone) => format!("{name} ({phone})"),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Day,
    Week,
    Month,
}

impl ViewKind {
    /// Half-open local window `[start, end)` containing `anchor`. Weeks
    /// start on Monday.
    pub fn window(&self, anchor: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let (start, end) = match self {
            ViewKind::Day => (anchor, anchor + Duration::days(1)),
            ViewKind::Week => {
                let start =
                    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
                (start, start + Duration::days(7))
            }
            ViewKind::Month => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                let end = start
                    .checked_add_months(Months::new(1))
                    .unwrap_or(start + Duration::days(31));
                (start, end)
            }
        };
        (start.and_time(chrono::NaiveTime::MIN), end.and_time(chrono::NaiveTime::MIN))
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
        })
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            other => Err(format!("unknown view `{other}` (expected day, week or month)")),
        }
    }
}
