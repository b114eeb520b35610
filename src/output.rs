//! Plain-text renderers for the CLI. JSON output goes straight through serde.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;

use crate::api::Page;
use crate::models::{ActivityLogEntry, Booking, Customer, FleetSummary, Vehicle};
use crate::services::catalog::VehicleCatalog;
use crate::services::schedule::ScheduleSlice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Whole đồng with `.` thousands separators, e.g. `1.250.000 VND`.
pub fn format_vnd(amount: f64) -> String {
    let rounded = amount.round();
    let digits = (rounded.abs() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped} VND")
}

pub fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Left-aligned columns sized to the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

pub fn page_footer<T>(page: &Page<T>) -> String {
    match (page.total, page.page_count()) {
        (Some(total), Some(pages)) => format!(
            "page {}/{pages}, {total} total",
            page.page.unwrap_or(1)
        ),
        (Some(total), None) => format!("{total} total"),
        _ => format!("{} shown", page.items.len()),
    }
}

/// `page N/M, T total`, with `?` for counts the backend did not report.
pub fn page_position(page: u32, pages: Option<u32>, total: Option<u64>) -> String {
    let pages = match (pages, total) {
        (Some(pages), _) => pages.to_string(),
        (None, Some(0)) => "1".to_string(),
        (None, _) => "?".to_string(),
    };
    let total = total.map_or_else(|| "?".to_string(), |t| t.to_string());
    format!("page {page}/{pages}, {total} total")
}

pub fn fleet_summary_line(summary: &FleetSummary) -> String {
    format!(
        "{} vehicles: {} available, {} rented, {} in maintenance",
        summary.total, summary.available, summary.rented, summary.maintenance
    )
}

pub fn vehicles_table(vehicles: &[Vehicle]) -> String {
    let rows: Vec<Vec<String>> = vehicles
        .iter()
        .map(|v| {
            vec![
                v.id.clone(),
                v.license_plate.clone(),
                v.brand.clone(),
                v.vehicle_type.clone(),
                v.color.clone().unwrap_or_default(),
                v.year.map(|y| y.to_string()).unwrap_or_default(),
                v.status.to_string(),
                format_vnd(v.price_per_day),
            ]
        })
        .collect();
    render_table(
        &["ID", "PLATE", "BRAND", "TYPE", "COLOR", "YEAR", "STATUS", "PRICE/DAY"],
        &rows,
    )
}

pub fn customers_table(customers: &[Customer]) -> String {
    let rows: Vec<Vec<String>> = customers
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.name.clone(),
                c.phone.clone().unwrap_or_default(),
                c.national_id.clone().unwrap_or_default(),
                c.driver_license.clone().unwrap_or_default(),
                c.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["ID", "NAME", "PHONE", "CCCD", "LICENSE", "NOTES"], &rows)
}

pub fn bookings_table(bookings: &[&Booking], catalog: &VehicleCatalog) -> String {
    let rows: Vec<Vec<String>> = bookings
        .iter()
        .map(|b| {
            let plates = b
                .vehicle_ids()
                .iter()
                .map(|id| catalog.plate_or_id(id).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                b.id.clone(),
                b.customer_label()
                    .or_else(|| b.customer_id().map(str::to_string))
                    .unwrap_or_default(),
                plates,
                format_local(b.start_date),
                format_local(b.end_date),
                format_vnd(b.total_price),
                b.status.to_string(),
            ]
        })
        .collect();
    render_table(
        &["ID", "CUSTOMER", "VEHICLES", "START", "END", "TOTAL", "STATUS"],
        &rows,
    )
}

pub fn logs_table(entries: &[ActivityLogEntry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.timestamp.map(format_local).unwrap_or_default(),
                e.actor.clone().unwrap_or_default(),
                e.action.clone().unwrap_or_default(),
                e.entity.clone().unwrap_or_default(),
                e.status.map(|s| s.to_string()).unwrap_or_default(),
                e.summary(),
            ]
        })
        .collect();
    render_table(&["TIME", "ACTOR", "ACTION", "ENTITY", "STATUS", "MESSAGE"], &rows)
}

/// Resources grouped by vehicle type, each followed by its events in the window.
pub fn schedule_text(slice: &ScheduleSlice<'_>, from: NaiveDateTime, to: NaiveDateTime) -> String {
    let mut out = vec![format!(
        "{} → {}",
        from.format("%d/%m/%Y"),
        (to - chrono::Duration::days(1)).format("%d/%m/%Y")
    )];

    let mut resources = slice.resources.clone();
    resources.sort_by(|a, b| (&a.vehicle_type, &a.title).cmp(&(&b.vehicle_type, &b.title)));

    let mut current_type: Option<&str> = None;
    for resource in resources {
        if current_type != Some(resource.vehicle_type.as_str()) {
            out.push(String::new());
            out.push(format!("[{}]", resource.vehicle_type));
            current_type = Some(resource.vehicle_type.as_str());
        }
        let mut events: Vec<_> = slice
            .events
            .iter()
            .filter(|e| e.resource_id == resource.id && e.intersects(from, to))
            .collect();
        events.sort_by_key(|e| e.start);

        if events.is_empty() {
            out.push(format!("  {}  (free)", resource.title));
            continue;
        }
        out.push(format!("  {}", resource.title));
        for event in events {
            out.push(format!("    {}  [{}]", event.tooltip().replace('\n', "  "), event.status));
        }
    }
    out.join("\n")
}
