use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ListParams;
use crate::api::client::unwrap_entity;
use crate::api::{AbortSignal, ApiClient, Page};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub customer: String,
    pub vehicles: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBooking {
    pub start_date: String,
    pub end_date: String,
    pub total_price: f64,
    pub status: BookingStatus,
    /// Omitted to keep the booking's current vehicles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    client: ApiClient,
}

impl BookingService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The booking endpoint is usually unpaginated; `params` is forwarded
    /// when given.
    pub async fn list(
        &self,
        params: Option<&ListParams>,
        signal: Option<&AbortSignal>,
    ) -> Result<Page<Booking>, AppError> {
        let query = params.map(ListParams::to_query).unwrap_or_default();
        let value = self.client.get_value("/bookings", &query, signal).await?;
        Page::decode(value)
    }

    pub async fn create(&self, payload: &CreateBooking) -> Result<Booking, AppError> {
        tracing::info!(
            customer = %payload.customer,
            vehicles = payload.vehicles.len(),
            total = payload.total_price,
            "creating booking"
        );
        let value: Value = self
            .client
            .send_json(Method::POST, "/bookings", payload, None)
            .await?;
        unwrap_entity(value)
    }

    pub async fn update(&self, id: &str, payload: &UpdateBooking) -> Result<Booking, AppError> {
        tracing::info!(booking_id = %id, status = %payload.status, "updating booking");
        let value: Value = self
            .client
            .send_json(Method::PUT, &format!("/bookings/{id}"), payload, None)
            .await?;
        unwrap_entity(value)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client.delete(&format!("/bookings/{id}"), None).await
    }
}

/// Case-insensitive match on customer name/phone and vehicle plate/brand.
pub fn filter_bookings<'a>(bookings: &'a [Booking], term: &str) -> Vec<&'a Booking> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return bookings.iter().collect();
    }
    bookings
        .iter()
        .filter(|b| {
            let customer = b.customer.as_ref().and_then(|c| c.customer());
            let customer_hit = customer.is_some_and(|c| {
                c.name.to_lowercase().contains(&term)
                    || c.phone
                        .as_deref()
                        .is_some_and(|p| p.to_lowercase().contains(&term))
            });
            customer_hit
                || b.embedded_vehicles().iter().any(|v| {
                    v.license_plate.to_lowercase().contains(&term)
                        || v.brand.to_lowercase().contains(&term)
                })
        })
        .collect()
}
