use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;

use super::catalog::VehicleCatalog;
use super::search::SearchSource;
use super::{ListParams, Upload};
use crate::api::client::unwrap_entity;
use crate::api::{AbortSignal, ApiClient, Page};
use crate::errors::AppError;
use crate::models::{Vehicle, VehicleStatus};

/// Fields of the add/edit vehicle form, sent as multipart.
#[derive(Debug, Clone)]
pub struct VehicleForm {
    pub license_plate: String,
    pub vehicle_type: String,
    pub brand: String,
    pub price_per_day: f64,
    pub status: VehicleStatus,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub images: Vec<Upload>,
}

impl VehicleForm {
    fn into_multipart(self) -> Result<Form, AppError> {
        if self.license_plate.trim().is_empty() {
            return Err(AppError::Invalid("licence plate is required".into()));
        }
        if !self.price_per_day.is_finite() || self.price_per_day < 0.0 {
            return Err(AppError::Invalid("daily price must be a non-negative number".into()));
        }
        let mut form = Form::new()
            .text("licensePlate", self.license_plate.trim().to_string())
            .text("type", self.vehicle_type)
            .text("brand", self.brand)
            .text("pricePerDay", self.price_per_day.to_string())
            .text("status", self.status.as_str());
        if let Some(color) = self.color {
            form = form.text("color", color);
        }
        if let Some(year) = self.year {
            form = form.text("year", year.to_string());
        }
        for image in self.images {
            form = form.part("images", image.into_part()?);
        }
        Ok(form)
    }
}

#[derive(Clone)]
pub struct VehicleService {
    client: ApiClient,
}

impl VehicleService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        params: &ListParams,
        signal: Option<&AbortSignal>,
    ) -> Result<Page<Vehicle>, AppError> {
        let value = self
            .client
            .get_value("/vehicles", &params.to_query(), signal)
            .await?;
        Page::decode(value)
    }

    /// Loads the whole fleet in one page for price and plate lookups.
    pub async fn catalog(
        &self,
        limit: u32,
        signal: Option<&AbortSignal>,
    ) -> Result<VehicleCatalog, AppError> {
        let params = ListParams {
            limit,
            ..ListParams::default()
        };
        let page = self.list(&params, signal).await?;
        if page.total.is_some_and(|total| total > page.items.len() as u64) {
            tracing::warn!(
                loaded = page.items.len(),
                total = ?page.total,
                "vehicle catalog truncated, prices for unlisted vehicles count as 0"
            );
        }
        Ok(VehicleCatalog::from_vehicles(page.items))
    }

    pub async fn create(&self, form: VehicleForm) -> Result<Vehicle, AppError> {
        let value: Value = self
            .client
            .send_multipart(Method::POST, "/vehicles", form.into_multipart()?, None)
            .await?;
        unwrap_entity(value)
    }

    pub async fn update(&self, id: &str, form: VehicleForm) -> Result<Vehicle, AppError> {
        let value: Value = self
            .client
            .send_multipart(
                Method::PUT,
                &format!("/vehicles/{id}"),
                form.into_multipart()?,
                None,
            )
            .await?;
        unwrap_entity(value)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client.delete(&format!("/vehicles/{id}"), None).await
    }
}

#[async_trait]
impl SearchSource for VehicleService {
    type Item = Vehicle;

    async fn search(&self, query: &str, signal: &AbortSignal) -> Result<Vec<Vehicle>, AppError> {
        let page = self.list(&ListParams::search(query), Some(signal)).await?;
        Ok(page.items)
    }
}
