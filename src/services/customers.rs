use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;

use super::search::SearchSource;
use super::{ListParams, Upload};
use crate::api::client::unwrap_entity;
use crate::api::{AbortSignal, ApiClient, Page};
use crate::errors::AppError;
use crate::models::Customer;

/// Add/edit customer form. Only fields that are set are sent.
#[derive(Debug, Clone, Default)]
pub struct CustomerForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub driver_license: Option<String>,
    pub notes: Option<String>,
    pub national_id_image: Option<Upload>,
    pub driver_license_image: Option<Upload>,
}

impl CustomerForm {
    fn into_multipart(self) -> Result<Form, AppError> {
        let mut form = Form::new();
        let texts = [
            ("name", self.name),
            ("phone", self.phone),
            ("cccd", self.national_id),
            ("driverLicense", self.driver_license),
            ("notes", self.notes),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                form = form.text(field, value);
            }
        }
        if let Some(image) = self.national_id_image {
            form = form.part("cccdImage", image.into_part()?);
        }
        if let Some(image) = self.driver_license_image {
            form = form.part("driverLicenseImage", image.into_part()?);
        }
        Ok(form)
    }
}

#[derive(Clone)]
pub struct CustomerService {
    client: ApiClient,
}

impl CustomerService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        params: &ListParams,
        signal: Option<&AbortSignal>,
    ) -> Result<Page<Customer>, AppError> {
        let value = self
            .client
            .get_value("/customers", &params.to_query(), signal)
            .await?;
        Page::decode(value)
    }

    pub async fn create(&self, form: CustomerForm) -> Result<Customer, AppError> {
        if form.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AppError::Invalid("customer name is required".into()));
        }
        let value: Value = self
            .client
            .send_multipart(Method::POST, "/customers", form.into_multipart()?, None)
            .await?;
        unwrap_entity(value)
    }

    pub async fn update(&self, id: &str, form: CustomerForm) -> Result<Customer, AppError> {
        let value: Value = self
            .client
            .send_multipart(
                Method::PUT,
                &format!("/customers/{id}"),
                form.into_multipart()?,
                None,
            )
            .await?;
        unwrap_entity(value)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client.delete(&format!("/customers/{id}"), None).await
    }
}

#[async_trait]
impl SearchSource for CustomerService {
    type Item = Customer;

    async fn search(&self, query: &str, signal: &AbortSignal) -> Result<Vec<Customer>, AppError> {
        let page = self.list(&ListParams::search(query), Some(signal)).await?;
        Ok(page.items)
    }
}
