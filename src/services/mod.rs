pub mod auth;
pub mod booking_form;
pub mod bookings;
pub mod catalog;
pub mod customers;
pub mod logs;
pub mod overlap;
pub mod pricing;
pub mod schedule;
pub mod search;
pub mod vehicles;

use std::path::Path;

use reqwest::multipart::Part;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: String::new(),
        }
    }
}

impl ListParams {
    pub fn search(query: &str) -> Self {
        Self {
            search: query.to_string(),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
            ("search", self.search.trim().to_string()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Upload {
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            mime: guess_mime(&file_name).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn into_part(self) -> Result<Part, AppError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)?)
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_query() {
        let params = ListParams::search("  honda ");
        assert_eq!(
            params.to_query(),
            vec![
                ("page", "1".to_string()),
                ("limit", "10".to_string()),
                ("search", "honda".to_string())
            ]
        );
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("front.JPG"), "image/jpeg");
        assert_eq!(guess_mime("scan.png"), "image/png");
        assert_eq!(guess_mime("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cccd.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let upload = Upload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "cccd.png");
        assert_eq!(upload.mime, "image/png");
        assert_eq!(upload.bytes.len(), 4);
    }
}
