use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "cccd", default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub driver_license: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(rename = "cccdImage", default)]
    pub national_id_image: Option<ImageRef>,
    #[serde(default)]
    pub driver_license_image: Option<ImageRef>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Customer {
    /// "name (phone)", or just the name.
    pub fn label(&self) -> String {
        match self.phone.as_deref().filter(|p| !p.is_empty()) {
            Some(phone) => format!("{} ({phone})", self.name),
            None => self.name.clone(),
        }
    }
}

/// Document image hosted by the external asset service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Hosted {
        url: String,
        #[serde(default, alias = "publicId")]
        public_id: Option<String>,
    },
}

impl ImageRef {
    pub fn url(&self) -> &str {
        match self {
            ImageRef::Url(url) | ImageRef::Hosted { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CustomerRef {
    Id(String),
    Embedded(Box<Customer>),
}

impl CustomerRef {
    pub fn id(&self) -> &str {
        match self {
            CustomerRef::Id(id) => id,
            CustomerRef::Embedded(c) => &c.id,
        }
    }

    pub fn customer(&self) -> Option<&Customer> {
        match self {
            CustomerRef::Id(_) => None,
            CustomerRef::Embedded(c) => Some(c),
        }
    }
}
