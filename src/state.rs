use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::auth::AuthService;
use crate::services::bookings::BookingService;
use crate::services::customers::CustomerService;
use crate::services::logs::LogService;
use crate::services::vehicles::VehicleService;
use crate::session::{FileTokenStore, Session};

/// Everything a command needs, built once at startup and passed explicitly.
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<Session>,
    pub auth: AuthService,
    pub vehicles: Arc<VehicleService>,
    pub customers: Arc<CustomerService>,
    pub bookings: BookingService,
    pub logs: LogService,
}

impl AppState {
    /// Loads the stored token from `config.token_path` and wires the services.
    pub fn init(config: AppConfig) -> Result<Self, AppError> {
        let store = FileTokenStore::new(config.token_path.clone());
        let session = Arc::new(Session::load(Box::new(store))?);
        let client = ApiClient::new(&config, Arc::clone(&session))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: AppConfig, client: ApiClient) -> Self {
        Self {
            session: Arc::clone(client.session()),
            auth: AuthService::new(client.clone()),
            vehicles: Arc::new(VehicleService::new(client.clone())),
            customers: Arc::new(CustomerService::new(client.clone())),
            bookings: BookingService::new(client.clone()),
            logs: LogService::new(client, &config.logs_endpoint),
            config,
        }
    }
}
