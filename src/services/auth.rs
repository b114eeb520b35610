use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::errors::AppError;
use crate::session::TokenClaims;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchanges credentials for a bearer token and stores it in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<TokenClaims>, AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Invalid("email and password are required".into()));
        }

        let value: Value = self
            .client
            .send_json(Method::POST, "/users/login", &LoginRequest { email, password }, None)
            .await?;
        let login = decode_login(value)?;

        self.client.session().sign_in(&login.token)?;
        tracing::info!(email = %email, "logged in");
        Ok(TokenClaims::peek(&login.token))
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.client.session().sign_out()?;
        tracing::info!("logged out");
        Ok(())
    }
}

fn decode_login(value: Value) -> Result<LoginResponse, AppError> {
    let inner = match value {
        Value::Object(mut map) if !map.contains_key("token") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    let login: LoginResponse =
        serde_json::from_value(inner).map_err(|e| AppError::Decode(e.to_string()))?;
    if login.token.trim().is_empty() {
        return Err(AppError::Decode("login response carried an empty token".into()));
    }
    Ok(login)
}
