use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::cancel::AbortSignal;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::session::Session;

/// Thin wrapper over `reqwest` that knows the backend base URL and attaches
/// the session's bearer token to every request.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: Arc<Session>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_http(http, &config.api_base_url, session))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and reads the body, racing both against `signal`.
    async fn execute(
        &self,
        builder: RequestBuilder,
        signal: Option<&AbortSignal>,
    ) -> Result<Vec<u8>, AppError> {
        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let url = resp.url().clone();
            let body = resp.bytes().await?;

            if status.is_success() {
                return Ok(body.to_vec());
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                tracing::warn!(%url, "unauthorized: token expired or invalid");
            } else {
                tracing::debug!(%url, status = status.as_u16(), "backend rejected request");
            }
            Err(AppError::from_status(status.as_u16(), &body))
        };

        match signal {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(AppError::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => Err(AppError::Cancelled),
                    res = exchange => res,
                }
            }
            None => exchange.await,
        }
    }

    pub async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
        signal: Option<&AbortSignal>,
    ) -> Result<Value, AppError> {
        let body = self
            .execute(self.request(Method::GET, path).query(query), signal)
            .await?;
        decode(&body)
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
        signal: Option<&AbortSignal>,
    ) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.request(method, path).json(payload), signal)
            .await?;
        decode(&body)
    }

    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Form,
        signal: Option<&AbortSignal>,
    ) -> Result<T, AppError> {
        let body = self
            .execute(self.request(method, path).multipart(form), signal)
            .await?;
        decode(&body)
    }

    pub async fn delete(&self, path: &str, signal: Option<&AbortSignal>) -> Result<(), AppError> {
        self.execute(self.request(Method::DELETE, path), signal)
            .await
            .map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::Decode(e.to_string()))
}

/// Entities come back either bare or wrapped in `{ "data": ... }`.
pub fn unwrap_entity<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    let inner = match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| AppError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        name: String,
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::with_http(reqwest::Client::new(), base, Arc::new(Session::anonymous()))
    }

    #[test]
    fn test_url_joining() {
        let c = client("http://localhost:5000/api/");
        assert_eq!(c.url("/vehicles"), "http://localhost:5000/api/vehicles");
        assert_eq!(c.url("bookings/1"), "http://localhost:5000/api/bookings/1");
    }

    #[test]
    fn test_unwrap_entity_bare_and_wrapped() {
        let bare: Thing = unwrap_entity(json!({"name": "a"})).unwrap();
        assert_eq!(bare, Thing { name: "a".into() });

        let wrapped: Thing = unwrap_entity(json!({"message": "ok", "data": {"name": "b"}})).unwrap();
        assert_eq!(wrapped, Thing { name: "b".into() });
    }

    #[tokio::test]
    async fn test_pre_aborted_signal_skips_network() {
        // nothing listens on this port; an aborted signal must short-circuit first
        let c = client("http://127.0.0.1:9");
        let controller = crate::api::AbortController::new();
        controller.abort();
        let err = c
            .get_value("/vehicles", &[], Some(&controller.signal()))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
