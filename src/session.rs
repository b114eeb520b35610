use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::AppError;

/// Durable home of the bearer token between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

/// Unverified JWT payload, used for display only.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default, alias = "id", alias = "_id", alias = "userId")]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn peek(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// Bearer-token lifecycle: read on load, replaced on login, cleared on logout.
pub struct Session {
    store: Box<dyn TokenStore>,
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn load(store: Box<dyn TokenStore>) -> Result<Self, AppError> {
        let token = store.load()?;
        if let Some(claims) = token.as_deref().and_then(TokenClaims::peek) {
            if claims.is_expired_at(Utc::now()) {
                tracing::warn!(expired_at = ?claims.expires_at(), "stored token has expired, log in again");
            }
        }
        tracing::debug!(has_token = token.is_some(), "session loaded");
        Ok(Self {
            store,
            token: RwLock::new(token),
        })
    }

    pub fn anonymous() -> Self {
        Self {
            store: Box::<MemoryTokenStore>::default(),
            token: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        self.token().as_deref().and_then(TokenClaims::peek)
    }

    pub fn sign_in(&self, token: &str) -> Result<(), AppError> {
        self.store.save(token)?;
        *self.token.write().unwrap() = Some(token.to_string());
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AppError> {
        self.store.clear()?;
        *self.token.write().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));
        assert_eq!(store.load().unwrap(), None);

        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_ignores_blank_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(FileTokenStore::new(path).load().unwrap(), None);
    }

    #[test]
    fn test_session_lifecycle() {
        let session = Session::load(Box::new(MemoryTokenStore::with_token("t1"))).unwrap();
        assert_eq!(session.token().as_deref(), Some("t1"));

        session.sign_in("t2").unwrap();
        assert_eq!(session.token().as_deref(), Some("t2"));

        session.sign_out().unwrap();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_claims_peek() {
        let token = jwt(r#"{"id":"u1","email":"admin@example.com","role":"admin","exp":1700000000}"#);
        let claims = TokenClaims::peek(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u1"));
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(claims.is_expired_at(Utc.timestamp_opt(1_700_000_001, 0).unwrap()));
        assert!(!claims.is_expired_at(Utc.timestamp_opt(1_699_999_999, 0).unwrap()));
    }

    #[test]
    fn test_claims_peek_rejects_opaque_token() {
        assert_eq!(TokenClaims::peek("not-a-jwt"), None);
        assert_eq!(TokenClaims::peek("a.!!!.c"), None);
    }
}
