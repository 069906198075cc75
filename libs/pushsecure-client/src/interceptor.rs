//! Request interceptors
//!
//! Every outgoing request passes through the client's interceptor chain
//! right before it is sent, so interceptors observe state as of execution
//! time rather than as of call creation.

use std::fmt;
use std::sync::{Arc, RwLock};

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::debug;

use crate::errors::{PushSecureError, Result};
use crate::models::Account;

/// Hook applied to each outgoing request
pub trait Interceptor: Send + Sync + fmt::Debug {
    fn intercept(&self, request: &mut Request) -> Result<()>;
}

/// Shared slot holding the current account token
///
/// Clones share the same slot. Reads and writes are serialized by a lock,
/// so a request racing with [`Credentials::set`] carries either the old or
/// the new token, whichever was current when the request was sent.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn from_account(account: Option<&Account>) -> Self {
        Self::new(account.map(|a| a.token.clone()))
    }

    pub fn set(&self, token: Option<String>) {
        // A poisoned lock still holds a valid Option<String>
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.is_set().then_some("<redacted>"))
            .finish()
    }
}

/// Adds `Authorization: Token <token>` when an account token is set
#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    credentials: Credentials,
}

impl AuthInterceptor {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl Interceptor for AuthInterceptor {
    fn intercept(&self, request: &mut Request) -> Result<()> {
        let Some(token) = self.credentials.token() else {
            return Ok(());
        };

        let mut value = HeaderValue::from_str(&format!("Token {}", token))
            .map_err(|_| PushSecureError::InvalidHeader("Authorization"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Logs each outgoing request at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, request: &mut Request) -> Result<()> {
        debug!(
            method = %request.method(),
            url = %request.url(),
            authenticated = request.headers().contains_key(AUTHORIZATION),
            "PushSecure request"
        );
        Ok(())
    }
}
