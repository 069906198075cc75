//! PushSecure Client Library
//!
//! Typed client for the PushSecure push-notification server: account
//! authentication, GCM/APNS device registration, push-token management and
//! message sending.
//!
//! It handles:
//! - `Authorization: Token <token>` injection for the current account
//! - Deferred, cancellable calls executed async, blocking or in the background
//! - JSON bodies with snake_case fields and Django-formatted timestamps
//! - Configuration from environment variables
//!
//! # Example
//!
//! ```no_run
//! use pushsecure_client::PushSecureClient;
//!
//! # async fn run() -> pushsecure_client::Result<()> {
//! let client = PushSecureClient::new("https://push.example.com/api/v1/")?;
//!
//! let account = client
//!     .authenticate_account("alice", "pw123", None)
//!     .execute()
//!     .await?;
//! client.set_account(Some(&account));
//!
//! let device = client
//!     .create_device("gcm-registration-id", Some("Pixel"), None)
//!     .execute()
//!     .await?;
//! let token = client.create_token(&device, Some("work")).execute().await?;
//! client.send_message(&token.token, Some("hello")).execute().await?;
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod client;
pub mod config;
pub mod django_date;
pub mod errors;
pub mod interceptor;
pub mod models;
mod routes;
pub mod string_or_number;
mod transport;

pub use call::{Call, CallHandle, Canceller};
pub use client::{PushSecureClient, PushSecureClientBuilder};
pub use config::PushSecureConfig;
pub use errors::{PushSecureError, Result};
pub use interceptor::{AuthInterceptor, Credentials, Interceptor, LoggingInterceptor};
pub use models::{Account, Device, DeviceList, Message, NoContent, Page, PushToken, TokenList};
