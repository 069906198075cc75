use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::call::Call;
use crate::config::{default_user_agent, parse_base_url, PushSecureConfig};
use crate::errors::{PushSecureError, Result};
use crate::interceptor::{AuthInterceptor, Credentials, Interceptor, LoggingInterceptor};
use crate::models::*;
use crate::routes;
use crate::transport::Transport;

/// PushSecure API Client
///
/// One method per backend endpoint. Each returns a [`Call`] that is sent
/// only when the caller executes it. Clones share the HTTP connection pool
/// and the current account.
#[derive(Debug, Clone)]
pub struct PushSecureClient {
    transport: Transport,
    credentials: Credentials,
}

impl PushSecureClient {
    /// Create a client for `api_host` with no account set
    pub fn new(api_host: &str) -> Result<Self> {
        Self::builder(api_host).build()
    }

    /// Create a client for `api_host`, authenticated as `account` if given
    pub fn with_account(api_host: &str, account: Option<&Account>) -> Result<Self> {
        let mut builder = Self::builder(api_host);
        if let Some(account) = account {
            builder = builder.account(account);
        }
        builder.build()
    }

    pub fn from_config(config: &PushSecureConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder(&config.api_host)
            .request_timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent);
        if let Some(token) = &config.auth_token {
            builder = builder.account(&Account::new(token.clone()));
        }
        builder.build()
    }

    pub fn builder(api_host: &str) -> PushSecureClientBuilder {
        PushSecureClientBuilder::new(api_host)
    }

    /// Replace the account whose token is attached to subsequent requests,
    /// or clear it with `None`
    ///
    /// Calls already created but not yet executed pick up the new token.
    pub fn set_account(&self, account: Option<&Account>) {
        self.credentials.set(account.map(|a| a.token.clone()));
        info!(authenticated = account.is_some(), "PushSecure account updated");
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_set()
    }

    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    /// Authenticate an account with the given credentials, creating one if
    /// none exists
    ///
    /// Pass the returned [`Account`] to [`set_account`](Self::set_account)
    /// before performing any other operation.
    pub fn authenticate_account(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Call<Account> {
        let body = AuthenticateRequest {
            username,
            password,
            email,
        };
        self.call_with_body(Method::POST, routes::ACCOUNTS, &body)
    }

    /// Register a GCM push endpoint
    pub fn create_device(
        &self,
        registration_id: &str,
        name: Option<&str>,
        platform_device_id: Option<&str>,
    ) -> Call<Device> {
        let body = CreateDeviceRequest {
            registration_id,
            name,
            platform_device_id,
        };
        self.call_with_body(Method::POST, routes::GCM_DEVICES, &body)
    }

    /// Create a push token delivering to `device`
    pub fn create_token(&self, device: &Device, name: Option<&str>) -> Call<PushToken> {
        let body = CreateTokenRequest {
            name,
            device: &device.id,
        };
        self.call_with_body(Method::POST, routes::TOKENS, &body)
    }

    pub fn delete_token(&self, token: &str) -> Call<NoContent> {
        self.call(Method::DELETE, &routes::token(token))
    }

    pub fn get_tokens(&self) -> Call<TokenList> {
        self.call(Method::GET, routes::TOKENS)
    }

    pub fn send_message(&self, recipient_token: &str, data: Option<&str>) -> Call<Message> {
        let body = SendMessageRequest {
            recipient_token,
            data,
        };
        self.call_with_body(Method::POST, routes::MESSAGES, &body)
    }

    pub fn get_gcm_devices(&self) -> Call<DeviceList> {
        self.call(Method::GET, routes::GCM_DEVICES)
    }

    pub fn get_apns_devices(&self) -> Call<DeviceList> {
        self.call(Method::GET, routes::APNS_DEVICES)
    }

    /// Update properties of a device
    ///
    /// The request targets `device.id`; the server does not let a device
    /// change its id, so a modified id in the body is ignored.
    pub fn update_device(&self, device: &Device) -> Call<Device> {
        self.call_with_body(Method::PUT, &routes::gcm_device(&device.id), device)
    }

    pub fn delete_device(&self, id: &str) -> Call<NoContent> {
        self.call(Method::DELETE, &routes::gcm_device(id))
    }

    fn call<T>(&self, method: Method, segments: &[&str]) -> Call<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let endpoint = self.transport.endpoint(method.clone(), segments);
        Call::new(self.transport.clone(), method, endpoint)
    }

    fn call_with_body<T, B>(&self, method: Method, segments: &[&str], body: &B) -> Call<T>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let endpoint = self
            .transport
            .endpoint_with_body(method.clone(), segments, body);
        Call::new(self.transport.clone(), method, endpoint)
    }
}

/// Builder for [`PushSecureClient`]
#[derive(Debug)]
pub struct PushSecureClientBuilder {
    api_host: String,
    token: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    http_client: Option<reqwest::Client>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl PushSecureClientBuilder {
    pub fn new(api_host: &str) -> Self {
        Self {
            api_host: api_host.to_string(),
            token: None,
            request_timeout: None,
            connect_timeout: None,
            user_agent: None,
            http_client: None,
            interceptors: Vec::new(),
        }
    }

    pub fn account(mut self, account: &Account) -> Self {
        self.token = Some(account.token.clone());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Use a preconfigured HTTP client; timeouts and user agent set on this
    /// builder are then ignored
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Append an interceptor; it runs after authentication and before the
    /// request is logged
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Result<PushSecureClient> {
        let base_url = parse_base_url(&self.api_host)?;

        let http = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.request_timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                let user_agent = self.user_agent.unwrap_or_else(default_user_agent);
                builder.user_agent(user_agent).build()?
            }
        };

        let credentials = Credentials::new(self.token);

        let mut interceptors: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(AuthInterceptor::new(credentials.clone()))];
        interceptors.extend(self.interceptors);
        interceptors.push(Arc::new(LoggingInterceptor));

        info!(
            base_url = %base_url,
            authenticated = credentials.is_set(),
            "Initialized PushSecure client"
        );

        Ok(PushSecureClient {
            transport: Transport::new(http, base_url, interceptors),
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PushSecureClient::new("https://push.example.com").unwrap();
        assert_eq!(client.base_url().as_str(), "https://push.example.com/");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_builder_with_custom_http_client() {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let client = PushSecureClient::builder("http://localhost:8000/api/v1/")
            .http_client(http)
            .account(&Account::new("abc123"))
            .build()
            .unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.base_url().port(), Some(8000));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = PushSecureClient::new("https://push.example.com/api/v1").unwrap();
        assert_eq!(client.base_url().as_str(), "https://push.example.com/api/v1/");
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(matches!(
            PushSecureClient::new("push.example.com"),
            Err(PushSecureError::InvalidUrl(_))
        ));
        assert!(matches!(
            PushSecureClient::new("mailto:push@example.com"),
            Err(PushSecureError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_set_account_toggles_authentication() {
        let account = Account::new("abc123");
        let client = PushSecureClient::with_account("https://push.example.com", Some(&account))
            .unwrap();
        assert!(client.is_authenticated());

        let clone = client.clone();
        clone.set_account(None);
        assert!(!client.is_authenticated());

        client.set_account(Some(&account));
        assert!(clone.is_authenticated());
    }

    #[test]
    fn test_from_config_applies_token() {
        let config = PushSecureConfig::new("https://push.example.com/api/v1/").with_auth_token("t");
        let client = PushSecureClient::from_config(&config).unwrap();
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_calls_target_expected_routes() {
        let client = PushSecureClient::new("https://push.example.com/api/v1/").unwrap();
        let device = Device {
            id: "dev-42".to_string(),
            registration_id: "reg".to_string(),
            name: None,
            platform_device_id: None,
            active: None,
            date_created: None,
        };

        let cases: Vec<(Method, Option<String>)> = vec![
            call_parts(client.authenticate_account("alice", "pw123", None)),
            call_parts(client.create_device("reg", None, None)),
            call_parts(client.create_token(&device, Some("work"))),
            call_parts(client.delete_token("tok-1")),
            call_parts(client.get_tokens()),
            call_parts(client.send_message("tok-1", Some("hi"))),
            call_parts(client.get_gcm_devices()),
            call_parts(client.get_apns_devices()),
            call_parts(client.update_device(&device)),
            call_parts(client.delete_device("dev-42")),
        ];

        let base = "https://push.example.com/api/v1/";
        let expected = [
            (Method::POST, "accounts/"),
            (Method::POST, "device/gcm/"),
            (Method::POST, "tokens/"),
            (Method::DELETE, "tokens/tok-1/"),
            (Method::GET, "tokens/"),
            (Method::POST, "messages/"),
            (Method::GET, "device/gcm/"),
            (Method::GET, "device/apns/"),
            (Method::PUT, "device/gcm/dev-42/"),
            (Method::DELETE, "device/gcm/dev-42/"),
        ];

        for ((method, url), (expected_method, path)) in cases.into_iter().zip(expected) {
            assert_eq!(method, expected_method);
            assert_eq!(url, Some(format!("{}{}", base, path)));
        }
    }

    #[tokio::test]
    async fn test_dot_and_empty_ids_fail_on_execute() {
        let client = PushSecureClient::new("https://push.example.com/api/v1/").unwrap();

        for id in ["", ".", ".."] {
            let call = client.delete_device(id);
            assert!(call.url().is_none());
            assert!(matches!(
                call.execute().await,
                Err(PushSecureError::InvalidUrl(_))
            ));

            let call = client.delete_token(id);
            assert!(call.url().is_none());
            assert!(matches!(
                call.execute().await,
                Err(PushSecureError::InvalidUrl(_))
            ));

            let mut device: Device =
                serde_json::from_str(r#"{"id":"1","registration_id":"reg"}"#).unwrap();
            device.id = id.to_string();
            assert!(matches!(
                client.update_device(&device).execute().await,
                Err(PushSecureError::InvalidUrl(_))
            ));
        }
    }

    fn call_parts<T>(call: Call<T>) -> (Method, Option<String>)
    where
        T: DeserializeOwned + Send + 'static,
    {
        (call.method().clone(), call.url().map(|u| u.to_string()))
    }
}
