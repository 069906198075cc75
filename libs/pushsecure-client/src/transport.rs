use std::fmt;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{PushSecureError, Result};
use crate::interceptor::Interceptor;

/// A fully resolved request waiting to be sent
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
}

/// HTTP client bound to a base URL and an interceptor chain
#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl Transport {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        Self {
            http,
            base_url,
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `segments` below the base URL, percent-encoding each one and
    /// keeping the trailing slash the backend routes expect.
    ///
    /// Empty, `.` and `..` segments are rejected: the URL parser would
    /// collapse them and the request would land on the parent collection.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments
            .iter()
            .find(|s| matches!(**s, "" | "." | ".."))
        {
            return Err(PushSecureError::InvalidUrl(format!(
                "invalid path segment {:?}",
                segment
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PushSecureError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    pub fn endpoint(&self, method: Method, segments: &[&str]) -> Result<Endpoint> {
        Ok(Endpoint {
            method,
            url: self.url_for(segments)?,
            body: None,
        })
    }

    pub fn endpoint_with_body<B>(&self, method: Method, segments: &[&str], body: &B) -> Result<Endpoint>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(PushSecureError::Encode)?;
        Ok(Endpoint {
            body: Some(body),
            ..self.endpoint(method, segments)?
        })
    }

    /// Send the request through the interceptor chain and decode the response
    pub async fn execute<T>(&self, endpoint: Endpoint) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut builder = self
            .http
            .request(endpoint.method, endpoint.url)
            .header(ACCEPT, "application/json");

        if let Some(body) = endpoint.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let mut request = builder.build()?;
        for interceptor in self.interceptors.iter() {
            interceptor.intercept(&mut request)?;
        }

        let method = request.method().clone();
        let url = request.url().clone();
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%method, %url, %status, "PushSecure API error");
            return Err(PushSecureError::Api { status, body });
        }

        debug!(%method, %url, %status, bytes = body.len(), "PushSecure response");
        decode(body)
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

/// Decode a response body; an empty body decodes as JSON `null`
pub(crate) fn decode<T>(body: String) -> Result<T>
where
    T: DeserializeOwned,
{
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(source) => Err(PushSecureError::Decode { source, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, NoContent};

    fn transport(base: &str) -> Transport {
        Transport::new(reqwest::Client::new(), base.parse().unwrap(), Vec::new())
    }

    #[test]
    fn test_url_for_root_base() {
        let t = transport("https://push.example.com/");
        let url = t.url_for(&["device", "gcm", "dev-42"]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/device/gcm/dev-42/");
    }

    #[test]
    fn test_url_for_nested_base() {
        let t = transport("https://push.example.com/api/v1/");
        let url = t.url_for(&["accounts"]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/api/v1/accounts/");

        let t = transport("https://push.example.com/api/v1");
        let url = t.url_for(&["tokens"]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/api/v1/tokens/");
    }

    #[test]
    fn test_url_for_encodes_segments() {
        let t = transport("https://push.example.com/");
        let url = t.url_for(&["tokens", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/tokens/a%2Fb%20c/");
    }

    #[test]
    fn test_url_for_rejects_empty_and_dot_segments() {
        let t = transport("https://push.example.com/api/v1/");
        for id in ["", ".", ".."] {
            match t.url_for(&["device", "gcm", id]) {
                Err(PushSecureError::InvalidUrl(msg)) => assert!(msg.contains("path segment")),
                other => panic!("{:?} should be rejected, got {:?}", id, other),
            }
        }

        let url = t.url_for(&["tokens", "..."]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/api/v1/tokens/.../");
        let url = t.url_for(&["tokens", ".hidden"]).unwrap();
        assert_eq!(url.as_str(), "https://push.example.com/api/v1/tokens/.hidden/");
    }

    #[test]
    fn test_endpoint_with_body_encodes_json() {
        let t = transport("https://push.example.com/");
        let endpoint = t
            .endpoint_with_body(Method::POST, &["accounts"], &Account::new("x"))
            .unwrap();
        assert_eq!(endpoint.method, Method::POST);
        assert_eq!(endpoint.body.as_deref(), Some(&br#"{"token":"x"}"#[..]));
    }

    #[test]
    fn test_decode_empty_body() {
        assert_eq!(decode::<NoContent>(String::new()).unwrap(), NoContent);
        assert_eq!(decode::<NoContent>("  \n".to_string()).unwrap(), NoContent);
        assert!(matches!(
            decode::<Account>(String::new()),
            Err(PushSecureError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_keeps_body_on_failure() {
        match decode::<Account>("{not json".to_string()) {
            Err(PushSecureError::Decode { body, .. }) => assert_eq!(body, "{not json"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
