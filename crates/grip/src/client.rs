//! Single-endpoint publisher client
//!
//! A [`PublisherClient`] owns one control endpoint plus its auth and
//! verification configuration. The HTTP POST itself goes through the
//! [`Transport`] trait so publishes are testable without a network; the
//! default implementation wraps [`reqwest::Client`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::auth::Auth;
use crate::error::{PublishError, Result};
use crate::keys::Key;
use crate::models::Item;

/// Response returned by a [`Transport`] when the POST completed at the
/// HTTP level (any status code)
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// The HTTP capability a publisher client needs: one POST.
///
/// Errors are transport-level failures (connect refused, premature close);
/// a non-2xx status is a successful transport round trip and is mapped to
/// a publish error by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: String,
    ) -> std::result::Result<TransportResponse, String>;
}

/// Default transport over a shared [`reqwest::Client`]
#[derive(Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: String,
    ) -> std::result::Result<TransportResponse, String> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(&name, &value);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| e.to_string())?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Explicit override of the verification configuration; takes precedence
/// over anything derived from the auth strategy
#[derive(Debug, Clone, Default)]
pub struct VerifyComponents {
    pub verify_iss: Option<String>,
    pub verify_key: Option<Key>,
}

/// A client for one GRIP control endpoint
pub struct PublisherClient {
    uri: String,
    auth: Option<Auth>,
    verify_components: Option<VerifyComponents>,
    transport: Arc<dyn Transport>,
}

impl PublisherClient {
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_transport(uri, Arc::new(HttpTransport::default()))
    }

    pub fn with_transport(uri: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let uri = uri.into();
        let uri = uri.strip_suffix('/').unwrap_or(&uri).to_string();
        Self {
            uri,
            auth: None,
            verify_components: None,
            transport,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn set_auth_basic(&mut self, user: impl Into<String>, pass: impl Into<String>) {
        self.auth = Some(Auth::basic(user, pass));
    }

    pub fn set_auth_bearer(&mut self, token: impl Into<String>) {
        self.auth = Some(Auth::bearer(token));
    }

    pub fn set_auth_jwt(&mut self, claims: serde_json::Value, key: Key) {
        self.auth = Some(Auth::Jwt { claims, key });
    }

    /// Override the verification configuration. Once set, the override is
    /// authoritative: the auth-derived fallback no longer applies, and the
    /// last call wins.
    pub fn set_verify_components(&mut self, components: VerifyComponents) {
        self.verify_components = Some(components);
    }

    /// Issuer expected in incoming `Grip-Sig` tokens: the explicit
    /// override when set, else the JWT auth `iss` claim
    pub fn verify_iss(&self) -> Option<&str> {
        match &self.verify_components {
            Some(components) => components.verify_iss.as_deref(),
            None => match &self.auth {
                Some(Auth::Jwt { claims, .. }) => claims.get("iss").and_then(|v| v.as_str()),
                _ => None,
            },
        }
    }

    /// Key used to verify incoming `Grip-Sig` tokens: the explicit
    /// override when set, else the JWT signing key
    pub fn verify_key(&self) -> Option<&Key> {
        match &self.verify_components {
            Some(components) => components.verify_key.as_ref(),
            None => match &self.auth {
                Some(Auth::Jwt { key, .. }) => Some(key),
                _ => None,
            },
        }
    }

    /// Publish one item to one channel: POST `{uri}/publish/` with
    /// `{"items":[exported]}`
    pub async fn publish(&self, channel: &str, item: &Item) -> Result<()> {
        if !self.uri.starts_with("http://") && !self.uri.starts_with("https://") {
            return Err(PublishError::bad_uri(format!(
                "unsupported control URI scheme: {}",
                self.uri
            ))
            .into());
        }

        let mut export = item.export()?;
        export["channel"] = json!(channel);
        let body = json!({ "items": [export] }).to_string();

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Content-Length".to_string(), body.len().to_string()),
        ];
        if let Some(auth) = &self.auth {
            headers.push(("Authorization".to_string(), auth.build_header()?));
        }

        let url = format!("{}/publish/", self.uri);
        debug!(url = %url, channel = %channel, "publishing item");

        let response = self
            .transport
            .post(&url, headers, body)
            .await
            .map_err(PublishError::transport)?;

        if (200..300).contains(&response.status) {
            Ok(())
        } else {
            Err(PublishError::bad_status(response.status, response.headers, response.body)
                .into())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::GripError;
    use crate::keys::load_key;
    use crate::models::{HttpStreamFormat, Item};
    use std::sync::Mutex;

    /// Records requests and replies with a canned response
    pub(crate) struct MockTransport {
        pub requests: Mutex<Vec<(String, Vec<(String, String)>, String)>>,
        pub response: std::result::Result<TransportResponse, String>,
    }

    impl MockTransport {
        pub fn ok() -> Self {
            Self::with_status(200)
        }

        pub fn with_status(status: u16) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Ok(TransportResponse {
                    status,
                    headers: HashMap::new(),
                    body: String::new(),
                }),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Err(message.to_string()),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(
            &self,
            url: &str,
            headers: Vec<(String, String)>,
            body: String,
        ) -> std::result::Result<TransportResponse, String> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers, body));
            self.response.clone()
        }
    }

    fn item() -> Item {
        Item::new(HttpStreamFormat::content("data")).set_id("1")
    }

    #[tokio::test]
    async fn test_publish_request_shape() {
        let transport = Arc::new(MockTransport::ok());
        let client = PublisherClient::with_transport("http://example.com/grip", transport.clone());

        client.publish("chan", &item()).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        let (url, headers, body) = &requests[0];
        assert_eq!(url, "http://example.com/grip/publish/");
        assert!(headers.contains(&(
            "Content-Type".to_string(),
            "application/json".to_string()
        )));
        assert!(headers.contains(&(
            "Content-Length".to_string(),
            body.len().to_string()
        )));

        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["items"][0]["channel"], "chan");
        assert_eq!(value["items"][0]["id"], "1");
        assert_eq!(value["items"][0]["formats"]["http-stream"]["content"], "data");
    }

    #[tokio::test]
    async fn test_publish_sends_auth_header() {
        let transport = Arc::new(MockTransport::ok());
        let mut client =
            PublisherClient::with_transport("http://example.com", transport.clone());
        client.set_auth_bearer("token123");

        client.publish("chan", &item()).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].1.contains(&(
            "Authorization".to_string(),
            "Bearer token123".to_string()
        )));
    }

    #[tokio::test]
    async fn test_publish_bad_scheme() {
        let client = PublisherClient::with_transport(
            "ftp://example.com",
            Arc::new(MockTransport::ok()),
        );

        match client.publish("chan", &item()).await {
            Err(GripError::Publish(e)) => assert_eq!(e.status_code, -2),
            other => panic!("expected publish error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_publish_transport_failure() {
        let client = PublisherClient::with_transport(
            "http://example.com",
            Arc::new(MockTransport::failing("connection refused")),
        );

        match client.publish("chan", &item()).await {
            Err(GripError::Publish(e)) => {
                assert_eq!(e.status_code, -1);
                assert!(e.message.contains("connection refused"));
            }
            other => panic!("expected publish error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_publish_non_2xx() {
        let client = PublisherClient::with_transport(
            "http://example.com",
            Arc::new(MockTransport::with_status(503)),
        );

        match client.publish("chan", &item()).await {
            Err(GripError::Publish(e)) => {
                assert_eq!(e.status_code, 503);
                assert!(e.headers.is_some());
            }
            other => panic!("expected publish error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_verify_components_precedence() {
        let mut client = PublisherClient::new("http://example.com");

        // JWT auth provides the fallback verification config
        client.set_auth_jwt(
            serde_json::json!({ "iss": "realm" }),
            load_key("secret").unwrap(),
        );
        assert_eq!(client.verify_iss(), Some("realm"));
        assert!(client.verify_key().is_some());

        // An explicit override wins, even one that clears the key
        client.set_verify_components(VerifyComponents {
            verify_iss: Some("other".to_string()),
            verify_key: None,
        });
        assert_eq!(client.verify_iss(), Some("other"));
        assert!(client.verify_key().is_none());

        // Last call wins
        client.set_verify_components(VerifyComponents {
            verify_iss: None,
            verify_key: Some(load_key("vk").unwrap()),
        });
        assert_eq!(client.verify_iss(), None);
        assert!(client.verify_key().is_some());
    }

    #[test]
    fn test_non_jwt_auth_has_no_verify_fallback() {
        let mut client = PublisherClient::new("http://example.com");
        client.set_auth_bearer("token");
        assert!(client.verify_key().is_none());
        assert!(client.verify_iss().is_none());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = PublisherClient::new("http://example.com/grip/");
        assert_eq!(client.uri(), "http://example.com/grip");
    }
}
