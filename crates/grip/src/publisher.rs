//! Multi-endpoint publisher and proxy trust validation
//!
//! A [`Publisher`] owns one [`PublisherClient`] per configured endpoint,
//! fans publishes out to all of them concurrently, and decides how much to
//! trust an inbound request from its `Grip-Sig` header.

use std::sync::Arc;

use futures_util::future::join_all;
use jsonwebtoken::{Validation, decode};
use tracing::{debug, warn};

use crate::client::{PublisherClient, VerifyComponents};
use crate::config::{GripConfig, parse_grip_uri};
use crate::error::{GripError, Result};
use crate::keys::{Key, load_key};
use crate::models::{HttpResponseFormat, HttpStreamFormat, Item};

/// Proxy trust state derived from a `Grip-Sig` header.
///
/// Never an error: callers branch on the three fields to tell "not behind
/// a GRIP proxy" from "behind a proxy but the signature is missing or bad"
/// from "fully authenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GripSigResult {
    /// The request came through a configured proxy
    pub is_proxied: bool,

    /// Every configured endpoint demands a verified signature
    pub needs_signed: bool,

    /// The header verified against at least one endpoint
    pub is_signed: bool,
}

/// Publishes items to every configured GRIP proxy endpoint
#[derive(Default)]
pub struct Publisher {
    clients: Vec<Arc<PublisherClient>>,
    prefix: String,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher whose channel names all carry a prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            clients: Vec::new(),
            prefix: prefix.into(),
        }
    }

    /// Publisher configured from a single GRIP URI
    pub fn from_uri(uri: &str) -> Result<Self> {
        let mut publisher = Self::new();
        publisher.apply_config([parse_grip_uri(uri)?])?;
        Ok(publisher)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn clients(&self) -> &[Arc<PublisherClient>] {
        &self.clients
    }

    pub fn add_client(&mut self, client: PublisherClient) {
        self.clients.push(Arc::new(client));
    }

    pub fn remove_all_clients(&mut self) {
        self.clients.clear();
    }

    /// Construct one client per config entry.
    ///
    /// An entry with `control_iss` gets JWT auth with `{iss}` and the
    /// entry's key. Otherwise a key that classifies as a plain text secret
    /// becomes a literal bearer token; anything else means no auth. Note
    /// this is narrower than some GRIP client libraries, which use any
    /// string key as a bearer token: here a `base64:`-tagged, PEM, or JWK
    /// key without `control_iss` configures no auth rather than leaking
    /// key material as a token. The verify pair, when present, is
    /// installed as an explicit override.
    pub fn apply_config<I>(&mut self, configs: I) -> Result<()>
    where
        I: IntoIterator<Item = GripConfig>,
    {
        for config in configs {
            let mut client = PublisherClient::new(&config.control_uri);

            if let Some(iss) = &config.control_iss {
                let key = config
                    .key
                    .as_deref()
                    .map(load_key)
                    .transpose()?
                    .ok_or_else(|| {
                        GripError::InvalidKey(format!(
                            "JWT auth for {} requires a key",
                            config.control_uri
                        ))
                    })?;
                client.set_auth_jwt(serde_json::json!({ "iss": iss }), key);
            } else if let Some(key) = &config.key
                && !key.starts_with("base64:")
                && matches!(load_key(key.as_str())?, Key::Raw(_))
            {
                client.set_auth_bearer(key.as_str());
            }

            if config.verify_iss.is_some() || config.verify_key.is_some() {
                client.set_verify_components(VerifyComponents {
                    verify_iss: config.verify_iss.clone(),
                    verify_key: config.verify_key.as_deref().map(load_key).transpose()?,
                });
            }

            self.add_client(client);
        }
        Ok(())
    }

    /// Parse a GRIP URI and apply it as one more endpoint
    pub fn apply_grip_uri(&mut self, uri: &str) -> Result<()> {
        self.apply_config([parse_grip_uri(uri)?])
    }

    /// Publish one item to one channel on every endpoint concurrently.
    ///
    /// Waits for all clients to settle; if any fail, the first failure in
    /// client order is returned.
    pub async fn publish(&self, channel: &str, item: &Item) -> Result<()> {
        let channel = format!("{}{}", self.prefix, channel);
        let publishes = self.clients.iter().map(|client| client.publish(&channel, item));
        for result in join_all(publishes).await {
            result?;
        }
        Ok(())
    }

    /// Publish a long-poll response payload
    pub async fn publish_http_response(
        &self,
        channel: &str,
        format: impl Into<HttpResponseFormat>,
        id: Option<&str>,
        prev_id: Option<&str>,
    ) -> Result<()> {
        let item = with_ids(Item::new(format.into()), id, prev_id);
        self.publish(channel, &item).await
    }

    /// Publish a stream payload
    pub async fn publish_http_stream(
        &self,
        channel: &str,
        format: impl Into<HttpStreamFormat>,
        id: Option<&str>,
        prev_id: Option<&str>,
    ) -> Result<()> {
        let item = with_ids(Item::new(format.into()), id, prev_id);
        self.publish(channel, &item).await
    }

    /// Decide the proxy trust state for an inbound request's `Grip-Sig`
    /// header. See [`GripSigResult`].
    pub fn validate_grip_sig(&self, header: Option<&str>) -> GripSigResult {
        let needs_signed = !self.clients.is_empty()
            && self.clients.iter().all(|c| c.verify_key().is_some());

        let token = match header {
            Some(token) if !self.clients.is_empty() => token,
            _ => {
                return GripSigResult {
                    is_proxied: false,
                    needs_signed,
                    is_signed: false,
                };
            }
        };

        let mut is_signed = false;
        for client in &self.clients {
            let Some(key) = client.verify_key() else {
                continue;
            };
            if verify_signature(token, key, client.verify_iss()) {
                is_signed = true;
                break;
            }
        }

        // A client without a verify key trusts network-level placement:
        // header presence alone proves proxying for it
        let is_proxied =
            is_signed || self.clients.iter().any(|c| c.verify_key().is_none());

        if needs_signed && !is_signed {
            warn!("Grip-Sig present but failed verification against all endpoints");
        }

        GripSigResult {
            is_proxied,
            needs_signed,
            is_signed,
        }
    }
}

fn with_ids(item: Item, id: Option<&str>, prev_id: Option<&str>) -> Item {
    let item = match id {
        Some(id) => item.set_id(id),
        None => item,
    };
    match prev_id {
        Some(prev_id) => item.set_prev_id(prev_id),
        None => item,
    }
}

/// Verify a `Grip-Sig` JWT against one endpoint's key and issuer,
/// honoring expiration. The accepted algorithm family follows the key
/// type.
fn verify_signature(token: &str, key: &Key, iss: Option<&str>) -> bool {
    let Ok(decoding_key) = key.decoding_key() else {
        return false;
    };
    let Ok(algorithms) = key.verify_algorithms() else {
        return false;
    };

    let mut validation = Validation::default();
    validation.algorithms = algorithms;
    if let Some(iss) = iss {
        validation.set_issuer(&[iss]);
    }

    match decode::<serde_json::Value>(token, &decoding_key, &validation) {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "Grip-Sig verification attempt failed");
            false
        }
    }
}
