//! GRIP URI parsing
//!
//! A GRIP URI packs a control endpoint plus credentials into one string:
//!
//! ```text
//! https://api.example.com/grip/?iss=realm&key=base64:aGVsbG8=&verify-iss=proxy
//! ```
//!
//! The credential parameters are extracted; every other query parameter is
//! retained on the resulting control URI untouched.

use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GripError, Result};

/// Configuration for a single GRIP proxy endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GripConfig {
    /// Control endpoint base URI (no trailing slash)
    pub control_uri: String,

    /// JWT issuer claim for outgoing publish auth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_iss: Option<String>,

    /// Signing key material, possibly `base64:`-tagged; classified by the
    /// key loader when a client is constructed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Expected issuer of incoming `Grip-Sig` tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_iss: Option<String>,

    /// Verification key material for incoming `Grip-Sig` tokens; defaults
    /// to `key` downstream when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_key: Option<String>,
}

impl GripConfig {
    /// Config with only a control URI, no credentials
    pub fn new(control_uri: impl Into<String>) -> Self {
        Self {
            control_uri: control_uri.into(),
            ..Default::default()
        }
    }
}

impl FromStr for GripConfig {
    type Err = GripError;

    fn from_str(s: &str) -> Result<Self> {
        parse_grip_uri(s)
    }
}

/// Parse a GRIP URI into a [`GripConfig`].
///
/// Extracts and removes `iss`, `key`, `verify-iss`, and `verify-key` from
/// the query string; any other parameters stay on the control URI in their
/// original encoded form. One trailing `/` is stripped from the path.
/// `base64:`-tagged key values are left tagged for the key loader.
pub fn parse_grip_uri(uri: &str) -> Result<GripConfig> {
    parse_grip_uri_with_defaults(uri, None, None)
}

/// Like [`parse_grip_uri`], but with caller-supplied defaults for the
/// verification pair, applied when the URI does not carry them.
pub fn parse_grip_uri_with_defaults(
    uri: &str,
    verify_iss: Option<&str>,
    verify_key: Option<&str>,
) -> Result<GripConfig> {
    let (base, query) = match uri.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (uri, None),
    };

    // Validate scheme/authority early so a garbage URI fails here rather
    // than at publish time
    let parsed =
        Url::parse(base).map_err(|e| GripError::InvalidUri(format!("{}: {}", uri, e)))?;
    if !parsed.has_host() {
        return Err(GripError::InvalidUri(format!("missing host: {}", uri)));
    }

    let base = base.strip_suffix('/').unwrap_or(base);

    let mut config = GripConfig {
        verify_iss: verify_iss.map(str::to_string),
        verify_key: verify_key.map(str::to_string),
        ..Default::default()
    };
    let mut retained: Vec<&str> = Vec::new();

    for segment in query.into_iter().flat_map(|q| q.split('&')) {
        if segment.is_empty() {
            continue;
        }
        let (name, value) = match segment.split_once('=') {
            Some((name, value)) => (name, value),
            None => (segment, ""),
        };
        // Percent-decode only. A raw `+` must stay a literal `+` because
        // under-encoding URL builders leave it bare inside base64 values.
        let decode = |s: &str| -> Result<String> {
            percent_decode_str(s)
                .decode_utf8()
                .map(|cow| cow.into_owned())
                .map_err(|e| GripError::InvalidUri(format!("bad query encoding: {}", e)))
        };
        match decode(name)?.as_str() {
            "iss" => config.control_iss = Some(decode(value)?),
            "key" => config.key = Some(decode(value)?),
            "verify-iss" => config.verify_iss = Some(decode(value)?),
            "verify-key" => config.verify_key = Some(decode(value)?),
            _ => retained.push(segment),
        }
    }

    config.control_uri = if retained.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, retained.join("&"))
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_uri() {
        let config = parse_grip_uri("http://example.com/path").unwrap();
        assert_eq!(config.control_uri, "http://example.com/path");
        assert!(config.control_iss.is_none());
        assert!(config.key.is_none());
    }

    #[test]
    fn test_parse_strips_trailing_slash() {
        let config = parse_grip_uri("http://example.com/path/").unwrap();
        assert_eq!(config.control_uri, "http://example.com/path");
    }

    #[test]
    fn test_parse_extracts_credentials() {
        let config = parse_grip_uri("http://h/p/?iss=r&key=base64:aGVsbG8=").unwrap();
        assert_eq!(config.control_uri, "http://h/p");
        assert_eq!(config.control_iss.as_deref(), Some("r"));
        // Key stays tagged and un-decoded until it reaches the key loader
        assert_eq!(config.key.as_deref(), Some("base64:aGVsbG8="));
    }

    #[test]
    fn test_parse_verify_params() {
        let config =
            parse_grip_uri("https://h/p?iss=a&key=k&verify-iss=b&verify-key=base64:dg==")
                .unwrap();
        assert_eq!(config.verify_iss.as_deref(), Some("b"));
        assert_eq!(config.verify_key.as_deref(), Some("base64:dg=="));
    }

    #[test]
    fn test_parse_retains_other_params() {
        let config = parse_grip_uri("http://h/p?a=1&iss=r&b=2").unwrap();
        assert_eq!(config.control_uri, "http://h/p?a=1&b=2");
        assert_eq!(config.control_iss.as_deref(), Some("r"));
    }

    #[test]
    fn test_parse_literal_plus_preserved() {
        // A bare `+` inside a base64 value is the literal character, never
        // a space
        let config = parse_grip_uri("http://h/p?key=base64:ab+cd/ef=").unwrap();
        assert_eq!(config.key.as_deref(), Some("base64:ab+cd/ef="));
    }

    #[test]
    fn test_parse_percent_decoding() {
        let config = parse_grip_uri("http://h/p?iss=my%20realm&key=a%2Bb").unwrap();
        assert_eq!(config.control_iss.as_deref(), Some("my realm"));
        assert_eq!(config.key.as_deref(), Some("a+b"));
    }

    #[test]
    fn test_parse_with_defaults() {
        let config =
            parse_grip_uri_with_defaults("http://h/p?iss=r", Some("v"), Some("vk")).unwrap();
        assert_eq!(config.verify_iss.as_deref(), Some("v"));
        assert_eq!(config.verify_key.as_deref(), Some("vk"));

        // URI-supplied values override defaults
        let config =
            parse_grip_uri_with_defaults("http://h/p?verify-iss=x", Some("v"), None).unwrap();
        assert_eq!(config.verify_iss.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_grip_uri("not a uri").is_err());
        assert!(parse_grip_uri("/relative/only").is_err());
    }

    #[test]
    fn test_from_str() {
        let config: GripConfig = "http://h/p?iss=r".parse().unwrap();
        assert_eq!(config.control_iss.as_deref(), Some("r"));
    }
}
