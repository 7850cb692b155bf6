//! Authorization header construction for publish requests
//!
//! Auth strategies are immutable values picked at client construction time.
//! Key material stays inside a classified [`Key`](crate::keys::Key), never a
//! loose string.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use jsonwebtoken::{Header, encode};

use crate::error::Result;
use crate::keys::Key;

/// Seconds an auto-stamped JWT `exp` claim is valid for (10 minutes)
const JWT_AUTH_LIFETIME_SECS: i64 = 600;

/// An authentication strategy for requests to a control endpoint
#[derive(Debug, Clone)]
pub enum Auth {
    /// HTTP Basic auth
    Basic { user: String, pass: String },

    /// A literal bearer token
    Bearer { token: String },

    /// A JWT signed per request with the configured claims and key
    Jwt { claims: serde_json::Value, key: Key },
}

impl Auth {
    pub fn basic(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Auth::Basic {
            user: user.into(),
            pass: pass.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer {
            token: token.into(),
        }
    }

    /// JWT auth with an issuer claim, the common GRIP configuration
    pub fn jwt_with_iss(iss: impl Into<String>, key: Key) -> Self {
        Auth::Jwt {
            claims: serde_json::json!({ "iss": iss.into() }),
            key,
        }
    }

    /// Build the value of the `Authorization` header.
    ///
    /// JWT auth signs at call time; a missing `exp` claim is stamped with a
    /// 10-minute lifetime so stale tokens never leave this process.
    pub fn build_header(&self) -> Result<String> {
        match self {
            Auth::Basic { user, pass } => {
                let credentials = STANDARD.encode(format!("{}:{}", user, pass));
                Ok(format!("Basic {}", credentials))
            }
            Auth::Bearer { token } => Ok(format!("Bearer {}", token)),
            Auth::Jwt { claims, key } => {
                let mut claims = claims.clone();
                if claims.get("exp").is_none()
                    && let Some(map) = claims.as_object_mut()
                {
                    let exp = chrono::Utc::now().timestamp() + JWT_AUTH_LIFETIME_SECS;
                    map.insert("exp".to_string(), serde_json::json!(exp));
                }
                let header = Header::new(key.signing_algorithm()?);
                let token = encode(&header, &claims, &key.encoding_key()?)?;
                Ok(format!("Bearer {}", token))
            }
        }
    }
}
