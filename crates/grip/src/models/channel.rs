use serde::{Deserialize, Serialize};

/// A proxy-side delivery channel, optionally with the last-delivered
/// message id for gap detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,

    #[serde(rename = "prevId", skip_serializing_if = "Option::is_none")]
    pub prev_id: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prev_id: None,
        }
    }

    pub fn with_prev_id(name: impl Into<String>, prev_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prev_id: Some(prev_id.into()),
        }
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Channel::new(name)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Channel::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_without_prev_id() {
        let json = serde_json::to_string(&Channel::new("chan")).unwrap();
        assert_eq!(json, r#"{"name":"chan"}"#);
    }

    #[test]
    fn test_export_with_prev_id() {
        let json = serde_json::to_string(&Channel::with_prev_id("chan", "5")).unwrap();
        assert_eq!(json, r#"{"name":"chan","prevId":"5"}"#);
    }

    #[test]
    fn test_from_str_normalization() {
        let channel: Channel = "chan".into();
        assert_eq!(channel.name, "chan");
        assert!(channel.prev_id.is_none());
    }
}
