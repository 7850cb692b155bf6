/// Message content, explicitly text or bytes.
///
/// The split is carried through the codec and context so nothing silently
/// reinterprets binary as UTF-8; conversions happen only at the send and
/// receive boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// View the content as bytes regardless of variant
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Bytes(b) => b,
        }
    }

    /// Byte length of the content
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }

    /// Consume into a string, replacing invalid UTF-8 in the bytes variant
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(s) => s,
            Payload::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(b.to_vec())
    }
}
