use serde_json::Value;
use std::collections::HashSet;

use super::format::Format;
use crate::error::{GripError, Result};

/// The publish-time message envelope: one payload rendered in one or more
/// formats, plus optional `id`/`prev-id` for gap detection.
///
/// Format names must be unique within an item. A duplicate is a programming
/// error and is rejected at export time, before anything touches the
/// network.
pub struct Item {
    formats: Vec<Box<dyn Format>>,
    pub id: Option<String>,
    pub prev_id: Option<String>,
}

impl Item {
    /// Item with a single format and no ids
    pub fn new(format: impl Format + 'static) -> Self {
        Self {
            formats: vec![Box::new(format)],
            id: None,
            prev_id: None,
        }
    }

    pub fn with_formats(formats: Vec<Box<dyn Format>>) -> Self {
        Self {
            formats,
            id: None,
            prev_id: None,
        }
    }

    pub fn set_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_prev_id(mut self, prev_id: impl Into<String>) -> Self {
        self.prev_id = Some(prev_id.into());
        self
    }

    pub fn add_format(&mut self, format: impl Format + 'static) {
        self.formats.push(Box::new(format));
    }

    /// Export to the publish wire object:
    /// `{id?, "prev-id"?, formats: {name: exported}}`
    pub fn export(&self) -> Result<Value> {
        let mut seen = HashSet::new();
        let mut formats = serde_json::Map::new();
        for format in &self.formats {
            let name = format.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(GripError::DuplicateFormat(name));
            }
            formats.insert(name, format.export());
        }

        let mut out = serde_json::Map::new();
        if let Some(id) = &self.id {
            out.insert("id".to_string(), Value::String(id.clone()));
        }
        if let Some(prev_id) = &self.prev_id {
            out.insert("prev-id".to_string(), Value::String(prev_id.clone()));
        }
        out.insert("formats".to_string(), Value::Object(formats));
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpResponseFormat, HttpStreamFormat};

    #[test]
    fn test_export_single_format() {
        let item = Item::new(HttpStreamFormat::content("data"))
            .set_id("3")
            .set_prev_id("2");

        let value = item.export().unwrap();
        assert_eq!(value["id"], "3");
        assert_eq!(value["prev-id"], "2");
        assert_eq!(value["formats"]["http-stream"]["content"], "data");
    }

    #[test]
    fn test_export_omits_missing_ids() {
        let item = Item::new(HttpStreamFormat::content("data"));
        let value = item.export().unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("prev-id").is_none());
    }

    #[test]
    fn test_export_multiple_distinct_formats() {
        let mut item = Item::new(HttpStreamFormat::content("data"));
        item.add_format(HttpResponseFormat::new("data"));

        let value = item.export().unwrap();
        let formats = value["formats"].as_object().unwrap();
        assert_eq!(formats.len(), 2);
        assert!(formats.contains_key("http-stream"));
        assert!(formats.contains_key("http-response"));
    }

    #[test]
    fn test_export_rejects_duplicate_format_names() {
        let mut item = Item::new(HttpStreamFormat::content("a"));
        item.add_format(HttpStreamFormat::content("b"));

        match item.export() {
            Err(GripError::DuplicateFormat(name)) => assert_eq!(name, "http-stream"),
            other => panic!("expected DuplicateFormat, got {:?}", other.map(|_| ())),
        }
    }
}
