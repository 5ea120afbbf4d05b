use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// One item of a bulk request, addressed by username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkOperation {
    pub identifier: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl BulkOperation {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Outcome of a bulk request.
///
/// `applied` is true only when the whole batch was committed. Per-item flags
/// report whether the item itself resolved, even when the batch was rolled
/// back because of another item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResult {
    pub applied: bool,
    results: Vec<(String, bool)>,
}

impl BulkResult {
    /// Records an item. A repeated identifier keeps its first failure.
    pub fn add(&mut self, identifier: &str, success: bool) {
        match self.results.iter_mut().find(|(id, _)| id == identifier) {
            Some(entry) => entry.1 &= success,
            None => self.results.push((identifier.to_string(), success)),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|(_, success)| *success)
    }

    pub fn get(&self, identifier: &str) -> Option<bool> {
        self.results
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, success)| *success)
    }

    pub fn results(&self) -> &[(String, bool)] {
        &self.results
    }
}

struct OrderedResults<'a>(&'a [(String, bool)]);

impl Serialize for OrderedResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (identifier, success) in self.0 {
            map.serialize_entry(identifier, success)?;
        }
        map.end()
    }
}

impl Serialize for BulkResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("applied", &self.applied)?;
        map.serialize_entry("results", &OrderedResults(&self.results))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_serialize_in_input_order() {
        let mut result = BulkResult::default();
        result.add("zed", true);
        result.add("alice", false);
        result.add("mike", true);

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"applied":false,"results":{"zed":true,"alice":false,"mike":true}}"#
        );
    }

    #[test]
    fn test_all_succeeded() {
        let mut result = BulkResult::default();
        assert!(result.all_succeeded());
        result.add("user1", true);
        assert!(result.all_succeeded());
        result.add("user2", false);
        assert!(!result.all_succeeded());
        assert_eq!(result.get("user2"), Some(false));
    }

    #[test]
    fn test_repeated_identifier_keeps_failure() {
        let mut result = BulkResult::default();
        result.add("user1", false);
        result.add("user1", true);

        assert_eq!(result.get("user1"), Some(false));
        assert!(!result.all_succeeded());
        assert_eq!(result.results().len(), 1);
    }

    #[test]
    fn test_operation_deserializes_without_attributes() {
        let json = r#"[
            {"identifier": "user1"},
            {"identifier": "user2", "attributes": {"lineItemSlug": "s"}}
        ]"#;
        let ops: Vec<BulkOperation> = serde_json::from_str(json).unwrap();
        assert_eq!(ops[0], BulkOperation::new("user1"));
        assert_eq!(ops[1].attribute("lineItemSlug"), Some("s"));
    }
}
