use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One computed aggregate: metric name to value.
///
/// Snapshots are immutable once built; the cache hands out clones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    metrics: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.metrics.iter()
    }

    /// Builds a snapshot from a JSON object. Anything else yields `None`.
    pub fn from_json(json: Value) -> Option<Self> {
        match json {
            Value::Object(map) => Some(Self {
                metrics: map.into_iter().collect(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_object() {
        let snapshot = Snapshot::from_json(json!({"transactions_today": 12, "stock_in_today": 3}))
            .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("transactions_today"), Some(&json!(12)));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Snapshot::from_json(json!([1, 2, 3])).is_none());
        assert!(Snapshot::from_json(json!(42)).is_none());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let snapshot = Snapshot::new().with_metric("total_items", 42);
        let text = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(text, r#"{"total_items":42}"#);
    }
}
