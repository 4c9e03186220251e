//! A dotted-path accessor over a JSON object, used to look up and mutate
//! hierarchical configuration values (`"group.name.key"`).

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    values: Value,
}

impl ConfigTree {
    pub fn new(values: Value) -> Self {
        Self {
            values: if values.is_object() { values } else { Value::Object(Map::new()) },
        }
    }

    /// Looks up a dotted key, descending into arrays when a path segment
    /// parses as a non-negative integer index.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut current = &self.values;
        for segment in key.split('.').filter(|s| !s.is_empty()) {
            current = if let Ok(index) = segment.parse::<usize>() {
                current.as_array()?.get(index)?
            } else {
                current.as_object()?.get(segment)?
            };
        }
        Some(current.clone())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }
        let mut current = &mut self.values;
        for segment in &segments[..segments.len() - 1] {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .unwrap()
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current
            .as_object_mut()
            .unwrap()
            .insert(segments.last().unwrap().to_string(), value);
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return false;
        }
        let mut current = &mut self.values;
        for segment in &segments[..segments.len() - 1] {
            match current.as_object_mut().and_then(|m| m.get_mut(*segment)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        current
            .as_object_mut()
            .map(|m| m.remove(*segments.last().unwrap()).is_some())
            .unwrap_or(false)
    }

    pub fn as_value(&self) -> Value {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn looks_up_nested_keys() {
        let tree = ConfigTree::new(json!({"group": {"name": {"foo": 1}, "bar": 2}}));
        assert_eq!(tree.get("group.name.foo"), Some(json!(1)));
        assert_eq!(tree.get("group.bar"), Some(json!(2)));
        assert_eq!(tree.get("missing"), None);
    }

    #[test]
    fn looks_up_array_index() {
        let tree = ConfigTree::new(json!({"list": [10, 20, 30]}));
        assert_eq!(tree.get("list.1"), Some(json!(20)));
    }

    #[test]
    fn set_and_delete_round_trip() {
        let mut tree = ConfigTree::new(json!({}));
        tree.set("a.b.c", json!(42));
        assert_eq!(tree.get("a.b.c"), Some(json!(42)));
        assert!(tree.delete("a.b.c"));
        assert_eq!(tree.get("a.b.c"), None);
    }
}
