use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `tool_args` 与 `required_data` 使用的字符串键值表
///
/// 键唯一且无顺序要求。输入时数字与布尔值转为字符串，数组、对象与 `null` 直接拒绝。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DynamicData(BTreeMap<String, String>);

impl DynamicData {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DynamicData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut data = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "value for key `{key}` must be a string, got {}",
                        json_kind(&other)
                    )))
                }
            };
            data.insert(key, text);
        }
        Ok(Self(data))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<K, V> FromIterator<(K, V)> for DynamicData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for DynamicData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for DynamicData {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DynamicData {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_values_are_stringified() {
        let data: DynamicData =
            serde_json::from_value(json!({"index": 2, "full_page": true, "url": "https://a.b"}))
                .unwrap();
        assert_eq!(data.get("index"), Some("2"));
        assert_eq!(data.get("full_page"), Some("true"));
        assert_eq!(data.get("url"), Some("https://a.b"));
    }

    #[test]
    fn nested_values_are_rejected() {
        let err = serde_json::from_value::<DynamicData>(json!({"rows": [["a", "b"]]}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("rows"));
        assert!(err.contains("array"));
        assert!(serde_json::from_value::<DynamicData>(json!({"x": null})).is_err());
    }

    #[test]
    fn serializes_as_plain_object() {
        let data = DynamicData::from([("selector", "#q"), ("text", "rust")]);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"selector": "#q", "text": "rust"})
        );
    }
}
