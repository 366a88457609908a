//! Query parameter extraction
//!
//! Parses the query component of a request target into an ordered mapping.
//! A key seen once maps to a single value; a repeated key collects its values
//! into a list, in arrival order. Extraction is synchronous, performs no I/O,
//! and is recomputed on every call rather than cached.

use serde_json::Value;
use url::form_urlencoded;

/// Value of one query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// First value for this key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Many(vs) => vs.first().map_or("", String::as_str),
        }
    }
}

/// Ordered query-parameter mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    /// Parse the query component of a request target (`/path?a=1&b=2`).
    ///
    /// Percent-encoding is decoded; a target without a query component
    /// yields an empty mapping.
    pub fn parse(target: &str) -> Self {
        let query = match target.split_once('?') {
            Some((_, query)) => query,
            None => return Self::default(),
        };

        let mut entries: Vec<(String, ParamValue)> = Vec::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match entries.iter_mut().find(|(k, _)| k.as_str() == key.as_ref()) {
                Some((_, existing)) => match existing {
                    ParamValue::Single(first) => {
                        let first = std::mem::take(first);
                        *existing = ParamValue::Many(vec![first, value]);
                    }
                    ParamValue::Many(values) => values.push(value),
                },
                None => entries.push((key.into_owned(), ParamValue::Single(value))),
            }
        }
        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the mapping as a JSON object, preserving key order.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.0 {
            let json = match value {
                ParamValue::Single(v) => Value::String(v.clone()),
                ParamValue::Many(vs) => {
                    Value::Array(vs.iter().cloned().map(Value::String).collect())
                }
            };
            map.insert(key.clone(), json);
        }
        Value::Object(map)
    }
}
