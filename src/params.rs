//! Query-string assembly and decoding.
//!
//! The retrieval backend takes everything as GET query parameters: scalar
//! values, optional values that must be omitted entirely when unset, and
//! multi-valued keys repeated once per value (`corpus_name=a&corpus_name=b`)
//! whose order is significant. [`QueryPairs`] keeps pairs in insertion order
//! so the encoded string is canonical for a given sequence of pushes, and the
//! same type is used on the inbound side to read the gateway's own request
//! parameters.

use url::form_urlencoded;

use crate::error::{RelayError, Result};

/// An ordered multi-valued set of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Append a key/value pair.
    pub fn push(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Append a numeric value in base-10 form.
    pub fn push_num(&mut self, key: &str, value: u64) {
        self.push(key, &value.to_string());
    }

    /// Append a boolean as `"true"` / `"false"`.
    pub fn push_bool(&mut self, key: &str, value: bool) {
        self.push(key, if value { "true" } else { "false" });
    }

    /// Append the value if present; absent optionals leave no trace in the
    /// encoded string.
    pub fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Append one pair per value, preserving the iteration order.
    pub fn push_all<S: AsRef<str>>(&mut self, key: &str, values: &[S]) {
        for value in values {
            self.push(key, value.as_ref());
        }
    }

    /// First value for a key, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key, in order of appearance.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value for a key, failing if the key is absent or its value
    /// is empty. This is the pre-network check for required parameters.
    pub fn require(&self, key: &'static str) -> Result<&str> {
        match self.first(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(RelayError::MissingParam(key)),
        }
    }

    /// Encode to a canonical query string (no leading `?`).
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Pairs in insertion order. The slice serializes directly as repeated
    /// query parameters.
    pub fn as_slice(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}
