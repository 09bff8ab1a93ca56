use std::collections::BTreeMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Attribute released by the CAS server for the authenticated principal.
///
/// CAS servers release either a single value or a list of values per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multi(Vec<String>),
}

impl AttributeValue {
    /// First value, regardless of shape.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            Self::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    /// All values, in order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Single(v.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Single(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(vs: Vec<String>) -> Self {
        Self::Multi(vs)
    }
}

/// Attribute map keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Host session identifier (opaque string).
///
/// Returned by `SessionStore::create`; the store chooses the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_value_untagged_json() {
        let attrs: Attributes =
            serde_json::from_str(r#"{"mail":"bob@example.edu","groups":["staff","faculty"]}"#)
                .unwrap();

        assert_eq!(attrs["mail"], AttributeValue::Single("bob@example.edu".into()));
        assert_eq!(attrs["groups"].values(), vec!["staff", "faculty"]);
        assert_eq!(attrs["groups"].first(), Some("staff"));
    }

    #[test]
    fn empty_multi_value_has_no_first() {
        assert_eq!(AttributeValue::Multi(vec![]).first(), None);
    }

    #[test]
    fn session_id_from_string() {
        let id = SessionId::from("sess-abc".to_string());
        assert_eq!(id.to_string(), "sess-abc");
        assert_eq!(id.as_str(), "sess-abc");
    }
}
