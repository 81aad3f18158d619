//! Core data types: sections, option values and staged deletions

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sections of one config keyed by section id, in server order
pub type SectionMap = IndexMap<String, Section>;

/// Value of a section option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Plain option
    Single(String),
    /// List option
    List(Vec<String>),
}

impl OptionValue {
    /// An empty string or empty list counts as "no value"
    pub fn is_empty(&self) -> bool {
        match self {
            OptionValue::Single(s) => s.is_empty(),
            OptionValue::List(items) => items.is_empty(),
        }
    }

    /// String content of a plain option
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Single(s) => Some(s),
            OptionValue::List(_) => None,
        }
    }

    /// Items of the value; a plain option yields a single item
    pub fn items(&self) -> Vec<&str> {
        match self {
            OptionValue::Single(s) => vec![s.as_str()],
            OptionValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Single(s) => write!(f, "{}", s),
            OptionValue::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Single(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Single(s)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(items: Vec<String>) -> Self {
        OptionValue::List(items)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(items: Vec<&str>) -> Self {
        OptionValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// A typed, ordered record of options
///
/// Serializes to the wire form used by `uci get`: metadata under dotted keys
/// next to the flattened options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section id
    #[serde(rename = ".name", default)]
    pub name: String,

    /// Section type
    #[serde(rename = ".type")]
    pub section_type: String,

    /// Whether the section has a generated id
    #[serde(rename = ".anonymous", default)]
    pub anonymous: bool,

    /// Sort position
    #[serde(rename = ".index", default)]
    pub index: i64,

    /// Name requested for a not yet committed section
    #[serde(rename = ".create", default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,

    /// Options
    #[serde(flatten)]
    pub options: IndexMap<String, OptionValue>,
}

impl Section {
    /// Create an empty section
    pub fn new(name: impl Into<String>, section_type: impl Into<String>, index: i64) -> Self {
        Self {
            name: name.into(),
            section_type: section_type.into(),
            anonymous: false,
            index,
            create: None,
            options: IndexMap::new(),
        }
    }

    /// Create a draft section; it is anonymous unless a name was requested
    pub fn draft(
        sid: impl Into<String>,
        section_type: impl Into<String>,
        create: Option<String>,
        index: i64,
    ) -> Self {
        Self {
            name: sid.into(),
            section_type: section_type.into(),
            anonymous: create.is_none(),
            index,
            create,
            options: IndexMap::new(),
        }
    }

    /// Builder-style option setter
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Read an option or a metadata field
    ///
    /// Metadata is rendered as strings: `.anonymous` as `1`/`0` and `.index`
    /// in decimal.
    pub fn get(&self, key: &str) -> Option<OptionValue> {
        match key {
            ".name" => Some(OptionValue::from(self.name.as_str())),
            ".type" => Some(OptionValue::from(self.section_type.as_str())),
            ".anonymous" => Some(OptionValue::from(if self.anonymous { "1" } else { "0" })),
            ".index" => Some(OptionValue::from(self.index.to_string())),
            ".create" => self.create.as_deref().map(OptionValue::from),
            _ => self.options.get(key).cloned(),
        }
    }

    /// Options that may be sent to the server (no reserved keys)
    pub fn values(&self) -> IndexMap<String, OptionValue> {
        self.options
            .iter()
            .filter(|(key, _)| !key.starts_with('.'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Staged deletion for a snapshot section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// The whole section goes away
    Section,
    /// Only these options go away
    Options(IndexSet<String>),
}

impl Deletion {
    /// Whether the deletion covers the given option
    pub fn covers(&self, option: &str) -> bool {
        match self {
            Deletion::Section => true,
            Deletion::Options(options) => options.contains(option),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_section_from_wire() {
        let section: Section = serde_json::from_value(json!({
            ".anonymous": false,
            ".type": "interface",
            ".name": "lan",
            ".index": 2,
            "proto": "static",
            "dns": ["1.1.1.1", "8.8.8.8"]
        }))
        .unwrap();

        assert_eq!(section.name, "lan");
        assert_eq!(section.section_type, "interface");
        assert_eq!(section.index, 2);
        assert_eq!(section.options.len(), 2);
        assert_eq!(section.get("proto"), Some(OptionValue::from("static")));
        assert_eq!(
            section.get("dns"),
            Some(OptionValue::from(vec!["1.1.1.1", "8.8.8.8"]))
        );
    }

    #[test]
    fn test_metadata_reads() {
        let section = Section::draft("new0a1b2c", "rule", None, 1003);

        assert_eq!(section.get(".type"), Some(OptionValue::from("rule")));
        assert_eq!(section.get(".anonymous"), Some(OptionValue::from("1")));
        assert_eq!(section.get(".index"), Some(OptionValue::from("1003")));
        assert_eq!(section.get(".create"), None);
    }

    #[test]
    fn test_empty_values() {
        assert!(OptionValue::from("").is_empty());
        assert!(OptionValue::List(vec![]).is_empty());
        assert!(!OptionValue::from("0").is_empty());
    }

    #[test]
    fn test_deletion_covers() {
        let mut options = IndexSet::new();
        options.insert("ipaddr".to_string());

        assert!(Deletion::Section.covers("anything"));
        assert!(Deletion::Options(options.clone()).covers("ipaddr"));
        assert!(!Deletion::Options(options).covers("netmask"));
    }
}
