//! Plain string builders for the text serialization of resources and nodes.
//!
//! The exporter treats these as opaque: it appends values and reads back a
//! formatted string. Layout mirrors the target format's literal syntax
//! (`PoolRealArray( … )`, bracketed arrays, `key = value` maps).

use std::fmt;

/// One serialized property value on a node or internal resource.
#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    Bool(bool),
    Int(i64),
    Float(f32),
    /// Quoted string literal
    Str(String),
    /// Pre-formatted fragment emitted verbatim (node paths, sub-resource
    /// references, array/map bodies)
    Raw(String),
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Bool(b) => write!(f, "{}", b),
            Property::Int(i) => write!(f, "{}", i),
            Property::Float(v) => write!(f, "{}", v),
            Property::Str(s) => write!(f, "\"{}\"", s),
            Property::Raw(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered sequence builder with a configurable prefix/suffix.
#[derive(Clone, Debug, Default)]
pub struct ArrayBuilder {
    prefix: String,
    suffix: String,
    items: Vec<String>,
}

impl ArrayBuilder {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            items: Vec::new(),
        }
    }

    /// Pool-of-reals literal, used for key time/transition lists.
    pub fn real_pool() -> Self {
        Self::new("PoolRealArray( ", " )")
    }

    /// Plain bracketed array, used for transform key streams and value lists.
    pub fn plain() -> Self {
        Self::new("[ ", " ]")
    }

    pub fn push(&mut self, item: impl fmt::Display) {
        self.items.push(item.to_string());
    }

    pub fn push_float(&mut self, v: f32) {
        self.items.push(format!("{}", v));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn build(&self) -> String {
        format!("{}{}{}", self.prefix, self.items.join(", "), self.suffix)
    }
}

/// Ordered key/value builder rendering a brace-delimited map literal.
#[derive(Clone, Debug, Default)]
pub struct MapBuilder {
    entries: Vec<(String, String)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl fmt::Display) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    pub fn build(&self) -> String {
        let body = self
            .entries
            .iter()
            .map(|(k, v)| format!("\"{}\": {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{ {} }}", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_builder_wraps_items() {
        let mut arr = ArrayBuilder::real_pool();
        arr.push_float(0.0);
        arr.push_float(1.5);
        assert_eq!(arr.build(), "PoolRealArray( 0, 1.5 )");
    }

    #[test]
    fn map_builder_preserves_insertion_order() {
        let mut map = MapBuilder::new();
        map.insert("times", "PoolRealArray( 0 )");
        map.insert("update", 0);
        assert_eq!(
            map.build(),
            "{ \"times\": PoolRealArray( 0 ), \"update\": 0 }"
        );
    }

    #[test]
    fn property_display_quotes_strings_only() {
        assert_eq!(Property::Str("walk".into()).to_string(), "\"walk\"");
        assert_eq!(Property::Raw("SubResource( 1 )".into()).to_string(), "SubResource( 1 )");
        assert_eq!(Property::Float(0.1).to_string(), "0.1");
    }
}
