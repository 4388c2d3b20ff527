//! Typed key/value property bag attached to features

use std::collections::HashMap;

/// Dynamically typed scalar
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl Variant {
    /// Best-effort typing of KML `<value>` text
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Variant::String(String::new());
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Variant::Int(i);
        }
        if let Ok(d) = trimmed.parse::<f64>()
            && d.is_finite()
        {
            return Variant::Double(d);
        }
        match trimmed {
            "true" => Variant::Bool(true),
            "false" => Variant::Bool(false),
            _ => Variant::String(text.to_string()),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Variant::Null => String::new(),
            Variant::Bool(b) => b.to_string(),
            Variant::Int(i) => i.to_string(),
            Variant::Double(d) => d.to_string(),
            Variant::String(s) => s.clone(),
        }
    }
}

/// Named value with an optional human readable label
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Data {
    pub name: String,
    pub display_name: String,
    pub value: Variant,
}

impl Data {
    pub fn new(name: impl Into<String>, value: Variant) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtendedData {
    data: HashMap<String, Data>,
    arrays: HashMap<String, Vec<Variant>>,
}

impl ExtendedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert by the data's name; a later value for the same name replaces the earlier one
    pub fn add_value(&mut self, data: Data) {
        self.data.insert(data.name.clone(), data);
    }

    pub fn value(&self, key: &str) -> Option<&Data> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Data> {
        self.data.remove(key)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.arrays.is_empty()
    }

    /// Entries sorted by name
    pub fn entries(&self) -> Vec<&Data> {
        let mut entries: Vec<&Data> = self.data.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn set_simple_array(&mut self, key: impl Into<String>, values: Vec<Variant>) {
        self.arrays.insert(key.into(), values);
    }

    pub fn simple_array(&self, key: &str) -> Option<&[Variant]> {
        self.arrays.get(key).map(Vec::as_slice)
    }

    /// Arrays sorted by name
    pub fn simple_arrays(&self) -> Vec<(&str, &[Variant])> {
        let mut arrays: Vec<(&str, &[Variant])> = self
            .arrays
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        arrays.sort_by(|a, b| a.0.cmp(b.0));
        arrays
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut ext = ExtendedData::new();
        ext.add_value(Data::new("ele", Variant::Int(1)));
        ext.add_value(Data::new("ele", Variant::Int(2)));
        assert_eq!(ext.size(), 1);
        assert_eq!(ext.value("ele").unwrap().value, Variant::Int(2));
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut ext = ExtendedData::new();
        ext.add_value(Data::new("Name", Variant::String("x".into())));
        assert!(ext.value("name").is_none());
        assert!(ext.contains("Name"));
    }

    #[test]
    fn test_variant_typing() {
        assert_eq!(Variant::from_text("42"), Variant::Int(42));
        assert_eq!(Variant::from_text("4.5"), Variant::Double(4.5));
        assert_eq!(Variant::from_text("true"), Variant::Bool(true));
        assert_eq!(Variant::from_text("hello"), Variant::String("hello".into()));
        assert_eq!(Variant::from_text("nan"), Variant::String("nan".into()));
    }

    #[test]
    fn test_entries_sorted() {
        let mut ext = ExtendedData::new();
        ext.add_value(Data::new("b", Variant::Null));
        ext.add_value(Data::new("a", Variant::Null));
        let names: Vec<_> = ext.entries().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
