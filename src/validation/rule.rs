//! Declarative validation rules.
//!
//! Rules deserialize from JSON or TOML (everything except `custom`, which is
//! code). A schema keeps the order its fields were declared in.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Expected shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// A string-field pattern: source compiled on each check, or precompiled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldPattern {
    Source(String),
    Compiled(Regex),
}

impl FieldPattern {
    pub fn as_str(&self) -> &str {
        match self {
            FieldPattern::Source(s) => s,
            FieldPattern::Compiled(re) => re.as_str(),
        }
    }
}

impl From<String> for FieldPattern {
    fn from(source: String) -> Self {
        FieldPattern::Source(source)
    }
}

impl From<&str> for FieldPattern {
    fn from(source: &str) -> Self {
        FieldPattern::Source(source.to_string())
    }
}

impl From<Regex> for FieldPattern {
    fn from(regex: Regex) -> Self {
        FieldPattern::Compiled(regex)
    }
}

impl From<FieldPattern> for String {
    fn from(pattern: FieldPattern) -> Self {
        pattern.as_str().to_string()
    }
}

/// Outcome of a custom predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Rejected with the generic `<field> is invalid` message.
    Invalid,
    /// Rejected with this exact message.
    Message(String),
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok {
            Verdict::Valid
        } else {
            Verdict::Invalid
        }
    }
}

impl From<String> for Verdict {
    fn from(message: String) -> Self {
        Verdict::Message(message)
    }
}

impl From<&str> for Verdict {
    fn from(message: &str) -> Self {
        Verdict::Message(message.to_string())
    }
}

pub type CustomCheck = Arc<dyn Fn(&Value) -> Verdict + Send + Sync>;

/// Constraints for one field.
#[derive(Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<FieldPattern>,
    #[serde(skip)]
    pub custom: Option<CustomCheck>,
}

impl ValidationRule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            min: None,
            max: None,
            pattern: None,
            custom: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldKind::Object)
    }

    pub fn array() -> Self {
        Self::new(FieldKind::Array)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<FieldPattern>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn custom<F, V>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.custom = Some(Arc::new(move |value| check(value).into()));
        self
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("pattern", &self.pattern.as_ref().map(FieldPattern::as_str))
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Field rules in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    fields: Vec<(String, ValidationRule)>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; a repeated field name replaces the earlier rule in place.
    pub fn field(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ValidationSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, rule) in &self.fields {
            map.serialize_entry(name, rule)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValidationSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ValidationSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to validation rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut schema = ValidationSchema::new();
                while let Some((name, rule)) = access.next_entry::<String, ValidationRule>()? {
                    schema = schema.field(name, rule);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
