//! Typed parameter values and declarations
//!
//! A `ParamValue` is a string, an ordered list of strings, or a string-keyed
//! map of strings. The YAML authoring format maps scalars, sequences, and
//! mappings straight onto the three variants, so the enum is serde-untagged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::substitution;

/// Shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value. Arrays are order-significant; objects compare
/// structurally regardless of key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
    Object(HashMap<String, String>),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::String(String::new())
    }
}

impl ParamValue {
    pub fn string(s: impl Into<String>) -> Self {
        ParamValue::String(s.into())
    }

    pub fn array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParamValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Array(_) => ParamType::Array,
            ParamValue::Object(_) => ParamType::Object,
        }
    }

    /// Substitute references in place.
    ///
    /// String slots holding exactly one reference whose key resolves to an
    /// array or object change type to carry the whole value; every other
    /// string slot gets literal replacement. Sequence elements splice whole
    /// arrays; object values get literal replacement per entry.
    pub fn apply_replacements(
        &mut self,
        string_replacements: &HashMap<String, String>,
        array_replacements: &HashMap<String, Vec<String>>,
        object_replacements: &HashMap<String, HashMap<String, String>>,
    ) {
        match self {
            ParamValue::String(s) => {
                if substitution::is_single_expression(s) {
                    let key = substitution::trim_expression(s);
                    if let Some(values) = array_replacements.get(key) {
                        *self = ParamValue::Array(values.clone());
                        return;
                    }
                    if let Some(entries) = object_replacements.get(key) {
                        *self = ParamValue::Object(entries.clone());
                        return;
                    }
                }
                *s = substitution::apply_replacements(s, string_replacements);
            }
            ParamValue::Array(items) => {
                let mut next = Vec::with_capacity(items.len());
                for item in items.iter() {
                    next.extend(substitution::apply_array_replacements(
                        item,
                        string_replacements,
                        array_replacements,
                    ));
                }
                *items = next;
            }
            ParamValue::Object(entries) => {
                for value in entries.values_mut() {
                    *value = substitution::apply_replacements(value, string_replacements);
                }
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

/// Type of a single key inside an object parameter. Only `string` values are
/// supported today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
}

/// A declared parameter: name, optional type, optional default.
///
/// The declared type is kept as authored text so that validation can report
/// unknown types instead of failing at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    /// Infer a missing declared type: `properties` implies object, otherwise
    /// the default's shape, otherwise string.
    pub fn set_defaults(&mut self) {
        if self.param_type.is_some() {
            return;
        }
        let inferred = if self.properties.is_some() {
            ParamType::Object
        } else if let Some(default) = &self.default {
            default.param_type()
        } else {
            ParamType::String
        };
        self.param_type = Some(inferred.as_str().to_string());
    }

    /// The effective type: declared, or inferred the way `set_defaults`
    /// would.
    pub fn effective_type(&self) -> Option<ParamType> {
        match self.param_type.as_deref() {
            Some("string") => Some(ParamType::String),
            Some("array") => Some(ParamType::Array),
            Some("object") => Some(ParamType::Object),
            Some(_) => None,
            None => {
                if self.properties.is_some() {
                    Some(ParamType::Object)
                } else if let Some(default) = &self.default {
                    Some(default.param_type())
                } else {
                    Some(ParamType::String)
                }
            }
        }
    }
}

/// A supplied parameter binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Param {
            name: name.into(),
            value: value.into(),
        }
    }
}
