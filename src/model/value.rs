// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Vec3;

/// Value held by an attribute instance or a custom visual variable.
///
/// Serialized untagged so scene files stay close to plain JSON values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Vector(Vec3),
    Structured(serde_json::Value),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(text) => match text.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vector(v) => Some(*v),
            Self::Structured(serde_json::Value::Array(items)) if items.len() == 3 => {
                let x = items[0].as_f64()?;
                let y = items[1].as_f64()?;
                let z = items[2].as_f64()?;
                Some(Vec3::new(x, y, z))
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Vector(v) => write!(f, "{},{},{}", v.x, v.y, v.z),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(value: Vec3) -> Self {
        Self::Vector(value)
    }
}

#[cfg(test)]
mod tests {
    use super::AttributeValue;
    use crate::model::Vec3;

    #[test]
    fn untagged_json_picks_the_narrowest_variant() {
        let parse = |raw: &str| serde_json::from_str::<AttributeValue>(raw).expect("value");
        assert_eq!(parse("null"), AttributeValue::Null);
        assert_eq!(parse("true"), AttributeValue::Bool(true));
        assert_eq!(parse("7"), AttributeValue::Integer(7));
        assert_eq!(parse("7.5"), AttributeValue::Float(7.5));
        assert_eq!(parse("\"x\""), AttributeValue::Text("x".to_owned()));
        assert_eq!(
            parse(r#"{"x":1.0,"y":2.0,"z":3.0}"#),
            AttributeValue::Vector(Vec3::new(1.0, 2.0, 3.0))
        );
        assert!(matches!(parse("[1,2]"), AttributeValue::Structured(_)));
    }

    #[test]
    fn numeric_text_reads_as_float() {
        assert_eq!(AttributeValue::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(AttributeValue::from("abc").as_f64(), None);
    }
}
