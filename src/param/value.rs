//! Bound argument values.

use std::collections::BTreeMap;

use crate::http::request::UploadedFile;
use crate::param::types::{ContextType, Primitive, TypeRef};

/// A bound argument, as handed to handlers and aspects.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Json(serde_json::Value),
    Map(BTreeMap<String, String>),
    Bytes(Vec<u8>),
    File(UploadedFile),
    Files(BTreeMap<String, UploadedFile>),
    /// Placeholder for a call-context object; read it through `Call`.
    Context(ContextType),
}

impl Value {
    /// Zero value for a declared type: `false`, `'\0'`, `0`, or null.
    pub fn zero_of(ty: &TypeRef) -> Value {
        match ty {
            TypeRef::Primitive(p) => Self::zero_of_primitive(*p),
            _ => Value::Null,
        }
    }

    pub fn zero_of_primitive(p: Primitive) -> Value {
        match p {
            Primitive::Bool => Value::Bool(false),
            Primitive::Char => Value::Char('\0'),
            Primitive::Byte => Value::Byte(0),
            Primitive::Short => Value::Short(0),
            Primitive::Int => Value::Int(0),
            Primitive::Long => Value::Long(0),
            Primitive::Float => Value::Float(0.0),
            Primitive::Double => Value::Double(0.0),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Any integral value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    /// Any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON node into `ty`. A node that does not fit becomes `Null`.
    pub fn from_json(ty: &TypeRef, node: &serde_json::Value) -> Value {
        if node.is_null() {
            return Value::Null;
        }

        let converted = match ty {
            TypeRef::Primitive(p) | TypeRef::Boxed(p) => Self::primitive_from_json(*p, node),
            TypeRef::Str => node.as_str().map(|s| Value::Str(s.to_string())),
            TypeRef::Array(element) => node.as_array().map(|items| {
                Value::Array(items.iter().map(|item| Value::from_json(element, item)).collect())
            }),
            TypeRef::Object(_) | TypeRef::Generic { .. } => Some(Value::Json(node.clone())),
            TypeRef::Context(_) => None,
        };

        converted.unwrap_or(Value::Null)
    }

    /// `None` when `node` has the wrong kind or overflows `p`.
    pub(crate) fn primitive_from_json(p: Primitive, node: &serde_json::Value) -> Option<Value> {
        match p {
            Primitive::Bool => node.as_bool().map(Value::Bool),
            Primitive::Char => {
                let s = node.as_str()?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }
            Primitive::Byte => node.as_i64().and_then(|v| i8::try_from(v).ok()).map(Value::Byte),
            Primitive::Short => node.as_i64().and_then(|v| i16::try_from(v).ok()).map(Value::Short),
            Primitive::Int => node.as_i64().and_then(|v| i32::try_from(v).ok()).map(Value::Int),
            Primitive::Long => node.as_i64().map(Value::Long),
            Primitive::Float => node.as_f64().map(|v| Value::Float(v as f32)),
            Primitive::Double => node.as_f64().map(Value::Double),
        }
    }

    /// JSON rendering used by views and push broadcasts.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null | Value::Context(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Byte(v) => Json::from(*v),
            Value::Short(v) => Json::from(*v),
            Value::Int(v) => Json::from(*v),
            Value::Long(v) => Json::from(*v),
            Value::Float(v) => Json::from(f64::from(*v)),
            Value::Double(v) => Json::from(*v),
            Value::Str(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Json(node) => node.clone(),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                    .collect(),
            ),
            Value::Bytes(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
            Value::File(file) => serde_json::json!({
                "name": file.name,
                "file_name": file.file_name,
                "content_type": file.content_type,
                "size": file.data.len(),
            }),
            Value::Files(files) => Json::Array(
                files.keys().map(|k| Json::String(k.clone())).collect(),
            ),
        }
    }
}
