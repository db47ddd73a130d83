//! Parameter descriptors and declarative markers.

use std::collections::BTreeMap;

use crate::param::types::{ContextType, TypeRef};

/// A declarative marker attached to a parameter or a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    name: String,
    attributes: BTreeMap<String, String>,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Describes one declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// Logical (declared) name.
    pub name: String,
    /// Name the value is read from, when it differs from `name`.
    pub source: Option<String>,
    /// Declared type, including array and generic shape.
    pub ty: TypeRef,
    /// Overrides the type the binder targets.
    pub convert_to: Option<TypeRef>,
    pub required: bool,
    pub markers: Vec<Marker>,
    /// Literal re-bound through the binder when no usable value is supplied.
    pub default_value: Option<String>,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            source: None,
            ty,
            convert_to: None,
            required: false,
            markers: Vec::new(),
            default_value: None,
        }
    }

    /// A parameter resolved from the call context.
    pub fn context(kind: ContextType) -> Self {
        Self::new(kind.name().to_ascii_lowercase(), TypeRef::Context(kind))
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_convert_to(mut self, ty: TypeRef) -> Self {
        self.convert_to = Some(ty);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Type handed to the binder: the override, else the array element type,
    /// else the declared type.
    pub fn bind_type(&self) -> &TypeRef {
        if let Some(ty) = &self.convert_to {
            return ty;
        }
        self.ty.element().unwrap_or(&self.ty)
    }

    pub fn is_array(&self) -> bool {
        self.ty.is_array()
    }

    pub fn is_context(&self) -> bool {
        matches!(self.ty, TypeRef::Context(_))
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_override() {
        let param = ParamDescriptor::new("userId", TypeRef::long()).with_source("user_id");
        assert_eq!(param.source_name(), "user_id");
        assert_eq!(ParamDescriptor::new("q", TypeRef::Str).source_name(), "q");
    }

    #[test]
    fn test_bind_type() {
        let ids = ParamDescriptor::new("ids", TypeRef::array_of(TypeRef::int()));
        assert_eq!(ids.bind_type(), &TypeRef::int());

        let converted = ParamDescriptor::new("when", TypeRef::Str).with_convert_to(TypeRef::long());
        assert_eq!(converted.bind_type(), &TypeRef::long());
    }
}
