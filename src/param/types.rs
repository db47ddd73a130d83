//! Declared parameter types.
//!
//! # Responsibilities
//! - Describe a parameter's declared shape (primitive, boxed, string, array,
//!   named object, generic, call-context)
//! - Answer "is A assignable from B" from explicit ancestry
//!
//! # Design Decisions
//! - Ancestry is declared, not discovered: `TypeTag::extends` copies the parent
//!   chain so `is_a` is a flat scan
//! - Error classes reuse `TypeTag`, so catch aspects and binder fallback share
//!   one assignability rule

use std::fmt;

/// Non-nullable scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    /// Name of the non-nullable form.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Name of the nullable (boxed) form.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Bool => "Boolean",
            Primitive::Char => "Character",
            Primitive::Byte => "Byte",
            Primitive::Short => "Short",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Primitive::Byte | Primitive::Short | Primitive::Int | Primitive::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }
}

/// Values resolved from the call itself rather than from request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    Request,
    Response,
    Session,
    /// Raw request body bytes.
    Body,
    /// The error being handled by a catch aspect.
    Cause,
    /// Uploaded files keyed by form field.
    Files,
    /// All request parameters flattened to their first value.
    Params,
}

impl ContextType {
    pub fn name(self) -> &'static str {
        match self {
            ContextType::Request => "Request",
            ContextType::Response => "Response",
            ContextType::Session => "Session",
            ContextType::Body => "Body",
            ContextType::Cause => "Cause",
            ContextType::Files => "Files",
            ContextType::Params => "Params",
        }
    }
}

/// A named type with its declared ancestry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag {
    name: String,
    ancestors: Vec<String>,
}

impl TypeTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestors: Vec::new(),
        }
    }

    /// Root of every error class.
    pub fn exception() -> Self {
        Self::new("Exception")
    }

    /// An error class descending directly from `Exception`.
    pub fn error(name: impl Into<String>) -> Self {
        Self::new(name).extends(&Self::exception())
    }

    /// Declare `parent` (and its ancestry) as supertypes of this tag.
    pub fn extends(mut self, parent: &TypeTag) -> Self {
        for name in std::iter::once(&parent.name).chain(parent.ancestors.iter()) {
            if *name != self.name && !self.ancestors.contains(name) {
                self.ancestors.push(name.clone());
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// True if this tag is `other` or declares it as an ancestor.
    pub fn is_a(&self, other: &TypeTag) -> bool {
        self.name == other.name || self.ancestors.iter().any(|a| *a == other.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(Primitive),
    Boxed(Primitive),
    Str,
    Array(Box<TypeRef>),
    Object(TypeTag),
    Generic { raw: TypeTag, args: Vec<TypeRef> },
    Context(ContextType),
}

impl TypeRef {
    pub fn boolean() -> Self {
        TypeRef::Primitive(Primitive::Bool)
    }

    pub fn int() -> Self {
        TypeRef::Primitive(Primitive::Int)
    }

    pub fn long() -> Self {
        TypeRef::Primitive(Primitive::Long)
    }

    pub fn double() -> Self {
        TypeRef::Primitive(Primitive::Double)
    }

    pub fn string() -> Self {
        TypeRef::Str
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeRef::Object(TypeTag::new(name))
    }

    /// The uploaded-file type handled by the file binder.
    pub fn file() -> Self {
        TypeRef::object("UploadedFile")
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The erased name used in logs and error messages.
    pub fn raw_name(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::Boxed(p) => p.boxed_name().to_string(),
            TypeRef::Str => "String".to_string(),
            TypeRef::Array(element) => format!("{}[]", element.raw_name()),
            TypeRef::Object(tag) => tag.name().to_string(),
            TypeRef::Generic { raw, .. } => raw.name().to_string(),
            TypeRef::Context(kind) => kind.name().to_string(),
        }
    }

    /// True if a value of type `other` may be used where `self` is declared.
    pub fn is_assignable_from(&self, other: &TypeRef) -> bool {
        if self == other {
            return true;
        }

        match (self, other) {
            (TypeRef::Object(a), TypeRef::Object(b)) => b.is_a(a),
            (TypeRef::Object(a), TypeRef::Generic { raw, .. }) => raw.is_a(a),
            (TypeRef::Generic { raw: a, .. }, TypeRef::Generic { raw: b, .. }) => b.is_a(a),
            (TypeRef::Object(a), _) => {
                a.name() == "Object" && !matches!(other, TypeRef::Primitive(_))
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Generic { raw, args } => {
                write!(f, "{}<", raw)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            other => f.write_str(&other.raw_name()),
        }
    }
}
