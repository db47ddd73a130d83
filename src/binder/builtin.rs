//! Built-in binders.
//!
//! Scalars (`boolean`, `char`, numbers, strings), uploaded files, and the
//! call-context targets (request, response, session, body, cause, files,
//! params).

use crate::binder::{BindContext, BindError, Binder};
use crate::param::{ContextType, Primitive, TypeRef, Value};

/// `true` for a case-insensitive "true", `false` for anything else.
pub struct BooleanBinder;

impl Binder for BooleanBinder {
    fn convert(&self, _ctx: &BindContext<'_>, _target: &TypeRef, value: Value) -> Result<Value, BindError> {
        match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::Str(s) => Ok(Value::Bool(s.eq_ignore_ascii_case("true"))),
            _ => Ok(Value::Bool(false)),
        }
    }
}

/// First character of the raw string.
pub struct CharBinder;

impl Binder for CharBinder {
    fn convert(&self, _ctx: &BindContext<'_>, target: &TypeRef, value: Value) -> Result<Value, BindError> {
        match value {
            Value::Char(c) => Ok(Value::Char(c)),
            Value::Str(ref s) => s
                .chars()
                .next()
                .map(Value::Char)
                .ok_or_else(|| BindError::malformed(target, &value)),
            other => Err(BindError::malformed(target, &other)),
        }
    }
}

/// Every integral and floating width, boxed or not.
pub struct NumberBinder;

impl NumberBinder {
    fn primitive(target: &TypeRef) -> Option<Primitive> {
        match target {
            TypeRef::Primitive(p) | TypeRef::Boxed(p) if p.is_integral() || p.is_floating() => Some(*p),
            _ => None,
        }
    }

    fn parse(p: Primitive, s: &str) -> Option<Value> {
        match p {
            Primitive::Byte => s.parse().ok().map(Value::Byte),
            Primitive::Short => s.parse().ok().map(Value::Short),
            Primitive::Int => s.parse().ok().map(Value::Int),
            Primitive::Long => s.parse().ok().map(Value::Long),
            Primitive::Float => s.parse().ok().map(Value::Float),
            Primitive::Double => s.parse().ok().map(Value::Double),
            Primitive::Bool | Primitive::Char => None,
        }
    }

    fn narrow(p: Primitive, value: &Value) -> Option<Value> {
        if p.is_floating() {
            let v = value.as_f64()?;
            return Some(match p {
                Primitive::Float => Value::Float(v as f32),
                _ => Value::Double(v),
            });
        }

        let v = value.as_i64()?;
        match p {
            Primitive::Byte => i8::try_from(v).ok().map(Value::Byte),
            Primitive::Short => i16::try_from(v).ok().map(Value::Short),
            Primitive::Int => i32::try_from(v).ok().map(Value::Int),
            _ => Some(Value::Long(v)),
        }
    }
}

impl Binder for NumberBinder {
    fn convert(&self, _ctx: &BindContext<'_>, target: &TypeRef, value: Value) -> Result<Value, BindError> {
        let p = Self::primitive(target).ok_or_else(|| BindError::Unsupported {
            target: target.raw_name(),
        })?;

        let bound = match &value {
            Value::Str(s) => Self::parse(p, s),
            other => Self::narrow(p, other),
        };

        bound.ok_or_else(|| BindError::malformed(target, &value))
    }
}

/// URL-decodes the raw string.
pub struct StringBinder;

impl StringBinder {
    /// Decode `%xx` escapes and `+` as a single form value.
    pub fn decode(raw: &str) -> String {
        let escaped = raw.replace('&', "%26").replace('=', "%3D");
        url::form_urlencoded::parse(escaped.as_bytes())
            .next()
            .map(|(key, _)| key.into_owned())
            .unwrap_or_default()
    }
}

impl Binder for StringBinder {
    fn convert(&self, _ctx: &BindContext<'_>, target: &TypeRef, value: Value) -> Result<Value, BindError> {
        match value {
            Value::Str(s) => Ok(Value::Str(Self::decode(&s))),
            Value::Char(c) => Ok(Value::Str(c.to_string())),
            other => Err(BindError::malformed(target, &other)),
        }
    }
}

/// Uploaded file whose form field equals the parameter's source name.
pub struct FileBinder;

impl Binder for FileBinder {
    fn convert(&self, ctx: &BindContext<'_>, target: &TypeRef, value: Value) -> Result<Value, BindError> {
        match value {
            Value::File(file) => Ok(Value::File(file)),
            other => self
                .lookup(ctx)
                .ok_or_else(|| BindError::malformed(target, &other)),
        }
    }

    fn bind(&self, ctx: &BindContext<'_>, target: &TypeRef, value: Option<Value>) -> Value {
        match value {
            Some(Value::File(file)) => Value::File(file),
            _ => self.lookup(ctx).unwrap_or_else(|| self.zero(target)),
        }
    }
}

impl FileBinder {
    fn lookup(&self, ctx: &BindContext<'_>) -> Option<Value> {
        let name = ctx.param?.source_name();
        ctx.request.files().remove(name).map(Value::File)
    }
}

/// Resolves call-context targets; raw values are ignored.
pub struct ContextBinder;

impl ContextBinder {
    pub fn resolve(ctx: &BindContext<'_>, kind: ContextType) -> Value {
        match kind {
            ContextType::Request | ContextType::Response => Value::Context(kind),
            ContextType::Session => match ctx.request.session() {
                Some(_) => Value::Context(kind),
                None => Value::Null,
            },
            ContextType::Body => Value::Bytes(ctx.request.body.clone()),
            ContextType::Cause => match ctx.cause {
                Some(_) => Value::Context(kind),
                None => Value::Null,
            },
            ContextType::Files => Value::Files(ctx.request.files()),
            ContextType::Params => Value::Map(ctx.request.flat_params()),
        }
    }
}

impl Binder for ContextBinder {
    fn convert(&self, ctx: &BindContext<'_>, target: &TypeRef, _value: Value) -> Result<Value, BindError> {
        match target {
            TypeRef::Context(kind) => Ok(Self::resolve(ctx, *kind)),
            other => Err(BindError::Unsupported {
                target: other.raw_name(),
            }),
        }
    }

    fn bind(&self, ctx: &BindContext<'_>, target: &TypeRef, _value: Option<Value>) -> Value {
        match target {
            TypeRef::Context(kind) => Self::resolve(ctx, *kind),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Verb;
    use crate::http::request::{Arg, UploadedFile, ARG_FILES};
    use crate::http::Request;
    use crate::param::ParamDescriptor;
    use std::collections::BTreeMap;

    fn request() -> Request {
        Request::new(Verb::Get, "/?a=1&a=2&b=x")
    }

    #[test]
    fn test_boolean_binder_never_fails() {
        let req = request();
        let ctx = BindContext::new(&req);
        let target = TypeRef::boolean();
        assert_eq!(BooleanBinder.bind(&ctx, &target, Some(Value::Str("TRUE".into()))), Value::Bool(true));
        assert_eq!(BooleanBinder.bind(&ctx, &target, Some(Value::Str("yes".into()))), Value::Bool(false));
        assert_eq!(BooleanBinder.bind(&ctx, &target, None), Value::Bool(false));
    }

    #[test]
    fn test_char_binder() {
        let req = request();
        let ctx = BindContext::new(&req);
        let target = TypeRef::Primitive(Primitive::Char);
        assert_eq!(CharBinder.bind(&ctx, &target, Some(Value::Str("xyz".into()))), Value::Char('x'));
        assert_eq!(CharBinder.bind(&ctx, &target, Some(Value::Str(String::new()))), Value::Char('\0'));
    }

    #[test]
    fn test_number_binder_widths() {
        let req = request();
        let ctx = BindContext::new(&req);

        let byte = TypeRef::Primitive(Primitive::Byte);
        assert_eq!(NumberBinder.bind(&ctx, &byte, Some(Value::Str("12".into()))), Value::Byte(12));
        assert_eq!(NumberBinder.bind(&ctx, &byte, Some(Value::Str("300".into()))), Value::Byte(0));

        let boxed = TypeRef::Boxed(Primitive::Long);
        assert_eq!(NumberBinder.bind(&ctx, &boxed, Some(Value::Str("x".into()))), Value::Null);

        let double = TypeRef::double();
        assert_eq!(NumberBinder.bind(&ctx, &double, Some(Value::Int(3))), Value::Double(3.0));
    }

    #[test]
    fn test_default_literal_rebound() {
        let req = request();
        let param = ParamDescriptor::new("limit", TypeRef::int()).with_default("10");
        let ctx = BindContext::new(&req).with_param(&param);

        assert_eq!(NumberBinder.bind(&ctx, &TypeRef::int(), None), Value::Int(10));
        assert_eq!(NumberBinder.bind(&ctx, &TypeRef::int(), Some(Value::Str("abc".into()))), Value::Int(10));

        let bad_default = ParamDescriptor::new("limit", TypeRef::int()).with_default("ten");
        let ctx = BindContext::new(&req).with_param(&bad_default);
        assert_eq!(NumberBinder.bind(&ctx, &TypeRef::int(), None), Value::Int(0));
    }

    #[test]
    fn test_string_binder_decodes() {
        assert_eq!(StringBinder::decode("a%20b+c"), "a b c");
        assert_eq!(StringBinder::decode("x=1&y"), "x=1&y");
        assert_eq!(StringBinder::decode(""), "");
    }

    #[test]
    fn test_file_binder() {
        let mut files = BTreeMap::new();
        files.insert(
            "avatar".to_string(),
            UploadedFile {
                name: "avatar".into(),
                file_name: "me.png".into(),
                content_type: "image/png".into(),
                data: vec![1, 2, 3],
            },
        );
        let req = request().with_arg(ARG_FILES, Arg::Files(files));
        let param = ParamDescriptor::new("avatar", TypeRef::file());
        let ctx = BindContext::new(&req).with_param(&param);

        match FileBinder.bind(&ctx, &TypeRef::file(), None) {
            Value::File(file) => assert_eq!(file.file_name, "me.png"),
            other => panic!("unexpected {:?}", other),
        }

        let missing = ParamDescriptor::new("resume", TypeRef::file());
        let ctx = BindContext::new(&req).with_param(&missing);
        assert!(FileBinder.bind(&ctx, &TypeRef::file(), None).is_null());
    }

    #[test]
    fn test_context_binder() {
        let req = request().with_body("payload");
        let ctx = BindContext::new(&req);

        assert_eq!(
            ContextBinder.bind(&ctx, &TypeRef::Context(ContextType::Body), None),
            Value::Bytes(b"payload".to_vec())
        );
        assert!(ContextBinder.bind(&ctx, &TypeRef::Context(ContextType::Cause), None).is_null());

        match ContextBinder.bind(&ctx, &TypeRef::Context(ContextType::Params), None) {
            Value::Map(map) => {
                assert_eq!(map["a"], "1");
                assert_eq!(map["b"], "x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
