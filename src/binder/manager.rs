//! Binder, converter and validator registries plus the binding algorithm.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::binder::builtin::{BooleanBinder, CharBinder, ContextBinder, FileBinder, NumberBinder, StringBinder};
use crate::binder::converter::{Converter, DateConverter};
use crate::binder::validator::{
    EmailValidator, Ipv4AddressValidator, RangeValidator, RequiredValidator, Validation, Validator,
};
use crate::binder::{BindContext, Binder};
use crate::dispatch::error::{DispatchError, ValidationError};
use crate::http::Request;
use crate::param::{ContextType, ParamDescriptor, Primitive, TypeRef, Value};

/// Bound arguments for one call, with the checks that accepted them.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    pub values: Vec<Value>,
    pub validation: Validation,
}

/// Registries consulted while binding. Read-only once built.
#[derive(Default)]
pub struct BinderManager {
    binders: Vec<(TypeRef, Arc<dyn Binder>)>,
    exact: HashMap<TypeRef, usize>,
    converters: HashMap<String, Arc<dyn Converter>>,
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl BinderManager {
    /// Empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries pre-populated with the built-in plugins.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();

        let boolean: Arc<dyn Binder> = Arc::new(BooleanBinder);
        let character: Arc<dyn Binder> = Arc::new(CharBinder);
        let number: Arc<dyn Binder> = Arc::new(NumberBinder);
        let context: Arc<dyn Binder> = Arc::new(ContextBinder);

        manager.register_binder(TypeRef::Primitive(Primitive::Bool), boolean.clone());
        manager.register_binder(TypeRef::Boxed(Primitive::Bool), boolean);
        manager.register_binder(TypeRef::Primitive(Primitive::Char), character.clone());
        manager.register_binder(TypeRef::Boxed(Primitive::Char), character);

        for p in [
            Primitive::Byte,
            Primitive::Short,
            Primitive::Int,
            Primitive::Long,
            Primitive::Float,
            Primitive::Double,
        ] {
            manager.register_binder(TypeRef::Primitive(p), number.clone());
            manager.register_binder(TypeRef::Boxed(p), number.clone());
        }

        manager.register_binder(TypeRef::Str, Arc::new(StringBinder));
        manager.register_binder(TypeRef::file(), Arc::new(FileBinder));

        for kind in [
            ContextType::Request,
            ContextType::Response,
            ContextType::Session,
            ContextType::Body,
            ContextType::Cause,
            ContextType::Files,
            ContextType::Params,
        ] {
            manager.register_binder(TypeRef::Context(kind), context.clone());
        }

        manager.register_converter(DateConverter::MARKER, Arc::new(DateConverter));

        manager.register_validator("Required", Arc::new(RequiredValidator));
        manager.register_validator("Range", Arc::new(RangeValidator));
        manager.register_validator("Email", Arc::new(EmailValidator));
        manager.register_validator("IPv4Address", Arc::new(Ipv4AddressValidator));

        manager
    }

    /// Register a binder for `ty`. Re-registering a type replaces its binder
    /// but keeps its original fallback position.
    pub fn register_binder(&mut self, ty: TypeRef, binder: Arc<dyn Binder>) {
        tracing::debug!(target_type = %ty, "Registered binder");
        match self.exact.get(&ty) {
            Some(&index) => self.binders[index].1 = binder,
            None => {
                self.exact.insert(ty.clone(), self.binders.len());
                self.binders.push((ty, binder));
            }
        }
    }

    pub fn register_converter(&mut self, marker: impl Into<String>, converter: Arc<dyn Converter>) {
        let marker = marker.into();
        tracing::debug!(marker = %marker, "Registered converter");
        self.converters.insert(marker, converter);
    }

    pub fn register_validator(&mut self, marker: impl Into<String>, validator: Arc<dyn Validator>) {
        let marker = marker.into();
        tracing::debug!(marker = %marker, "Registered validator");
        self.validators.insert(marker, validator);
    }

    /// Exact registration, else the first registration (in order) whose type
    /// is assignable from `target`.
    pub fn find_binder(&self, target: &TypeRef) -> Option<&Arc<dyn Binder>> {
        if let Some(&index) = self.exact.get(target) {
            return Some(&self.binders[index].1);
        }

        self.binders
            .iter()
            .find(|(ty, _)| ty.is_assignable_from(target))
            .map(|(_, binder)| binder)
    }

    /// Run the first marker that has a registered converter; otherwise the raw
    /// string passes through.
    pub fn convert(&self, request: &Request, param: &ParamDescriptor, raw: &str) -> Value {
        param
            .markers
            .iter()
            .find_map(|marker| {
                self.converters
                    .get(marker.name())
                    .map(|converter| converter.convert(request, param, marker, raw))
            })
            .flatten()
            .unwrap_or_else(|| Value::Str(raw.to_string()))
    }

    /// Bind one parameter from its raw values. Never fails.
    pub fn bind(&self, ctx: &BindContext<'_>, param: &ParamDescriptor, raw: &[String]) -> Value {
        let ctx = ctx.with_param(param);
        let target = param.bind_type();
        let binder = self.find_binder(target);

        let bind_one = |value: Option<Value>| match binder {
            Some(binder) => binder.bind(&ctx, target, value),
            None => value.unwrap_or(Value::Null),
        };

        if !param.is_array() {
            return bind_one(raw.first().map(|r| self.convert(ctx.request, param, r)));
        }

        if raw.is_empty() {
            return match param.default_value {
                Some(_) => Value::Array(vec![bind_one(None)]),
                None => Value::Array(Vec::new()),
            };
        }

        Value::Array(
            raw.iter()
                .map(|r| bind_one(Some(self.convert(ctx.request, param, r))))
                .collect(),
        )
    }

    /// Check `value` against every marker with a registered validator, stopping
    /// at the first failure.
    pub fn validate(
        &self,
        value: &Value,
        param: &ParamDescriptor,
        validation: &mut Validation,
    ) -> Result<(), ValidationError> {
        for marker in &param.markers {
            let Some(validator) = self.validators.get(marker.name()) else {
                continue;
            };

            let passed = validator.is_satisfied(value, marker);
            validation.record(param.source_name(), marker.name(), passed);

            if !passed {
                return Err(ValidationError {
                    parameter: param.source_name().to_string(),
                    marker: marker.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Bind and validate every parameter in declaration order.
    pub fn bind_arguments(
        &self,
        request: &Request,
        params: &[ParamDescriptor],
        values: &BTreeMap<String, Vec<String>>,
        cause: Option<&DispatchError>,
    ) -> Result<BoundArguments, ValidationError> {
        let ctx = BindContext::new(request).with_cause(cause);
        let mut validation = Validation::new();
        let mut bound = Vec::with_capacity(params.len());

        for param in params {
            let raw = values
                .get(param.source_name())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let value = self.bind(&ctx, param, raw);
            self.validate(&value, param, &mut validation)?;
            bound.push(value);
        }

        Ok(BoundArguments {
            values: bound,
            validation,
        })
    }

    /// Arguments for aspects and push handlers: context targets resolved,
    /// everything else at its zero value.
    pub fn context_arguments(
        &self,
        request: &Request,
        params: &[ParamDescriptor],
        cause: Option<&DispatchError>,
    ) -> Vec<Value> {
        let ctx = BindContext::new(request).with_cause(cause);
        params
            .iter()
            .map(|param| match &param.ty {
                TypeRef::Context(kind) => ContextBinder::resolve(&ctx.with_param(param), *kind),
                other => Value::zero_of(other),
            })
            .collect()
    }

    pub fn binder_count(&self) -> usize {
        self.binders.len()
    }
}
