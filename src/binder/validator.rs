//! Marker-keyed validators and the per-call validation record.

use std::sync::OnceLock;

use regex::Regex;

use crate::param::{Marker, Value};

/// Checks a bound value against a marker's attributes.
///
/// Implementations must be pure: the same value and marker always give the
/// same answer.
pub trait Validator: Send + Sync {
    fn is_satisfied(&self, value: &Value, marker: &Marker) -> bool;
}

/// Non-null, non-blank string, non-empty collection.
pub struct RequiredValidator;

impl Validator for RequiredValidator {
    fn is_satisfied(&self, value: &Value, _marker: &Marker) -> bool {
        match value {
            Value::Null => false,
            Value::Str(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Files(files) => !files.is_empty(),
            Value::Json(serde_json::Value::Null) => false,
            _ => true,
        }
    }
}

/// Inclusive numeric bounds from the `min` / `max` attributes.
///
/// Null passes (pair with `Required` to reject it). Strings are parsed as
/// numbers; anything else fails. A missing or unparseable bound is open.
pub struct RangeValidator;

impl RangeValidator {
    fn bound(marker: &Marker, key: &str, open: f64) -> f64 {
        marker
            .attribute(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(open)
    }
}

impl Validator for RangeValidator {
    fn is_satisfied(&self, value: &Value, marker: &Marker) -> bool {
        if value.is_null() {
            return true;
        }

        let min = Self::bound(marker, "min", f64::NEG_INFINITY);
        let max = Self::bound(marker, "max", f64::INFINITY);

        let number = match value {
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        };

        number.is_some_and(|v| v >= min && v <= max)
    }
}

/// RFC 5322-ish address check.
pub struct EmailValidator;

impl EmailValidator {
    fn pattern() -> Option<&'static Regex> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| {
                Regex::new(
                    r"^[\w!#$%&'*+/=?^`{|}~-]+(?:\.[\w!#$%&'*+/=?^`{|}~-]+)*@(?:\w(?:[\w-]*\w)?\.)+[a-zA-Z0-9](?:[\w-]*\w)?$",
                )
                .ok()
            })
            .as_ref()
    }
}

impl Validator for EmailValidator {
    fn is_satisfied(&self, value: &Value, _marker: &Marker) -> bool {
        match (value.as_str(), Self::pattern()) {
            (Some(s), Some(pattern)) => pattern.is_match(s),
            _ => false,
        }
    }
}

/// Dotted-quad IPv4 address.
pub struct Ipv4AddressValidator;

impl Validator for Ipv4AddressValidator {
    fn is_satisfied(&self, value: &Value, _marker: &Marker) -> bool {
        let Some(s) = value.as_str() else {
            return false;
        };

        let parts: Vec<&str> = s.split('.').collect();
        parts.len() == 4
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.parse::<u16>().is_ok_and(|n| n <= 255))
    }
}

/// One validator verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub parameter: String,
    pub marker: String,
    pub passed: bool,
}

/// Record of the checks run while binding one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    checks: Vec<Check>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, parameter: &str, marker: &str, passed: bool) {
        self.checks.push(Check {
            parameter: parameter.to_string(),
            marker: marker.to_string(),
            passed,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.checks.iter().any(|c| !c.passed)
    }

    /// First failing check, in evaluation order.
    pub fn first_error(&self) -> Option<&Check> {
        self.checks.iter().find(|c| !c.passed)
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let m = Marker::new("Required");
        assert!(!RequiredValidator.is_satisfied(&Value::Null, &m));
        assert!(!RequiredValidator.is_satisfied(&Value::Str("  ".into()), &m));
        assert!(!RequiredValidator.is_satisfied(&Value::Array(vec![]), &m));
        assert!(RequiredValidator.is_satisfied(&Value::Int(0), &m));
        assert!(RequiredValidator.is_satisfied(&Value::Str("x".into()), &m));
    }

    #[test]
    fn test_range() {
        let m = Marker::new("Range").with("min", "1").with("max", "10");
        assert!(RangeValidator.is_satisfied(&Value::Int(1), &m));
        assert!(RangeValidator.is_satisfied(&Value::Str("9.5".into()), &m));
        assert!(!RangeValidator.is_satisfied(&Value::Long(11), &m));
        assert!(!RangeValidator.is_satisfied(&Value::Str("abc".into()), &m));
        assert!(RangeValidator.is_satisfied(&Value::Null, &m));
        assert!(!RangeValidator.is_satisfied(&Value::Bool(true), &m));

        let open = Marker::new("Range").with("min", "0");
        assert!(RangeValidator.is_satisfied(&Value::Long(i64::MAX), &open));
    }

    #[test]
    fn test_email() {
        let m = Marker::new("Email");
        assert!(EmailValidator.is_satisfied(&Value::Str("dev.team+ci@example.co.kr".into()), &m));
        assert!(!EmailValidator.is_satisfied(&Value::Str("no-at-sign".into()), &m));
        assert!(!EmailValidator.is_satisfied(&Value::Str("a@b".into()), &m));
        assert!(!EmailValidator.is_satisfied(&Value::Null, &m));
    }

    #[test]
    fn test_ipv4() {
        let m = Marker::new("IPv4Address");
        assert!(Ipv4AddressValidator.is_satisfied(&Value::Str("192.168.0.255".into()), &m));
        assert!(!Ipv4AddressValidator.is_satisfied(&Value::Str("256.1.1.1".into()), &m));
        assert!(!Ipv4AddressValidator.is_satisfied(&Value::Str("1.2.3".into()), &m));
        assert!(!Ipv4AddressValidator.is_satisfied(&Value::Str("1..2.3".into()), &m));
        assert!(!Ipv4AddressValidator.is_satisfied(&Value::Int(1), &m));
    }

    #[test]
    fn test_validators_are_idempotent() {
        let validators: Vec<(Box<dyn Validator>, Marker)> = vec![
            (Box::new(RequiredValidator), Marker::new("Required")),
            (Box::new(RangeValidator), Marker::new("Range").with("min", "2").with("max", "4")),
            (Box::new(EmailValidator), Marker::new("Email")),
            (Box::new(Ipv4AddressValidator), Marker::new("IPv4Address")),
        ];
        let values = [
            Value::Null,
            Value::Int(3),
            Value::Str("a@b.io".into()),
            Value::Str("10.0.0.1".into()),
            Value::Str(String::new()),
        ];

        for (validator, marker) in &validators {
            for value in &values {
                assert_eq!(validator.is_satisfied(value, marker), validator.is_satisfied(value, marker));
            }
        }
    }

    #[test]
    fn test_validation_record() {
        let mut validation = Validation::new();
        validation.record("name", "Required", true);
        validation.record("age", "Range", false);
        validation.record("mail", "Email", false);

        assert!(validation.has_errors());
        assert_eq!(validation.first_error().map(|c| c.parameter.as_str()), Some("age"));
        assert_eq!(validation.checks().len(), 3);
    }
}
