//! Marker-keyed converters that run before binding.

use chrono::{NaiveDate, NaiveDateTime};

use crate::http::Request;
use crate::param::{Marker, ParamDescriptor, Value};

/// Produces a typed value straight from a raw string.
///
/// Returning `None` lets the raw string pass through to the binder.
pub trait Converter: Send + Sync {
    fn convert(&self, request: &Request, param: &ParamDescriptor, marker: &Marker, raw: &str) -> Option<Value>;
}

/// Parses dates into epoch milliseconds (`Value::Long`).
///
/// The marker's `format` attribute is a chrono format string; the default is
/// `%Y-%m-%d`. Formats with a time component are parsed as date-times.
pub struct DateConverter;

impl DateConverter {
    pub const MARKER: &'static str = "Date";
    const DEFAULT_FORMAT: &'static str = "%Y-%m-%d";
}

impl Converter for DateConverter {
    fn convert(&self, _request: &Request, _param: &ParamDescriptor, marker: &Marker, raw: &str) -> Option<Value> {
        let format = marker.attribute("format").unwrap_or(Self::DEFAULT_FORMAT);

        let datetime = NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;

        Some(Value::Long(datetime.and_utc().timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Verb;
    use crate::param::TypeRef;

    #[test]
    fn test_date_converter() {
        let request = Request::new(Verb::Get, "/");
        let param = ParamDescriptor::new("since", TypeRef::long());

        let marker = Marker::new(DateConverter::MARKER);
        assert_eq!(
            DateConverter.convert(&request, &param, &marker, "1970-01-02"),
            Some(Value::Long(86_400_000))
        );
        assert_eq!(DateConverter.convert(&request, &param, &marker, "yesterday"), None);

        let timed = Marker::new(DateConverter::MARKER).with("format", "%Y-%m-%d %H:%M");
        assert_eq!(
            DateConverter.convert(&request, &param, &timed, "1970-01-01 00:01"),
            Some(Value::Long(60_000))
        );
    }
}
