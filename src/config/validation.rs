//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, prefixes and value ranges
//! - Check every literal route parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::action::Verb;
use crate::config::schema::EngineConfig;
use crate::routing::StaticTarget;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }
    if config.http.default_view.trim().is_empty() {
        errors.push(ValidationError::new("http.default_view", "must not be empty"));
    }

    for (field, prefix) in [("rpc.prefix", &config.rpc.prefix), ("socket.prefix", &config.socket.prefix)] {
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            errors.push(ValidationError::new(
                field,
                format!("`{prefix}` must start with `/`, not end with `/` and not be the root"),
            ));
        }
    }
    if config.rpc.prefix == config.socket.prefix {
        errors.push(ValidationError::new("socket.prefix", "must differ from rpc.prefix"));
    }
    if config.rpc.parameter_names_header.trim().is_empty() {
        errors.push(ValidationError::new("rpc.parameter_names_header", "must not be empty"));
    }

    if config.socket.max_message_size == 0 {
        errors.push(ValidationError::new("socket.max_message_size", "must be greater than 0"));
    }
    if config.socket.channel_capacity == 0 {
        errors.push(ValidationError::new("socket.channel_capacity", "must be greater than 0"));
    }

    for (i, route) in config.static_routes.iter().enumerate() {
        let field = format!("static_routes[{i}]");
        if let Err(e) = route.verb.parse::<Verb>() {
            errors.push(ValidationError::new(&field, e.to_string()));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(&field, format!("path `{}` must start with `/`", route.path)));
        }
        if let Err(e) = route.target.parse::<StaticTarget>() {
            errors.push(ValidationError::new(&field, e.to_string()));
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("`{}` is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StaticRouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = EngineConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.socket.prefix = "/rpc".into();
        config.observability.log_level = "loud".into();
        config.static_routes.push(StaticRouteConfig {
            verb: "FETCH".into(),
            path: "assets".into(),
            target: "staticDir:public".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"socket.prefix"));
        assert!(fields.contains(&"observability.log_level"));
        assert_eq!(fields.iter().filter(|f| **f == "static_routes[0]").count(), 2);
    }
}
