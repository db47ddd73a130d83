//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults, so an empty file is a valid config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatch engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Path-routed HTTP actions and static resources.
    pub http: HttpConfig,

    /// Structural JSON-RPC surface.
    pub rpc: RpcConfig,

    /// Push-style socket actions.
    pub socket: SocketConfig,

    /// Literal routes: fixed statuses, files and directory mappings.
    pub static_routes: Vec<StaticRouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Send caching headers and honour If-Modified-Since for static resources.
    pub static_cache: bool,

    /// max-age / Expires offset for static resources, in seconds.
    pub cache_ttl_secs: u64,

    /// View used when a handler names none.
    pub default_view: String,

    /// Route cache entries; 0 disables the cache.
    pub route_cache_size: usize,

    /// Static files kept in memory; 0 disables the cache.
    pub file_cache_size: usize,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional line-oriented routes file (`VERB /path target`).
    pub routes_file: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            static_cache: false,
            cache_ttl_secs: 86_400,
            default_view: "json".to_string(),
            route_cache_size: 10_000,
            file_cache_size: 256,
            request_timeout_secs: 30,
            routes_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Path prefix of the RPC surface.
    pub prefix: String,

    /// Header whose value `true` selects by-name payloads.
    pub parameter_names_header: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            prefix: "/rpc".to_string(),
            parameter_names_header: "x-rpc-use-parameter-names".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Path prefix of socket upgrades.
    pub prefix: String,

    /// Largest accepted inbound message in bytes.
    pub max_message_size: usize,

    /// Outbound messages buffered per channel.
    pub channel_capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            prefix: "/ws".to_string(),
            max_message_size: 65_345,
            channel_capacity: 64,
        }
    }
}

/// One literal route. `target` is a status code, `staticDir:<dir>` or `file:<path>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticRouteConfig {
    #[serde(default = "default_verb")]
    pub verb: String,

    pub path: String,

    pub target: String,
}

fn default_verb() -> String {
    "GET".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.http.default_view, "json");
        assert_eq!(config.http.cache_ttl_secs, 86_400);
        assert!(!config.http.static_cache);
        assert_eq!(config.socket.max_message_size, 65_345);
        assert_eq!(config.rpc.parameter_names_header, "x-rpc-use-parameter-names");
        assert!(config.static_routes.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let config: EngineConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [http]
            static_cache = true
            default_view = "html"

            [[static_routes]]
            path = "/assets/"
            target = "staticDir:public"

            [[static_routes]]
            verb = "POST"
            path = "/legacy"
            target = "410"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(config.http.static_cache);
        assert_eq!(config.static_routes[0].verb, "GET");
        assert_eq!(config.static_routes[1].target, "410");
    }
}
