//! Embeddable request-dispatch engine.
//!
//! Resolves an inbound request to a handler, binds and validates its
//! parameters, runs the before/after/catch/finally aspect chain around it and
//! renders the result. One engine backs path-routed HTTP actions, a
//! structural JSON-RPC surface and push-style socket actions.

// Core model
pub mod action;
pub mod param;

// Request processing
pub mod binder;
pub mod dispatch;
pub mod interceptor;
pub mod routing;
pub mod rpc;
pub mod socket;

// Assembly
pub mod registry;

// Transport and cross-cutting concerns
pub mod config;
pub mod demo;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use action::{Action, Call, Model, Reply, Verb};
pub use config::EngineConfig;
pub use dispatch::{DispatchError, HandlerError};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use registry::{Engine, HandlerDef, RegistryBuilder, RegistryError};
