//! Action registry: built once at startup, read-only while serving.
//!
//! # Data Flow
//! ```text
//! application code
//!     → builder.rs (routes, RPC candidates, pushes, aspects, plugins)
//!     → build(&EngineConfig) (interceptors resolved, source names checked,
//!       trie + literal table + RPC table + push table assembled)
//!     → engine.rs (route / dispatch / handle for each surface)
//! ```
//!
//! # Design Decisions
//! - Handlers are registered explicitly; there is no discovery step
//! - Every structural error surfaces from `build`, never while serving
//! - The built `Engine` is shared behind an `Arc` and never mutated

pub mod builder;
pub mod engine;

pub use builder::{HandlerDef, RegistryBuilder, RegistryError};
pub use engine::Engine;
