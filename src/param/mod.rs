//! Parameter model shared by routing, binding and RPC matching.
//!
//! # Data Flow
//! ```text
//! Registry build:
//!     ParamDescriptor (name, source, TypeRef, markers, default)
//!     → attached to a MethodAction in declaration order
//!
//! Per request:
//!     raw strings / JSON nodes
//!     → binder pipeline (HTTP) or Value::from_json (RPC)
//!     → Vec<Value> handed to the handler
//! ```
//!
//! # Design Decisions
//! - Types are plain data (`TypeRef`, `TypeTag`), never inspected at runtime
//!   beyond equality and declared ancestry
//! - Bound arguments are a closed `Value` enum so handlers can match on them

pub mod descriptor;
pub mod types;
pub mod value;

pub use descriptor::{Marker, ParamDescriptor};
pub use types::{ContextType, Primitive, TypeRef, TypeTag};
pub use value::Value;
