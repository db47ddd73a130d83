//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Action + Request
//!     → dispatcher.rs (match on the action variant)
//!     → lifecycle.rs (BEFORE → bind → INVOKE → AFTER / CATCH → FINALLY)
//!     → view.rs (resolve the view name, write the Response)
//!     → on error: responder.rs (status + body, pluggable 404 renderer)
//! ```
//!
//! # Design Decisions
//! - View priority: reply > catch aspect (error path) / verb (success path) > default
//! - Finally aspects never change the outcome; their errors are logged

pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod responder;
pub mod view;

pub use dispatcher::{DispatchSettings, Dispatcher};
pub use error::{DispatchError, HandlerError, ValidationError};
pub use lifecycle::Rendered;
pub use responder::{NotFoundRenderer, PlainNotFound, Responder, RpcErrorBody};
pub use view::{View, ViewResolver};
