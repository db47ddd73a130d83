//! Structural JSON-RPC surface.
//!
//! # Data Flow
//! ```text
//! POST /rpc/<namespace>/<method>, body = JSON object or array
//!     → naming flag header picks by-name (object) or positional (array)
//!     → router.rs (first candidate whose signature fits the payload)
//!     → dispatcher.rs (payload → Values, interceptor lifecycle, JSON view)
//!     → on error: {type, message, stacktrace}
//! ```

pub mod dispatcher;
pub mod namespace;
pub mod router;

pub use dispatcher::{dispatch_rpc, rpc_arguments};
pub use namespace::{RpcMethod, RpcNamespace};
pub use router::{is_compatible, RpcMatch, RpcRouter};
