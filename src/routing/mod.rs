//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (verb, path)
//!     → router.rs (route cache lookup, "VERB path")
//!     → static_router.rs (statuses, files, directory mappings)
//!     → tree.rs (per-verb segment trie, literal over wildcard)
//!     → Return: Action (Null when nothing matched)
//!
//! Route Compilation (at startup):
//!     RegistryBuilder routes   → Tree
//!     config / routes file     → StaticRouter
//!     → Freeze as HttpRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (segment lookups only)
//! - Deterministic: same input always matches same route

pub mod cache;
pub mod router;
pub mod routes_file;
pub mod static_router;
pub mod tree;

pub use router::{HttpRouter, Router};
pub use static_router::{StaticRoute, StaticRouter, StaticTarget};
pub use tree::{DuplicateRoute, Tree};
