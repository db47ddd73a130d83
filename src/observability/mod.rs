//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry build, dispatch, socket hub produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP middleware span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
