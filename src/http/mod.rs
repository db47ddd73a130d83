//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body buffering)
//!     → request.rs (engine Request: params, headers, cookies, side channel)
//!     → registry::Engine (route + dispatch, or RPC, or socket)
//!     → response.rs (engine Response → Axum response)
//!     → Send to client
//! ```

pub mod cookie;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use cookie::Cookie;
pub use request::{Arg, Request, UploadedFile};
pub use response::Response;
pub use server::HttpServer;
