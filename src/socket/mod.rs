//! Push-style socket actions.
//!
//! # Data Flow
//! ```text
//! Upgrade on /ws/<path>
//!     → SocketHub::bind (channel registered, pushes started)
//!     → outbound: push tasks / replies → mpsc → socket writer
//!     → inbound text → Engine::on_message (WS verb, normal lifecycle) → JSON reply
//!     → close → SocketHub::unbind (last channel cancels periodic pushes)
//! ```
//!
//! # Design Decisions
//! - Push tasks stop on a `watch` cancellation signal, never by polling
//! - Bounded channels; a full channel drops the push rather than blocking

pub mod hub;

pub use hub::{PushAction, PushEvent, SocketChannel, SocketHub};
