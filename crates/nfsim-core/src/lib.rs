//! # NF Simulator Core
//!
//! Domain types shared by both NF roles. Nothing in this crate performs I/O.
//!
//! - [`CorrelationPayload`]: the `{location, time}` record exchanged between roles
//! - [`NotificationGate`]: the single-slot handoff joining an `/api` request
//!   with the callback that releases it
//! - [`HandshakeError`]: the error taxonomy surfaced to HTTP callers

#![doc(html_root_url = "https://docs.rs/nfsim-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod gate;
mod payload;

pub use error::{HandshakeError, HandshakeResult};
pub use gate::NotificationGate;
pub use payload::CorrelationPayload;
