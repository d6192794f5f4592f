//! # NF Simulator
//!
//! Two cooperating network functions that exercise an asynchronous
//! request/notify handshake over plain HTTP.
//!
//! ```text
//!  client        NF1 (api + nf)                 NF2 (nf2)
//!    │ POST /api      │                             │
//!    │───────────────►│ POST {location: .../nf1}    │
//!    │                │────────────────────────────►│ 200 "Hello Thanks !!!"
//!    │                │◄────────────────────────────│
//!    │   (waiting on  │                             │ ... delay ...
//!    │    the gate)   │ POST /nf1 {location: .../nf2}
//!    │                │◄────────────────────────────│
//!    │◄───────────────│ 200 "Hello Thanks !!!"      │
//!    │ 200 {location: .../nf2, time}                │
//! ```
//!
//! - [`ApiFrontend`] serves `POST /api` on NF1's API listener.
//! - [`CallbackEndpoint`] serves the callback route on NF1's NF listener.
//! - [`DelayedRelay`] serves `POST /nf2` on NF2.
//! - [`PeerClient`] carries every outbound call.
//!
//! The `nf1` and `nf2` binaries load their configuration, install telemetry
//! and run the role's listeners until SIGINT or SIGTERM.

#![doc(html_root_url = "https://docs.rs/nfsim/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod callback;
pub mod cli;
pub mod error;
pub mod frontend;
pub mod peer;
pub mod relay;

pub use app::{load_config, log_report, Nf1App, Nf2App};
pub use callback::CallbackEndpoint;
pub use error::{AppError, AppResult};
pub use frontend::{ApiFrontend, HandshakeState};
pub use peer::{PeerClient, PeerResponse};
pub use relay::DelayedRelay;

/// Plain-text body acknowledging a callback or a relay request.
pub const ACKNOWLEDGEMENT: &str = "Hello Thanks !!!";

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
