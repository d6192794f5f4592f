//! Configuration for the NF simulator roles.
//!
//! Each role reads a JSON (or TOML) file, by default `config/nf.json`:
//!
//! ```json
//! {
//!     "remotenfapiroot": "http://localhost:8083/nf2",
//!     "localapirootprefix": "http://",
//!     "nfNotificationResUriPath": "/nf1",
//!     "HTTPConfig": { "apiendpoint": ":8081", "nfendpoint": "localhost:8082" }
//! }
//! ```
//!
//! ```json
//! { "nfendpoint": "localhost:8083", "localapirootprefix": "http://" }
//! ```
//!
//! The first is an [`Nf1Config`], the second an [`Nf2Config`]. Both accept
//! the optional `peer`, `server` and `telemetry` sections; NF1 also takes
//! `handshake` and NF2 `relay`.
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `NF1__...` or `NF2__...` variables, using
//! upper snake case for section keys:
//!
//! - `NF1__HTTPCONFIG__APIENDPOINT=:9081`
//! - `NF1__HANDSHAKE__CALLBACK_TIMEOUT_SECS=5`
//! - `NF2__RELAY__DELAY_MS=250`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HttpConfig, Nf1Config, Nf2Config, NfConfig, DEFAULT_CALLBACK_PATH};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    HandshakeSettings, LogFormat, PeerSettings, RelaySettings, ServerSettings, TelemetrySettings,
};
