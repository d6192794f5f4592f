//! Coordinated start and stop of a set of listeners.
//!
//! [`ServerLifecycle`] starts every listener concurrently. Each listener
//! watches the shared [`ShutdownSignal`] itself; when it fires they stop
//! accepting, drain, and post a [`ListenerReport`] on a rendezvous channel
//! sized to the number of listeners. [`ServerLifecycle::run`] returns once
//! all of them have reported.
//!
//! # Example
//!
//! ```rust,ignore
//! use nfsim_server::{ListenerDef, Router, ServerLifecycle, ShutdownSignal};
//!
//! let report = ServerLifecycle::new(ShutdownSignal::with_os_signals())
//!     .listener(ListenerDef::new("api", ":8081", api_routes))
//!     .listener(ListenerDef::new("nf", ":8082", callback_routes))
//!     .run()
//!     .await;
//! assert!(report.all_closed());
//! ```

use tokio::sync::mpsc;

use crate::listener::{serve, ListenerDef, ListenerReport, ListenerSettings};
use crate::shutdown::ShutdownSignal;

/// Owns a set of listener definitions and runs them until shutdown.
#[derive(Debug)]
pub struct ServerLifecycle {
    shutdown: ShutdownSignal,
    settings: ListenerSettings,
    listeners: Vec<ListenerDef>,
}

impl ServerLifecycle {
    /// Creates a lifecycle bound to `shutdown`.
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            settings: ListenerSettings::default(),
            listeners: Vec::new(),
        }
    }

    /// Sets the limits shared by all listeners.
    pub fn with_settings(mut self, settings: ListenerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a listener.
    pub fn listener(mut self, def: ListenerDef) -> Self {
        self.listeners.push(def);
        self
    }

    /// Adds several listeners.
    pub fn listeners(mut self, defs: impl IntoIterator<Item = ListenerDef>) -> Self {
        self.listeners.extend(defs);
        self
    }

    /// Number of listeners that will be started.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Limits every listener is started with.
    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    /// The signal listeners stop on.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Starts every listener and waits until each has reported.
    ///
    /// Listeners that fail to bind report straight away and are logged;
    /// the others keep serving until shutdown.
    pub async fn run(self) -> ShutdownReport {
        let expected = self.listeners.len();
        if expected == 0 {
            return ShutdownReport::default();
        }

        let (tx, mut rx) = mpsc::channel(expected);
        for def in self.listeners {
            let tx = tx.clone();
            let settings = self.settings.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let report = serve(def, settings, shutdown).await;
                let _ = tx.send(report).await;
            });
        }
        drop(tx);

        let mut listeners = Vec::with_capacity(expected);
        while listeners.len() < expected {
            match rx.recv().await {
                Some(report) => {
                    tracing::debug!(listener = %report.name, closed = report.is_closed(), "listener reported");
                    listeners.push(report);
                }
                None => {
                    tracing::error!(
                        reported = listeners.len(),
                        expected,
                        "listener task ended without reporting"
                    );
                    break;
                }
            }
        }

        tracing::info!(listeners = listeners.len(), "all listeners stopped");
        ShutdownReport { listeners }
    }
}

/// Reports from every listener of a finished lifecycle.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// One report per listener, in completion order.
    pub listeners: Vec<ListenerReport>,
}

impl ShutdownReport {
    /// Returns `true` if every listener started and closed.
    pub fn all_closed(&self) -> bool {
        self.listeners.iter().all(ListenerReport::is_closed)
    }

    /// Finds the report of the named listener.
    pub fn get(&self, name: &str) -> Option<&ListenerReport> {
        self.listeners.iter().find(|r| r.name == name)
    }
}
