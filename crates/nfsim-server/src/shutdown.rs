//! Process-wide cancellation and connection draining.
//!
//! [`ShutdownSignal`] is the shared cancellable context: listeners stop
//! accepting when it fires and suspended handlers abort. [`ConnectionTracker`]
//! counts open connections and detached work so a listener can wait for them
//! before reporting that it has closed.
//!
//! # Example
//!
//! ```rust,ignore
//! use nfsim_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::with_os_signals();
//! tokio::select! {
//!     () = shutdown.recv() => tracing::info!("stopping"),
//!     () = tokio::time::sleep(Duration::from_secs(60)) => {}
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};

/// A signal that can be used to trigger and await graceful shutdown.
///
/// Clones share state: triggering any clone fires all of them.
///
/// ```rust
/// use nfsim_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let shutdown_clone = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(shutdown_clone.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers the signal. Calling this more than once is a no-op.
    pub fn trigger(&self) {
        let fired = self.sender.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });
        if fired {
            tracing::debug!("shutdown signal triggered");
        }
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Waits until shutdown is triggered. Completes immediately if it
    /// already was.
    pub async fn recv(&self) {
        self.cancelled().await;
    }

    /// Returns an owned future that completes on shutdown.
    ///
    /// Unlike [`recv`](Self::recv) the future does not borrow the signal, so
    /// it can be moved into spawned tasks or handed to
    /// `NotificationGate::wait`.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            // An error means every sender is gone and nothing can trigger
            // any more; treat that as shutdown too.
            let _ = receiver.wait_for(|triggered| *triggered).await;
        }
    }

    /// Creates a signal that fires on SIGTERM or SIGINT (Ctrl+C).
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            match wait_for_os_signal().await {
                Ok(()) => signal_clone.trigger(),
                Err(e) => tracing::error!(error = %e, "failed to install OS signal handlers"),
            }
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_os_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }

    Ok(())
}

/// Counts live connections and detached work.
///
/// ```rust
/// use nfsim_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new tracker with nothing active.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Acquires a token, held for as long as the tracked work runs.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of outstanding tokens.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    pub async fn wait_until_idle(&self) {
        loop {
            // Register before checking so a drop in between is not missed.
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of tracked work. Dropping it releases the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
