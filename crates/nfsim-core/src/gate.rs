//! Single-slot notification gate.
//!
//! The gate joins a flow that waits for a callback with the flow that
//! receives it. It holds at most one pending token. [`NotificationGate::signal`]
//! never blocks: a token deposited while another is still pending replaces it
//! and the displaced one is handed back to the caller.
//!
//! # Example
//!
//! ```
//! use nfsim_core::NotificationGate;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let gate = Arc::new(NotificationGate::new());
//! let waiter = {
//!     let gate = Arc::clone(&gate);
//!     tokio::spawn(async move { gate.wait(std::future::pending()).await })
//! };
//!
//! gate.signal("token");
//! assert_eq!(waiter.await.unwrap().unwrap(), "token");
//! # });
//! ```

use crate::error::{HandshakeError, HandshakeResult};
use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::Notify;

/// A capacity-one handoff between a signalling side and a waiting side.
#[derive(Debug)]
pub struct NotificationGate<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Default for NotificationGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NotificationGate<T> {
    /// Creates an empty gate.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Deposits a token and wakes one waiter.
    ///
    /// Returns the token that was still pending, if any.
    pub fn signal(&self, token: T) -> Option<T> {
        let displaced = self.slot.lock().replace(token);
        self.notify.notify_one();
        displaced
    }

    /// Waits for a token or for `cancel` to complete, whichever comes first.
    ///
    /// A cancelled wait leaves any pending or future token in place.
    pub async fn wait<F>(&self, cancel: F) -> HandshakeResult<T>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let pending = self.slot.lock().take();
            if let Some(token) = pending {
                return Ok(token);
            }

            tokio::select! {
                biased;
                () = &mut cancel => {
                    return Err(HandshakeError::cancelled("wait for callback was cancelled"));
                }
                () = &mut notified => {}
            }
        }
    }

    /// Returns `true` if a token is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}
