//! Ctrl+C state shared between the signal handler and running commands
//!
//! The handler runs on its own thread. It raises a flag and wakes any task
//! parked in [`interrupted`], which then shuts its run down through the
//! normal cancellation path.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use tokio::sync::Notify;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static WAKE: Lazy<Notify> = Lazy::new(Notify::new);

#[inline]
pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
    WAKE.notify_waiters();
}

#[inline]
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Resolves once Ctrl+C has been pressed (immediately if it already was)
pub async fn interrupted() {
    let notified = WAKE.notified();
    tokio::pin!(notified);
    // Register before checking the flag so a concurrent set is not missed
    notified.as_mut().enable();
    if was_interrupted() {
        return;
    }
    notified.await;
}
