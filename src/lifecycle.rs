//! Process-wide setup and teardown.
//!
//! Call [`ensure_initialized`] once at startup before any [`FeedParser`] is
//! used and [`shutdown`] once at exit. Neither call is meant to race with
//! the other; do them from the main thread, never per request.
//!
//! [`FeedParser`]: crate::FeedParser

use std::sync::atomic::{AtomicU8, Ordering};

const UNINITIALIZED: u8 = 0;
const INITIALIZED: u8 = 1;
const SHUT_DOWN: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNINITIALIZED);

/// Marks the library ready for use. Repeated calls are no-ops.
pub fn ensure_initialized() {
    let previous = STATE.swap(INITIALIZED, Ordering::AcqRel);
    match previous {
        INITIALIZED => {}
        SHUT_DOWN => tracing::warn!("Reinitializing feedpipe after shutdown"),
        _ => tracing::debug!("feedpipe initialized"),
    }
}

/// Ends the process-wide lifecycle. Calling it without a prior
/// [`ensure_initialized`] only logs.
pub fn shutdown() {
    let previous = STATE.swap(SHUT_DOWN, Ordering::AcqRel);
    if previous != INITIALIZED {
        tracing::warn!("feedpipe shutdown without matching initialization");
    } else {
        tracing::debug!("feedpipe shut down");
    }
}

pub fn is_initialized() -> bool {
    STATE.load(Ordering::Acquire) == INITIALIZED
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the state is process-wide and tests run in parallel
    #[test]
    fn test_lifecycle_transitions() {
        ensure_initialized();
        ensure_initialized();
        assert!(is_initialized());

        shutdown();
        assert!(!is_initialized());

        ensure_initialized();
        assert!(is_initialized());
    }
}
