//! Cooperative cancellation for in-flight calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{AbortHandle, AbortRegistration};

/// Read side of an [`AbortController`], handed to the call.
///
/// The call's future is dropped at its next poll once aborted; the signal
/// lets transport code that runs outside that future observe the abort.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Whether the owning controller has aborted.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Aborts one call.
#[derive(Debug)]
pub struct AbortController {
    handle: AbortHandle,
    signal: AbortSignal,
}

impl AbortController {
    /// A controller plus the registration that wraps the call's future in
    /// [`futures_util::future::Abortable`].
    pub fn new() -> (Self, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        let controller = Self {
            handle,
            signal: AbortSignal::default(),
        };
        (controller, registration)
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort the call. Idempotent.
    pub fn abort(&self) {
        self.signal.aborted.store(true, Ordering::Release);
        self.handle.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use futures_util::future::{Abortable, Aborted};

    use super::*;

    #[tokio::test]
    async fn test_abort_drops_future_and_flags_signal() {
        let (controller, registration) = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        let call = Abortable::new(std::future::pending::<()>(), registration);
        controller.abort();
        controller.abort();

        assert_eq!(call.await, Err(Aborted));
        assert!(signal.is_aborted());
    }
}
