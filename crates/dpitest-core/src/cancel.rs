//! Cooperative cancellation token
//!
//! Replaces a global stop flag with an explicit token passed into the
//! orchestrator and probe engine. The flag is monotonic (false to true only),
//! so relaxed atomic reads from any thread are sufficient.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, cheap to clone across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// New token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_clear() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn test_request_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.request();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_request_idempotent() {
        let token = CancelToken::new();
        token.request();
        token.request();
        assert!(token.is_cancelled());
    }
}
