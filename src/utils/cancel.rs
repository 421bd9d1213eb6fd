//! Cooperative cancellation tokens.
//!
//! Long running work (imports, inspections, source probes) receives a
//! [`CancelToken`] and polls it at its suspension points: per line, per flush,
//! per buffer. A child token is cancelled when either it or any ancestor is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Result, WordlistError};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also reports cancelled whenever `self` does.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears this token's own flag. Ancestors are untouched.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|parent| parent.is_cancelled())
    }

    /// Returns [`WordlistError::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(WordlistError::cancelled());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_observes_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        assert!(child.check().is_ok());

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(child.check().unwrap_err().is_cancelled());

        parent.reset();
        assert!(!child.is_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
