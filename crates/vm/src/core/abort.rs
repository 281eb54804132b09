use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cooperative cancellation flag shared between a supervisor and any number of executions.
///
/// Cloning an [`AbortFlag`] shares the underlying cell. Once set the flag stays set; executions
/// observe it at their next check point and unwind with
/// [`Error::ExecutionAborted`](crate::error::Error::ExecutionAborted).
///
/// ```
/// use sleipnir_vm::core::abort::AbortFlag;
///
/// let flag = AbortFlag::new();
/// let shared = flag.clone();
/// assert!(!shared.is_aborted());
///
/// std::thread::spawn(move || flag.abort()).join().expect("thread panicked");
/// assert!(shared.is_aborted());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests every execution sharing this flag to stop.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`AbortFlag::abort`] has been called on any clone of this flag.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns true if both handles share the same underlying cell.
    pub fn ptr_eq(&self, other: &AbortFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_shared() {
        let flag = AbortFlag::new();
        let clone = flag.clone();
        assert!(flag.ptr_eq(&clone));
        assert!(!AbortFlag::new().ptr_eq(&flag));

        clone.abort();
        assert!(flag.is_aborted());

        // setting twice is harmless
        flag.abort();
        assert!(clone.is_aborted());
    }
}
