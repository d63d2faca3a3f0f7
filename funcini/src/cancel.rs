use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// cooperative cancellation signal. clones share the same flag, so one side
/// can hand a clone to a signal handler while the export polls the other.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// the raw flag, for APIs that set an `AtomicBool` themselves
    pub fn shared(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// predicate form accepted by the exporter
    pub fn as_predicate(&self) -> impl Fn() -> bool + '_ {
        move || self.is_cancelled()
    }
}
