use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The view handed to the presentation layer on every read
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot<T> {
    pub records: Vec<T>,
    /// True from attach/fetch start until the first delivery; live
    /// redeliveries never flip it back
    pub loading: bool,
    /// Last failure message; previous records stay in place through an error
    pub error: Option<String>,
}

impl<T> Default for SyncSnapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// State shared between a source handle and its delivery callbacks.
///
/// The liveness flag is the cooperative cancellation point of the layer:
/// callbacks and in-flight fetches check it before applying anything, so a
/// delivery racing with teardown is discarded instead of writing to a view
/// nobody owns anymore.
pub(crate) struct SharedState<T> {
    snapshot: Mutex<SyncSnapshot<T>>,
    alive: AtomicBool,
}

impl<T: Clone> SharedState<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(SyncSnapshot::default()),
            alive: AtomicBool::new(true),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SyncSnapshot<T>> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn snapshot(&self) -> SyncSnapshot<T> {
        self.lock().clone()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub(crate) fn begin_loading(&self) {
        if !self.is_alive() {
            return;
        }
        self.lock().loading = true;
    }

    pub(crate) fn apply_records(&self, records: Vec<T>) {
        if !self.is_alive() {
            return;
        }
        let mut snapshot = self.lock();
        snapshot.records = records;
        snapshot.loading = false;
        snapshot.error = None;
    }

    pub(crate) fn apply_error(&self, message: &str) {
        if !self.is_alive() {
            return;
        }
        let mut snapshot = self.lock();
        snapshot.loading = false;
        snapshot.error = Some(message.to_string());
    }
}
