use crate::source::CollectionSource;
use crate::state::{SharedState, SyncSnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

/// On-demand strategy: fetch once on attach, then only when the caller asks.
///
/// `refresh()` calls are not queued or de-duplicated; two racing refreshes
/// resolve in whatever order the backend answers and the later one wins.
/// A refresh racing with `detach()` is discarded by the liveness check
/// before it can touch torn-down state.
pub struct PolledSource<S: CollectionSource> {
    source: S,
    shared: Arc<SharedState<S::Record>>,
}

impl<S: CollectionSource> PolledSource<S> {
    /// Attach and perform the initial fetch
    pub async fn attach(source: S) -> Self {
        let handle = Self {
            shared: SharedState::new(),
            source,
        };
        handle.refresh().await;
        handle
    }

    /// Re-fetch the collection. On failure the error is recorded and the
    /// previous records stay in place.
    pub async fn refresh(&self) {
        self.shared.begin_loading();
        match self.source.fetch().await {
            Ok(records) => self.shared.apply_records(records),
            Err(err) => {
                warn!(error = %err, "fetch failed, keeping stale records");
                self.shared.apply_error(&err.to_string());
            }
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot<S::Record> {
        self.shared.snapshot()
    }

    /// Tear the view down; any in-flight refresh result is discarded
    pub fn detach(&self) {
        debug!("polled source detached");
        self.shared.kill();
    }
}

impl<S: CollectionSource> Drop for PolledSource<S> {
    fn drop(&mut self) {
        self.shared.kill();
    }
}
