use crate::source::CollectionSource;
use crate::state::{SharedState, SyncSnapshot};
use document_store::Subscription;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Live strategy: a push subscription redelivers the full collection on
/// every remote change; the last delivery wins as the new snapshot.
///
/// Detaching drops the subscription exactly once and kills the shared
/// liveness flag, so a delivery already in flight on the channel cannot be
/// applied afterwards.
pub struct LiveSource<S: CollectionSource> {
    source: S,
    shared: Arc<SharedState<S::Record>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<S: CollectionSource> LiveSource<S> {
    /// Attach the push subscription. The backend delivers the current
    /// collection immediately, so `loading` clears on a successful attach.
    pub async fn attach(source: S) -> Self {
        let shared = SharedState::new();

        let deliveries = Arc::clone(&shared);
        let on_change = Arc::new(move |records: Vec<S::Record>| {
            deliveries.apply_records(records);
        });
        let failures = Arc::clone(&shared);
        let on_error = Arc::new(move |err: billing_service::BillingError| {
            warn!(error = %err, "push channel error, keeping stale records");
            failures.apply_error(&err.to_string());
        });

        let subscription = match source.subscribe(on_change, on_error).await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!(error = %err, "subscribe failed");
                shared.apply_error(&err.to_string());
                None
            }
        };

        Self {
            source,
            shared,
            subscription: Mutex::new(subscription),
        }
    }

    /// One-shot re-fetch, useful after a channel error while the
    /// subscription recovers
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

    /// Detach the subscription exactly once and stop applying deliveries
    pub fn detach(&self) {
        self.shared.kill();
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = subscription {
            debug!("live source detached");
            subscription.detach();
        }
    }
}

impl<S: CollectionSource> Drop for LiveSource<S> {
    fn drop(&mut self) {
        self.detach();
    }
}
