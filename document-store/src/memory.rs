use crate::error::{StoreError, StoreResult};
use crate::filter::FilterSpec;
use crate::path::{CollectionRef, DocumentRef};
use crate::store::{ChangeHandler, DocumentStore, ErrorHandler, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

struct SubscriberEntry {
    path: String,
    filter: FilterSpec,
    on_change: ChangeHandler,
    on_error: ErrorHandler,
}

/// In-memory reference backend.
///
/// Mutations re-evaluate every subscriber's filter against the collection and
/// deliver the full matching snapshot, mirroring the push-delivery contract of
/// the managed store. Failure injection lets tests exercise the transient
/// `Unavailable` path without a network.
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<Uuid, Value>>,
    subscribers: Arc<DashMap<Uuid, SubscriberEntry>>,
    read_failures: AtomicUsize,
    create_failures: AtomicUsize,
    update_failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            subscribers: Arc::new(DashMap::new()),
            read_failures: AtomicUsize::new(0),
            create_failures: AtomicUsize::new(0),
            update_failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` reads (list/get/subscribe) fail as unavailable
    pub fn inject_read_failures(&self, count: usize) {
        self.read_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` document creations fail as unavailable
    pub fn inject_create_failures(&self, count: usize) {
        self.create_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` updates/deletes fail as unavailable
    pub fn inject_update_failures(&self, count: usize) {
        self.update_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn snapshot(&self, path: &str) -> Vec<Value> {
        self.collections
            .get(path)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Redeliver the collection to every attached subscriber. Handlers are
    /// cloned out first so callbacks never run under a map lock.
    fn notify(&self, collection: &CollectionRef) {
        let path = collection.to_string();
        let docs = self.snapshot(&path);

        let targets: Vec<(FilterSpec, ChangeHandler, ErrorHandler)> = self
            .subscribers
            .iter()
            .filter(|entry| entry.path == path)
            .map(|entry| {
                (
                    entry.filter.clone(),
                    entry.on_change.clone(),
                    entry.on_error.clone(),
                )
            })
            .collect();

        for (filter, on_change, _on_error) in targets {
            on_change(filter.apply(docs.clone()));
        }
    }

    /// Simulate a dropped push channel: every subscriber attached to the
    /// collection receives an `Unavailable` error
    pub fn inject_channel_failure(&self, collection: &CollectionRef) {
        let path = collection.to_string();
        let targets: Vec<ErrorHandler> = self
            .subscribers
            .iter()
            .filter(|entry| entry.path == path)
            .map(|entry| entry.on_error.clone())
            .collect();
        for on_error in targets {
            on_error(StoreError::Unavailable("push channel dropped".to_string()));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(
        &self,
        collection: CollectionRef,
        filter: &FilterSpec,
    ) -> StoreResult<Vec<Value>> {
        if Self::take_failure(&self.read_failures) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        filter.validate()?;
        debug!(collection = %collection, "listing documents");
        Ok(filter.apply(self.snapshot(&collection.to_string())))
    }

    async fn get_document(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        if Self::take_failure(&self.read_failures) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        let path = doc.collection.to_string();
        Ok(self
            .collections
            .get(&path)
            .and_then(|docs| docs.get(&doc.document_id).cloned()))
    }

    async fn create_document(&self, collection: CollectionRef, data: Value) -> StoreResult<Uuid> {
        if Self::take_failure(&self.create_failures) {
            return Err(StoreError::Unavailable(
                "injected create failure".to_string(),
            ));
        }
        let mut data = data;
        let fields = data
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidDocument("expected a JSON object".to_string()))?;

        let id = Uuid::new_v4();
        fields.insert("id".to_string(), Value::String(id.to_string()));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, data);

        debug!(doc = %collection.doc(id), "created document");
        self.notify(&collection);
        Ok(id)
    }

    async fn update_document(&self, doc: &DocumentRef, patch: Value) -> StoreResult<()> {
        if Self::take_failure(&self.update_failures) {
            return Err(StoreError::Unavailable(
                "injected update failure".to_string(),
            ));
        }
        let patch = patch
            .as_object()
            .cloned()
            .ok_or_else(|| StoreError::InvalidDocument("patch must be a JSON object".to_string()))?;

        let path = doc.collection.to_string();
        {
            let mut docs = self
                .collections
                .get_mut(&path)
                .ok_or(StoreError::MissingDocument)?;
            let existing = docs
                .get_mut(&doc.document_id)
                .ok_or(StoreError::MissingDocument)?;
            let fields = existing.as_object_mut().ok_or_else(|| {
                StoreError::InvalidDocument("stored document is not an object".to_string())
            })?;
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }

        debug!(doc = %doc, "patched document");
        self.notify(&doc.collection);
        Ok(())
    }

    async fn delete_document(&self, doc: &DocumentRef) -> StoreResult<()> {
        if Self::take_failure(&self.update_failures) {
            return Err(StoreError::Unavailable(
                "injected update failure".to_string(),
            ));
        }
        let path = doc.collection.to_string();
        let removed = self
            .collections
            .get_mut(&path)
            .and_then(|mut docs| docs.remove(&doc.document_id));
        if removed.is_none() {
            return Err(StoreError::MissingDocument);
        }

        debug!(doc = %doc, "deleted document");
        self.notify(&doc.collection);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: CollectionRef,
        filter: FilterSpec,
        on_change: ChangeHandler,
        on_error: ErrorHandler,
    ) -> StoreResult<Subscription> {
        if Self::take_failure(&self.read_failures) {
            return Err(StoreError::Unavailable(
                "injected subscribe failure".to_string(),
            ));
        }
        filter.validate()?;

        let path = collection.to_string();
        // Initial delivery happens before the subscriber is registered so a
        // concurrent mutation cannot double-deliver the attach snapshot.
        on_change(filter.apply(self.snapshot(&path)));

        let subscription_id = Uuid::new_v4();
        self.subscribers.insert(
            subscription_id,
            SubscriberEntry {
                path,
                filter,
                on_change,
                on_error,
            },
        );

        let subscribers = Arc::clone(&self.subscribers);
        debug!(collection = %collection, subscription = %subscription_id, "subscription attached");
        Ok(Subscription::new(move || {
            subscribers.remove(&subscription_id);
        }))
    }
}
