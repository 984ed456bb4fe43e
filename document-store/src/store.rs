use crate::error::StoreResult;
use crate::filter::FilterSpec;
use crate::path::{CollectionRef, DocumentRef};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Delivery callback for push subscriptions; receives the full current
/// matching collection on every change
pub type ChangeHandler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Error callback for push subscriptions
pub type ErrorHandler = Arc<dyn Fn(crate::error::StoreError) + Send + Sync>;

/// Document database seam consumed by the repository layer.
///
/// All paths are tenant-scoped; the store itself knows nothing about claims
/// or denials beyond the collection kind in the path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents matching the filter. Empty result is not an error.
    async fn list_documents(
        &self,
        collection: CollectionRef,
        filter: &FilterSpec,
    ) -> StoreResult<Vec<Value>>;

    async fn get_document(&self, doc: &DocumentRef) -> StoreResult<Option<Value>>;

    /// Create a document; the store assigns the id and stamps it into the
    /// document's `id` field
    async fn create_document(&self, collection: CollectionRef, data: Value) -> StoreResult<Uuid>;

    /// Shallow-merge the patch into an existing document
    async fn update_document(&self, doc: &DocumentRef, patch: Value) -> StoreResult<()>;

    async fn delete_document(&self, doc: &DocumentRef) -> StoreResult<()>;

    /// Attach a push subscription. The current matching collection is
    /// delivered immediately, then again after every mutation of the
    /// collection. No callback fires after the returned subscription is
    /// detached.
    async fn subscribe(
        &self,
        collection: CollectionRef,
        filter: FilterSpec,
        on_change: ChangeHandler,
        on_error: ErrorHandler,
    ) -> StoreResult<Subscription>;
}

/// Detach handle for a push subscription. Detaches exactly once, either
/// explicitly or on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn detach(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
