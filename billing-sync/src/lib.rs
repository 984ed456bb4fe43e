//! Synchronization layer between the billing repositories and the
//! presentation layer
//!
//! Gives consumers a consistent, tenant-scoped, always-current view of
//! claims or denials while hiding whether currency comes from push delivery
//! or manual refresh:
//! - `LiveSource`: push subscription, every remote change redelivers the
//!   full collection
//! - `PolledSource`: one-shot fetch on attach plus explicit `refresh()`
//! - Both expose the same `{records, loading, error}` snapshot and detach
//!   their resources exactly once; nothing is applied after teardown

pub mod live;
pub mod polled;
pub mod source;
pub mod state;

pub use live::*;
pub use polled::*;
pub use source::*;
pub use state::*;
