//! Document store seam for the clinic billing engine
//!
//! Provides the tenant-scoped document database abstraction consumed by the
//! repository layer:
//! - Value-typed collection and document paths (`tenants/{tenant}/claims/{id}`)
//! - A closed, tagged filter specification validated at the store boundary
//! - The `DocumentStore` trait: list / get / create / update / delete plus
//!   push subscriptions with explicit detach semantics
//! - An in-memory reference backend for tests and local development

pub mod error;
pub mod filter;
pub mod memory;
pub mod path;
pub mod store;

pub use error::*;
pub use filter::*;
pub use memory::*;
pub use path::*;
pub use store::*;
