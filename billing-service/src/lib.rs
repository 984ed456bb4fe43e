//! Billing lifecycle engine for clinic insurance claims
//!
//! Tracks a submitted claim ("guia") from draft through payment or denial,
//! and a denial ("glosa") through its appeal window:
//! - Tenant-scoped claim and denial repositories
//! - Single-authority, table-driven lifecycle validation
//! - Automatic denial creation when a claim enters a denied status
//! - Appeal deadlines derived from per-insurer configuration
//! - Pure financial statistics over in-memory collections

pub mod claims;
pub mod config;
pub mod denials;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod reporting;

pub use claims::*;
pub use config::*;
pub use denials::*;
pub use error::*;
pub use lifecycle::*;
pub use models::*;
pub use reporting::*;
