//! Domain module - entities, errors and repository interfaces
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod entities;
pub mod errors;
pub mod repositories;

pub use entities::{
    EntityId, EntityKind, EntityKindDescriptor, ReconcileMode, ReconcileReport,
    ReconciliationRequest, RewriteId, RewriteRecord, SqlIdentifier,
};
pub use errors::{ReconcileError, StoreError, StoreResult};
pub use repositories::{EntityIdSource, RewriteStore};
