//! Taxonomy persistence
//!
//! Categories, tags, the cluster → category mapping and article-tag
//! assignments, stored as plain rows keyed by primary id and written with
//! insert-or-update semantics.

pub mod models;
pub mod schema;
pub mod store;

pub use models::*;
pub use store::TaxonomyStore;
