//! # docmap store
//!
//! Durable side of the document map pipeline:
//! - Name normalization, synonym canonicalization and stable cluster ids
//! - Processing state ledger (what has already been processed)
//! - Taxonomy persistence (categories, tags, cluster mapping, article tags)
//!
//! Both stores recover transparently when their SQLite file is deleted by an
//! external rebuild: the next write recreates the file and schema.

pub mod normalize;
pub mod state;
pub mod taxonomy;

pub use docmap_common::{Error, Result};
pub use normalize::{
    canonical_slug, canonicalize_normalized_name, normalize_name, stable_cluster_id, SynonymTable,
};
pub use state::{StateEntry, StateStore, LAST_PROCESSED_COMMIT};
pub use taxonomy::{ArticleTagAssignment, ClusterCategoryMapping, Tag, TaxonomyCategory, TaxonomyStore};
