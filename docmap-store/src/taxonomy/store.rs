//! SQLite-backed taxonomy store
//!
//! All batch writes validate every record first and then run inside a single
//! transaction, so a malformed record never leaves a partial batch behind.

use super::models::{require, ArticleTagAssignment, ClusterCategoryMapping, Tag, TaxonomyCategory};
use super::schema::TAXONOMY_SCHEMA;
use crate::normalize::SynonymTable;
use docmap_common::db::ManagedPool;
use docmap_common::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Taxonomy persistence
pub struct TaxonomyStore {
    db: ManagedPool,
    synonyms: Arc<SynonymTable>,
}

impl TaxonomyStore {
    /// Open (or create) the store with the built-in synonym table
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_synonyms(path, Arc::new(SynonymTable::builtin().clone())).await
    }

    /// Open (or create) the store with a caller-supplied synonym table
    pub async fn with_synonyms(path: impl Into<PathBuf>, synonyms: Arc<SynonymTable>) -> Result<Self> {
        let db = ManagedPool::open(path, TAXONOMY_SCHEMA).await?;
        info!(path = %db.path().display(), "Taxonomy store ready");
        Ok(Self { db, synonyms })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Create the schema if absent. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<()> {
        self.db.for_write().await?;
        Ok(())
    }

    /// Insert or replace categories by id
    pub async fn upsert_categories(&self, categories: &[TaxonomyCategory]) -> Result<usize> {
        for category in categories {
            category.validate()?;
        }

        let pool = self.db.for_write().await?;
        let mut tx = pool.begin().await?;
        for category in categories {
            sqlx::query(
                r#"
                INSERT INTO categories (id, name, description, parent_id, level, updated_at)
                VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    parent_id = excluded.parent_id,
                    level = excluded.level,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.parent_id)
            .bind(category.level)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = categories.len(), "Upserted categories");
        Ok(categories.len())
    }

    /// Insert or replace tags by id
    ///
    /// `normalized_name` is always re-derived from `name` with this store's
    /// synonym table; a caller-supplied value is ignored.
    pub async fn upsert_tags(&self, tags: &[Tag]) -> Result<usize> {
        let mut slugs = Vec::with_capacity(tags.len());
        for tag in tags {
            tag.validate()?;
            let slug = self.synonyms.canonical_slug(&tag.name);
            if slug.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "tag '{}' name {:?} has no alphanumeric characters",
                    tag.id, tag.name
                )));
            }
            slugs.push(slug);
        }

        let pool = self.db.for_write().await?;
        let mut tx = pool.begin().await?;
        for (tag, slug) in tags.iter().zip(&slugs) {
            sqlx::query(
                r#"
                INSERT INTO tags (id, name, normalized_name, description, category_id, updated_at)
                VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    normalized_name = excluded.normalized_name,
                    description = excluded.description,
                    category_id = excluded.category_id,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&tag.id)
            .bind(&tag.name)
            .bind(slug)
            .bind(&tag.description)
            .bind(&tag.category_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = tags.len(), "Upserted tags");
        Ok(tags.len())
    }

    /// All tags ordered by id ascending
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, name, normalized_name, description, category_id FROM tags ORDER BY id",
        )
        .fetch_all(&pool)
        .await?;

        Ok(tags)
    }

    pub async fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(None);
        };

        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, name, normalized_name, description, category_id FROM tags WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&pool)
        .await?;

        Ok(tag)
    }

    /// Tags whose canonical slug matches `raw` after normalization, by id
    pub async fn find_tags_by_normalized_name(&self, raw: &str) -> Result<Vec<Tag>> {
        let slug = self.synonyms.canonical_slug(raw);
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, name, normalized_name, description, category_id
            FROM tags
            WHERE normalized_name = ?
            ORDER BY id
            "#,
        )
        .bind(&slug)
        .fetch_all(&pool)
        .await?;

        Ok(tags)
    }

    /// All categories ordered by (level, id)
    pub async fn list_categories(&self) -> Result<Vec<TaxonomyCategory>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let categories = sqlx::query_as::<_, TaxonomyCategory>(
            "SELECT id, name, description, parent_id, level FROM categories ORDER BY level, id",
        )
        .fetch_all(&pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<TaxonomyCategory>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(None);
        };

        let category = sqlx::query_as::<_, TaxonomyCategory>(
            "SELECT id, name, description, parent_id, level FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&pool)
        .await?;

        Ok(category)
    }

    /// Point `cluster_id` at a category, replacing any earlier mapping
    pub async fn map_cluster_to_category(
        &self,
        cluster_id: &str,
        category_id: &str,
        subcategory_id: Option<&str>,
    ) -> Result<()> {
        require("cluster mapping", "cluster_id", cluster_id)?;
        require("cluster mapping", "category_id", category_id)?;

        let pool = self.db.for_write().await?;
        sqlx::query(
            r#"
            INSERT INTO cluster_category_map (cluster_id, category_id, subcategory_id, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(cluster_id) DO UPDATE SET
                category_id = excluded.category_id,
                subcategory_id = excluded.subcategory_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(cluster_id)
        .bind(category_id)
        .bind(subcategory_id)
        .execute(&pool)
        .await?;

        debug!(cluster_id, category_id, ?subcategory_id, "Mapped cluster to category");
        Ok(())
    }

    /// cluster_id → (category_id, subcategory_id)
    pub async fn get_cluster_category_map(&self) -> Result<HashMap<String, (String, Option<String>)>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(HashMap::new());
        };

        let rows = sqlx::query_as::<_, ClusterCategoryMapping>(
            "SELECT cluster_id, category_id, subcategory_id FROM cluster_category_map",
        )
        .fetch_all(&pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.cluster_id, (row.category_id, row.subcategory_id)))
            .collect())
    }

    /// Insert or replace assignments keyed by (article_id, tag_id)
    ///
    /// The latest confidence wins.
    pub async fn upsert_article_tag_assignments(
        &self,
        assignments: &[ArticleTagAssignment],
    ) -> Result<usize> {
        for assignment in assignments {
            assignment.validate()?;
        }

        let pool = self.db.for_write().await?;
        let mut tx = pool.begin().await?;
        for assignment in assignments {
            sqlx::query(
                r#"
                INSERT INTO article_tags (article_id, tag_id, confidence, updated_at)
                VALUES (?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(article_id, tag_id) DO UPDATE SET
                    confidence = excluded.confidence,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&assignment.article_id)
            .bind(&assignment.tag_id)
            .bind(assignment.confidence)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = assignments.len(), "Upserted article tag assignments");
        Ok(assignments.len())
    }

    /// Assignments for one article, highest confidence first, then by tag id
    pub async fn get_article_tags(&self, article_id: &str) -> Result<Vec<ArticleTagAssignment>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let assignments = sqlx::query_as::<_, ArticleTagAssignment>(
            r#"
            SELECT article_id, tag_id, confidence
            FROM article_tags
            WHERE article_id = ?
            ORDER BY confidence DESC, tag_id
            "#,
        )
        .bind(article_id)
        .fetch_all(&pool)
        .await?;

        Ok(assignments)
    }

    /// Assignments carrying `tag_id`, highest confidence first, then by article id
    pub async fn get_tag_articles(&self, tag_id: &str) -> Result<Vec<ArticleTagAssignment>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let assignments = sqlx::query_as::<_, ArticleTagAssignment>(
            r#"
            SELECT article_id, tag_id, confidence
            FROM article_tags
            WHERE tag_id = ?
            ORDER BY confidence DESC, article_id
            "#,
        )
        .bind(tag_id)
        .fetch_all(&pool)
        .await?;

        Ok(assignments)
    }
}
