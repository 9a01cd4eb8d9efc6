//! Taxonomy records

use crate::normalize::canonical_slug;
use docmap_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Node in the category hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaxonomyCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Not checked against existing categories
    pub parent_id: Option<String>,
    /// Depth in the hierarchy, 0 for roots
    pub level: i64,
}

impl TaxonomyCategory {
    /// Root category with an empty description
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parent_id: None,
            level: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Place under `parent_id` at depth `level`
    pub fn with_parent(mut self, parent_id: impl Into<String>, level: i64) -> Self {
        self.parent_id = Some(parent_id.into());
        self.level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require("category", "id", &self.id)?;
        require("category", "name", &self.name)?;
        if self.level < 0 {
            return Err(Error::InvalidInput(format!(
                "category '{}' has negative level {}",
                self.id, self.level
            )));
        }
        Ok(())
    }
}

/// Label attached to articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    /// Derived from `name`; recomputed by the store on every upsert
    pub normalized_name: String,
    pub description: String,
    pub category_id: Option<String>,
}

impl Tag {
    /// Tag with its normalized name derived from the built-in synonym table
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            normalized_name: canonical_slug(&name),
            name,
            description: String::new(),
            category_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require("tag", "id", &self.id)?;
        require("tag", "name", &self.name)
    }
}

/// Active category assignment for one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClusterCategoryMapping {
    pub cluster_id: String,
    pub category_id: String,
    pub subcategory_id: Option<String>,
}

/// Tag applied to an article with a confidence in `[0.0, 1.0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleTagAssignment {
    pub article_id: String,
    pub tag_id: String,
    pub confidence: f64,
}

impl ArticleTagAssignment {
    pub fn new(article_id: impl Into<String>, tag_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            article_id: article_id.into(),
            tag_id: tag_id.into(),
            confidence,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("article tag", "article_id", &self.article_id)?;
        require("article tag", "tag_id", &self.tag_id)?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidInput(format!(
                "confidence for ({}, {}) must be within [0.0, 1.0], got {}",
                self.article_id, self.tag_id, self.confidence
            )));
        }
        Ok(())
    }
}

pub(crate) fn require(entity: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} {} must not be empty", entity, field)));
    }
    Ok(())
}
