//! Taxonomy table definitions
//!
//! Every statement is idempotent; the set is re-applied before each write so
//! a wiped database file comes back with its full schema.

pub const TAXONOMY_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        parent_id TEXT,
        level INTEGER NOT NULL DEFAULT 0,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        normalized_name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        category_id TEXT,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tags_normalized_name ON tags(normalized_name)",
    r#"
    CREATE TABLE IF NOT EXISTS cluster_category_map (
        cluster_id TEXT PRIMARY KEY,
        category_id TEXT NOT NULL,
        subcategory_id TEXT,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_tags (
        article_id TEXT NOT NULL,
        tag_id TEXT NOT NULL,
        confidence REAL NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (article_id, tag_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id ON article_tags(tag_id)",
];
