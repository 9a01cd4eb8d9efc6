//! Integration tests for taxonomy persistence

use docmap_store::{
    stable_cluster_id, ArticleTagAssignment, Error, SynonymTable, Tag, TaxonomyCategory,
    TaxonomyStore,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_store(temp_dir: &TempDir) -> TaxonomyStore {
    let store = TaxonomyStore::open(temp_dir.path().join("taxonomy.db")).await.unwrap();
    store.initialize().await.unwrap();
    store
}

#[tokio::test]
async fn test_initialize_is_repeatable() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store.initialize().await.unwrap();
    store.initialize().await.unwrap();
    assert!(store.path().exists());
    assert!(store.list_tags().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_round_trip_categories_tags_mapping_assignments() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store
        .upsert_categories(&[
            TaxonomyCategory::new("cat-ai", "Artificial Intelligence").with_description("AI topics"),
            TaxonomyCategory::new("cat-ops", "Operations"),
        ])
        .await
        .unwrap();

    // Inserted out of order on purpose
    store
        .upsert_tags(&[
            Tag::new("tag-k8s", "K8s").in_category("cat-ops"),
            Tag::new("tag-llm", "Large Language Models").in_category("cat-ai"),
        ])
        .await
        .unwrap();

    let tags = store.list_tags().await.unwrap();
    let ids: Vec<&str> = tags.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["tag-k8s", "tag-llm"]);
    assert_eq!(tags[0].normalized_name, "kubernetes");
    assert_eq!(tags[1].normalized_name, "large-language-models");
    assert_eq!(tags[1].category_id.as_deref(), Some("cat-ai"));

    let cluster_id = stable_cluster_id(&["doc-3", "doc-1", "doc-2"], "kmeans");
    store
        .map_cluster_to_category(&cluster_id, "cat-ai", Some("tag-llm"))
        .await
        .unwrap();
    let map = store.get_cluster_category_map().await.unwrap();
    assert_eq!(
        map.get(&cluster_id),
        Some(&("cat-ai".to_string(), Some("tag-llm".to_string())))
    );

    store
        .upsert_article_tag_assignments(&[ArticleTagAssignment::new("doc-1", "tag-llm", 0.87)])
        .await
        .unwrap();
    let assigned = store.get_article_tags("doc-1").await.unwrap();
    assert_eq!(assigned, vec![ArticleTagAssignment::new("doc-1", "tag-llm", 0.87)]);
}

#[tokio::test]
async fn test_upserts_are_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    let categories = vec![
        TaxonomyCategory::new("root", "Root"),
        TaxonomyCategory::new("child", "Child").with_parent("root", 1),
    ];
    let tags = vec![Tag::new("t1", "Rust"), Tag::new("t2", "CI/CD")];

    for _ in 0..2 {
        store.upsert_categories(&categories).await.unwrap();
        store.upsert_tags(&tags).await.unwrap();
    }

    assert_eq!(store.list_categories().await.unwrap(), categories);
    assert_eq!(store.list_tags().await.unwrap(), tags);
}

#[tokio::test]
async fn test_upsert_replaces_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store.upsert_tags(&[Tag::new("t1", "ML")]).await.unwrap();
    store
        .upsert_tags(&[Tag::new("t1", "Deep Learning").with_description("renamed")])
        .await
        .unwrap();

    let tag = store.get_tag("t1").await.unwrap().unwrap();
    assert_eq!(tag.name, "Deep Learning");
    assert_eq!(tag.normalized_name, "deep-learning");
    assert_eq!(tag.description, "renamed");
    assert_eq!(store.list_tags().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_derives_normalized_name() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    let mut tag = Tag::new("t1", "LLMs");
    tag.normalized_name = "something-else".to_string();
    store.upsert_tags(&[tag]).await.unwrap();

    let stored = store.get_tag("t1").await.unwrap().unwrap();
    assert_eq!(stored.normalized_name, "large-language-models");

    let found = store.find_tags_by_normalized_name("LLM").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "t1");
}

#[tokio::test]
async fn test_injected_synonym_table() {
    let temp_dir = TempDir::new().unwrap();
    let synonyms = Arc::new(SynonymTable::from_pairs([("Rust Lang", "rust")]));
    let store = TaxonomyStore::with_synonyms(temp_dir.path().join("taxonomy.db"), synonyms)
        .await
        .unwrap();

    store
        .upsert_tags(&[Tag::new("t1", "Rust-Lang"), Tag::new("t2", "LLM")])
        .await
        .unwrap();

    let tags = store.list_tags().await.unwrap();
    assert_eq!(tags[0].normalized_name, "rust");
    // Built-in synonyms do not apply to a custom table
    assert_eq!(tags[1].normalized_name, "llm");
}

#[tokio::test]
async fn test_malformed_record_rejected_without_partial_write() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    let err = store
        .upsert_tags(&[Tag::new("good", "Good Tag"), Tag::new("", "Missing Id")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(store.list_tags().await.unwrap().is_empty());

    let err = store
        .upsert_categories(&[TaxonomyCategory::new("c1", "Fine"), TaxonomyCategory::new("c2", " ")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(store.list_categories().await.unwrap().is_empty());

    let err = store
        .upsert_tags(&[Tag::new("t9", "!!!")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = store
        .upsert_article_tag_assignments(&[
            ArticleTagAssignment::new("a1", "t1", 0.5),
            ArticleTagAssignment::new("a1", "t2", 1.5),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(store.get_article_tags("a1").await.unwrap().is_empty());

    let err = store.map_cluster_to_category("", "cat", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_remap_cluster_replaces_previous() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store.map_cluster_to_category("cluster-1", "cat-a", Some("sub-a")).await.unwrap();
    store.map_cluster_to_category("cluster-1", "cat-b", None).await.unwrap();
    store.map_cluster_to_category("cluster-2", "cat-a", None).await.unwrap();

    let map = store.get_cluster_category_map().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["cluster-1"], ("cat-b".to_string(), None));
    assert_eq!(map["cluster-2"], ("cat-a".to_string(), None));
}

#[tokio::test]
async fn test_assignment_confidence_last_write_wins() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store
        .upsert_article_tag_assignments(&[
            ArticleTagAssignment::new("a1", "t1", 0.4),
            ArticleTagAssignment::new("a1", "t2", 0.9),
            ArticleTagAssignment::new("a2", "t1", 0.7),
        ])
        .await
        .unwrap();
    store
        .upsert_article_tag_assignments(&[ArticleTagAssignment::new("a1", "t1", 0.95)])
        .await
        .unwrap();

    let a1 = store.get_article_tags("a1").await.unwrap();
    assert_eq!(
        a1,
        vec![
            ArticleTagAssignment::new("a1", "t1", 0.95),
            ArticleTagAssignment::new("a1", "t2", 0.9),
        ]
    );

    let t1 = store.get_tag_articles("t1").await.unwrap();
    let articles: Vec<&str> = t1.iter().map(|a| a.article_id.as_str()).collect();
    assert_eq!(articles, vec!["a1", "a2"]);
}

#[tokio::test]
async fn test_categories_ordered_by_level_then_id() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store
        .upsert_categories(&[
            TaxonomyCategory::new("b-child", "B Child").with_parent("b", 1),
            TaxonomyCategory::new("b", "B"),
            TaxonomyCategory::new("a", "A"),
        ])
        .await
        .unwrap();

    let ids: Vec<String> = store
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "b-child"]);

    let child = store.get_category("b-child").await.unwrap().unwrap();
    assert_eq!(child.parent_id.as_deref(), Some("b"));
    assert_eq!(child.level, 1);
    assert!(store.get_category("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_dangling_references_are_allowed() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;

    store
        .upsert_categories(&[TaxonomyCategory::new("orphan", "Orphan").with_parent("nowhere", 1)])
        .await
        .unwrap();
    store
        .upsert_tags(&[Tag::new("t1", "Loose").in_category("no-such-category")])
        .await
        .unwrap();

    assert_eq!(store.list_categories().await.unwrap().len(), 1);
    assert_eq!(store.list_tags().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_taxonomy_recovers_after_external_delete() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;
    let db_path = store.path().to_path_buf();

    store.upsert_tags(&[Tag::new("t1", "Rust")]).await.unwrap();
    std::fs::remove_file(&db_path).unwrap();

    assert!(store.list_tags().await.unwrap().is_empty());
    assert!(store.get_cluster_category_map().await.unwrap().is_empty());

    store.upsert_tags(&[Tag::new("t2", "Go")]).await.unwrap();
    assert!(db_path.exists());

    let tags = store.list_tags().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, "t2");
}
