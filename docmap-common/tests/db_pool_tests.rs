//! Tests for database creation and recovery after external deletion

use docmap_common::db::ManagedPool;
use tempfile::TempDir;

const SCHEMA: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS notes (
        id TEXT PRIMARY KEY,
        body TEXT NOT NULL
    )
    "#];

async fn count_notes(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notes")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_open_creates_file_and_parent_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("deeper").join("notes.db");

    let managed = ManagedPool::open(&db_path, SCHEMA).await.unwrap();

    assert!(db_path.exists(), "Database file was not created");
    let pool = managed.for_write().await.unwrap();
    assert_eq!(count_notes(&pool).await, 0);
}

#[tokio::test]
async fn test_reopen_existing_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("notes.db");

    let first = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    let pool = first.for_write().await.unwrap();
    sqlx::query("INSERT INTO notes (id, body) VALUES ('a', 'kept')")
        .execute(&pool)
        .await
        .unwrap();
    first.close().await;

    let second = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    let pool = second.for_write().await.unwrap();
    assert_eq!(count_notes(&pool).await, 1);
}

#[tokio::test]
async fn test_write_after_external_delete_recreates_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("notes.db");

    let managed = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    std::fs::remove_file(&db_path).unwrap();
    assert!(!db_path.exists());

    let pool = managed.for_write().await.unwrap();
    sqlx::query("INSERT INTO notes (id, body) VALUES ('b', 'fresh')")
        .execute(&pool)
        .await
        .unwrap();

    assert!(db_path.exists(), "Database file was not recreated");
    assert_eq!(count_notes(&pool).await, 1);
}

#[tokio::test]
async fn test_read_after_external_delete_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("notes.db");

    let managed = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    std::fs::remove_file(&db_path).unwrap();

    let pool = managed.for_read().await.unwrap();
    assert!(pool.is_none());
    assert!(!db_path.exists(), "Reads must not recreate the file");
}

#[tokio::test]
async fn test_dropped_table_recovered_on_next_write() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("notes.db");

    let managed = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    let pool = managed.for_write().await.unwrap();
    sqlx::query("DROP TABLE notes").execute(&pool).await.unwrap();

    let pool = managed.for_write().await.unwrap();
    assert_eq!(count_notes(&pool).await, 0);
}

#[tokio::test]
async fn test_write_after_file_replaced_uses_new_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("notes.db");

    let managed = ManagedPool::open(&db_path, SCHEMA).await.unwrap();
    let pool = managed.for_write().await.unwrap();
    sqlx::query("INSERT INTO notes (id, body) VALUES ('a', 'old')")
        .execute(&pool)
        .await
        .unwrap();
    drop(pool);

    // Rebuild deletes the file and another process recreates it at once
    std::fs::remove_file(&db_path).unwrap();
    let rebuilt = ManagedPool::open(&db_path, SCHEMA).await.unwrap();

    let pool = managed.for_write().await.unwrap();
    sqlx::query("INSERT INTO notes (id, body) VALUES ('b', 'new')")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(count_notes(&pool).await, 1);

    let other = rebuilt.for_read().await.unwrap().unwrap();
    let body: String = sqlx::query_scalar("SELECT body FROM notes WHERE id = 'b'")
        .fetch_one(&other)
        .await
        .unwrap();
    assert_eq!(body, "new");
}
