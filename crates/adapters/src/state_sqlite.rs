//! SQLite state store implementation

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use trend_digest_domain::{MemoryContent, MemoryRecord, StateError, StateStore, unix_millis};
use uuid::Uuid;

/// SQLite-backed state store
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Create a new SQLite state store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StateError> {
        const MIGRATIONS: &[&str] = &[
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                room_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (room_id, agent_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_memories_room
            ON memories(room_id, created_at)
            "#,
        ];

        for migration in MIGRATIONS {
            sqlx::query(*migration)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }

        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> StateError {
    StateError::Database(e.to_string())
}

fn parse_uuid(value: &str) -> Result<Uuid, StateError> {
    Uuid::parse_str(value).map_err(|e| StateError::Serialization(e.to_string()))
}

fn now_ms() -> i64 {
    unix_millis(OffsetDateTime::now_utc())
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn set_cache(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        let encoded =
            serde_json::to_string(value).map_err(|e| StateError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO cache (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&encoded)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(|(value,)| {
            serde_json::from_str(&value).map_err(|e| StateError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn ensure_room(&self, room_id: Uuid) -> Result<(), StateError> {
        sqlx::query("INSERT INTO rooms (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
            .bind(room_id.to_string())
            .bind(now_ms())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }

    async fn ensure_participant(&self, room_id: Uuid, agent_id: Uuid) -> Result<(), StateError> {
        sqlx::query(
            r#"
            INSERT INTO participants (room_id, agent_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(room_id, agent_id) DO NOTHING
            "#,
        )
        .bind(room_id.to_string())
        .bind(agent_id.to_string())
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn create_memory(&self, record: &MemoryRecord) -> Result<(), StateError> {
        let content = serde_json::to_string(&record.content)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        let embedding = serde_json::to_string(&record.embedding)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO memories (id, agent_id, room_id, content, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.agent_id.to_string())
        .bind(record.room_id.to_string())
        .bind(&content)
        .bind(&embedding)
        .bind(record.created_at_ms)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, StateError> {
        let row: Option<(String, String, String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT id, agent_id, room_id, content, embedding, created_at
            FROM memories
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some((id, agent_id, room_id, content, embedding, created_at_ms)) => {
                let content: MemoryContent = serde_json::from_str(&content)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;
                let embedding: Vec<f32> = serde_json::from_str(&embedding)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;

                Ok(Some(MemoryRecord {
                    id: parse_uuid(&id)?,
                    agent_id: parse_uuid(&agent_id)?,
                    room_id: parse_uuid(&room_id)?,
                    content,
                    embedding,
                    created_at_ms,
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(id: Uuid, text: &str) -> MemoryRecord {
        MemoryRecord {
            id,
            agent_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            content: MemoryContent {
                text: text.to_string(),
                url: "https://x.com/digestbot/status/1".to_string(),
                source: "trend_report".to_string(),
                in_reply_to: None,
            },
            embedding: vec![0.0; 8],
            created_at_ms: 1_717_243_200_000,
        }
    }

    #[tokio::test]
    async fn test_cache_roundtrip_and_overwrite() {
        let store = SqliteStateStore::in_memory().await.unwrap();

        store
            .set_cache(
                "x/digestbot/last_post",
                &serde_json::json!({"post_id": "1", "timestamp_ms": 1}),
            )
            .await
            .unwrap();
        store
            .set_cache(
                "x/digestbot/last_post",
                &serde_json::json!({"post_id": "2", "timestamp_ms": 2}),
            )
            .await
            .unwrap();

        let value = store.get_cache("x/digestbot/last_post").await.unwrap();
        assert_eq!(
            value,
            Some(serde_json::json!({"post_id": "2", "timestamp_ms": 2}))
        );
        assert!(store.get_cache("x/posts/404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let store = SqliteStateStore::in_memory().await.unwrap();
        let record = memory(Uuid::new_v4(), "📊 digest");

        store.create_memory(&record).await.unwrap();

        let stored = store.get_memory(record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(store.get_memory(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_memory_is_idempotent() {
        let store = SqliteStateStore::in_memory().await.unwrap();
        let id = Uuid::new_v4();

        store.create_memory(&memory(id, "first")).await.unwrap();
        store.create_memory(&memory(id, "second")).await.unwrap();

        let stored = store.get_memory(id).await.unwrap().unwrap();
        assert_eq!(stored.content.text, "first");
    }

    #[tokio::test]
    async fn test_rooms_and_participants_are_idempotent() {
        let store = SqliteStateStore::in_memory().await.unwrap();
        let room = Uuid::new_v4();
        let agent = Uuid::new_v4();

        store.ensure_room(room).await.unwrap();
        store.ensure_room(room).await.unwrap();
        store.ensure_participant(room, agent).await.unwrap();
        store.ensure_participant(room, agent).await.unwrap();

        let rooms: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let participants: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rooms.0, 1);
        assert_eq!(participants.0, 1);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");

        {
            let store = SqliteStateStore::new(&path).await.unwrap();
            store
                .set_cache("x/posts/1", &serde_json::json!({"id": "1"}))
                .await
                .unwrap();
            store.pool.close().await;
        }

        let store = SqliteStateStore::new(&path).await.unwrap();
        assert_eq!(
            store.get_cache("x/posts/1").await.unwrap(),
            Some(serde_json::json!({"id": "1"}))
        );
    }
}
