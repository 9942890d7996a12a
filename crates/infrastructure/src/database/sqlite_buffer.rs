use anyhow::Result;
use sqlx::{Pool, Row, Sqlite, sqlite::SqlitePoolOptions};

/// Bounded store-and-forward queue of outbound messages
#[derive(Clone)]
pub struct SQLiteBuffer {
    pool: Pool<Sqlite>,
    max_rows: i64,
}

impl SQLiteBuffer {
    pub async fn new(connection_string: &str, max_rows: i64) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1) // SQLite is single-writer
            .connect(connection_string)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS offline_buffer (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                payload BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            max_rows: max_rows.max(1),
        })
    }

    /// Append a message. Returns how many of the oldest rows were dropped to
    /// stay within the bound.
    pub async fn enqueue(&self, topic: &str, payload: &[u8]) -> Result<u64> {
        sqlx::query("INSERT INTO offline_buffer (topic, payload, created_at) VALUES (?, ?, strftime('%s','now'))")
            .bind(topic)
            .bind(payload)
            .execute(&self.pool)
            .await?;

        let trimmed = sqlx::query(
            "DELETE FROM offline_buffer WHERE id NOT IN (
                SELECT id FROM offline_buffer ORDER BY id DESC LIMIT ?
            )",
        )
        .bind(self.max_rows)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(trimmed)
    }

    /// Oldest messages first
    pub async fn dequeue_batch(&self, limit: i64) -> Result<Vec<(i64, String, Vec<u8>)>> {
        let rows = sqlx::query("SELECT id, topic, payload FROM offline_buffer ORDER BY id ASC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            batch.push((row.try_get(0)?, row.try_get(1)?, row.try_get(2)?));
        }
        Ok(batch)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM offline_buffer WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offline_buffer")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
