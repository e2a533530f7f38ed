//! SQLite persistence for the GTM vector index.
//!
//! Schema:
//!
//! ```text
//! index_meta(key TEXT PRIMARY KEY, value TEXT)      -- dims, model, fingerprint
//! entries(seq INTEGER PRIMARY KEY, id, source_id, start_offset,
//!         chunk_index, text, hash, embedding BLOB)
//! ```
//!
//! [`IndexStore::save`] replaces the whole content in one transaction.
//! [`IndexStore::load`] rebuilds an [`InMemoryIndex`] in `seq` order, so a
//! reloaded index answers queries exactly like the one that was saved.

use anyhow::{bail, Result};
use memchat_core::embedding::{blob_to_vec, vec_to_blob};
use memchat_core::index::{InMemoryIndex, VectorIndex};
use memchat_core::models::Chunk;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;

/// An index read back from disk with the metadata it was saved with.
pub struct StoredIndex {
    pub index: InMemoryIndex,
    pub model: String,
    pub fingerprint: String,
}

pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn save(&self, index: &dyn VectorIndex, model: &str, fingerprint: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entries").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await?;

        for (key, value) in [
            ("dims", index.dims().to_string()),
            ("model", model.to_string()),
            ("fingerprint", fingerprint.to_string()),
        ] {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        for (seq, entry) in index.entries().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO entries (seq, id, source_id, start_offset, chunk_index, text, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(seq as i64)
            .bind(&entry.id)
            .bind(&entry.chunk.source_id)
            .bind(entry.chunk.start_offset as i64)
            .bind(entry.chunk.chunk_index)
            .bind(&entry.chunk.text)
            .bind(&entry.chunk.hash)
            .bind(vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(entries = index.len(), "saved index");
        Ok(())
    }

    /// `None` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<StoredIndex>> {
        let meta = sqlx::query("SELECT key, value FROM index_meta")
            .fetch_all(&self.pool)
            .await?;

        let mut dims = None;
        let mut model = String::new();
        let mut fingerprint = String::new();
        for row in &meta {
            let key: String = row.get("key");
            let value: String = row.get("value");
            match key.as_str() {
                "dims" => dims = Some(value.parse::<usize>()?),
                "model" => model = value,
                "fingerprint" => fingerprint = value,
                _ => {}
            }
        }
        let Some(dims) = dims else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT id, source_id, start_offset, chunk_index, text, hash, embedding
            FROM entries
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut index = InMemoryIndex::new(dims);
        for row in &rows {
            let start_offset: i64 = row.get("start_offset");
            if start_offset < 0 {
                bail!("corrupt index entry: negative start_offset");
            }
            let blob: Vec<u8> = row.get("embedding");
            let chunk = Chunk {
                text: row.get("text"),
                source_id: row.get("source_id"),
                start_offset: start_offset as usize,
                chunk_index: row.get("chunk_index"),
                hash: row.get("hash"),
            };
            index.insert(row.get("id"), blob_to_vec(&blob), chunk)?;
        }

        Ok(Some(StoredIndex {
            index,
            model,
            fingerprint,
        }))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            seq INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            source_id TEXT NOT NULL,
            start_offset INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_source_id ON entries(source_id)")
        .execute(pool)
        .await?;

    Ok(())
}
