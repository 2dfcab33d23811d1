//! SQLite 키-값 저장소.
//!
//! 모든 네임스페이스가 `kv(key, value)` 테이블 하나를 공유하며,
//! 저장 키는 `"<namespace>/<key>"` 형태입니다.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use super::KeyValueStore;
use crate::codec::{Codec, JsonCodec};
use crate::error::{DataError, Result};

/// 네임스페이스로 구분되는 SQLite 키-값 저장소.
pub struct SqlKvStore<T> {
    pool: SqlitePool,
    namespace: String,
    codec: Arc<dyn Codec<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqlKvStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON 코덱으로 저장소를 엽니다. 테이블이 없으면 만듭니다.
    pub async fn open(pool: SqlitePool, namespace: impl Into<String>) -> Result<Self> {
        Self::open_with_codec(pool, namespace, Arc::new(JsonCodec)).await
    }
}

impl<T> SqlKvStore<T> {
    /// 지정한 코덱으로 저장소를 엽니다.
    pub async fn open_with_codec(
        pool: SqlitePool,
        namespace: impl Into<String>,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Self> {
        ensure_schema(&pool).await?;
        Ok(Self {
            pool,
            namespace: namespace.into(),
            codec,
            _marker: PhantomData,
        })
    }

    /// 네임스페이스.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn row_key(&self, key: &str) -> String {
        prefixed(&self.namespace, key)
    }
}

/// 테이블에 저장되는 키.
pub(crate) fn prefixed(namespace: &str, key: &str) -> String {
    format!("{namespace}/{key}")
}

/// 네임스페이스 접두사를 떼어낸 키. 다른 네임스페이스면 `None`.
pub(crate) fn unprefixed<'a>(namespace: &str, row_key: &'a str) -> Option<&'a str> {
    row_key.strip_prefix(namespace)?.strip_prefix('/')
}

/// `kv` 테이블 생성.
pub(crate) async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl<T> KeyValueStore<T> for SqlKvStore<T>
where
    T: Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: &T) -> Result<()> {
        let text = self.codec.encode(value)?;
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(self.row_key(key))
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<T> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM kv WHERE key = ?")
                .bind(self.row_key(key))
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((text,)) => self.codec.decode(&text),
            None => Err(DataError::NotFound(key.to_string())),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM kv WHERE key = ?")
                .bind(self.row_key(key))
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(self.row_key(key))
            .execute(&self.pool)
            .await?;

        debug!(namespace = %self.namespace, key, rows = result.rows_affected(), "KV 삭제");
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let prefix = prefixed(&self.namespace, "");
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT key FROM kv WHERE substr(key, 1, ?) = ? ORDER BY key")
                .bind(prefix.chars().count() as i64)
                .bind(&prefix)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .iter()
            .filter_map(|(row_key,)| unprefixed(&self.namespace, row_key))
            .map(str::to_string)
            .collect())
    }
}
