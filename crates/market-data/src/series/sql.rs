//! SQLite 키-시계열 저장소.
//!
//! 테이블 두 개를 씁니다.
//!
//! - `series (key, t, value)` - `(key, t)` 기본 키
//! - `series_span (key, "start", "end")` - `(key, "start")` 기본 키
//!
//! 네임스페이스는 키 접두사 `"<namespace>/"`로 구분합니다.
//! 각 공개 연산은 트랜잭션 하나로 실행되고, 구간 변경은 `(key, start)` 단위의
//! 삭제/삽입으로 반영합니다.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use market_core::{Coverage, CoverageDelta, Span, Timestamped};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::SeriesStore;
use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::kv::sql::{prefixed, unprefixed};
use crate::lock::KeyLocks;

/// 네임스페이스로 구분되는 SQLite 시계열 저장소.
pub struct SqlSeriesStore<T> {
    pool: SqlitePool,
    namespace: String,
    codec: Arc<dyn Codec<T>>,
    locks: KeyLocks,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqlSeriesStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON 코덱으로 저장소를 엽니다. 테이블이 없으면 만듭니다.
    pub async fn open(pool: SqlitePool, namespace: impl Into<String>) -> Result<Self> {
        Self::open_with_codec(pool, namespace, Arc::new(JsonCodec)).await
    }
}

impl<T> SqlSeriesStore<T> {
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
            locks: KeyLocks::new(),
            _marker: PhantomData,
        })
    }

    /// 네임스페이스.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn load_coverage(&self, conn: &mut SqliteConnection, key: &str) -> Result<Coverage> {
        let rows: Vec<(f64, f64)> = sqlx::query_as(
            r#"
            SELECT "start", "end" FROM series_span
            WHERE key = ?
            ORDER BY "start"
            "#,
        )
        .bind(prefixed(&self.namespace, key))
        .fetch_all(&mut *conn)
        .await?;

        Ok(Coverage::from_spans(
            rows.into_iter().map(|(start, end)| Span::new(start, end)),
        ))
    }

    async fn apply_delta(
        &self,
        conn: &mut SqliteConnection,
        key: &str,
        delta: &CoverageDelta,
    ) -> Result<()> {
        for span in &delta.removed {
            sqlx::query(r#"DELETE FROM series_span WHERE key = ? AND "start" = ?"#)
                .bind(prefixed(&self.namespace, key))
                .bind(span.start)
                .execute(&mut *conn)
                .await?;
        }
        for span in &delta.added {
            sqlx::query(
                r#"INSERT OR REPLACE INTO series_span (key, "start", "end") VALUES (?, ?, ?)"#,
            )
            .bind(prefixed(&self.namespace, key))
            .bind(span.start)
            .bind(span.end)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

/// 시계열 테이블 생성.
pub(crate) async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            key   TEXT NOT NULL,
            t     REAL NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (key, t)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series_span (
            key     TEXT NOT NULL,
            "start" REAL NOT NULL,
            "end"   REAL NOT NULL,
            PRIMARY KEY (key, "start")
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl<T> SeriesStore<T> for SqlSeriesStore<T>
where
    T: Timestamped + Send + Sync + 'static,
{
    async fn set(&self, key: &str, start: f64, end: f64, items: Vec<T>) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        let encoded = items
            .iter()
            .filter(|item| {
                let t = item.timestamp();
                start < t && t <= end
            })
            .map(|item| Ok((item.timestamp(), self.codec.encode(item)?)))
            .collect::<Result<Vec<_>>>()?;

        let _guard = self.locks.lock(key).await;
        let mut tx = self.pool.begin().await?;

        for (t, value) in &encoded {
            sqlx::query(
                "INSERT OR REPLACE INTO series (key, t, value) VALUES (?, ?, ?)",
            )
            .bind(prefixed(&self.namespace, key))
            .bind(*t)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        let mut coverage = self.load_coverage(&mut tx, key).await?;
        let delta = coverage.absorb(start, end);
        self.apply_delta(&mut tx, key, &delta).await?;

        tx.commit().await?;
        debug!(
            namespace = %self.namespace,
            key,
            start,
            end,
            count = encoded.len(),
            "시계열 기록"
        );
        Ok(())
    }

    async fn get(&self, key: &str, start: f64, end: f64) -> Result<Vec<T>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT value FROM series
            WHERE key = ? AND t > ? AND t <= ?
            ORDER BY t
            "#,
        )
        .bind(prefixed(&self.namespace, key))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(text,)| self.codec.decode(text)).collect()
    }

    async fn delete(&self, key: &str, start: f64, end: f64) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        let _guard = self.locks.lock(key).await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM series WHERE key = ? AND t > ? AND t <= ?")
            .bind(prefixed(&self.namespace, key))
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await?;

        let mut coverage = self.load_coverage(&mut tx, key).await?;
        let delta = coverage.punch(start, end);
        self.apply_delta(&mut tx, key, &delta).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn missing_spans(&self, key: &str, start: f64, end: f64) -> Result<Vec<Span>> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.load_coverage(&mut conn, key).await?.missing(start, end))
    }

    async fn spans(&self, key: &str) -> Result<Vec<Span>> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.load_coverage(&mut conn, key).await?.into_spans())
    }

    async fn clear(&self, key: &str) -> Result<bool> {
        let _guard = self.locks.lock(key).await;
        let mut tx = self.pool.begin().await?;

        let items = sqlx::query("DELETE FROM series WHERE key = ?")
            .bind(prefixed(&self.namespace, key))
            .execute(&mut *tx)
            .await?;
        let spans = sqlx::query("DELETE FROM series_span WHERE key = ?")
            .bind(prefixed(&self.namespace, key))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(items.rows_affected() + spans.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let prefix = prefixed(&self.namespace, "");
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT key FROM series_span WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
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
