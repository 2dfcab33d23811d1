//! 설정 기반 저장소 팩토리.
//!
//! 저장소 이름은 네임스페이스로 쓰입니다.
//!
//! | 백엔드 | 키-값 | 사전 | 시계열 |
//! |---|---|---|---|
//! | folder | `root/kv/<name>/` | `root/<name>.json` | `root/series/<name>/` |
//! | db | `kv` 테이블, namespace = name | (키-값과 같음) | `series_*` 테이블, namespace = name |
//! | memory | 호출마다 새 저장소 | (키-값과 같음) | 호출마다 새 저장소 |

use std::path::PathBuf;
use std::sync::Arc;

use market_core::{StorageConfig, StorageLocation, Timestamped};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::escape::escape_key;
use crate::kv::{DictFileKvStore, FolderKvStore, KeyValueStore, MemoryKvStore, SqlKvStore};
use crate::series::{FolderSeriesStore, MemorySeriesStore, SeriesStore, SqlSeriesStore};

/// 저장소 백엔드.
#[derive(Debug, Clone)]
pub enum StorageFactory {
    /// 프로세스 메모리
    Memory,
    /// 폴더 루트
    Folder(PathBuf),
    /// SQLite 연결 풀
    Db(SqlitePool),
}

impl StorageFactory {
    /// 설정으로 백엔드를 엽니다. SQLite 파일은 없으면 만듭니다.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let factory = match config.location {
            StorageLocation::Memory => Self::Memory,
            StorageLocation::Folder => Self::Folder(config.folder_path.clone()),
            StorageLocation::Db => {
                if let Some(parent) = config.db_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                let options = SqliteConnectOptions::new()
                    .filename(&config.db_path)
                    .create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(4)
                    .connect_with(options)
                    .await?;
                Self::Db(pool)
            }
        };
        info!(location = ?config.location, "저장소 백엔드 준비");
        Ok(factory)
    }

    /// JSON 코덱 키-값 저장소.
    pub async fn kv_store<T>(&self, name: &str) -> Result<Arc<dyn KeyValueStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.kv_store_with_codec(name, Arc::new(JsonCodec)).await
    }

    /// 지정한 코덱의 키-값 저장소.
    pub async fn kv_store_with_codec<T>(
        &self,
        name: &str,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Arc<dyn KeyValueStore<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let store: Arc<dyn KeyValueStore<T>> = match self {
            Self::Memory => Arc::new(MemoryKvStore::new()),
            Self::Folder(root) => Arc::new(FolderKvStore::with_codec(
                root.join("kv").join(escape_key(name)),
                codec,
            )),
            Self::Db(pool) => {
                Arc::new(SqlKvStore::open_with_codec(pool.clone(), name, codec).await?)
            }
        };
        Ok(store)
    }

    /// 단일 파일 사전 저장소. 폴더 백엔드가 아니면 키-값 저장소와 같습니다.
    pub async fn dict_store<T>(&self, name: &str) -> Result<Arc<dyn KeyValueStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        match self {
            Self::Folder(root) => {
                let store: Arc<dyn KeyValueStore<T>> = Arc::new(DictFileKvStore::new(
                    root.join(format!("{}.json", escape_key(name))),
                ));
                Ok(store)
            }
            _ => self.kv_store(name).await,
        }
    }

    /// JSON 코덱 시계열 저장소.
    pub async fn series_store<T>(&self, name: &str) -> Result<Arc<dyn SeriesStore<T>>>
    where
        T: Timestamped + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.series_store_with_codec(name, Arc::new(JsonCodec)).await
    }

    /// 지정한 코덱의 시계열 저장소.
    pub async fn series_store_with_codec<T>(
        &self,
        name: &str,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Arc<dyn SeriesStore<T>>>
    where
        T: Timestamped + Clone + Send + Sync + 'static,
    {
        let store: Arc<dyn SeriesStore<T>> = match self {
            Self::Memory => Arc::new(MemorySeriesStore::new()),
            Self::Folder(root) => Arc::new(FolderSeriesStore::with_codec(
                root.join("series").join(escape_key(name)),
                codec,
            )),
            Self::Db(pool) => {
                Arc::new(SqlSeriesStore::open_with_codec(pool.clone(), name, codec).await?)
            }
        };
        Ok(store)
    }
}
