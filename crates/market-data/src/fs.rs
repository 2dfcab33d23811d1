//! 파일 백엔드 공용 입출력.
//!
//! 쓰기는 같은 디렉토리의 임시 파일에 기록한 뒤 원자적으로 이름을 바꿉니다.
//! 프로세스 간 배타는 `.locks/` 아래 잠금 파일의 OS 권고 잠금으로 합니다.
//! 이스케이프된 키는 `.`으로 시작하지 않으므로 `.`으로 시작하는 이름은 키 목록에서 제외됩니다.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tracing::warn;

use crate::error::{DataError, Result};

/// 임시 파일 접두사.
pub(crate) const TEMP_PREFIX: &str = ".tmp";

/// 잠금 파일 디렉토리 이름.
pub(crate) const LOCK_DIR: &str = ".locks";

/// 잠금 파일에 거는 배타 권고 잠금. drop 시 해제됩니다.
#[derive(Debug)]
pub(crate) struct FileLock {
    file: File,
}

impl FileLock {
    /// 잠금을 얻을 때까지 기다립니다. 파일이 없으면 만듭니다.
    pub(crate) async fn acquire(path: PathBuf) -> Result<Self> {
        tokio::task::spawn_blocking(move || -> Result<Self> {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(Self { file })
        })
        .await?
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "파일 잠금 해제 실패");
        }
    }
}

/// `path`에 `contents`를 원자적으로 기록합니다.
pub(crate) async fn atomic_write(path: PathBuf, contents: String) -> Result<()> {
    tokio::task::spawn_blocking(move || write_blocking(&path, contents.as_bytes())).await?
}

fn write_blocking(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| DataError::InvalidData(format!("상위 디렉토리 없음: {}", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| DataError::Io(e.error))?;
    Ok(())
}

/// 파일을 읽습니다. 없으면 `None`.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 파일을 지웁니다. 없으면 `false`.
pub(crate) async fn remove_optional(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// 디렉토리 항목 이름 (`.`으로 시작하는 임시/잠금 파일 제외). 디렉토리가 없으면 빈 목록.
pub(crate) async fn list_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
