//! 本地目录存储
//!
//! 在磁盘上镜像云端的文件夹层级，文件夹 id 就是相对于根目录的路径

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::infrastructure::remote_store::RemoteStore;

pub struct LocalDirectoryStore {
    root: PathBuf,
}

impl LocalDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_id(parent_id: Option<&str>, name: &str) -> String {
        match parent_id {
            Some(parent) if !parent.is_empty() => format!("{}/{}", parent, name),
            _ => name.to_string(),
        }
    }

    fn resolve(&self, id: &str) -> PathBuf {
        id.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl RemoteStore for LocalDirectoryStore {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>> {
        let id = Self::folder_id(parent_id, name);
        let exists = tokio::fs::metadata(self.resolve(&id))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        Ok(exists.then_some(id))
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
        let id = Self::folder_id(parent_id, name);
        let path = self.resolve(&id);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        debug!("已创建目录: {}", path.display());
        Ok(id)
    }

    async fn upload_file(&self, path: &Path, folder_id: &str, name: &str) -> AppResult<String> {
        if !path.exists() {
            return Err(FileError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let target = self.resolve(folder_id).join(name);
        tokio::fs::copy(path, &target)
            .await
            .map_err(|e| AppError::file_write_failed(target.display().to_string(), e))?;
        Ok(format!("{}/{}", folder_id, name))
    }

    async fn file_exists(&self, name: &str, folder_id: &str) -> AppResult<bool> {
        Ok(self.resolve(folder_id).join(name).is_file())
    }
}
