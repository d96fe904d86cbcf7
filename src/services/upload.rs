//! 上传协调服务 - 业务能力层
//!
//! 根文件夹 → 部门文件夹（逐级查找或创建）→ 查重 → 带重试上传 → 可选清理本地文件

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::CloudSettings;
use crate::error::{AppResult, StorageError};
use crate::infrastructure::RemoteStore;
use crate::services::filename::FilenameSanitizer;
use crate::services::retry::{RetryExecutor, RetryPolicy};
use crate::services::validator::extension_of;

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// 已上传，附带远程文件 id
    Uploaded { file_id: String },
    /// 目标文件夹中已有同名文件，未重新上传
    Duplicate,
}

/// 上传协调服务
pub struct UploadCoordinator {
    store: Arc<dyn RemoteStore>,
    settings: CloudSettings,
    retry: RetryExecutor,
    sanitizer: FilenameSanitizer,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, settings: CloudSettings, policy: RetryPolicy) -> Self {
        Self {
            store,
            settings,
            retry: RetryExecutor::new(policy),
            sanitizer: FilenameSanitizer::default(),
        }
    }

    /// 上传一个本地文件
    ///
    /// # 参数
    /// - `local_path`: 已校验的本地文件
    /// - `department`: 拥有该文档的部门的文件夹名称，不能为空
    /// - `title`: 文档标题，用于生成远程文件名
    ///
    /// # 返回
    /// 上传结果；文件夹无法获取或重试用尽时返回错误
    pub async fn upload(
        &self,
        local_path: &Path,
        department: &str,
        title: &str,
    ) -> AppResult<UploadOutcome> {
        if department.trim().is_empty() {
            return Err(StorageError::FolderUnavailable {
                path: format!("{}/<空部门>", self.settings.root_folder_name),
            }
            .into());
        }
        let folder_id = self
            .ensure_folder_path(&[self.settings.root_folder_name.as_str(), department])
            .await?;

        let file_name = self.remote_file_name(local_path, title);

        if self.settings.check_duplicates && self.store.file_exists(&file_name, &folder_id).await? {
            // 只按名称判断，不比较内容
            info!(
                department = department,
                document_title = title,
                policy = "name_match",
                "☁️ 云端已有同名文件，跳过上传: {}",
                file_name
            );
            return Ok(UploadOutcome::Duplicate);
        }

        let store = &self.store;
        let folder = folder_id.as_str();
        let name = file_name.as_str();
        let file_id = self
            .retry
            .run("upload_file", move || store.upload_file(local_path, folder, name))
            .await?;
        info!(
            department = department,
            document_title = title,
            file_id = %file_id,
            "☁️ 已上传: {}",
            file_name
        );

        if self.settings.cleanup_after_upload {
            match tokio::fs::remove_file(local_path).await {
                Ok(()) => debug!("已删除本地文件: {}", local_path.display()),
                Err(e) => warn!(
                    document_title = title,
                    error = %e,
                    "删除本地文件失败: {}",
                    local_path.display()
                ),
            }
        }

        Ok(UploadOutcome::Uploaded { file_id })
    }

    /// 逐级查找或创建文件夹，返回最后一级的 id
    ///
    /// 空的路径段会被跳过
    pub async fn ensure_folder_path(&self, segments: &[&str]) -> AppResult<String> {
        let mut parent: Option<String> = None;
        let mut walked = Vec::new();

        for segment in segments.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            walked.push(segment);
            let id = self.get_or_create_folder(segment, parent.as_deref()).await?;
            if id.is_empty() {
                return Err(StorageError::FolderUnavailable {
                    path: walked.join("/"),
                }
                .into());
            }
            parent = Some(id);
        }

        parent.ok_or_else(|| {
            StorageError::FolderUnavailable {
                path: segments.join("/"),
            }
            .into()
        })
    }

    async fn get_or_create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
        if let Some(id) = self.store.find_folder(name, parent_id).await? {
            return Ok(id);
        }
        debug!("文件夹不存在，创建: {}", name);
        self.store.create_folder(name, parent_id).await
    }

    /// 远程文件名：清理后的标题 + 本地文件扩展名
    fn remote_file_name(&self, local_path: &Path, title: &str) -> String {
        let ext = extension_of(local_path);
        if ext.is_empty() {
            self.sanitizer.sanitize(title)
        } else {
            self.sanitizer.sanitize_with_extension(title, &ext)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// 记录调用次数的内存存储
    #[derive(Default)]
    struct MemoryStore {
        folders: Mutex<HashMap<(Option<String>, String), String>>,
        files: Mutex<HashMap<(String, String), PathBuf>>,
        uploads: Mutex<u32>,
        creates: Mutex<u32>,
        fail_uploads: Mutex<u32>,
    }

    #[async_trait]
    impl RemoteStore for MemoryStore {
        async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>> {
            let key = (parent_id.map(str::to_string), name.to_string());
            Ok(self.folders.lock().unwrap().get(&key).cloned())
        }

        async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
            *self.creates.lock().unwrap() += 1;
            let id = format!("{}/{}", parent_id.unwrap_or(""), name);
            let key = (parent_id.map(str::to_string), name.to_string());
            self.folders.lock().unwrap().insert(key, id.clone());
            Ok(id)
        }

        async fn upload_file(&self, path: &Path, folder_id: &str, name: &str) -> AppResult<String> {
            *self.uploads.lock().unwrap() += 1;
            {
                let mut remaining = self.fail_uploads.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AppError::Storage(StorageError::BadResponse {
                        operation: "upload_file".to_string(),
                        status: 503,
                        body: String::new(),
                    }));
                }
            }
            self.files
                .lock()
                .unwrap()
                .insert((folder_id.to_string(), name.to_string()), path.to_path_buf());
            Ok(format!("id:{}", name))
        }

        async fn file_exists(&self, name: &str, folder_id: &str) -> AppResult<bool> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .contains_key(&(folder_id.to_string(), name.to_string())))
        }
    }

    fn coordinator(store: Arc<MemoryStore>, settings: CloudSettings) -> UploadCoordinator {
        UploadCoordinator::new(store, settings, RetryPolicy::immediate(3))
    }

    fn local_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("download.docx");
        std::fs::write(&path, b"PK\x03\x04payload").unwrap();
        path
    }

    #[tokio::test]
    async fn test_duplicate_uploads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let first = uploader.upload(&path, "SALES", "Инструкция менеджера").await.unwrap();
        let second = uploader.upload(&path, "SALES", "Инструкция менеджера").await.unwrap();

        assert_eq!(
            first,
            UploadOutcome::Uploaded {
                file_id: "id:Инструкция-менеджера.docx".to_string()
            }
        );
        assert_eq!(second, UploadOutcome::Duplicate);
        assert_eq!(*store.uploads.lock().unwrap(), 1);
        // 文件夹只创建一次
        assert_eq!(*store.creates.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_without_duplicate_check_uploads_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        let settings = CloudSettings {
            check_duplicates: false,
            ..CloudSettings::default()
        };
        let uploader = coordinator(store.clone(), settings);

        uploader.upload(&path, "SALES", "a").await.unwrap();
        uploader.upload(&path, "SALES", "a").await.unwrap();
        assert_eq!(*store.uploads.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_folder_path_is_root_then_department() {
        let store = Arc::new(MemoryStore::default());
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let id = uploader
            .ensure_folder_path(&["Job Instructions", "HR"])
            .await
            .unwrap();
        assert_eq!(id, "/Job Instructions/HR");

        let again = uploader
            .ensure_folder_path(&["Job Instructions", "HR"])
            .await
            .unwrap();
        assert_eq!(again, id);
        assert_eq!(*store.creates.lock().unwrap(), 2);

        let empty = uploader.ensure_folder_path(&["", " "]).await;
        assert!(matches!(
            empty,
            Err(AppError::Storage(StorageError::FolderUnavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_department_never_lands_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let err = uploader.upload(&path, " ", "a").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage(StorageError::FolderUnavailable { .. })
        ));
        assert_eq!(*store.uploads.lock().unwrap(), 0);
        assert!(store.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        *store.fail_uploads.lock().unwrap() = 2;
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let outcome = uploader.upload(&path, "SALES", "a").await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
        assert_eq!(*store.uploads.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        *store.fail_uploads.lock().unwrap() = 10;
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let err = uploader.upload(&path, "SALES", "a").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(*store.uploads.lock().unwrap(), 3);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_after_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_file(&dir);
        let store = Arc::new(MemoryStore::default());
        let settings = CloudSettings {
            cleanup_after_upload: true,
            ..CloudSettings::default()
        };
        let uploader = coordinator(store, settings);

        uploader.upload(&path, "SALES", "a").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remote_name_keeps_local_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let store = Arc::new(MemoryStore::default());
        let uploader = coordinator(store.clone(), CloudSettings::default());

        let outcome = uploader.upload(&path, "LEGAL", "Договор №5").await.unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Uploaded {
                file_id: "id:Договор-5.pdf".to_string()
            }
        );
    }
}
