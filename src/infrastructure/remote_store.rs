//! 远程存储能力
//!
//! 只提供文件夹 / 文件原语，路径解析、去重、重试都在 `UploadCoordinator` 中完成

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;

/// 远程对象存储
///
/// `parent_id` 为 `None` 表示存储的顶层
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 按名称查找文件夹
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>>;

    /// 创建文件夹，返回新文件夹 id
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String>;

    /// 上传本地文件，返回远程文件 id
    async fn upload_file(&self, path: &Path, folder_id: &str, name: &str) -> AppResult<String>;

    /// 文件夹中是否已有同名文件
    async fn file_exists(&self, name: &str, folder_id: &str) -> AppResult<bool>;
}
