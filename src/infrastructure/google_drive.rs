//! Google Drive 存储 - 基础设施层
//!
//! 通过 Drive v3 REST 接口实现 [`RemoteStore`]，使用 bearer token 鉴权

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CloudSettings;
use crate::error::{AppError, AppResult, StorageError};
use crate::infrastructure::remote_store::RemoteStore;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const MULTIPART_BOUNDARY: &str = "jid_upload_boundary";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Google Drive 客户端
pub struct GoogleDriveStore {
    client: Client,
    access_token: String,
    api_base_url: String,
    upload_base_url: String,
}

impl GoogleDriveStore {
    pub fn new(
        access_token: impl Into<String>,
        api_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 从云存储配置创建
    pub fn from_settings(settings: &CloudSettings) -> AppResult<Self> {
        let token = settings.access_token.clone().ok_or_else(|| {
            AppError::invalid_config("cloud_storage.access_token", "google_drive 需要访问令牌")
        })?;
        Ok(Self::new(
            token,
            settings.api_base_url.clone(),
            settings.upload_base_url.clone(),
        ))
    }

    /// 查询文件列表，返回第一个匹配项的 id
    async fn query_first(&self, operation: &str, query: String) -> AppResult<Option<String>> {
        debug!(operation = operation, query = %query, "查询 Drive 文件");
        let response = self
            .client
            .get(format!("{}/files", self.api_base_url))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await
            .map_err(|e| AppError::storage_request_failed(operation, e))?;

        let list: FileList = check_status(operation, response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::storage_request_failed(operation, e))?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }
}

#[async_trait]
impl RemoteStore for GoogleDriveStore {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>> {
        let mut query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query(name),
            FOLDER_MIME_TYPE
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", escape_query(parent)));
        }
        self.query_first("find_folder", query).await
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
        let mut metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .client
            .post(format!("{}/files", self.api_base_url))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| AppError::storage_request_failed("create_folder", e))?;

        let created: FileRef = check_status("create_folder", response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::storage_request_failed("create_folder", e))?;
        info!("📁 已创建 Drive 文件夹: {} ({})", name, created.id);
        Ok(created.id)
    }

    async fn upload_file(&self, path: &Path, folder_id: &str, name: &str) -> AppResult<String> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let metadata = json!({
            "name": name,
            "parents": [folder_id],
        });
        let body = multipart_related_body(&metadata.to_string(), &content);

        let response = self
            .client
            .post(format!("{}/files", self.upload_base_url))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::storage_request_failed("upload_file", e))?;

        let uploaded: FileRef = check_status("upload_file", response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::storage_request_failed("upload_file", e))?;
        debug!("已上传 {} → {}", name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn file_exists(&self, name: &str, folder_id: &str) -> AppResult<bool> {
        let query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query(name),
            escape_query(folder_id)
        );
        Ok(self.query_first("file_exists", query).await?.is_some())
    }
}

async fn check_status(operation: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::BadResponse {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Drive 查询语法中的字符串字面量转义
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related_body(metadata: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            m = metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
