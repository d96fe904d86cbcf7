use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::models::DocumentType;
use crate::services::filename::FilenameSanitizer;

/// 文档下载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// 本次运行中是否已经结束
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Downloading => "downloading",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 云端上传状态，与下载状态相互独立
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudStatus {
    #[default]
    NotUploaded,
    Uploaded,
    /// 云端已有同名文件，未重新上传
    Duplicate,
    Failed,
}

/// 非法的状态变更
#[derive(Debug, Error, PartialEq, Eq)]
#[error("文档 '{title}' 不能从 {from} 变为 {to}")]
pub struct StatusTransitionError {
    pub title: String,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
}

/// 单个待下载文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub department: String,
    pub url: String,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub download_date: Option<DateTime<Utc>>,
    #[serde(default)]
    status: DocumentStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    cloud_status: CloudStatus,
    #[serde(default)]
    pub cloud_file_id: Option<String>,
    #[serde(default)]
    pub download_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upload_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub file_extension: Option<String>,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        department: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            department: department.into(),
            url: url.into(),
            file_path: None,
            file_size: None,
            download_date: None,
            status: DocumentStatus::Pending,
            error_message: None,
            metadata: BTreeMap::new(),
            local_path: None,
            cloud_status: CloudStatus::NotUploaded,
            cloud_file_id: None,
            download_timestamp: None,
            upload_timestamp: None,
            document_type: DocumentType::default(),
            file_extension: None,
        }
    }

    pub fn with_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn cloud_status(&self) -> CloudStatus {
        self.cloud_status
    }

    /// 根据标题和文档类型生成的文件名
    pub fn filename(&self) -> String {
        FilenameSanitizer::default().sanitize_for_type(&self.title, &self.document_type)
    }

    /// 已完成且本地文件仍然存在
    pub fn is_downloaded(&self) -> bool {
        self.status == DocumentStatus::Completed
            && self
                .local_path
                .as_deref()
                .or(self.file_path.as_deref())
                .is_some_and(Path::exists)
    }

    /// 新一轮运行开始：清除上一轮的结果
    pub fn reset_for_run(&mut self) {
        self.status = DocumentStatus::Pending;
        self.error_message = None;
        self.local_path = None;
        self.cloud_status = CloudStatus::NotUploaded;
        self.cloud_file_id = None;
        self.upload_timestamp = None;
        self.metadata.remove("cloud_error");
    }

    /// pending → downloading
    pub fn begin_download(&mut self) -> Result<(), StatusTransitionError> {
        self.transition(DocumentStatus::Downloading)
    }

    /// pending / downloading → completed
    pub fn mark_completed(
        &mut self,
        local_path: PathBuf,
        file_size: u64,
    ) -> Result<(), StatusTransitionError> {
        self.transition(DocumentStatus::Completed)?;
        let now = Utc::now();
        self.file_extension = local_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()));
        self.file_path = Some(local_path.clone());
        self.local_path = Some(local_path);
        self.file_size = Some(file_size);
        self.download_date = Some(now);
        self.download_timestamp = Some(now);
        self.error_message = None;
        Ok(())
    }

    /// pending / downloading → failed
    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), StatusTransitionError> {
        self.transition(DocumentStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// 记录上传成功
    pub fn mark_uploaded(&mut self, file_id: Option<String>) {
        self.cloud_status = CloudStatus::Uploaded;
        self.cloud_file_id = file_id;
        self.upload_timestamp = Some(Utc::now());
        self.metadata.remove("cloud_error");
    }

    /// 记录云端已有同名文件
    pub fn mark_duplicate(&mut self) {
        self.cloud_status = CloudStatus::Duplicate;
        self.upload_timestamp = Some(Utc::now());
        self.metadata.remove("cloud_error");
    }

    /// 记录上传失败，不影响下载状态
    pub fn mark_upload_failed(&mut self, message: impl Into<String>) {
        self.cloud_status = CloudStatus::Failed;
        self.metadata
            .insert("cloud_error".to_string(), JsonValue::String(message.into()));
    }

    fn transition(&mut self, to: DocumentStatus) -> Result<(), StatusTransitionError> {
        let allowed = match (self.status, to) {
            (DocumentStatus::Pending, DocumentStatus::Downloading) => true,
            (DocumentStatus::Pending | DocumentStatus::Downloading, DocumentStatus::Completed) => {
                true
            }
            (DocumentStatus::Pending | DocumentStatus::Downloading, DocumentStatus::Failed) => true,
            _ => false,
        };
        if !allowed {
            return Err(StatusTransitionError {
                title: self.title.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
