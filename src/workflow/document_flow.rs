//! 文档处理流程 - 流程层
//!
//! 核心职责：定义"一个文档"的完整处理流程
//!
//! 流程顺序：
//! 1. 下载（带重试）
//! 2. 校验（失败不重试）
//! 3. 重命名为清理后的文件名
//! 4. 上传到云端（可选，失败不影响下载状态）

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, FailureKind, ValidationError};
use crate::infrastructure::PageDriver;
use crate::models::{CloudStatus, Document, DocumentTypeRegistry};
use crate::services::validator::extension_of;
use crate::services::{
    place_file, DocumentValidator, FilenameSanitizer, PageDownloader, RetryExecutor,
    UploadCoordinator, UploadOutcome,
};
use crate::utils::OperationTimer;
use crate::workflow::document_ctx::DocumentCtx;

/// 文档处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 下载并校验成功
    Completed,
    /// 失败，附带失败类别
    Failed(FailureKind),
}

/// 单个文档的处理结果：下载和上传是两个独立的维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub result: ProcessResult,
    pub cloud: CloudStatus,
}

impl DocumentOutcome {
    fn failed(kind: FailureKind) -> Self {
        Self {
            result: ProcessResult::Failed(kind),
            cloud: CloudStatus::NotUploaded,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.result == ProcessResult::Completed
    }
}

/// 文档处理流程
///
/// - 编排一个文档的下载、校验、重命名、上传
/// - 不持有页面驱动，由调用方传入
pub struct DocumentFlow {
    downloader: PageDownloader,
    validator: DocumentValidator,
    registry: DocumentTypeRegistry,
    sanitizer: FilenameSanitizer,
    retry: RetryExecutor,
    uploader: Option<UploadCoordinator>,
}

impl DocumentFlow {
    pub fn new(
        downloader: PageDownloader,
        registry: DocumentTypeRegistry,
        retry: RetryExecutor,
        uploader: Option<UploadCoordinator>,
    ) -> Self {
        Self {
            downloader,
            validator: DocumentValidator::new(),
            registry,
            sanitizer: FilenameSanitizer::default(),
            retry,
            uploader,
        }
    }

    pub fn uploads_enabled(&self) -> bool {
        self.uploader.is_some()
    }

    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        document: &mut Document,
        ctx: &DocumentCtx,
    ) -> DocumentOutcome {
        let timer = OperationTimer::start("process_document", &ctx.department, &ctx.title);

        // 上一轮留下的文件，重新下载时覆盖它
        let previous = document.file_path.clone();

        if let Err(e) = document.begin_download() {
            warn!("{} 跳过: {}", ctx, e);
            timer.fail(&e);
            return DocumentOutcome::failed(FailureKind::Internal);
        }

        let local_path = match self
            .download_and_place(driver, document, previous.as_deref(), ctx)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(
                    operation = "download_document",
                    department = %ctx.department,
                    document_title = %ctx.title,
                    failure_kind = ?e.kind(),
                    "{} ❌ 下载失败: {}",
                    ctx,
                    e
                );
                let kind = e.kind();
                if let Err(transition) = document.mark_failed(e.to_string()) {
                    warn!("{} {}", ctx, transition);
                }
                timer.fail(&e);
                return DocumentOutcome::failed(kind);
            }
        };

        let file_size = std::fs::metadata(&local_path).map(|m| m.len()).unwrap_or(0);
        if let Err(e) = document.mark_completed(local_path.clone(), file_size) {
            warn!("{} {}", ctx, e);
            timer.fail(&e);
            return DocumentOutcome::failed(FailureKind::Internal);
        }
        info!("{} ✓ 下载完成: {}", ctx, local_path.display());

        if let Some(uploader) = &self.uploader {
            self.upload(uploader, document, ctx).await;
        }

        timer.finish();
        DocumentOutcome {
            result: ProcessResult::Completed,
            cloud: document.cloud_status(),
        }
    }

    /// 下载 → 校验 → 重命名
    async fn download_and_place(
        &self,
        driver: &dyn PageDriver,
        document: &Document,
        previous: Option<&Path>,
        ctx: &DocumentCtx,
    ) -> AppResult<PathBuf> {
        let downloader = &self.downloader;
        let url = document.url.as_str();
        let downloaded = self
            .retry
            .run_with_observer(
                "download_document",
                move || downloader.download(driver, url),
                |attempt, delay, e: &AppError| {
                    warn!(
                        "{} 第 {} 次下载失败: {} (等待 {:?})",
                        ctx,
                        attempt + 1,
                        e,
                        delay
                    );
                },
            )
            .await?;

        let rule = self.registry.validation_rule(&document.document_type);
        if !self.validator.validate(&downloaded, &rule) {
            return Err(ValidationError::Rejected {
                path: downloaded.display().to_string(),
            }
            .into());
        }

        let mut extension = extension_of(&downloaded);
        if extension.is_empty() {
            extension = self
                .registry
                .default_extension(&document.document_type)
                .to_string();
        }
        let file_name = self
            .sanitizer
            .sanitize_with_extension(&document.title, &extension);
        place_file(
            &downloaded,
            driver.current_download_directory(),
            &file_name,
            previous,
        )
    }

    async fn upload(&self, uploader: &UploadCoordinator, document: &mut Document, ctx: &DocumentCtx) {
        let Some(local_path) = document.local_path.clone() else {
            return;
        };
        let timer = OperationTimer::start("upload_document", &ctx.department, &ctx.title);

        match uploader
            .upload(&local_path, &ctx.folder_name, &document.title)
            .await
        {
            Ok(UploadOutcome::Uploaded { file_id }) => {
                document.mark_uploaded(Some(file_id));
                timer.finish();
            }
            Ok(UploadOutcome::Duplicate) => {
                document.mark_duplicate();
                timer.finish();
            }
            Err(e) => {
                error!(
                    operation = "upload_document",
                    department = %ctx.department,
                    document_title = %ctx.title,
                    "{} ☁️ 上传失败: {}",
                    ctx,
                    e
                );
                document.mark_upload_failed(e.to_string());
                timer.fail(&e);
            }
        }
    }
}
