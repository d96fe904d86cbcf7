//! 下载编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个运行的入口，负责资源管理和部门调度。
//!
//! 1. **配置校验**：处理任何文档之前校验配置，非法直接终止
//! 2. **资源管理**：通过工厂获取页面驱动，所有退出路径上都会关闭（包括 panic）
//! 3. **顺序调度**：按列表顺序处理启用的部门，单个部门失败不影响后续部门
//! 4. **全局统计**：合并各部门结果，计算耗时和速度
//! 5. **状态报告**：运行结束后把部门和文档状态写回 JSON

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, PageDriverFactory, RemoteStore};
use crate::models::{save_departments, Department, DocumentType, DocumentTypeRegistry};
use crate::orchestrator::department_processor::DepartmentProcessor;
use crate::orchestrator::run_stats::{RunProgress, RunStats};
use crate::orchestrator::Callbacks;
use crate::services::{
    DocumentExtractor, PageDownloader, RetryExecutor, UploadCoordinator,
};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::DocumentFlow;

/// 下载编排器
pub struct DownloadOrchestrator {
    config: AppConfig,
    factory: Box<dyn PageDriverFactory>,
    flow: DocumentFlow,
    extractor: DocumentExtractor,
    document_type: DocumentType,
    callbacks: Callbacks,
}

impl DownloadOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - `config`: 程序配置（会先校验）
    /// - `factory`: 页面驱动工厂，`run` 时才真正获取会话
    /// - `store`: 远程存储；为 `None` 或配置未启用云存储时不上传
    pub fn new(
        config: AppConfig,
        factory: Box<dyn PageDriverFactory>,
        store: Option<Arc<dyn RemoteStore>>,
    ) -> AppResult<Self> {
        config.validate()?;

        let registry =
            DocumentTypeRegistry::new(config.document_types.clone(), config.validation.clone());
        let downloader = PageDownloader::new(
            config.site.selectors.download_button.clone(),
            config.browser.page_load_timeout,
            config.download.timeout,
        );
        let uploader = store
            .filter(|_| config.cloud_storage.enabled)
            .map(|store| {
                UploadCoordinator::new(
                    store,
                    config.cloud_storage.clone(),
                    config.download.retry.clone(),
                )
            });
        let flow = DocumentFlow::new(
            downloader,
            registry,
            RetryExecutor::new(config.download.retry.clone()),
            uploader,
        );
        let extractor = DocumentExtractor::new(config.site.clone())?;
        let document_type = DocumentType::from_key(&config.download.document_type);

        Ok(Self {
            config,
            factory,
            flow,
            extractor,
            document_type,
            callbacks: Callbacks::default(),
        })
    }

    /// 设置状态消息回调
    pub fn on_status(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.status = Some(Box::new(callback));
        self
    }

    /// 设置进度回调 `(completed, total)`
    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.callbacks.progress = Some(Box::new(callback));
        self
    }

    /// 运行一次完整的下载
    ///
    /// # 返回
    /// 运行统计；只有页面驱动无法建立或处理过程 panic 时返回错误，
    /// 单个文档或部门的失败只体现在统计中
    pub async fn run(&self, departments: &mut [Department]) -> AppResult<RunStats> {
        let mut driver = self.factory.open().await.map_err(|e| {
            error!("❌ 无法建立浏览器会话: {}", e);
            e
        })?;

        let result = AssertUnwindSafe(self.process_all(driver.as_ref(), departments))
            .catch_unwind()
            .await;

        if let Err(e) = driver.close().await {
            warn!("关闭浏览器会话失败: {}", e);
        }

        let stats = result.map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!("❌ 运行中断: {}", message);
            AppError::Other(format!("运行中断: {}", message))
        })?;

        if let Err(e) = save_departments(&self.config.download.report_path, departments).await {
            warn!("写入状态报告失败: {}", e);
        }
        print_final_stats(&stats, &self.config.download.report_path);

        Ok(stats)
    }

    async fn process_all(
        &self,
        driver: &dyn PageDriver,
        departments: &mut [Department],
    ) -> RunStats {
        let started = Instant::now();
        let mut stats = RunStats::default();

        let mut enabled: Vec<&mut Department> =
            departments.iter_mut().filter(|d| d.enabled).collect();
        for department in enabled.iter_mut() {
            for document in department.documents.iter_mut() {
                document.reset_for_run();
            }
        }

        let mut progress = RunProgress {
            completed: 0,
            total: enabled.iter().map(|d| d.total_documents()).sum(),
        };
        log_startup(enabled.len(), progress.total, self.flow.uploads_enabled());
        self.callbacks.status("开始下载");

        let processor = DepartmentProcessor {
            driver,
            flow: &self.flow,
            extractor: &self.extractor,
            callbacks: &self.callbacks,
            document_type: &self.document_type,
            page_load_timeout: self.config.browser.page_load_timeout,
            rate_limit: self.config.site.rate_limiting.delay_between_requests,
        };

        let total_departments = enabled.len();
        for (i, department) in enabled.into_iter().enumerate() {
            let outcome = processor
                .process(department, i + 1, total_departments, &mut progress)
                .await;
            stats.merge(&outcome);
        }

        stats.finish(started.elapsed());
        info!(
            completed = stats.completed,
            failed = stats.failed,
            duration_ms = stats.elapsed.as_millis() as u64,
            "运行结束"
        );
        self.callbacks.status(&format!(
            "下载完成: 成功 {}, 失败 {}",
            stats.completed, stats.failed
        ));
        stats
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
