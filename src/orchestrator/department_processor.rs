//! 单个部门处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **按需提取**：部门没有文档时从站点提取
//! 2. **遍历文档**：按顺序把每个文档交给 `DocumentFlow`
//! 3. **回调**：每个文档开始前发状态消息，结束后发进度
//! 4. **限速**：每个文档之后无条件等待
//! 5. **统计输出**：返回部门结果，由上层合并

use std::time::Duration;

use tracing::{info, warn};

use crate::infrastructure::PageDriver;
use crate::models::{Department, DocumentType};
use crate::orchestrator::run_stats::{DepartmentOutcome, RunProgress};
use crate::orchestrator::Callbacks;
use crate::services::DocumentExtractor;
use crate::utils::logging::{log_department_complete, log_department_start};
use crate::workflow::{DocumentCtx, DocumentFlow};

/// 部门处理器，借用编排器持有的资源
pub struct DepartmentProcessor<'a> {
    pub driver: &'a dyn PageDriver,
    pub flow: &'a DocumentFlow,
    pub extractor: &'a DocumentExtractor,
    pub callbacks: &'a Callbacks,
    pub document_type: &'a DocumentType,
    pub page_load_timeout: Duration,
    pub rate_limit: Duration,
}

impl DepartmentProcessor<'_> {
    /// 处理单个部门
    ///
    /// # 参数
    /// - `department`: 部门（文档状态原地更新）
    /// - `index`: 部门编号（从1开始，仅用于日志）
    /// - `total_departments`: 部门总数
    /// - `progress`: 整个运行的进度
    pub async fn process(
        &self,
        department: &mut Department,
        index: usize,
        total_departments: usize,
        progress: &mut RunProgress,
    ) -> DepartmentOutcome {
        if department.documents.is_empty() {
            self.extract(department, progress).await;
        }

        let total = department.total_documents();
        let mut outcome = DepartmentOutcome {
            total,
            ..Default::default()
        };

        log_department_start(index, total_departments, &department.name, total);
        self.callbacks
            .status(&format!("开始处理部门: {} ({} 个文档)", department.name, total));

        if total == 0 {
            info!(department = %department.name, "部门没有文档，跳过");
            return outcome;
        }

        let department_name = department.name.clone();
        let folder_name = department.folder_name.clone();
        for (i, document) in department.documents.iter_mut().enumerate() {
            // 文档归属于列出它的部门
            if document.department != department_name {
                document.department = department_name.clone();
            }
            let ctx = DocumentCtx::new(&department_name, i + 1, total, &document.title)
                .with_folder_name(&folder_name);
            self.callbacks.status(&ctx.status_message());

            let result = self.flow.run(self.driver, document, &ctx).await;
            outcome.record(&result);
            if result.is_completed() {
                progress.completed += 1;
            }
            self.callbacks.progress(progress.completed, progress.total);

            // 成功失败都等待
            tokio::time::sleep(self.rate_limit).await;
        }

        log_department_complete(&department_name, outcome.completed, outcome.failed, total);
        outcome
    }

    /// 按需提取文档；提取失败或为空都按空部门处理
    async fn extract(&self, department: &mut Department, progress: &mut RunProgress) {
        self.callbacks
            .status(&format!("正在提取部门文档: {}", department.name));

        match self
            .extractor
            .extract(
                self.driver,
                &department.name,
                self.document_type,
                self.page_load_timeout,
            )
            .await
        {
            Ok(documents) => {
                progress.total += documents.len();
                for document in documents {
                    department.add_document(document);
                }
            }
            Err(e) => {
                warn!(
                    operation = "extract_documents",
                    department = %department.name,
                    error = %e,
                    "提取文档失败，按空部门处理"
                );
            }
        }
    }
}
