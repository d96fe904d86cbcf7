//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `download_orchestrator` - 下载编排器
//! - 校验配置、获取并释放页面驱动
//! - 顺序处理所有启用的部门
//! - 输出全局统计和状态报告
//!
//! ### `department_processor` - 单个部门处理器
//! - 按需提取文档
//! - 遍历部门的所有文档（Vec<Document>）
//! - 状态 / 进度回调与限速
//!
//! ## 层次关系
//!
//! ```text
//! download_orchestrator (处理 Vec<Department>)
//!     ↓
//! department_processor (处理 Vec<Document>)
//!     ↓
//! workflow::DocumentFlow (处理单个 Document)
//!     ↓
//! services (能力层：download / validate / sanitize / upload / retry)
//!     ↓
//! infrastructure (基础设施：PageDriver / RemoteStore)
//! ```

pub mod department_processor;
pub mod download_orchestrator;
pub mod run_stats;

pub use download_orchestrator::DownloadOrchestrator;
pub use run_stats::{DepartmentOutcome, RunProgress, RunStats};

/// 状态消息回调
pub type StatusCallback = Box<dyn Fn(&str) + Send + Sync>;
/// 进度回调 `(completed, total)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// 运行过程中的回调，均可选
#[derive(Default)]
pub struct Callbacks {
    pub status: Option<StatusCallback>,
    pub progress: Option<ProgressCallback>,
}

impl Callbacks {
    pub fn status(&self, message: &str) {
        if let Some(callback) = &self.status {
            callback(message);
        }
    }

    pub fn progress(&self, completed: usize, total: usize) {
        if let Some(callback) = &self.progress {
            callback(completed, total);
        }
    }
}
