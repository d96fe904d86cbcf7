//! # Job Instruction Downloader
//!
//! 从网页批量下载岗位说明书等文档，校验后按部门上传到云端
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `PageDriver` - 页面驱动（chromiumoxide 实现为 `ChromiumPageDriver`）
//! - `RemoteStore` - 远程存储（`GoogleDriveStore` / `LocalDirectoryStore`）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档
//! - `RetryExecutor` - 指数退避重试
//! - `DocumentValidator` - 文件校验
//! - `FilenameSanitizer` - 文件名清理
//! - `UploadCoordinator` - 文件夹解析、查重、上传
//! - `DocumentExtractor` / `PageDownloader` - 页面提取与下载
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文档"的完整处理流程
//! - `DocumentCtx` - 上下文封装（部门 + 文档序号）
//! - `DocumentFlow` - 流程编排（download → validate → rename → upload）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/download_orchestrator` - 运行入口，管理资源和统计
//! - `orchestrator/department_processor` - 单个部门处理器，遍历文档列表
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::AppConfig;
pub use error::{AppError, AppResult, FailureKind};
pub use infrastructure::{PageDriver, PageDriverFactory, RemoteStore};
pub use models::{CloudStatus, Department, Document, DocumentStatus};
pub use orchestrator::{DownloadOrchestrator, RunStats};
pub use workflow::{DocumentCtx, DocumentFlow};
