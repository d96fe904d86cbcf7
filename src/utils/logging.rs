/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供运行过程中的横幅日志
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LoggingSettings;
use crate::error::{AppError, AppResult};
use crate::orchestrator::RunStats;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的 `level`；`file_path` 存在时追加写入该文件
pub fn init(settings: &LoggingSettings) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if settings.console_output {
        let layer = tracing_subscriber::fmt::layer().with_target(false);
        layers.push(if settings.structured {
            layer.json().boxed()
        } else {
            layer.compact().boxed()
        });
    }

    if let Some(path) = &settings.file_path {
        let file = open_log_file(path)?;
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file));
        layers.push(if settings.structured {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Other(format!("初始化日志失败: {}", e)))
}

fn open_log_file(path: &Path) -> AppResult<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 记录程序启动信息
///
/// # 参数
/// - `departments`: 启用的部门数
/// - `documents`: 已知文档数
/// - `cloud_enabled`: 是否上传到云端
pub fn log_startup(departments: usize, documents: usize, cloud_enabled: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 岗位说明书下载");
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📋 部门: {} 个, 文档: {} 个", departments, documents);
    info!("☁️ 云端上传: {}", if cloud_enabled { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 记录部门开始信息
///
/// # 参数
/// - `index`: 部门编号（从 1 开始）
/// - `total`: 部门总数
/// - `name`: 部门名称
/// - `documents`: 部门文档数
pub fn log_department_start(index: usize, total: usize, name: &str, documents: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📂 开始处理第 {}/{} 个部门: {}", index, total, name);
    info!("📄 文档数: {}", documents);
    info!("{}", "=".repeat(60));
}

/// 记录部门完成信息
pub fn log_department_complete(name: &str, completed: usize, failed: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 部门 {} 完成: 成功 {}/{}, 失败 {}",
        name, completed, total, failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 本次运行的统计
/// - `report_path`: 状态报告路径
pub fn print_final_stats(stats: &RunStats, report_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.completed, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("☁️ 已上传: {} (失败 {})", stats.uploaded, stats.upload_failed);
    info!(
        "⏱️ 耗时: {:.1} 秒, 速度: {:.2} 个/分钟",
        stats.elapsed.as_secs_f64(),
        stats.throughput_per_minute
    );
    info!("{}", "=".repeat(60));
    info!("\n状态报告已保存至: {}", report_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
