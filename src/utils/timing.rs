//! 操作计时
//!
//! `OperationTimer` 创建时记录开始时间；`finish` / `fail` 记录结束日志。
//! 没有调用二者就被丢弃（提前返回、`?`、panic 展开）时，由 `Drop` 记一条失败日志。

use std::fmt::Display;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

pub struct OperationTimer {
    operation: &'static str,
    department: String,
    document_title: String,
    started: Instant,
    finished: bool,
}

impl OperationTimer {
    pub fn start(
        operation: &'static str,
        department: impl Into<String>,
        document_title: impl Into<String>,
    ) -> Self {
        let timer = Self {
            operation,
            department: department.into(),
            document_title: document_title.into(),
            started: Instant::now(),
            finished: false,
        };
        debug!(
            operation = timer.operation,
            department = %timer.department,
            document_title = %timer.document_title,
            "开始"
        );
        timer
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 成功结束，返回耗时
    pub fn finish(mut self) -> Duration {
        self.finished = true;
        let elapsed = self.elapsed();
        info!(
            operation = self.operation,
            department = %self.department,
            document_title = %self.document_title,
            duration_ms = elapsed.as_millis() as u64,
            status = "completed",
            "完成"
        );
        elapsed
    }

    /// 失败结束，返回耗时
    pub fn fail(mut self, error: &dyn Display) -> Duration {
        self.finished = true;
        let elapsed = self.elapsed();
        warn!(
            operation = self.operation,
            department = %self.department,
            document_title = %self.document_title,
            duration_ms = elapsed.as_millis() as u64,
            status = "failed",
            error = %error,
            "失败"
        );
        elapsed
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            operation = self.operation,
            department = %self.department,
            document_title = %self.document_title,
            duration_ms = self.elapsed().as_millis() as u64,
            status = "failed",
            "未正常结束"
        );
    }
}
