//! 运行统计
//!
//! 每个部门返回一个 `DepartmentOutcome`，由编排器合并进 `RunStats`，不使用全局计数器

use std::time::Duration;

use serde::Serialize;

use crate::models::CloudStatus;
use crate::workflow::DocumentOutcome;

/// 单个部门的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentOutcome {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub uploaded: usize,
    pub duplicates: usize,
    pub upload_failed: usize,
}

impl DepartmentOutcome {
    /// 记录一个文档的结果
    pub fn record(&mut self, outcome: &DocumentOutcome) {
        if outcome.is_completed() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        match outcome.cloud {
            CloudStatus::Uploaded => self.uploaded += 1,
            CloudStatus::Duplicate => self.duplicates += 1,
            CloudStatus::Failed => self.upload_failed += 1,
            CloudStatus::NotUploaded => {}
        }
    }
}

/// 整个运行的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub departments: usize,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub uploaded: usize,
    pub duplicates: usize,
    pub upload_failed: usize,
    #[serde(with = "crate::config::duration_secs")]
    pub elapsed: Duration,
    /// 每分钟完成的文档数
    pub throughput_per_minute: f64,
}

impl RunStats {
    pub fn merge(&mut self, outcome: &DepartmentOutcome) {
        self.departments += 1;
        self.total += outcome.total;
        self.completed += outcome.completed;
        self.failed += outcome.failed;
        self.uploaded += outcome.uploaded;
        self.duplicates += outcome.duplicates;
        self.upload_failed += outcome.upload_failed;
    }

    /// 写入耗时并计算速度
    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        let minutes = elapsed.as_secs_f64() / 60.0;
        self.throughput_per_minute = if minutes > 0.0 {
            self.completed as f64 / minutes
        } else {
            0.0
        };
    }
}

/// 整个运行的进度，跨部门累计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::workflow::ProcessResult;

    fn outcome(result: ProcessResult, cloud: CloudStatus) -> DocumentOutcome {
        DocumentOutcome { result, cloud }
    }

    #[test]
    fn test_department_outcome_counts_axes_independently() {
        let mut dept = DepartmentOutcome {
            total: 3,
            ..Default::default()
        };
        dept.record(&outcome(ProcessResult::Completed, CloudStatus::Uploaded));
        dept.record(&outcome(ProcessResult::Completed, CloudStatus::Failed));
        dept.record(&outcome(
            ProcessResult::Failed(FailureKind::Transient),
            CloudStatus::NotUploaded,
        ));

        assert_eq!(dept.completed, 2);
        assert_eq!(dept.failed, 1);
        assert_eq!(dept.uploaded, 1);
        assert_eq!(dept.upload_failed, 1);
    }

    #[test]
    fn test_merge_and_throughput() {
        let mut stats = RunStats::default();
        stats.merge(&DepartmentOutcome {
            total: 4,
            completed: 3,
            failed: 1,
            ..Default::default()
        });
        stats.merge(&DepartmentOutcome {
            total: 2,
            completed: 1,
            failed: 1,
            duplicates: 1,
            ..Default::default()
        });
        stats.finish(Duration::from_secs(120));

        assert_eq!(stats.departments, 2);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.completed, 4);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.duplicates, 1);
        assert!((stats.throughput_per_minute - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_has_zero_throughput() {
        let mut stats = RunStats::default();
        stats.finish(Duration::ZERO);
        assert_eq!(stats.throughput_per_minute, 0.0);
    }
}
