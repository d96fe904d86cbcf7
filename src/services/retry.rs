//! 重试服务 - 业务能力层
//!
//! 带指数退避和随机抖动的有限次重试。
//!
//! - 尝试编号从 0 开始
//! - `delay(attempt) = min(max_delay, base_delay * multiplier^attempt)`
//! - 开启抖动时再乘以 [0.5, 1.0] 的随机系数
//! - 最后一次尝试失败后不再等待，直接把这次的错误返回给调用方

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::duration_secs;
use crate::error::{AppError, AppResult};

/// 重试策略，启动时构造一次，之后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最大尝试次数（>= 1）
    pub max_attempts: u32,
    /// 初始等待时间
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    /// 等待时间上限
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// 指数倍率
    pub multiplier: f64,
    /// 是否加入随机抖动
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// 不等待、不抖动的策略
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::invalid_config(
                "download.retry.max_attempts",
                "必须 >= 1",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(AppError::invalid_config(
                "download.retry.multiplier",
                format!("必须 >= 1.0，当前为 {}", self.multiplier),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(AppError::invalid_config(
                "download.retry.base_delay",
                "不能大于 max_delay",
            ));
        }
        Ok(())
    }

    /// 不含抖动的等待时间
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// 第 `attempt` 次失败后的等待时间
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }
}

/// 重试执行器
///
/// 对任何失败都重试，直到用尽 `max_attempts`。
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行操作，失败时按策略重试
    ///
    /// # 参数
    /// - `operation_name`: 操作名称（仅用于日志）
    /// - `operation`: 每次尝试都会重新调用的异步闭包
    ///
    /// # 返回
    /// 成功值，或最后一次尝试的错误
    pub async fn run<F, Fut, T, E>(&self, operation_name: &str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_with_observer(operation_name, operation, |_, _, _| {})
            .await
    }

    /// 同 [`run`](Self::run)，每次失败后（等待前）回调 `on_failure(attempt, delay, error)`
    pub async fn run_with_observer<F, Fut, T, E, O>(
        &self,
        operation_name: &str,
        mut operation: F,
        mut on_failure: O,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        O: FnMut(u32, Duration, &E),
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "重试后成功"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if attempt + 1 < max_attempts => {
                    let delay = self.policy.delay(attempt);
                    warn!(
                        operation = operation_name,
                        error = %e,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "操作失败，等待后重试"
                    );
                    on_failure(attempt, delay, &e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        operation = operation_name,
                        error = %e,
                        attempts = max_attempts,
                        "重试次数已用尽"
                    );
                    on_failure(attempt, Duration::ZERO, &e);
                    return Err(e);
                }
            }
        }
    }
}
