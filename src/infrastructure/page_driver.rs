//! 页面驱动能力 - 基础设施层
//!
//! 编排层只通过这个 trait 操作浏览器，不直接接触 chromiumoxide

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::{AppError, AppResult};

/// 轮询页面状态的间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 页面元素快照
///
/// 通过 (selector, index) 定位，点击时重新查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    pub selector: String,
    pub index: usize,
    pub text: String,
    pub href: Option<String>,
    pub onclick: Option<String>,
}

impl PageElement {
    pub fn new(selector: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            index,
            text: text.into(),
            href: None,
            onclick: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_onclick(mut self, onclick: impl Into<String>) -> Self {
        self.onclick = Some(onclick.into());
        self
    }
}

/// 等待条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// 页面上至少存在一个匹配元素
    ElementPresent(String),
    /// 匹配元素存在且可以点击
    ElementClickable(String),
}

impl WaitCondition {
    pub fn selector(&self) -> &str {
        match self {
            WaitCondition::ElementPresent(s) | WaitCondition::ElementClickable(s) => s,
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitCondition::ElementPresent(s) => write!(f, "元素出现 '{}'", s),
            WaitCondition::ElementClickable(s) => write!(f, "元素可点击 '{}'", s),
        }
    }
}

/// 页面驱动
///
/// 整个运行期间只有一个会话，由编排层独占
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到指定 URL
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// 查询所有匹配元素
    async fn find_elements(&self, selector: &str) -> AppResult<Vec<PageElement>>;

    /// 点击元素
    async fn click(&self, element: &PageElement) -> AppResult<()>;

    /// 等待条件成立，超时返回 [`BrowserError::Timeout`](crate::error::BrowserError::Timeout)
    async fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> AppResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            // 查询失败（页面还在加载等）按未满足处理
            if let Ok(elements) = self.find_elements(condition.selector()).await {
                if !elements.is_empty() {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(AppError::browser_timeout(condition.to_string(), timeout));
            }
            sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }

    /// 浏览器的下载目录
    fn current_download_directory(&self) -> &Path;

    /// 关闭会话
    async fn close(&mut self) -> AppResult<()>;
}

/// 页面驱动工厂
///
/// 编排层通过它获取会话，并负责在所有退出路径上关闭
#[async_trait]
pub trait PageDriverFactory: Send + Sync {
    async fn open(&self) -> AppResult<Box<dyn PageDriver>>;
}
