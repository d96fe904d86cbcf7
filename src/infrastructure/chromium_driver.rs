//! Chromium 页面驱动 - 基础设施层
//!
//! 持有唯一的 page 资源，通过执行 JS 完成查询和点击

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::browser;
use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::page_driver::{
    PageDriver, PageDriverFactory, PageElement, WaitCondition, POLL_INTERVAL,
};

#[derive(Debug, Deserialize)]
struct ElementSnapshot {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    onclick: Option<String>,
}

/// Chromium 页面驱动
pub struct ChromiumPageDriver {
    browser: Option<Browser>,
    page: Option<Page>,
    download_dir: PathBuf,
    /// 连接到已有浏览器时只关闭页面，不关闭浏览器
    attached: bool,
}

impl ChromiumPageDriver {
    /// 包装已有会话，并把下载目录指向 `download_dir`
    pub async fn new(
        browser: Browser,
        page: Page,
        download_dir: PathBuf,
        attached: bool,
    ) -> AppResult<Self> {
        std::fs::create_dir_all(&download_dir)
            .map_err(|e| AppError::file_write_failed(download_dir.display().to_string(), e))?;
        let download_dir = download_dir.canonicalize().unwrap_or(download_dir);

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_dir.to_string_lossy().to_string())
            .build()
            .map_err(|message| BrowserError::LaunchFailed { message })?;
        page.execute(params).await?;
        info!("下载目录: {}", download_dir.display());

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            download_dir,
            attached,
        })
    }

    fn page(&self) -> AppResult<&Page> {
        self.page
            .as_ref()
            .ok_or(AppError::Browser(BrowserError::SessionClosed))
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page()?.evaluate(js_code.into()).await?;
        let json_value = result.into_value().map_err(|e| {
            AppError::Browser(BrowserError::CommandFailed {
                source: Box::new(e),
            })
        })?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| {
            AppError::Browser(BrowserError::CommandFailed {
                source: Box::new(e),
            })
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumPageDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> AppResult<Vec<PageElement>> {
        let js_code = format!(
            r#"
            (() => {{
                return Array.from(document.querySelectorAll({})).map(e => ({{
                    text: e.innerText,
                    href: e.getAttribute('href'),
                    onclick: e.getAttribute('onclick')
                }}));
            }})()
            "#,
            serde_json::to_string(selector).unwrap_or_default()
        );

        let snapshots: Vec<ElementSnapshot> = self.eval_as(js_code).await?;
        Ok(snapshots
            .into_iter()
            .enumerate()
            .map(|(index, s)| PageElement {
                selector: selector.to_string(),
                index,
                text: s.text.unwrap_or_default(),
                href: s.href,
                onclick: s.onclick,
            })
            .collect())
    }

    async fn click(&self, element: &PageElement) -> AppResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelectorAll({})[{}];
                if (!el || el.disabled) return false;
                el.scrollIntoView();
                el.click();
                return true;
            }})()
            "#,
            serde_json::to_string(&element.selector).unwrap_or_default(),
            element.index
        );

        let clicked: bool = self.eval_as(js_code).await?;
        if !clicked {
            return Err(AppError::Browser(BrowserError::ElementNotFound {
                selector: element.selector.clone(),
                index: element.index,
            }));
        }
        Ok(())
    }

    async fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> AppResult<()> {
        let selector = serde_json::to_string(condition.selector()).unwrap_or_default();
        let js_code = match condition {
            WaitCondition::ElementPresent(_) => {
                format!("document.querySelector({}) !== null", selector)
            }
            WaitCondition::ElementClickable(_) => format!(
                r#"
                (() => {{
                    const el = document.querySelector({});
                    return !!el && !el.disabled && el.offsetParent !== null;
                }})()
                "#,
                selector
            ),
        };

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(true) = self.eval_as::<bool>(js_code.clone()).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::browser_timeout(condition.to_string(), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn current_download_directory(&self) -> &Path {
        &self.download_dir
    }

    async fn close(&mut self) -> AppResult<()> {
        if let Some(page) = self.page.take() {
            if self.attached {
                page.close().await?;
                debug!("页面已关闭");
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if !self.attached {
                browser.close().await?;
                if let Err(e) = browser.wait().await {
                    warn!("等待浏览器进程退出失败: {}", e);
                }
            }
        }
        info!("浏览器会话已关闭");
        Ok(())
    }
}

/// 根据配置连接或启动 Chromium
pub struct ChromiumLauncher {
    settings: BrowserSettings,
    download_dir: PathBuf,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings, download_dir: PathBuf) -> Self {
        Self {
            settings,
            download_dir,
        }
    }
}

#[async_trait]
impl PageDriverFactory for ChromiumLauncher {
    async fn open(&self) -> AppResult<Box<dyn PageDriver>> {
        let (browser, page, attached) = match self.settings.debug_port {
            Some(port) => {
                let (browser, page) =
                    browser::connect_to_browser_and_page(port, None, None).await?;
                (browser, page, true)
            }
            None => {
                let (browser, page) = browser::launch_browser(&self.settings).await?;
                (browser, page, false)
            }
        };

        let driver =
            ChromiumPageDriver::new(browser, page, self.download_dir.clone(), attached).await?;
        Ok(Box::new(driver))
    }
}
