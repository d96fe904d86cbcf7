use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::BrowserSettings;
use crate::error::{AppResult, BrowserError};

/// 按配置启动新的浏览器进程并打开空白页
pub async fn launch_browser(settings: &BrowserSettings) -> AppResult<(Browser, Page)> {
    info!(
        "🚀 启动浏览器 (headless: {}, 窗口: {}x{})...",
        settings.headless, settings.window_size[0], settings.window_size[1]
    );

    let mut builder = BrowserConfig::builder()
        .window_size(settings.window_size[0], settings.window_size[1])
        .request_timeout(settings.page_load_timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ]);
    builder = if settings.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &settings.chrome_executable {
        debug!("浏览器路径: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|message| {
        error!("配置浏览器失败: {}", message);
        BrowserError::LaunchFailed { message }
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed {
            message: e.to_string(),
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        BrowserError::LaunchFailed {
            message: e.to_string(),
        }
    })?;
    info!("✅ 浏览器已就绪");

    Ok((browser, page))
}
