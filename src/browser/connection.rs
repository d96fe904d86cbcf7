use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};

/// 连接到已打开的浏览器（远程调试端口）并获取页面
///
/// # 参数
/// - `port`: 远程调试端口
/// - `target_url`: 新建页面时导航到的地址
/// - `target_title`: 优先复用标题包含该字符串的页面
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
    target_title: Option<&str>,
) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {:?}, 目标标题: {:?}", target_url, target_title);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    if let Some(title) = target_title {
        let pages = browser.pages().await?;
        debug!("正在查找标题包含 '{}' 的页面 (共 {} 个)", title, pages.len());
        for p in pages.iter() {
            if let Ok(Some(page_title)) = p.get_title().await {
                if page_title.contains(title) {
                    info!("✓ 找到目标页面: {}", page_title);
                    return Ok((browser, p.clone()));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    let page = browser.new_page(target_url.unwrap_or("about:blank")).await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("新页面已创建");

    Ok((browser, page))
}
