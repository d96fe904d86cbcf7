//! 页面下载服务 - 业务能力层
//!
//! 打开文档页面、点击下载按钮，并等待浏览器把文件写入下载目录

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::infrastructure::page_driver::POLL_INTERVAL;
use crate::infrastructure::{PageDriver, WaitCondition};

/// 浏览器下载中的临时文件扩展名
const PARTIAL_EXTENSIONS: &[&str] = &["crdownload", "part", "tmp"];

/// 页面下载服务
#[derive(Debug, Clone)]
pub struct PageDownloader {
    download_button: String,
    page_load_timeout: Duration,
    download_timeout: Duration,
}

impl PageDownloader {
    pub fn new(
        download_button: impl Into<String>,
        page_load_timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self {
            download_button: download_button.into(),
            page_load_timeout,
            download_timeout,
        }
    }

    /// 下载一个文档
    ///
    /// # 返回
    /// 下载目录中新出现的文件路径；页面元素或文件在限定时间内没有出现时返回超时错误
    pub async fn download(&self, driver: &dyn PageDriver, url: &str) -> AppResult<PathBuf> {
        let download_dir = driver.current_download_directory().to_path_buf();
        let before = list_finished_files(&download_dir).await?;

        driver.navigate(url).await?;
        driver
            .wait_for(
                &WaitCondition::ElementPresent("body".to_string()),
                self.page_load_timeout,
            )
            .await?;
        driver
            .wait_for(
                &WaitCondition::ElementClickable(self.download_button.clone()),
                self.page_load_timeout,
            )
            .await?;

        let button = driver
            .find_elements(&self.download_button)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::Browser(crate::error::BrowserError::ElementNotFound {
                    selector: self.download_button.clone(),
                    index: 0,
                })
            })?;
        driver.click(&button).await?;
        debug!("已点击下载按钮: {}", self.download_button);

        let path = self.wait_for_new_file(&download_dir, &before).await?;
        info!("📥 文件已下载: {}", path.display());
        Ok(path)
    }

    async fn wait_for_new_file(
        &self,
        download_dir: &Path,
        before: &HashSet<OsString>,
    ) -> AppResult<PathBuf> {
        let deadline = Instant::now() + self.download_timeout;
        loop {
            let current = list_finished_files(download_dir).await?;
            let mut fresh: Vec<&OsString> = current.difference(before).collect();
            fresh.sort();
            if let Some(name) = fresh.first() {
                return Ok(download_dir.join(name));
            }
            if Instant::now() >= deadline {
                return Err(AppError::browser_timeout(
                    format!("文件出现在 {}", download_dir.display()),
                    self.download_timeout,
                ));
            }
            sleep(POLL_INTERVAL.min(self.download_timeout)).await;
        }
    }
}

/// 下载目录中已经写完的文件名
async fn list_finished_files(dir: &Path) -> AppResult<HashSet<OsString>> {
    let mut names = HashSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(AppError::file_read_failed(dir.display().to_string(), e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?
    {
        let path = entry.path();
        if !path.is_file() || is_partial(&path) {
            continue;
        }
        names.insert(entry.file_name());
    }
    Ok(names)
}

fn is_partial(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            PARTIAL_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 把已下载文件移动为 `dir/file_name`
///
/// # 参数
/// - `previous`: 同一文档上一轮留下的文件；目标正是它时直接覆盖
///
/// 其他情况下目标已存在时在扩展名前加 " (n)"
pub fn place_file(
    source: &Path,
    dir: &Path,
    file_name: &str,
    previous: Option<&Path>,
) -> AppResult<PathBuf> {
    let wanted = dir.join(file_name);
    if source == wanted {
        return Ok(wanted);
    }
    let target = if previous == Some(wanted.as_path()) {
        if wanted.exists() {
            std::fs::remove_file(&wanted)
                .map_err(|e| AppError::file_write_failed(wanted.display().to_string(), e))?;
            debug!("覆盖上一轮的文件: {}", wanted.display());
        }
        wanted
    } else {
        available_path(dir, file_name)
    };
    std::fs::rename(source, &target).map_err(|e| FileError::RenameFailed {
        from: source.display().to_string(),
        to: target.display().to_string(),
        source: e,
    })?;
    Ok(target)
}

fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
