//! 集成测试用的假页面驱动和内存存储

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use job_instruction_downloader::config::AppConfig;
use job_instruction_downloader::error::{AppError, AppResult, BrowserError, StorageError};
use job_instruction_downloader::infrastructure::{
    PageDriver, PageDriverFactory, PageElement, RemoteStore,
};
use job_instruction_downloader::services::{RetryPolicy, ValidationRule};

pub const BASE_URL: &str = "https://example.test";
pub const LIST_PATH: &str = "/list";
pub const DOWNLOAD_BUTTON: &str = "[devinid='14']";
pub const DOCUMENT_LINKS: &str = "[devinid]";

/// 页面行为
#[derive(Debug, Clone)]
pub enum PageBehavior {
    /// 点击下载按钮后写出文件
    Download { file_name: String, content: Vec<u8> },
    /// 下载按钮永远不出现
    NoButton,
    /// 导航时 panic
    Panic,
}

/// 假站点，被所有驱动实例共享
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, PageBehavior>>,
    listing: Mutex<Vec<PageElement>>,
    navigations: Mutex<HashMap<String, usize>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_open: Mutex<bool>,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: &str, behavior: PageBehavior) {
        self.pages.lock().unwrap().insert(url.to_string(), behavior);
    }

    pub fn docx_page(&self, url: &str, file_name: &str) {
        self.page(
            url,
            PageBehavior::Download {
                file_name: file_name.to_string(),
                content: docx_bytes(2000),
            },
        );
    }

    pub fn set_listing(&self, elements: Vec<PageElement>) {
        *self.listing.lock().unwrap() = elements;
    }

    pub fn navigations(&self, url: &str) -> usize {
        self.navigations
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

pub fn docx_bytes(size: usize) -> Vec<u8> {
    let mut data = b"PK\x03\x04".to_vec();
    data.resize(size, b'x');
    data
}

pub struct FakePageDriver {
    site: Arc<FakeSite>,
    download_dir: PathBuf,
    current: Mutex<String>,
}

impl FakePageDriver {
    fn behavior(&self) -> Option<PageBehavior> {
        let current = self.current.lock().unwrap().clone();
        self.site.pages.lock().unwrap().get(&current).cloned()
    }
}

#[async_trait]
impl PageDriver for FakePageDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        *self
            .site
            .navigations
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;
        let behavior = self.site.pages.lock().unwrap().get(url).cloned();
        if let Some(PageBehavior::Panic) = behavior {
            panic!("page driver crashed on {}", url);
        }
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> AppResult<Vec<PageElement>> {
        let current = self.current.lock().unwrap().clone();
        if selector == "body" {
            return Ok(vec![PageElement::new("body", 0, "")]);
        }
        if selector == DOCUMENT_LINKS && current == format!("{}{}", BASE_URL, LIST_PATH) {
            return Ok(self.site.listing.lock().unwrap().clone());
        }
        if selector == DOWNLOAD_BUTTON {
            if let Some(PageBehavior::Download { .. }) = self.behavior() {
                return Ok(vec![PageElement::new(DOWNLOAD_BUTTON, 0, "Скачать")]);
            }
        }
        Ok(Vec::new())
    }

    async fn click(&self, element: &PageElement) -> AppResult<()> {
        match self.behavior() {
            Some(PageBehavior::Download { file_name, content }) => {
                std::fs::write(self.download_dir.join(file_name), content)
                    .map_err(|e| AppError::file_write_failed("download", e))?;
                Ok(())
            }
            _ => Err(AppError::Browser(BrowserError::ElementNotFound {
                selector: element.selector.clone(),
                index: element.index,
            })),
        }
    }

    fn current_download_directory(&self) -> &Path {
        &self.download_dir
    }

    async fn close(&mut self) -> AppResult<()> {
        self.site.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeFactory {
    pub site: Arc<FakeSite>,
    pub download_dir: PathBuf,
}

#[async_trait]
impl PageDriverFactory for FakeFactory {
    async fn open(&self) -> AppResult<Box<dyn PageDriver>> {
        if *self.site.fail_open.lock().unwrap() {
            return Err(AppError::Browser(BrowserError::LaunchFailed {
                message: "chrome not found".to_string(),
            }));
        }
        self.site.opened.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(&self.download_dir).unwrap();
        Ok(Box::new(FakePageDriver {
            site: self.site.clone(),
            download_dir: self.download_dir.clone(),
            current: Mutex::new(String::new()),
        }))
    }
}

/// 内存中的远程存储
#[derive(Default)]
pub struct InMemoryStore {
    folders: Mutex<HashMap<(Option<String>, String), String>>,
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub uploads: AtomicUsize,
    pub fail_uploads: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn has_file(&self, folder_id: &str, name: &str) -> bool {
        self.files
            .lock()
            .unwrap()
            .contains_key(&(folder_id.to_string(), name.to_string()))
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<String>> {
        let key = (parent_id.map(str::to_string), name.to_string());
        Ok(self.folders.lock().unwrap().get(&key).cloned())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> AppResult<String> {
        let id = match parent_id {
            Some(parent) => format!("{}/{}", parent, name),
            None => name.to_string(),
        };
        let key = (parent_id.map(str::to_string), name.to_string());
        self.folders.lock().unwrap().insert(key, id.clone());
        Ok(id)
    }

    async fn upload_file(&self, path: &Path, folder_id: &str, name: &str) -> AppResult<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_uploads.lock().unwrap() {
            return Err(AppError::Storage(StorageError::BadResponse {
                operation: "upload_file".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            }));
        }
        let content = std::fs::read(path).map_err(|e| AppError::file_read_failed("upload", e))?;
        self.files
            .lock()
            .unwrap()
            .insert((folder_id.to_string(), name.to_string()), content);
        Ok(format!("{}/{}", folder_id, name))
    }

    async fn file_exists(&self, name: &str, folder_id: &str) -> AppResult<bool> {
        Ok(self.has_file(folder_id, name))
    }
}

/// 测试用配置：不等待、短超时、小文件即可通过校验
pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.download.temp_directory = root.join("downloads");
    config.download.report_path = root.join("report.json");
    config.download.timeout = Duration::from_millis(200);
    config.download.retry = RetryPolicy::immediate(3);
    config.browser.page_load_timeout = Duration::from_millis(50);
    config.site.base_url = BASE_URL.to_string();
    config.site.start_url = LIST_PATH.to_string();
    config.site.selectors.download_button = DOWNLOAD_BUTTON.to_string();
    config.site.selectors.document_links = DOCUMENT_LINKS.to_string();
    config.site.rate_limiting.delay_between_requests = Duration::ZERO;
    config.validation = ValidationRule {
        min_size: 10,
        max_size: 10_000,
        accepted_extensions: vec![".docx".to_string()],
        check_content: true,
    };
    config.cloud_storage.local_root = root.join("cloud");
    config.logging.file_path = None;
    config
}

pub fn factory(site: &Arc<FakeSite>, config: &AppConfig) -> Box<FakeFactory> {
    Box::new(FakeFactory {
        site: site.clone(),
        download_dir: config.download.temp_directory.clone(),
    })
}
