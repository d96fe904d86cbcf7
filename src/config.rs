//! 程序配置
//!
//! 所有配置在启动时一次性读入强类型结构体，并立即校验；运行过程中只读。
//! 配置目录结构：
//!
//! ```text
//! config/
//! ├── settings.json      # AppConfig
//! └── departments.json   # 部门与文档列表
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::retry::RetryPolicy;
use crate::services::validator::ValidationRule;

/// 程序配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 下载相关配置
    pub download: DownloadSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 目标站点配置
    pub site: SiteConfig,
    /// 默认校验规则（文档类型没有单独配置时使用）
    pub validation: ValidationRule,
    /// 文档类型配置，键为类型名（如 "job_instruction"）
    pub document_types: BTreeMap<String, DocumentTypeSettings>,
    /// 云存储配置
    pub cloud_storage: CloudSettings,
    /// 日志配置
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// 浏览器下载目录
    pub temp_directory: PathBuf,
    /// 等待单个文件下载完成的超时时间
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// 重试策略
    pub retry: RetryPolicy,
    /// 运行结束后写出的状态报告
    pub report_path: PathBuf,
    /// 默认文档类型
    pub document_type: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            temp_directory: PathBuf::from("downloads"),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            report_path: PathBuf::from("downloads/report.json"),
            document_type: "job_instruction".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 是否无头模式（仅启动新浏览器时有效）
    pub headless: bool,
    /// 已打开浏览器的调试端口；设置后直接连接而不是启动
    pub debug_port: Option<u16>,
    /// 窗口大小
    pub window_size: [u32; 2],
    /// 页面加载超时
    #[serde(with = "duration_secs")]
    pub page_load_timeout: Duration,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            debug_port: None,
            window_size: [1920, 1080],
            page_load_timeout: Duration::from_secs(10),
            chrome_executable: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub start_url: String,
    pub selectors: SelectorSettings,
    pub rate_limiting: RateLimitSettings,
    /// 提取文档标题时的清理规则
    pub title_processing: TitleProcessing,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "consultant_ru".to_string(),
            base_url: "https://www.consultant.ru".to_string(),
            start_url: "/document/cons_doc_LAW_18090/".to_string(),
            selectors: SelectorSettings::default(),
            rate_limiting: RateLimitSettings::default(),
            title_processing: TitleProcessing::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSettings {
    /// 文档链接
    pub document_links: String,
    /// 文档标题
    pub document_title: String,
    /// 下载按钮
    pub download_button: String,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            document_links: "[devinid]".to_string(),
            document_title: "h1, .document-title".to_string(),
            download_button: "[devinid='14']".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// 每个文档之间的间隔
    #[serde(with = "duration_secs")]
    pub delay_between_requests: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            delay_between_requests: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleProcessing {
    /// 需要去掉的标题前缀
    pub remove_prefixes: Vec<String>,
    /// 需要去掉的标题后缀
    pub remove_suffixes: Vec<String>,
    /// 标题最大字符数
    pub max_length: usize,
    /// 匹配的片段替换为单个空格
    pub cleanup_regex: String,
}

impl Default for TitleProcessing {
    fn default() -> Self {
        Self {
            remove_prefixes: Vec::new(),
            remove_suffixes: Vec::new(),
            max_length: 100,
            cleanup_regex: r"\s+".to_string(),
        }
    }
}

/// 单个文档类型的配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentTypeSettings {
    pub name: String,
    pub description: String,
    pub default_extension: Option<String>,
    pub supported_extensions: Vec<String>,
    pub validation: Option<ValidationRule>,
}

/// 云存储提供方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    GoogleDrive,
    Local,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub enabled: bool,
    pub provider: CloudProvider,
    /// 根文件夹名称
    pub root_folder_name: String,
    /// 上传前检查同名文件
    pub check_duplicates: bool,
    /// 上传成功后删除本地文件
    pub cleanup_after_upload: bool,
    /// provider = local 时的根目录
    pub local_root: PathBuf,
    /// Google Drive 访问令牌
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Google Drive API 地址
    pub api_base_url: String,
    /// Google Drive 上传地址
    pub upload_base_url: String,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: CloudProvider::GoogleDrive,
            root_folder_name: "Job Instructions".to_string(),
            check_duplicates: true,
            cleanup_after_upload: false,
            local_root: PathBuf::from("cloud"),
            access_token: None,
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 默认日志级别（RUST_LOG 优先）
    pub level: String,
    /// 日志文件，追加写入
    pub file_path: Option<PathBuf>,
    /// 输出 JSON 格式日志
    pub structured: bool,
    /// 同时输出到控制台
    pub console_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: Some(PathBuf::from("logs/app.log")),
            structured: false,
            console_output: true,
        }
    }
}

impl AppConfig {
    /// 默认配置目录
    pub const DEFAULT_DIR: &'static str = "config";

    /// 从环境变量确定配置目录，加载并校验
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::read_file(&Self::config_dir().join("settings.json"))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 配置目录：`JID_CONFIG_DIR`，默认 `config`
    pub fn config_dir() -> PathBuf {
        std::env::var("JID_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_DIR))
    }

    /// 从配置目录加载并校验（不读取环境变量）
    pub fn load(dir: &Path) -> AppResult<Self> {
        let config = Self::read_file(&dir.join("settings.json"))?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 settings.json
    pub fn read_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileMissing {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| FileError::JsonParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        info!("已加载配置: {}", path.display());
        Ok(config)
    }

    /// 使用环境变量覆盖配置项
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        if let Some(v) = env_parse::<bool>("JID_HEADLESS")? {
            self.browser.headless = v;
        }
        if let Some(v) = env_parse::<u16>("JID_BROWSER_DEBUG_PORT")? {
            self.browser.debug_port = Some(v);
        }
        if let Ok(v) = std::env::var("JID_DOWNLOAD_DIR") {
            self.download.temp_directory = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<bool>("JID_CLOUD_ENABLED")? {
            self.cloud_storage.enabled = v;
        }
        if let Ok(v) = std::env::var("JID_DRIVE_ACCESS_TOKEN") {
            self.cloud_storage.access_token = Some(v);
        }
        Ok(())
    }

    /// 校验配置，任何非法值都会让运行在处理文档之前终止
    pub fn validate(&self) -> AppResult<()> {
        self.download.retry.validate()?;
        self.validation.validate("validation")?;
        for (key, doc_type) in &self.document_types {
            if let Some(rule) = &doc_type.validation {
                rule.validate(&format!("document_types.{}.validation", key))?;
            }
            if let Some(ext) = &doc_type.default_extension {
                check_extension(&format!("document_types.{}.default_extension", key), ext)?;
            }
        }

        if self.site.base_url.trim().is_empty() {
            return Err(AppError::invalid_config("site.base_url", "不能为空"));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| AppError::invalid_config("site.base_url", e.to_string()))?;
        if self.site.selectors.download_button.trim().is_empty() {
            return Err(AppError::invalid_config(
                "site.selectors.download_button",
                "不能为空",
            ));
        }
        if self.site.selectors.document_links.trim().is_empty() {
            return Err(AppError::invalid_config(
                "site.selectors.document_links",
                "不能为空",
            ));
        }
        regex::Regex::new(&self.site.title_processing.cleanup_regex).map_err(|e| {
            AppError::invalid_config("site.title_processing.cleanup_regex", e.to_string())
        })?;
        if self.download.timeout.is_zero() {
            return Err(AppError::invalid_config("download.timeout", "必须大于 0"));
        }

        if self.cloud_storage.enabled {
            if self.cloud_storage.root_folder_name.trim().is_empty() {
                return Err(AppError::invalid_config(
                    "cloud_storage.root_folder_name",
                    "启用云存储时不能为空",
                ));
            }
        }

        debug!("配置校验通过");
        Ok(())
    }
}

/// 扩展名必须以 '.' 开头
pub(crate) fn check_extension(field: &str, ext: &str) -> AppResult<()> {
    if !ext.starts_with('.') || ext.len() < 2 {
        return Err(AppError::invalid_config(
            field,
            format!("扩展名 '{}' 必须以 '.' 开头", ext),
        ));
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

/// 以秒（浮点数）表示的 Duration
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
