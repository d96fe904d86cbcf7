use std::time::Duration;

use thiserror::Error;

/// 错误类别
///
/// 调用方只需要看类别就能决定是否重试，不需要逐个匹配错误变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 网络 / 超时等临时错误，可以重试
    Transient,
    /// 文件校验失败，不重试
    Validation,
    /// 配置错误，整个运行直接终止
    Configuration,
    /// 资源（浏览器会话等）无法建立，整个运行直接终止
    ResourceSetup,
    /// 其他内部错误
    Internal,
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 远程存储错误
    #[error("远程存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 文档校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {message}")]
    LaunchFailed { message: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待超时
    #[error("等待 {what} 超时 ({timeout:?})")]
    Timeout { what: String, timeout: Duration },
    /// 页面元素不存在
    #[error("页面元素不存在: {selector} #{index}")]
    ElementNotFound { selector: String, index: usize },
    /// 页面操作失败
    #[error("页面操作失败: {source}")]
    CommandFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 会话已关闭
    #[error("浏览器会话已关闭")]
    SessionClosed,
}

/// 远程存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 请求失败
    #[error("存储请求失败 ({operation}): {source}")]
    RequestFailed {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回错误响应
    #[error("存储返回错误响应 ({operation}): status={status}, body={body}")]
    BadResponse {
        operation: String,
        status: u16,
        body: String,
    },
    /// 无法解析或创建目标文件夹
    #[error("无法获取文件夹: {path}")]
    FolderUnavailable { path: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 重命名失败
    #[error("重命名文件失败 ({from} -> {to}): {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文档校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 下载的文件未通过校验
    #[error("文件未通过校验: {path}")]
    Rejected { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件缺失
    #[error("配置文件不存在: {path}")]
    FileMissing { path: String },
    /// 字段取值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl AppError {
    /// 获取错误类别
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::Browser(BrowserError::ConnectionFailed { .. })
            | AppError::Browser(BrowserError::LaunchFailed { .. }) => FailureKind::ResourceSetup,
            AppError::Browser(_) | AppError::Storage(_) => FailureKind::Transient,
            AppError::File(FileError::ReadFailed { .. }) => FailureKind::Transient,
            AppError::File(_) => FailureKind::Internal,
            AppError::Validation(_) => FailureKind::Validation,
            AppError::Config(_) => FailureKind::Configuration,
            AppError::Other(_) => FailureKind::Internal,
        }
    }

    /// 是否为临时错误
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// 是否会终止整个运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Configuration | FailureKind::ResourceSetup
        )
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::CommandFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Storage(StorageError::RequestFailed {
            operation: err
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_default(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建等待超时错误
    pub fn browser_timeout(what: impl Into<String>, timeout: Duration) -> Self {
        AppError::Browser(BrowserError::Timeout {
            what: what.into(),
            timeout,
        })
    }

    /// 创建存储请求失败错误
    pub fn storage_request_failed(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::RequestFailed {
            operation: operation.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置项非法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
