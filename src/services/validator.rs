//! 文档校验服务 - 业务能力层
//!
//! 只负责判断"下载下来的文件能不能用"，不关心流程

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::check_extension;
use crate::error::{AppError, AppResult};

/// 已知格式的文件头签名
static SIGNATURES: phf::Map<&'static str, &'static [u8]> = phf_map! {
    ".docx" => b"PK\x03\x04" as &[u8],
    ".doc" => b"\xD0\xCF\x11\xE0" as &[u8],
    ".pdf" => b"%PDF" as &[u8],
};

/// 读取文件头的最大字节数
const HEADER_LEN: usize = 8;

/// 单个文档类型的校验规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRule {
    /// 最小字节数（含）
    pub min_size: u64,
    /// 最大字节数（含）
    pub max_size: u64,
    /// 允许的扩展名，为空时不限制
    #[serde(alias = "expected_file_types")]
    pub accepted_extensions: Vec<String>,
    /// 是否检查文件头签名
    pub check_content: bool,
}

impl Default for ValidationRule {
    fn default() -> Self {
        Self {
            min_size: 30_000,
            max_size: 10_485_760,
            accepted_extensions: vec![".docx".to_string(), ".doc".to_string()],
            check_content: false,
        }
    }
}

impl ValidationRule {
    pub fn validate(&self, field: &str) -> AppResult<()> {
        if self.min_size > self.max_size {
            return Err(AppError::invalid_config(
                format!("{}.min_size", field),
                format!("{} 大于 max_size {}", self.min_size, self.max_size),
            ));
        }
        for ext in &self.accepted_extensions {
            check_extension(&format!("{}.accepted_extensions", field), ext)?;
        }
        Ok(())
    }

    fn accepts_extension(&self, ext: &str) -> bool {
        self.accepted_extensions.is_empty()
            || self
                .accepted_extensions
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

/// 文件元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub file_extension: String,
}

/// 结构检查结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub valid: bool,
    pub file_size: u64,
    pub file_type: String,
    pub errors: Vec<String>,
    pub metadata: Option<FileMetadata>,
}

/// 文档校验服务
///
/// 校验步骤依次为：存在 → 大小 → 扩展名 → 文件头（可选），任一步失败立即返回
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentValidator;

impl DocumentValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验文件
    ///
    /// # 返回
    /// 通过返回 true；任何 I/O 错误都视为不通过
    pub fn validate(&self, path: &Path, rule: &ValidationRule) -> bool {
        let size = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) | Err(_) => {
                error!("文件不存在: {}", path.display());
                return false;
            }
        };

        if size == 0 {
            error!("文件为空: {}", path.display());
            return false;
        }
        if size < rule.min_size {
            error!("文件过小: {} < {} ({})", size, rule.min_size, path.display());
            return false;
        }
        if size > rule.max_size {
            error!("文件过大: {} > {} ({})", size, rule.max_size, path.display());
            return false;
        }

        let ext = extension_of(path);
        if !rule.accepts_extension(&ext) {
            error!("文件类型不允许: '{}' ({})", ext, path.display());
            return false;
        }

        if rule.check_content && !self.validate_content(path) {
            error!("文件头与扩展名不符: {}", path.display());
            return false;
        }

        debug!("✓ 文件校验通过: {} ({} 字节)", path.display(), size);
        true
    }

    /// 检查文件头签名，未知扩展名直接通过
    pub fn validate_content(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        let Some(signature) = SIGNATURES.get(ext.as_str()) else {
            return true;
        };

        match read_header(path) {
            Ok(header) => header.starts_with(signature),
            Err(e) => {
                warn!("读取文件头失败 {}: {}", path.display(), e);
                false
            }
        }
    }

    /// 结构检查：收集所有错误，并在内容有效时提取元数据
    pub fn inspect(&self, path: &Path) -> StructureReport {
        let mut report = StructureReport::default();

        let meta = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                report.errors.push("File does not exist".to_string());
                return report;
            }
        };

        report.file_size = meta.len();
        report.file_type = extension_of(path);

        if self.validate_content(path) {
            report.valid = true;
            report.metadata = Some(FileMetadata {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                file_size: meta.len(),
                created_time: meta.created().ok().map(DateTime::<Utc>::from),
                modified_time: meta.modified().ok().map(DateTime::<Utc>::from),
                file_extension: report.file_type.clone(),
            });
        } else {
            report.errors.push("Invalid file content".to_string());
        }

        report
    }
}

/// 小写扩展名（带 '.'），没有扩展名时为空字符串
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = Vec::with_capacity(HEADER_LEN);
    file.by_ref().take(HEADER_LEN as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
