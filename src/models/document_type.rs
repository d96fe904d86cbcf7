//! 文档类型
//!
//! 类型决定默认扩展名、允许的扩展名以及校验规则

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::DocumentTypeSettings;
use crate::services::validator::ValidationRule;

/// 文档类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DocumentType {
    /// 岗位说明书
    #[default]
    JobInstruction,
    /// 合同
    Contract,
    /// 手册
    Manual,
    /// 其他自定义类型
    Other(String),
}

impl DocumentType {
    /// 类型键名
    pub fn key(&self) -> &str {
        match self {
            DocumentType::JobInstruction => "job_instruction",
            DocumentType::Contract => "contract",
            DocumentType::Manual => "manual",
            DocumentType::Other(key) => key,
        }
    }

    /// 从键名解析
    pub fn from_key(key: &str) -> Self {
        match key {
            "job_instruction" => DocumentType::JobInstruction,
            "contract" => DocumentType::Contract,
            "manual" => DocumentType::Manual,
            other => DocumentType::Other(other.to_string()),
        }
    }

    /// 内置默认扩展名
    pub fn default_extension(&self) -> &'static str {
        match self {
            DocumentType::Contract | DocumentType::Manual => ".pdf",
            DocumentType::JobInstruction | DocumentType::Other(_) => ".docx",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for DocumentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(DocumentType::from_key(&key))
    }
}

/// 文档类型注册表
///
/// 由 `settings.json` 的 `document_types` 构建，只读
#[derive(Debug, Clone)]
pub struct DocumentTypeRegistry {
    types: BTreeMap<String, DocumentTypeSettings>,
    fallback_rule: ValidationRule,
}

impl DocumentTypeRegistry {
    pub fn new(
        types: BTreeMap<String, DocumentTypeSettings>,
        fallback_rule: ValidationRule,
    ) -> Self {
        Self {
            types,
            fallback_rule,
        }
    }

    pub fn settings(&self, doc_type: &DocumentType) -> Option<&DocumentTypeSettings> {
        self.types.get(doc_type.key())
    }

    /// 是否为已配置的类型
    pub fn is_known(&self, doc_type: &DocumentType) -> bool {
        self.types.contains_key(doc_type.key())
    }

    /// 已配置的类型键名
    pub fn available_types(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// 默认扩展名：配置优先，其次内置值
    pub fn default_extension<'a>(&'a self, doc_type: &'a DocumentType) -> &'a str {
        self.settings(doc_type)
            .and_then(|s| s.default_extension.as_deref())
            .unwrap_or_else(|| doc_type.default_extension())
    }

    /// 允许的扩展名
    pub fn supported_extensions(&self, doc_type: &DocumentType) -> &[String] {
        self.settings(doc_type)
            .map(|s| s.supported_extensions.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_extension_supported(&self, doc_type: &DocumentType, extension: &str) -> bool {
        self.supported_extensions(doc_type)
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// 校验规则：类型单独配置的规则优先
    ///
    /// 类型配置了 `supported_extensions` 而规则本身没有限制扩展名时，用前者补全
    pub fn validation_rule(&self, doc_type: &DocumentType) -> ValidationRule {
        let settings = self.settings(doc_type);
        let mut rule = settings
            .and_then(|s| s.validation.clone())
            .unwrap_or_else(|| self.fallback_rule.clone());
        if rule.accepted_extensions.is_empty() {
            if let Some(s) = settings {
                rule.accepted_extensions = s.supported_extensions.clone();
            }
        }
        rule
    }
}
