use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::document::{Document, DocumentStatus};

fn default_priority() -> i32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// 部门：拥有一组按顺序排列的文档
///
/// 统计值（总数 / 完成数 / 失败数 / 进度）每次都从文档重新计算，不单独保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub folder_name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, alias = "job_instructions")]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl Department {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            folder_name: name.clone(),
            name,
            priority: default_priority(),
            enabled: default_enabled(),
            documents: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// 添加文档，文档的部门字段统一为本部门名称
    pub fn add_document(&mut self, mut document: Document) {
        document.department = self.name.clone();
        self.documents.push(document);
    }

    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn completed_documents(&self) -> usize {
        self.count(DocumentStatus::Completed)
    }

    pub fn failed_documents(&self) -> usize {
        self.count(DocumentStatus::Failed)
    }

    pub fn pending_documents(&self) -> usize {
        self.total_documents() - self.completed_documents() - self.failed_documents()
    }

    /// 完成百分比，没有文档时为 0
    pub fn progress_percentage(&self) -> f64 {
        let total = self.total_documents();
        if total == 0 {
            return 0.0;
        }
        self.completed_documents() as f64 / total as f64 * 100.0
    }

    /// 补全加载时缺省的字段
    pub(crate) fn normalize(&mut self) {
        if self.folder_name.is_empty() {
            self.folder_name = self.name.clone();
        }
        for document in &mut self.documents {
            if document.department.is_empty() {
                document.department = self.name.clone();
            }
        }
    }

    fn count(&self, status: DocumentStatus) -> usize {
        self.documents
            .iter()
            .filter(|d| d.status() == status)
            .count()
    }
}
