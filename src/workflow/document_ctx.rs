//! 文档处理上下文
//!
//! 封装"我正在处理哪个部门的第几个文档"这一信息

use std::fmt::Display;

use crate::utils::logging::truncate_text;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 部门名称
    pub department: String,

    /// 部门在云端的文件夹名称
    pub folder_name: String,

    /// 文档在部门中的索引（从1开始）
    pub document_index: usize,

    /// 部门文档总数
    pub department_total: usize,

    /// 文档标题
    pub title: String,
}

impl DocumentCtx {
    /// 创建新的文档上下文
    pub fn new(
        department: impl Into<String>,
        document_index: usize,
        department_total: usize,
        title: impl Into<String>,
    ) -> Self {
        let department = department.into();
        Self {
            folder_name: department.clone(),
            department,
            document_index,
            department_total,
            title: title.into(),
        }
    }

    /// 指定云端文件夹名称，为空时沿用部门名称
    pub fn with_folder_name(mut self, folder_name: &str) -> Self {
        if !folder_name.trim().is_empty() {
            self.folder_name = folder_name.to_string();
        }
        self
    }

    /// 状态回调使用的进度描述
    pub fn status_message(&self) -> String {
        format!(
            "正在下载 {} ({}/{}): {}",
            self.department,
            self.document_index,
            self.department_total,
            truncate_text(&self.title, 60)
        )
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[部门 {} 文档#{}/{}]",
            self.department, self.document_index, self.department_total
        )
    }
}
