use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::department::Department;

/// departments.json 的两种写法：带 "departments" 键的对象，或直接是数组
#[derive(Deserialize)]
#[serde(untagged)]
enum DepartmentsFile {
    Wrapped { departments: Vec<Department> },
    Bare(Vec<Department>),
}

#[derive(Serialize)]
struct DepartmentsReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    departments: &'a [Department],
}

/// 从 JSON 文件加载部门列表
///
/// 文件不存在或格式错误属于配置错误，整个运行终止
pub async fn load_departments(path: &Path) -> AppResult<Vec<Department>> {
    if !path.exists() {
        return Err(ConfigError::FileMissing {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let mut departments = parse_departments(&content).map_err(|source| FileError::JsonParseFailed {
        path: path.display().to_string(),
        source,
    })?;

    for department in &mut departments {
        department.normalize();
        tracing::info!(
            "已加载部门: {} ({} 个文档{})",
            department.name,
            department.total_documents(),
            if department.enabled { "" } else { ", 已禁用" }
        );
    }

    let mut seen = std::collections::HashSet::new();
    for department in &departments {
        if department.name.trim().is_empty() {
            return Err(AppError::invalid_config(
                format!("departments[{}].name", department.id),
                "不能为空",
            ));
        }
        if !seen.insert(department.id.as_str()) {
            return Err(AppError::invalid_config(
                "departments.id",
                format!("重复的部门 ID: {}", department.id),
            ));
        }
    }

    Ok(departments)
}

/// 解析部门 JSON 文本
pub fn parse_departments(content: &str) -> Result<Vec<Department>, serde_json::Error> {
    let file: DepartmentsFile = serde_json::from_str(content)?;
    Ok(match file {
        DepartmentsFile::Wrapped { departments } => departments,
        DepartmentsFile::Bare(departments) => departments,
    })
}

/// 写出带状态的部门报告
pub async fn save_departments(path: &Path, departments: &[Department]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
    }

    let report = DepartmentsReport {
        generated_at: chrono::Utc::now(),
        departments,
    };
    let content = serde_json::to_string_pretty(&report).map_err(|source| {
        FileError::JsonParseFailed {
            path: path.display().to_string(),
            source,
        }
    })?;

    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    tracing::info!("状态报告已写入: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentStatus};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_load_wrapped_and_bare() {
        let dir = tempfile::tempdir().unwrap();

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(
            &wrapped,
            r#"{ "departments": [ { "id": "sales", "name": "SALES", "documents": [
                { "title": "A", "url": "https://example.com/a" } ] } ] }"#,
        )
        .unwrap();
        let departments = load_departments(&wrapped).await.unwrap();
        assert_eq!(departments.len(), 1);
        assert_eq!(departments[0].documents[0].department, "SALES");

        let bare = dir.path().join("bare.json");
        std::fs::write(&bare, r#"[ { "id": "hr", "name": "HR", "enabled": false } ]"#).unwrap();
        let departments = load_departments(&bare).await.unwrap();
        assert!(!departments[0].enabled);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_departments(&dir.path().join("departments.json"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("departments.json");
        std::fs::write(
            &path,
            r#"[ { "id": "a", "name": "A" }, { "id": "a", "name": "B" } ]"#,
        )
        .unwrap();
        assert!(load_departments(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");

        let mut dept = Department::new("sales", "SALES");
        dept.add_document(Document::new("A", "", "https://example.com/a"));
        dept.documents[0]
            .mark_completed(PathBuf::from("a.docx"), 5000)
            .unwrap();

        save_departments(&path, std::slice::from_ref(&dept))
            .await
            .unwrap();
        let loaded = load_departments(&path).await.unwrap();
        assert_eq!(loaded[0], dept);
        assert_eq!(loaded[0].documents[0].status(), DocumentStatus::Completed);
    }
}
