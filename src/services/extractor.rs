//! 文档列表提取服务 - 业务能力层
//!
//! 部门没有文档列表时，从站点起始页提取文档标题和链接

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{SiteConfig, TitleProcessing};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, PageElement, WaitCondition};
use crate::models::{Document, DocumentType};

fn onclick_location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"location\.href\s*=\s*['"]([^'"]+)['"]"#).expect("静态正则")
    })
}

/// 文档列表提取服务
pub struct DocumentExtractor {
    site: SiteConfig,
    cleanup: Regex,
}

impl DocumentExtractor {
    pub fn new(site: SiteConfig) -> AppResult<Self> {
        let cleanup = Regex::new(&site.title_processing.cleanup_regex).map_err(|e| {
            AppError::invalid_config("site.title_processing.cleanup_regex", e.to_string())
        })?;
        Ok(Self { site, cleanup })
    }

    /// 打开起始页并提取文档
    ///
    /// # 参数
    /// - `driver`: 页面驱动
    /// - `department`: 文档所属部门名称
    /// - `document_type`: 提取出的文档类型
    /// - `timeout`: 等待页面加载的时间
    ///
    /// # 返回
    /// 提取到的文档，标题或链接缺失的元素会被跳过
    pub async fn extract(
        &self,
        driver: &dyn PageDriver,
        department: &str,
        document_type: &DocumentType,
        timeout: Duration,
    ) -> AppResult<Vec<Document>> {
        if self.site.start_url.is_empty() || self.site.base_url.is_empty() {
            warn!(department = department, "站点地址未配置，跳过提取");
            return Ok(Vec::new());
        }

        let full_url = format!("{}{}", self.site.base_url, self.site.start_url);
        info!(department = department, "🔍 打开文档列表: {}", full_url);
        driver.navigate(&full_url).await?;
        driver
            .wait_for(&WaitCondition::ElementPresent("body".to_string()), timeout)
            .await?;

        let selector = &self.site.selectors.document_links;
        let elements = driver.find_elements(selector).await?;
        debug!("选择器 {} 匹配到 {} 个元素", selector, elements.len());

        let mut documents = Vec::new();
        for element in &elements {
            let title = self.process_title(element.text.trim());
            let Some(url) = self.element_url(element) else {
                debug!("元素 #{} 没有链接，跳过", element.index);
                continue;
            };
            if title.is_empty() {
                debug!("元素 #{} 没有标题，跳过", element.index);
                continue;
            }
            documents.push(
                Document::new(title, department, url).with_type(document_type.clone()),
            );
        }

        info!(
            department = department,
            "✓ 提取到 {} 个文档 (候选元素 {} 个)",
            documents.len(),
            elements.len()
        );
        Ok(documents)
    }

    /// 按配置清理标题：去前缀 → 去后缀 → 截断 → 正则替换为空格
    pub fn process_title(&self, title: &str) -> String {
        clean_title(title, &self.site.title_processing, &self.cleanup)
    }

    /// 元素对应的文档地址
    pub fn element_url(&self, element: &PageElement) -> Option<String> {
        resolve_url(
            element.href.as_deref(),
            element.onclick.as_deref(),
            &self.site.base_url,
        )
    }
}

fn clean_title(title: &str, rules: &TitleProcessing, cleanup: &Regex) -> String {
    let mut title = title.trim().to_string();
    if title.is_empty() {
        return title;
    }

    for prefix in &rules.remove_prefixes {
        if let Some(rest) = title.strip_prefix(prefix.as_str()) {
            title = rest.trim().to_string();
        }
    }
    for suffix in &rules.remove_suffixes {
        if let Some(rest) = title.strip_suffix(suffix.as_str()) {
            title = rest.trim().to_string();
        }
    }
    if title.chars().count() > rules.max_length {
        title = title
            .chars()
            .take(rules.max_length)
            .collect::<String>()
            .trim()
            .to_string();
    }

    cleanup.replace_all(&title, " ").trim().to_string()
}

/// 解析链接：绝对地址原样返回，以 '/' 开头拼接站点地址，其他相对地址用 '/' 连接；
/// 没有 href 时尝试 onclick 中的 `location.href = '...'`
pub fn resolve_url(href: Option<&str>, onclick: Option<&str>, base_url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');

    if let Some(href) = href.map(str::trim).filter(|h| !h.is_empty()) {
        return Some(if href.starts_with("http") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", base, href)
        } else {
            format!("{}/{}", base, href)
        });
    }

    let onclick = onclick?;
    let target = onclick_location().captures(onclick)?.get(1)?.as_str();
    Some(if target.starts_with('/') {
        format!("{}{}", base, target)
    } else {
        target.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> TitleProcessing {
        TitleProcessing {
            remove_prefixes: vec!["Должностная инструкция".to_string()],
            remove_suffixes: vec!["(профессиональный стандарт)".to_string()],
            max_length: 50,
            cleanup_regex: r"\s+".to_string(),
        }
    }

    fn clean(title: &str) -> String {
        let rules = rules();
        let re = Regex::new(&rules.cleanup_regex).unwrap();
        clean_title(title, &rules, &re)
    }

    #[test]
    fn test_prefix_and_suffix_removed() {
        assert_eq!(
            clean("Должностная инструкция Менеджер (профессиональный стандарт)"),
            "Менеджер"
        );
    }

    #[test]
    fn test_long_title_truncated() {
        let long = format!("Должностная инструкция {}", "А".repeat(100));
        assert!(clean(&long).chars().count() <= 50);
    }

    #[test]
    fn test_whitespace_normalized() {
        assert_eq!(clean("  Инструкция \n\t бухгалтера  "), "Инструкция бухгалтера");
        assert_eq!(clean("   "), "");
    }

    #[test]
    fn test_resolve_href_forms() {
        let base = "https://cloud.consultant.ru";
        assert_eq!(
            resolve_url(Some("/document/123"), None, base).as_deref(),
            Some("https://cloud.consultant.ru/document/123")
        );
        assert_eq!(
            resolve_url(Some("https://cloud.consultant.ru/document/456"), None, base).as_deref(),
            Some("https://cloud.consultant.ru/document/456")
        );
        assert_eq!(
            resolve_url(Some("document/789"), None, base).as_deref(),
            Some("https://cloud.consultant.ru/document/789")
        );
    }

    #[test]
    fn test_resolve_onclick() {
        let base = "https://www.consultant.ru/";
        assert_eq!(
            resolve_url(None, Some("location.href = '/doc/1'"), base).as_deref(),
            Some("https://www.consultant.ru/doc/1")
        );
        assert_eq!(
            resolve_url(Some(""), Some(r#"location.href="https://x.ru/2""#), base).as_deref(),
            Some("https://x.ru/2")
        );
        assert_eq!(resolve_url(None, Some("doSomething()"), base), None);
        assert_eq!(resolve_url(None, None, base), None);
    }
}
