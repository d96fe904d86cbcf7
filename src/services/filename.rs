//! 文件名清理服务 - 业务能力层
//!
//! 把任意标题转换为安全、长度受限的文件名，纯函数，结果确定

use std::sync::OnceLock;

use regex::Regex;

use crate::models::DocumentType;

/// 文件名主体的最大字符数
pub const MAX_BASE_CHARS: usize = 100;
/// 完整文件名的最大字符数
pub const MAX_FILENAME_CHARS: usize = 104;
/// 标题清理后为空时使用的文件名
const FALLBACK_BASE: &str = "document";

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s-]").expect("静态正则"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("静态正则"))
}

/// 文件名清理服务
#[derive(Debug, Clone)]
pub struct FilenameSanitizer {
    default_extension: String,
}

impl Default for FilenameSanitizer {
    fn default() -> Self {
        Self::new(".docx")
    }
}

impl FilenameSanitizer {
    pub fn new(default_extension: impl Into<String>) -> Self {
        Self {
            default_extension: default_extension.into(),
        }
    }

    /// 使用默认扩展名生成文件名
    pub fn sanitize(&self, title: &str) -> String {
        self.sanitize_with_extension(title, &self.default_extension)
    }

    /// 使用文档类型对应的默认扩展名生成文件名
    pub fn sanitize_for_type(&self, title: &str, doc_type: &DocumentType) -> String {
        self.sanitize_with_extension(title, doc_type.default_extension())
    }

    /// 使用指定扩展名生成文件名
    ///
    /// 1. 去掉字母、数字、空白、连字符以外的字符
    /// 2. 连续的空白 / 连字符合并为一个连字符
    /// 3. 去掉首尾连字符
    /// 4. 截断主体，保证整个文件名不超过 104 个字符
    /// 5. 追加扩展名
    pub fn sanitize_with_extension(&self, title: &str, extension: &str) -> String {
        let base = sanitize_base(title, base_limit(extension));
        let base = if base.is_empty() {
            FALLBACK_BASE.to_string()
        } else {
            base
        };
        format!("{}{}", base, extension)
    }
}

/// 只清理主体部分，不加扩展名
pub fn sanitize_base(title: &str, max_chars: usize) -> String {
    let kept = disallowed_chars().replace_all(title, "");
    let collapsed = separators().replace_all(&kept, "-");
    let trimmed = collapsed.trim_matches('-');

    // 截断后可能以连字符结尾，再去一次
    let truncated: String = trimmed.chars().take(max_chars).collect();
    truncated.trim_end_matches('-').to_string()
}

fn base_limit(extension: &str) -> usize {
    MAX_BASE_CHARS.min(MAX_FILENAME_CHARS.saturating_sub(extension.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    #[test]
    fn test_cyrillic_title() {
        let sanitizer = FilenameSanitizer::default();
        assert_eq!(
            sanitizer.sanitize("Должностная инструкция менеджера по продажам"),
            "Должностная-инструкция-менеджера-по-продажам.docx"
        );
    }

    #[test]
    fn test_special_characters_removed() {
        let sanitizer = FilenameSanitizer::default();
        assert_eq!(
            sanitizer.sanitize("Test Document with Special Characters!@#"),
            "Test-Document-with-Special-Characters.docx"
        );
        assert_eq!(
            sanitizer.sanitize(r#"  a<b>c:d"e/f\g|h?i*j  "#),
            "abcdefghij.docx"
        );
    }

    #[test]
    fn test_collapse_and_trim() {
        let sanitizer = FilenameSanitizer::default();
        assert_eq!(sanitizer.sanitize("--  Отдел -- кадров \t\n-"), "Отдел-кадров.docx");
        assert_eq!(sanitizer.sanitize("技术 说明书"), "技术-说明书.docx");
    }

    #[test]
    fn test_empty_title_falls_back() {
        let sanitizer = FilenameSanitizer::default();
        assert_eq!(sanitizer.sanitize("!!!"), "document.docx");
        assert_eq!(sanitizer.sanitize(""), "document.docx");
    }

    #[test]
    fn test_type_specific_extension() {
        let sanitizer = FilenameSanitizer::default();
        assert_eq!(
            sanitizer.sanitize_for_type("Договор поставки", &DocumentType::Contract),
            "Договор-поставки.pdf"
        );
        assert_eq!(
            sanitizer.sanitize_for_type("Руководство", &DocumentType::Manual),
            "Руководство.pdf"
        );
        assert_eq!(
            sanitizer.sanitize_for_type("Инструкция", &DocumentType::JobInstruction),
            "Инструкция.docx"
        );
    }

    #[test]
    fn test_length_bound_and_reserved_chars() {
        let sanitizer = FilenameSanitizer::default();
        let inputs = [
            "а".repeat(500),
            "word ".repeat(80),
            format!("{}-{}", "x".repeat(98), "yyyy"),
            "<>:\"/\\|?*".repeat(20),
            "🙂 emoji title 🙂".to_string(),
        ];
        for input in inputs.iter() {
            for ext in [".docx", ".pdf", ".doc"] {
                let name = sanitizer.sanitize_with_extension(input, ext);
                assert!(name.chars().count() <= MAX_FILENAME_CHARS, "{}", name);
                assert!(!name.contains(RESERVED), "{}", name);
                assert!(name.ends_with(ext));
            }
        }
    }

    #[test]
    fn test_exactly_100_char_title() {
        let sanitizer = FilenameSanitizer::default();
        let title = "я".repeat(100);

        // 整体上限优先：.docx 占 5 个字符，主体只剩 99
        let docx = sanitizer.sanitize(&title);
        assert_eq!(docx.chars().count(), MAX_FILENAME_CHARS);
        assert_eq!(docx, format!("{}.docx", "я".repeat(99)));

        let pdf = sanitizer.sanitize_with_extension(&title, ".pdf");
        assert_eq!(pdf, format!("{}.pdf", title));
        assert_eq!(pdf.chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_idempotent_on_base() {
        let sanitizer = FilenameSanitizer::default();
        let inputs = [
            "Должностная инструкция менеджера по продажам".to_string(),
            "  spaced -- out  ".to_string(),
            format!("{} {}", "x".repeat(98), "tail"),
            "word ".repeat(80),
        ];
        for input in inputs.iter() {
            let first = sanitizer.sanitize(input);
            let base = first.strip_suffix(".docx").unwrap();
            let second = sanitizer.sanitize(base);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_truncation_does_not_leave_trailing_hyphen() {
        let title = format!("{} {}", "x".repeat(98), "tail");
        let base = sanitize_base(&title, 99);
        assert_eq!(base, "x".repeat(98));
    }
}
