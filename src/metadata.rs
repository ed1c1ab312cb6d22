//! Book title and author resolution
//!
//! The title comes from the source file name, the author from an in-text
//! `作者：` marker, the caller, or a configured default, in that order.

use std::sync::LazyLock;

use regex::Regex;

use crate::{types::BookMetadata, utils::strip_invalid_xml_chars};

static TITLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"《([^》]+)》").expect("title marker pattern is valid"));

static AUTHOR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"作者[:：]\s*(.+)").expect("author marker pattern is valid"));

/// Derives the book title from the source file name
///
/// The content of the first `《...》` pair wins. Without one, the final extension
/// is stripped from the file name. Only characters XML cannot carry are removed.
pub fn extract_title(file_name: &str) -> String {
    if let Some(captures) = TITLE_MARKER.captures(file_name) {
        return strip_invalid_xml_chars(&captures[1]);
    }

    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => strip_invalid_xml_chars(stem),
        _ => strip_invalid_xml_chars(file_name),
    }
}

/// Finds the author declared in the text, if any
pub fn extract_author(text: &str) -> Option<String> {
    AUTHOR_MARKER
        .captures(text)
        .map(|captures| strip_invalid_xml_chars(&captures[1]).trim().to_string())
        .filter(|author| !author.is_empty())
}

/// Resolves the author with the precedence text marker > override > default
///
/// An empty or blank override counts as absent.
pub fn resolve_author(text: &str, author_override: Option<&str>, default_author: &str) -> String {
    if let Some(author) = extract_author(text) {
        return author;
    }

    match author_override.map(str::trim) {
        Some(author) if !author.is_empty() => strip_invalid_xml_chars(author),
        _ => default_author.to_string(),
    }
}

impl BookMetadata {
    pub fn new(title: &str, author: &str, chapter_count: usize) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            chapter_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{extract_author, extract_title, resolve_author};

    #[test]
    fn test_extract_title_from_marker() {
        assert_eq!(extract_title("《测试小说》作者.txt"), "测试小说");
        assert_eq!(extract_title("[精校]《斗破苍穹》全本.txt"), "斗破苍穹");
    }

    #[test]
    fn test_extract_title_without_marker() {
        assert_eq!(extract_title("novel.txt"), "novel");
        assert_eq!(extract_title("my.novel.txt"), "my.novel");
        assert_eq!(extract_title("novel"), "novel");
        assert_eq!(extract_title("no\u{1}vel.txt"), "novel");
    }

    /// An empty marker is not a title
    #[test]
    fn test_extract_title_empty_marker() {
        assert_eq!(extract_title("《》.txt"), "《》");
    }

    #[test]
    fn test_extract_author() {
        assert_eq!(
            extract_author("书名\n作者：张三\n第一章"),
            Some("张三".to_string())
        );
        assert_eq!(extract_author("作者: Li Si \n"), Some("Li Si".to_string()));
        assert_eq!(extract_author("第一章 开始"), None);
        assert_eq!(extract_author("作者：张\u{1}三\u{c}"), Some("张三".to_string()));
    }

    /// The in-text marker wins over any caller-supplied author
    #[test]
    fn test_resolve_author_precedence() {
        let text = "作者：张三\n第一章 开始";

        assert_eq!(resolve_author(text, Some("李四"), "未知作者"), "张三");
        assert_eq!(resolve_author("第一章", Some("李四"), "未知作者"), "李四");
        assert_eq!(resolve_author("第一章", Some("  "), "未知作者"), "未知作者");
        assert_eq!(resolve_author("第一章", None, "未知作者"), "未知作者");
    }
}
