use chrono::{SecondsFormat, Utc};
use sha1::{Digest, Sha1};

use crate::types::Chapter;

pub static ELEMENT_IN_DC_NAMESPACE: std::sync::LazyLock<Vec<&str>> =
    std::sync::LazyLock::new(|| {
        vec![
            "contributor",
            "coverage",
            "creator",
            "date",
            "description",
            "format",
            "identifier",
            "language",
            "publisher",
            "relation",
            "rights",
            "source",
            "subject",
            "title",
            "type",
        ]
    });

/// Returns the milliseconds elapsed since the Unix epoch
pub fn timestamp_millis() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Returns the current time in RFC 3339 format with millisecond precision
pub fn generation_date() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Removes characters that XML 1.0 documents cannot contain
///
/// Tab, line feed and carriage return are the only control characters kept.
pub fn strip_invalid_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(
                c,
                '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect()
}

/// Computes a stable identifier from the book's content
///
/// The digest covers the title, the author and every chapter in order. Each
/// field is terminated by a NUL byte so that moving text between adjacent fields
/// changes the digest.
///
/// ## Return
/// - `String`: An `urn:sha1:` URN with the lowercase hex digest
pub fn content_hash(title: &str, author: &str, chapters: &[Chapter]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(title.as_bytes());
    hasher.update([0]);
    hasher.update(author.as_bytes());
    hasher.update([0]);

    for chapter in chapters {
        hasher.update(chapter.title.as_bytes());
        hasher.update([0]);
        hasher.update(chapter.content.as_bytes());
        hasher.update([0]);
    }

    let digest = hasher.finalize();
    let hex = digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>();

    format!("urn:sha1:{}", hex)
}
