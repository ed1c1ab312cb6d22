//! Chapter Segmenter
//!
//! This module splits a decoded text into an ordered sequence of chapters.
//! Heading detection is isolated behind the [HeadingMatcher] trait so that other
//! heading grammars can be plugged in without touching package assembly.
//!
//! ## Default grammar
//!
//! A heading starts at the beginning of the text or right after a line break and is
//! one of:
//! - `第` + a run of Chinese numerals or digits + `章` or `卷`, and the rest of the line
//! - the literal word `楔子` or `引言`
//! - `序章` and the rest of the line
//!
//! Headings containing `第N卷` anywhere are volume dividers and render as `<h1>`, every
//! other heading renders as `<h2>`.

use std::sync::LazyLock;

use log::debug;
use quick_xml::escape::escape;
use regex::Regex;

use crate::{error::ConvertError, types::Chapter, utils::strip_invalid_xml_chars};

const HEADING_PATTERN: &str =
    r"(?:^|\n)(第[一二三四五六七八九十零〇两百千万0-9０-９]+[章卷][^\n]*|楔子|引言|序章[^\n]*)";

const VOLUME_PATTERN: &str = r"第[一二三四五六七八九十零〇两百千万0-9０-９]+卷";

static DEFAULT_MATCHER: LazyLock<RegexHeadingMatcher> = LazyLock::new(|| RegexHeadingMatcher {
    heading: Regex::new(HEADING_PATTERN).expect("default heading pattern is valid"),
    volume: Regex::new(VOLUME_PATTERN).expect("default volume pattern is valid"),
});

/// Level of a heading in the rendered chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    /// Volume divider, rendered as a top-level heading
    Volume,

    /// Ordinary chapter, rendered as a second-level heading
    Chapter,
}

impl HeadingLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            HeadingLevel::Volume => "h1",
            HeadingLevel::Chapter => "h2",
        }
    }
}

/// A heading located in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    /// The heading text, trimmed
    pub title: String,

    /// Byte offset where the match starts, including a leading line break
    pub start: usize,

    /// Byte offset right after the heading
    pub end: usize,
}

/// Strategy for locating and classifying chapter headings
///
/// Implementations must return matches in ascending, non-overlapping order.
pub trait HeadingMatcher: Send + Sync {
    /// Locates every heading of the text
    fn find_headings(&self, text: &str) -> Vec<HeadingMatch>;

    /// Decides how a heading found by `find_headings` is rendered
    fn classify(&self, title: &str) -> HeadingLevel;
}

/// Regex-based heading matcher
///
/// The heading pattern's first capture group, when present, is the heading text;
/// otherwise the whole match is used. A heading matching the volume pattern is
/// classified as [HeadingLevel::Volume].
#[derive(Debug, Clone)]
pub struct RegexHeadingMatcher {
    heading: Regex,
    volume: Regex,
}

impl RegexHeadingMatcher {
    /// Create a matcher from custom patterns
    ///
    /// # Return
    /// - `Ok(RegexHeadingMatcher)`: Both patterns compiled
    /// - `Err(ConvertError)`: One of the patterns is not a valid regex
    pub fn new(heading_pattern: &str, volume_pattern: &str) -> Result<Self, ConvertError> {
        Ok(Self {
            heading: Regex::new(heading_pattern)?,
            volume: Regex::new(volume_pattern)?,
        })
    }
}

impl Default for RegexHeadingMatcher {
    fn default() -> Self {
        DEFAULT_MATCHER.clone()
    }
}

impl HeadingMatcher for RegexHeadingMatcher {
    fn find_headings(&self, text: &str) -> Vec<HeadingMatch> {
        self.heading
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let title = captures.get(1).unwrap_or(whole);

                Some(HeadingMatch {
                    title: title.as_str().trim().to_string(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }

    fn classify(&self, title: &str) -> HeadingLevel {
        if self.volume.is_match(title) {
            HeadingLevel::Volume
        } else {
            HeadingLevel::Chapter
        }
    }
}

/// Splits the text into chapters
///
/// Text before the first heading is discarded. Each chapter's body runs until the
/// next heading or the end of the text.
///
/// # Return
/// - `Ok(Vec<Chapter>)`: Chapters in the order their headings appear
/// - `Err(ConvertError)`: No heading was found, or the matcher returned offsets
///   that do not delimit a slice of the text
pub fn segment_chapters(
    text: &str,
    matcher: &dyn HeadingMatcher,
) -> Result<Vec<Chapter>, ConvertError> {
    let headings = matcher.find_headings(text);
    if headings.is_empty() {
        return Err(ConvertError::NoChapterStructureDetected);
    }

    let mut chapters = Vec::with_capacity(headings.len());
    for (index, heading) in headings.iter().enumerate() {
        let body_end = headings
            .get(index + 1)
            .map_or(text.len(), |next| next.start);
        let body = text
            .get(heading.end..body_end)
            .ok_or(ConvertError::InvalidHeadingRange {
                start: heading.end,
                end: body_end,
            })?;

        let title = strip_invalid_xml_chars(&heading.title).trim().to_string();
        let level = matcher.classify(&title);
        chapters.push(Chapter {
            content: render_chapter(&title, level, body),
            title,
        });
    }

    debug!("Detected {} chapters", chapters.len());
    Ok(chapters)
}

/// Renders a heading and its body into body markup
///
/// Characters XML 1.0 cannot carry are removed, then body lines are trimmed and
/// blank lines dropped; every remaining line becomes one paragraph.
fn render_chapter(title: &str, level: HeadingLevel, body: &str) -> String {
    let paragraphs = body
        .lines()
        .map(strip_invalid_xml_chars)
        .filter_map(|line| {
            let line = line.trim();
            (!line.is_empty()).then(|| escape(line).into_owned())
        })
        .collect::<Vec<_>>();

    format!(
        "<{tag}>{title}</{tag}><p>{body}</p>",
        tag = level.tag(),
        title = escape(title),
        body = paragraphs.join("</p><p>"),
    )
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use crate::{
        error::ConvertError,
        segmenter::{HeadingLevel, HeadingMatch, HeadingMatcher, RegexHeadingMatcher, segment_chapters},
    };

    fn segment(text: &str) -> Result<Vec<crate::types::Chapter>, ConvertError> {
        segment_chapters(text, &RegexHeadingMatcher::default())
    }

    #[test]
    fn test_segment_two_chapters() {
        let chapters = segment("第一章 开始\n这是第一段。\n第二章 结束\n完结。").unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "第一章 开始");
        assert_eq!(chapters[1].title, "第二章 结束");
        assert_eq!(chapters[0].content, "<h2>第一章 开始</h2><p>这是第一段。</p>");
        assert_eq!(chapters[1].content, "<h2>第二章 结束</h2><p>完结。</p>");
    }

    /// Text without any heading is rejected
    #[test]
    fn test_segment_without_headings() {
        let result = segment("这是一段没有章节的文字。\n还是没有。");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), ConvertError::NoChapterStructureDetected);
    }

    /// Text before the first heading, such as a preamble, is dropped
    #[test]
    fn test_segment_discards_preamble() {
        let chapters = segment("书名：测试\n作者：张三\n\n第1章 起\n内容").unwrap();

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "第1章 起");
        assert!(!chapters[0].content.contains("张三"));
    }

    #[test]
    fn test_segment_volume_and_chapter_levels() {
        let chapters = segment("第一卷 风起\n第一章 云涌\n正文\n第二卷 雨落\n第十二章 终").unwrap();

        let tags = chapters
            .iter()
            .map(|chapter| chapter.content.starts_with("<h1>"))
            .collect::<Vec<_>>();
        assert_eq!(tags, vec![true, false, true, false]);

        for chapter in &chapters {
            let h1 = chapter.content.starts_with("<h1>");
            let h2 = chapter.content.starts_with("<h2>");
            assert!(h1 ^ h2);
        }

        // Volume dividers without body get an empty paragraph block
        assert_eq!(chapters[0].content, "<h1>第一卷 风起</h1><p></p>");
    }

    /// Prologue and preface markers are headings too
    #[test]
    fn test_segment_prologue_and_preface() {
        let chapters = segment("序章 缘起\n很久以前\n楔子\n风\n引言\n话\n第一章 正文\n开始").unwrap();

        let titles = chapters
            .iter()
            .map(|chapter| chapter.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["序章 缘起", "楔子", "引言", "第一章 正文"]);
        assert_eq!(chapters[1].content, "<h2>楔子</h2><p>风</p>");
    }

    /// Only the literal word is the heading of a prologue line
    #[test]
    fn test_segment_prologue_rest_of_line_is_body() {
        let chapters = segment("楔子：风起\n正文").unwrap();

        assert_eq!(chapters[0].title, "楔子");
        assert_eq!(chapters[0].content, "<h2>楔子</h2><p>：风起</p><p>正文</p>");
    }

    /// Headings must start a line
    #[test]
    fn test_segment_ignores_inline_markers() {
        let chapters = segment("第一章 开始\n他翻到第二章看了看。\n第三章 结束").unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].title, "第三章 结束");
        assert!(chapters[0].content.contains("他翻到第二章看了看。"));
    }

    /// Blank lines, indentation and CRLF line breaks are normalized away
    #[test]
    fn test_segment_normalizes_body_lines() {
        let chapters = segment("第一章 开始\r\n\r\n\u{3000}\u{3000}第一段。\r\n\r\n\r\n  第二段。  \r\n").unwrap();

        assert_eq!(chapters[0].title, "第一章 开始");
        assert_eq!(
            chapters[0].content,
            "<h2>第一章 开始</h2><p>第一段。</p><p>第二段。</p>"
        );
    }

    #[test]
    fn test_segment_escapes_markup() {
        let chapters = segment("第一章 <A & B>\n1 < 2").unwrap();

        assert_eq!(chapters[0].title, "第一章 <A & B>");
        assert_eq!(
            chapters[0].content,
            "<h2>第一章 &lt;A &amp; B&gt;</h2><p>1 &lt; 2</p>"
        );
    }

    /// Output follows appearance order, not sorted order
    #[test]
    fn test_segment_keeps_source_order() {
        let headings = ["第三章 丙", "第一章 甲", "第二章 乙", "第一章 甲"];
        let text = headings
            .iter()
            .map(|heading| format!("{}\n内容", heading))
            .collect::<Vec<_>>()
            .join("\n");

        let chapters = segment(&text).unwrap();
        let titles = chapters
            .iter()
            .map(|chapter| chapter.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, headings.to_vec());
    }

    /// The chapter count equals an independent count of heading lines
    #[test]
    fn test_segment_count_matches_heading_lines() {
        let text = "前言\n第一百零一章 甲\n正文\n第２章 乙\n\n第三卷\n楔子\n序章\n他说第四章\n第5章";
        let counter = Regex::new(r"(?m)^(第[一二三四五六七八九十零〇两百千万0-9０-９]+[章卷]|楔子|引言|序章)")
            .unwrap();

        let chapters = segment(text).unwrap();
        assert_eq!(chapters.len(), counter.find_iter(text).count());
        assert_eq!(chapters.len(), 6);
    }

    /// Control characters forbidden in XML never reach the markup
    #[test]
    fn test_segment_strips_invalid_xml_chars() {
        let chapters = segment("第一章 开\u{1}始\n第一\u{c}段。\n\u{1}\u{c}\n第二段。").unwrap();

        assert_eq!(chapters[0].title, "第一章 开始");
        assert_eq!(
            chapters[0].content,
            "<h2>第一章 开始</h2><p>第一段。</p><p>第二段。</p>"
        );
    }

    /// Matches that overlap or split a character are rejected instead of panicking
    #[test]
    fn test_segment_invalid_heading_range() {
        struct OverlappingMatcher;

        impl HeadingMatcher for OverlappingMatcher {
            fn find_headings(&self, _text: &str) -> Vec<HeadingMatch> {
                vec![
                    HeadingMatch {
                        title: "甲".to_string(),
                        start: 0,
                        end: 7,
                    },
                    HeadingMatch {
                        title: "乙".to_string(),
                        start: 3,
                        end: 4,
                    },
                ]
            }

            fn classify(&self, _title: &str) -> HeadingLevel {
                HeadingLevel::Chapter
            }
        }

        let result = segment_chapters("第一章 开始", &OverlappingMatcher);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            ConvertError::InvalidHeadingRange { start: 7, end: 3 }
        );

        struct SplittingMatcher;

        impl HeadingMatcher for SplittingMatcher {
            fn find_headings(&self, _text: &str) -> Vec<HeadingMatch> {
                vec![HeadingMatch {
                    title: "第".to_string(),
                    start: 0,
                    end: 1,
                }]
            }

            fn classify(&self, _title: &str) -> HeadingLevel {
                HeadingLevel::Chapter
            }
        }

        assert!(matches!(
            segment_chapters("第一章", &SplittingMatcher).unwrap_err(),
            ConvertError::InvalidHeadingRange { start: 1, .. }
        ));
    }

    #[test]
    fn test_classify() {
        let matcher = RegexHeadingMatcher::default();

        assert_eq!(matcher.classify("第一卷 风起"), HeadingLevel::Volume);
        assert_eq!(matcher.classify("第12卷"), HeadingLevel::Volume);
        assert_eq!(matcher.classify("第一章 风起"), HeadingLevel::Chapter);
        assert_eq!(matcher.classify("第一章 重返第三卷"), HeadingLevel::Volume);
        assert_eq!(matcher.classify("楔子"), HeadingLevel::Chapter);
        assert_eq!(HeadingLevel::Volume.tag(), "h1");
        assert_eq!(HeadingLevel::Chapter.tag(), "h2");
    }

    /// A custom grammar can replace the default one
    #[test]
    fn test_custom_matcher() {
        let matcher = RegexHeadingMatcher::new(r"(?:^|\n)(Chapter \d+[^\n]*|Part \d+)", r"^Part")
            .unwrap();

        let chapters = segment_chapters("Part 1\nChapter 1 Dawn\nText\nChapter 2", &matcher).unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].content, "<h1>Part 1</h1><p></p>");
        assert_eq!(chapters[1].content, "<h2>Chapter 1 Dawn</h2><p>Text</p>");
    }

    #[test]
    fn test_custom_matcher_invalid_pattern() {
        let result = RegexHeadingMatcher::new(r"(unclosed", r"^Part");
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConvertError::InvalidHeadingPattern { .. }
        ));
    }
}
