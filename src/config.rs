//! Conversion options
//!
//! `ConvertOptions` gathers every tunable of a conversion: input limits,
//! compression level, document language and the strategies for identifiers and
//! encoding fallback. Options are immutable once handed to a `Converter`.

/// Default maximum size of the source text, 50 MiB
pub const DEFAULT_MAX_TEXT_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum size of the cover image, 10 MiB
pub const DEFAULT_MAX_COVER_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

pub const DEFAULT_AUTHOR: &str = "未知作者";

pub const DEFAULT_COVER_TITLE: &str = "封面";

pub const DEFAULT_STYLESHEET: &str = r#"body {
    font-family: "PingFang SC", "Hiragino Sans GB", "Microsoft YaHei", "WenQuanYi Micro Hei", sans-serif;
    line-height: 1.8;
    margin: 0;
    padding: 20px;
    background: #fff;
    color: #333;
}
h1, h2 {
    text-align: center;
    margin: 30px 0 20px 0;
    color: #2c3e50;
    border-bottom: 2px solid #3498db;
    padding-bottom: 10px;
}
p {
    text-indent: 2em;
    margin: 0 0 1em 0;
    text-align: justify;
}
"#;

/// How the package's unique identifier is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierStrategy {
    /// Milliseconds since the Unix epoch at generation time
    ///
    /// Two conversions within the same millisecond share an identifier.
    #[default]
    Timestamp,

    /// SHA-1 digest of the title, author and chapter contents
    ///
    /// Converting the same book twice yields the same identifier.
    ContentHash,
}

/// What to do when the text is not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingPolicy {
    /// Decode as GBK and replace unmappable sequences
    #[default]
    BestEffort,

    /// Decode as GBK and fail on any unmappable sequence
    Strict,
}

/// Options for a conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Maximum accepted size of the source text in bytes
    pub max_text_size: usize,

    /// Maximum accepted size of the cover image in bytes
    pub max_cover_size: usize,

    /// Deflate level for every entry except `mimetype`
    ///
    /// `None` lets the zip backend choose its own default.
    pub compression_level: Option<i64>,

    /// Value of `dc:language` and of the `xml:lang` of generated documents
    pub language: String,

    /// Author used when neither the text nor the caller provides one
    pub default_author: String,

    /// Label of the title page in the navigation map
    pub cover_title: String,

    /// Content of the shared `style.css`
    pub stylesheet: String,

    pub identifier: IdentifierStrategy,

    pub encoding: EncodingPolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
            max_cover_size: DEFAULT_MAX_COVER_SIZE,
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
            language: "zh".to_string(),
            default_author: DEFAULT_AUTHOR.to_string(),
            cover_title: DEFAULT_COVER_TITLE.to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            identifier: IdentifierStrategy::default(),
            encoding: EncodingPolicy::default(),
        }
    }
}

impl ConvertOptions {
    pub fn with_max_text_size(mut self, size: usize) -> Self {
        self.max_text_size = size;
        self
    }

    pub fn with_max_cover_size(mut self, size: usize) -> Self {
        self.max_cover_size = size;
        self
    }

    /// Set the deflate level
    ///
    /// The valid range is 0 to 9 for the deflate backend.
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_default_author(mut self, author: &str) -> Self {
        self.default_author = author.to_string();
        self
    }

    pub fn with_cover_title(mut self, title: &str) -> Self {
        self.cover_title = title.to_string();
        self
    }

    pub fn with_stylesheet(mut self, stylesheet: &str) -> Self {
        self.stylesheet = stylesheet.to_string();
        self
    }

    pub fn with_identifier(mut self, strategy: IdentifierStrategy) -> Self {
        self.identifier = strategy;
        self
    }

    pub fn with_encoding(mut self, policy: EncodingPolicy) -> Self {
        self.encoding = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConvertOptions, EncodingPolicy, IdentifierStrategy};

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();

        assert_eq!(options.max_text_size, 50 * 1024 * 1024);
        assert_eq!(options.max_cover_size, 10 * 1024 * 1024);
        assert_eq!(options.compression_level, Some(6));
        assert_eq!(options.language, "zh");
        assert_eq!(options.default_author, "未知作者");
        assert_eq!(options.identifier, IdentifierStrategy::Timestamp);
        assert_eq!(options.encoding, EncodingPolicy::BestEffort);
    }

    #[test]
    fn test_option_setters() {
        let options = ConvertOptions::default()
            .with_max_text_size(10)
            .with_compression_level(None)
            .with_identifier(IdentifierStrategy::ContentHash)
            .with_encoding(EncodingPolicy::Strict)
            .with_cover_title("Cover");

        assert_eq!(options.max_text_size, 10);
        assert_eq!(options.compression_level, None);
        assert_eq!(options.identifier, IdentifierStrategy::ContentHash);
        assert_eq!(options.encoding, EncodingPolicy::Strict);
        assert_eq!(options.cover_title, "Cover");
    }
}
