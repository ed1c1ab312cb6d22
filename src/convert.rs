//! Conversion pipeline
//!
//! The [Converter] runs a whole conversion in one pass: size checks, text
//! decoding, title and author resolution, chapter segmentation, cover loading,
//! package assembly and archive serialization. It holds only immutable options
//! and a heading matcher, so one converter can serve concurrent requests.
//!
//! ## Usage
//!
//! ```rust, no_run
//! # fn main() -> Result<(), txt_epub::error::ConvertError> {
//! use txt_epub::{config::ConvertOptions, convert::{ConversionRequest, Converter}};
//!
//! let converter = Converter::new(ConvertOptions::default());
//! let request = ConversionRequest::new(
//!     "第一章 开始\n这是第一段。".as_bytes().to_vec(),
//!     "《测试小说》.txt",
//! );
//!
//! let output = converter.convert(&request)?;
//! std::fs::write(&output.output_file_name, &output.archive_bytes)?;
//! # Ok(())
//! # }
//! ```

use std::{fs, path::Path};

use log::info;

use crate::{
    archive::ArchiveWriter,
    config::ConvertOptions,
    cover::{load_cover, supported_subtype},
    encoding::DecodeText,
    error::ConvertError,
    metadata::{extract_title, resolve_author},
    package::assemble_package,
    segmenter::{HeadingMatcher, RegexHeadingMatcher, segment_chapters},
    types::BookMetadata,
};

/// Everything a caller supplies for one conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// The raw source text, UTF-8 or GBK
    pub text_bytes: Vec<u8>,

    /// Name of the source file, used to derive the book title
    pub text_file_name: String,

    pub cover_bytes: Option<Vec<u8>>,

    /// Declared MIME type of the cover, required whenever a cover is supplied
    pub cover_mime_type: Option<String>,

    /// Author used when the text does not declare one
    pub author_override: Option<String>,
}

impl ConversionRequest {
    pub fn new(text_bytes: Vec<u8>, text_file_name: &str) -> Self {
        Self {
            text_bytes,
            text_file_name: text_file_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_cover(mut self, bytes: Vec<u8>, mime_type: &str) -> Self {
        self.cover_bytes = Some(bytes);
        self.cover_mime_type = Some(mime_type.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author_override = Some(author.to_string());
        self
    }

    /// Build a request from files on disk
    ///
    /// File sizes are checked against the limits of `options` before anything is
    /// read. The cover MIME type is sniffed from the file content; a cover whose
    /// type cannot be recognised is left without one, which the converter rejects.
    ///
    /// # Parameters
    /// - `text_path`: Path of the source text
    /// - `cover_path`: Path of the cover image, if any
    /// - `options`: Options holding the size limits
    pub fn from_paths<P: AsRef<Path>>(
        text_path: P,
        cover_path: Option<P>,
        options: &ConvertOptions,
    ) -> Result<Self, ConvertError> {
        let text_path = text_path.as_ref();
        check_size("text", fs::metadata(text_path)?.len() as usize, options.max_text_size)?;

        let mut request = Self::new(fs::read(text_path)?, &file_name(text_path));

        if let Some(cover_path) = cover_path {
            let cover_path = cover_path.as_ref();
            check_size(
                "cover image",
                fs::metadata(cover_path)?.len() as usize,
                options.max_cover_size,
            )?;

            let bytes = fs::read(cover_path)?;
            request.cover_mime_type = sniff_mime_type(&bytes);
            request.cover_bytes = Some(bytes);
        }

        Ok(request)
    }
}

/// The result of a successful conversion
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The complete EPUB container
    pub archive_bytes: Vec<u8>,

    /// Suggested file name, `<title>.epub`
    pub output_file_name: String,

    pub chapter_count: usize,

    pub metadata: BookMetadata,
}

/// Text to EPUB converter
pub struct Converter {
    options: ConvertOptions,
    matcher: Box<dyn HeadingMatcher>,
}

impl Converter {
    /// Create a converter using the default heading grammar
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            matcher: Box::new(RegexHeadingMatcher::default()),
        }
    }

    /// Replace the heading matcher
    pub fn with_matcher<M: HeadingMatcher + 'static>(mut self, matcher: M) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a request into an EPUB container
    ///
    /// Size limits and the declared cover MIME type are checked against the
    /// allow-list before the text is decoded.
    ///
    /// # Return
    /// - `Ok(ConversionOutput)`: The container and what it was built from
    /// - `Err(ConvertError)`: The first failure; no partial container is returned
    pub fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutput, ConvertError> {
        check_size("text", request.text_bytes.len(), self.options.max_text_size)?;

        let cover_input = match (&request.cover_bytes, &request.cover_mime_type) {
            (Some(bytes), Some(mime_type)) => {
                check_size("cover image", bytes.len(), self.options.max_cover_size)?;
                supported_subtype(mime_type)?;
                Some((bytes.as_slice(), mime_type.as_str()))
            }
            (Some(_), None) => return Err(ConvertError::MissingCoverMimeType),
            (None, _) => None,
        };

        let (text, encoding) = request.text_bytes.decode_text(self.options.encoding)?;
        let text = text.trim();

        let title = extract_title(&request.text_file_name);
        let author = resolve_author(
            text,
            request.author_override.as_deref(),
            &self.options.default_author,
        );

        let chapters = segment_chapters(text, self.matcher.as_ref())?;

        let cover = cover_input
            .map(|(bytes, mime_type)| load_cover(bytes, mime_type, self.options.max_cover_size))
            .transpose()?;

        let metadata = BookMetadata::new(&title, &author, chapters.len());
        let archive = assemble_package(&metadata, &chapters, cover.as_ref(), &self.options)?;
        let archive_bytes = ArchiveWriter::new(self.options.compression_level).write(&archive)?;

        info!(
            "Converted \"{}\" ({}) into {} chapters, {} bytes",
            title,
            encoding.label(),
            chapters.len(),
            archive_bytes.len()
        );

        Ok(ConversionOutput {
            archive_bytes,
            output_file_name: format!("{}.epub", title),
            chapter_count: chapters.len(),
            metadata,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_size(input: &str, size: usize, limit: usize) -> Result<(), ConvertError> {
    if size > limit {
        return Err(ConvertError::OversizedInput {
            input: input.to_string(),
            size,
            limit,
        });
    }

    Ok(())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn sniff_mime_type(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|kind| kind.mime_type().to_string())
}
