//! Error Type Definition Module
//!
//! This module defines the errors that may be encountered while converting a
//! plain-text novel into an EPUB package. All errors are uniformly wrapped in the
//! `ConvertError` enumeration, so a caller only ever receives one structured value
//! carrying a human-readable message.
//!
//! ## Main Error Types
//!
//! - [ConvertError] - Enumeration of errors that abort a conversion
//! - [PackageError] - Structural invariant violations detected while assembling the package

use thiserror::Error;

/// Types of errors that can occur during a conversion
///
/// Every variant aborts the whole conversion; no partial archive is ever produced.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Zip serialization error
    ///
    /// Occurs when the virtual file tree cannot be written into the compressed container.
    #[error("Archive serialization failure: {source}")]
    ArchiveSerializationFailure { source: zip::result::ZipError },

    /// Cover decoding error
    ///
    /// The supplied cover is not optional once given, so a cover that cannot be
    /// decoded aborts the conversion instead of being skipped.
    #[error("Cover image could not be loaded: {source}")]
    CoverDecodeFailure { source: image::ImageError },

    /// Text decoding error
    ///
    /// Only raised under `EncodingPolicy::Strict`, when the fallback encoding
    /// meets byte sequences it cannot map.
    #[error("Encoding decode failure: The text is neither valid UTF-8 nor valid {encoding}.")]
    EncodingDecodeFailure { encoding: String },

    /// A heading matcher returned offsets that do not delimit a slice of the text
    ///
    /// Raised when matches overlap, run backwards or split a character.
    #[error("Invalid heading range: Bytes {start}..{end} are not a valid slice of the text.")]
    InvalidHeadingRange { start: usize, end: usize },

    #[error("Invalid heading pattern: {source}")]
    InvalidHeadingPattern { source: regex::Error },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Missing cover MIME type error
    ///
    /// Cover bytes were supplied without declaring their MIME type.
    #[error("Missing cover mime type: A cover image was supplied without a mime type.")]
    MissingCoverMimeType,

    /// No chapter heading was recognized in the text
    #[error(
        "No chapter structure detected: Make sure the text contains chapter markers such as \"第X章\"."
    )]
    NoChapterStructureDetected,

    /// Input size error
    ///
    /// The text or the cover exceeds the configured limit.
    #[error("Oversized input: The {input} is {size} bytes, exceeding the limit of {limit} bytes.")]
    OversizedInput {
        input: String,
        size: usize,
        limit: usize,
    },

    #[error("Package error: {source}")]
    PackageError { source: PackageError },

    /// QuickXml error
    ///
    /// This error occurs when writing XML documents with the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },

    /// Unsupported cover format error
    ///
    /// Only jpeg, jpg, png and webp covers are accepted.
    #[error("Unsupported cover format: The \"{mime}\" format is not a supported cover format.")]
    UnsupportedCoverFormat { mime: String },
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(value: zip::result::ZipError) -> Self {
        ConvertError::ArchiveSerializationFailure { source: value }
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(value: image::ImageError) -> Self {
        ConvertError::CoverDecodeFailure { source: value }
    }
}

impl From<regex::Error> for ConvertError {
    fn from(value: regex::Error) -> Self {
        ConvertError::InvalidHeadingPattern { source: value }
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(value: quick_xml::Error) -> Self {
        ConvertError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(value: std::io::Error) -> Self {
        ConvertError::IOError { source: value }
    }
}

impl From<PackageError> for ConvertError {
    fn from(value: PackageError) -> Self {
        ConvertError::PackageError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for ConvertError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::EncodingDecodeFailure { encoding: l_encoding },
                Self::EncodingDecodeFailure { encoding: r_encoding },
            ) => l_encoding == r_encoding,
            (
                Self::InvalidHeadingRange {
                    start: l_start,
                    end: l_end,
                },
                Self::InvalidHeadingRange {
                    start: r_start,
                    end: r_end,
                },
            ) => l_start == r_start && l_end == r_end,
            (
                Self::OversizedInput {
                    input: l_input,
                    size: l_size,
                    limit: l_limit,
                },
                Self::OversizedInput {
                    input: r_input,
                    size: r_size,
                    limit: r_limit,
                },
            ) => l_input == r_input && l_size == r_size && l_limit == r_limit,
            (Self::PackageError { source: l_source }, Self::PackageError { source: r_source }) => {
                l_source == r_source
            }
            (
                Self::UnsupportedCoverFormat { mime: l_mime },
                Self::UnsupportedCoverFormat { mime: r_mime },
            ) => l_mime == r_mime,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// Types of errors that can occur while assembling the package
///
/// These errors describe violations of the EPUB structural invariants. They are
/// detected before any archive byte is written.
#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq))]
pub enum PackageError {
    /// Navigation map and spine disagree
    ///
    /// Every spine item needs exactly one navigation point, in the same order,
    /// so that play order stays a dense sequence matching the reading order.
    #[error("The navigation map does not match the spine at position {position}.")]
    CatalogSpineMismatch { position: usize },

    /// The container descriptor is missing from the virtual archive
    #[error("The \"META-INF/container.xml\" file is missing.")]
    MissingContainer,

    /// The cover meta element refers to an unknown manifest item
    #[error("Cover item '{manifest_id}' does not exist in manifest.")]
    CoverNotFound { manifest_id: String },

    /// Duplicate manifest id error
    #[error("A manifest item with id '{manifest_id}' already exists.")]
    DuplicateManifestId { manifest_id: String },

    /// Empty spine error
    ///
    /// A package needs at least one content document in its reading order.
    #[error("The spine does not contain any item.")]
    EmptySpine,

    /// Duplicate path error
    ///
    /// Two entries of the virtual archive would be written to the same path.
    #[error("The archive already contains an entry at '{path}'.")]
    DuplicateEntryPath { path: String },

    /// Invalid mimetype entry
    ///
    /// The `mimetype` entry must exist and contain exactly `application/epub+zip`.
    #[error("The \"mimetype\" entry is missing or does not contain \"application/epub+zip\".")]
    InvalidMimetype,

    /// Missing necessary metadata error
    ///
    /// The following must be included: title, language, and an identifier with id 'book-id'.
    #[error("Requires at least one 'title', 'language', and 'identifier' with id 'book-id'.")]
    MissingNecessaryMetadata,

    /// Missing rootfile error
    ///
    /// Resources are placed relative to the package document, so the rootfile
    /// must be set before any manifest item is added.
    #[error("Need a rootfile before adding resources.")]
    MissingRootfile,

    /// Spine reference error
    #[error("Spine item '{idref}' does not exist in manifest.")]
    SpineItemNotFound { idref: String },

    /// Uncompressed entry error
    ///
    /// Only the `mimetype` entry may be stored without compression.
    #[error("Only the \"mimetype\" entry may be stored uncompressed, but '{path}' is.")]
    UnexpectedRawEntry { path: String },
}
