//! Encoding resolution
//!
//! The source text is either UTF-8 or, failing a strict UTF-8 validation, assumed
//! to be GBK. No byte-level statistics are gathered; a text in any other code page
//! decodes to garbled characters. `EncodingPolicy` decides whether unmappable GBK
//! sequences are replaced or rejected.

use encoding_rs::{Encoding, GBK, UTF_8};
use log::warn;

use crate::{config::EncodingPolicy, error::ConvertError};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// The encodings a source text may be decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,

    /// Legacy simplified Chinese code page, used when UTF-8 validation fails
    Gbk,
}

impl TextEncoding {
    /// The WHATWG label of the encoding
    pub fn label(&self) -> &'static str {
        self.encoding().name()
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Gbk => GBK,
        }
    }
}

/// Decides which encoding the buffer is decoded with
///
/// A leading UTF-8 byte order mark is ignored. Validation is strict: a single
/// invalid sequence anywhere in the buffer selects the fallback encoding.
pub fn resolve_encoding(bytes: &[u8]) -> TextEncoding {
    let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(_) => TextEncoding::Utf8,
        Err(_) => TextEncoding::Gbk,
    }
}

/// Provides functionality to decode a source text buffer
///
/// The encoding is resolved once for the whole buffer with [resolve_encoding]
/// and the buffer is decoded in a single pass.
pub trait DecodeText {
    fn decode_text(&self, policy: EncodingPolicy) -> Result<(String, TextEncoding), ConvertError>;
}

impl DecodeText for [u8] {
    fn decode_text(&self, policy: EncodingPolicy) -> Result<(String, TextEncoding), ConvertError> {
        let encoding = resolve_encoding(self);

        let (text, had_errors) = match encoding {
            TextEncoding::Utf8 => {
                let (text, had_errors) = UTF_8.decode_with_bom_removal(self);
                (text.into_owned(), had_errors)
            }
            TextEncoding::Gbk => {
                let (text, had_errors) = GBK.decode_without_bom_handling(self);
                (text.into_owned(), had_errors)
            }
        };

        if had_errors {
            match policy {
                EncodingPolicy::Strict => {
                    return Err(ConvertError::EncodingDecodeFailure {
                        encoding: encoding.label().to_string(),
                    });
                }
                EncodingPolicy::BestEffort => {
                    warn!(
                        "Text is not valid {}, undecodable bytes were replaced",
                        encoding.label()
                    );
                }
            }
        }

        Ok((text, encoding))
    }
}

#[cfg(test)]
mod tests {
    use encoding_rs::GBK;

    use crate::{
        config::EncodingPolicy,
        encoding::{DecodeText, TextEncoding, resolve_encoding},
        error::ConvertError,
    };

    #[test]
    fn test_resolve_utf8() {
        assert_eq!(resolve_encoding("第一章 开始".as_bytes()), TextEncoding::Utf8);
        assert_eq!(resolve_encoding(b"plain ascii"), TextEncoding::Utf8);
        assert_eq!(resolve_encoding(b""), TextEncoding::Utf8);
    }

    /// A UTF-8 byte order mark does not affect resolution and is removed
    #[test]
    fn test_decode_utf8_with_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("第一章".as_bytes());

        assert_eq!(resolve_encoding(&data), TextEncoding::Utf8);

        let (text, encoding) = data.decode_text(EncodingPolicy::BestEffort).unwrap();
        assert_eq!(text, "第一章");
        assert_eq!(encoding, TextEncoding::Utf8);
    }

    /// GBK bytes are never valid UTF-8 and fall back to GBK
    #[test]
    fn test_decode_gbk_text() {
        let (bytes, _, _) = GBK.encode("第一章 开始\n这是第一段。");
        assert_eq!(resolve_encoding(&bytes), TextEncoding::Gbk);

        let (text, encoding) = bytes.decode_text(EncodingPolicy::Strict).unwrap();
        assert_eq!(text, "第一章 开始\n这是第一段。");
        assert_eq!(encoding, TextEncoding::Gbk);
        assert_eq!(encoding.label(), "GBK");
    }

    /// Undecodable bytes are replaced under the best-effort policy
    #[test]
    fn test_decode_invalid_best_effort() {
        let data = vec![b'a', 0xFF, b'b'];

        let (text, encoding) = data.decode_text(EncodingPolicy::BestEffort).unwrap();
        assert_eq!(encoding, TextEncoding::Gbk);
        assert!(text.contains('\u{FFFD}'));
        assert!(text.starts_with('a'));
    }

    /// Undecodable bytes abort the decoding under the strict policy
    #[test]
    fn test_decode_invalid_strict() {
        let data = vec![b'a', 0xFF, b'b'];

        let result = data.decode_text(EncodingPolicy::Strict);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            ConvertError::EncodingDecodeFailure {
                encoding: "GBK".to_string()
            }
        );
    }
}
