//! Cover Processor
//!
//! Validates a cover image against the accepted formats and size limit, then
//! decodes it to learn its intrinsic pixel dimensions. A supplied cover that
//! cannot be decoded aborts the conversion.

use std::io::Cursor;

use image::{GenericImageView, ImageError, ImageReader};
use log::{debug, warn};

use crate::{error::ConvertError, types::CoverAsset};

/// Accepted MIME subtypes of a cover image
pub const SUPPORTED_COVER_SUBTYPES: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

/// Loads a cover image
///
/// # Parameters
/// - `bytes`: The raw image file
/// - `mime_type`: The declared MIME type, e.g. "image/png"
/// - `max_size`: Maximum accepted size in bytes
///
/// # Return
/// - `Ok(CoverAsset)`: The image with its pixel dimensions
/// - `Err(ConvertError)`: The image is too large, of an unsupported format, or undecodable
pub fn load_cover(bytes: &[u8], mime_type: &str, max_size: usize) -> Result<CoverAsset, ConvertError> {
    if bytes.len() > max_size {
        return Err(ConvertError::OversizedInput {
            input: "cover image".to_string(),
            size: bytes.len(),
            limit: max_size,
        });
    }

    let mut mime_subtype = supported_subtype(mime_type)?;

    // The content decides the format, a declared type only names it
    if let Some(kind) = infer::get(bytes) {
        let sniffed = kind.mime_type();
        match sniffed.strip_prefix("image/") {
            Some(subtype) if SUPPORTED_COVER_SUBTYPES.contains(&subtype) => {
                if normalize_subtype(subtype) != normalize_subtype(&mime_subtype) {
                    warn!(
                        "Cover declared as \"{}\" but its content is \"{}\"",
                        mime_type, sniffed
                    );
                    mime_subtype = subtype.to_string();
                }
            }
            _ => {
                return Err(ConvertError::UnsupportedCoverFormat {
                    mime: sniffed.to_string(),
                });
            }
        }
    }

    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()?;
    let (width, height) = image.dimensions();

    debug!("Loaded {}x{} cover image", width, height);

    Ok(CoverAsset {
        bytes: bytes.to_vec(),
        mime_subtype,
        width,
        height,
    })
}

/// Extracts the lowercase subtype of an accepted cover MIME type
pub(crate) fn supported_subtype(mime_type: &str) -> Result<String, ConvertError> {
    let normalized = mime_type.trim().to_ascii_lowercase();

    match normalized.strip_prefix("image/") {
        Some(subtype) if SUPPORTED_COVER_SUBTYPES.contains(&subtype) => Ok(subtype.to_string()),
        _ => Err(ConvertError::UnsupportedCoverFormat {
            mime: mime_type.to_string(),
        }),
    }
}

fn normalize_subtype(subtype: &str) -> &str {
    match subtype {
        "jpg" => "jpeg",
        other => other,
    }
}
