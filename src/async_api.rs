//! Optional async helpers for converting files on disk.
//!
//! This module is available with the `async` feature. Only file access is
//! asynchronous; the conversion itself runs on the calling task.

use std::path::Path;

use crate::{
    convert::{ConversionOutput, ConversionRequest, Converter, check_size, file_name, sniff_mime_type},
    error::ConvertError,
};

/// Read the source files asynchronously and build a request from them.
///
/// File sizes are checked against the converter's limits before anything is read.
pub async fn read_request_async<P: AsRef<Path>>(
    converter: &Converter,
    text_path: P,
    cover_path: Option<P>,
) -> Result<ConversionRequest, ConvertError> {
    let options = converter.options();
    let text_path = text_path.as_ref();

    let size = tokio::fs::metadata(text_path).await?.len() as usize;
    check_size("text", size, options.max_text_size)?;
    let mut request = ConversionRequest::new(tokio::fs::read(text_path).await?, &file_name(text_path));

    if let Some(cover_path) = cover_path {
        let cover_path = cover_path.as_ref();

        let size = tokio::fs::metadata(cover_path).await?.len() as usize;
        check_size("cover image", size, options.max_cover_size)?;

        let bytes = tokio::fs::read(cover_path).await?;
        request.cover_mime_type = sniff_mime_type(&bytes);
        request.cover_bytes = Some(bytes);
    }

    Ok(request)
}

/// Read the source files asynchronously and convert them.
pub async fn convert_files_async<P: AsRef<Path>>(
    converter: &Converter,
    text_path: P,
    cover_path: Option<P>,
) -> Result<ConversionOutput, ConvertError> {
    let request = read_request_async(converter, text_path, cover_path).await?;
    converter.convert(&request)
}
