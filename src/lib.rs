//! Txt to Epub library
//!
//! A Rust library for converting Chinese plain-text novels into EPUB 2.0 files.
//!
//! The source text is decoded (UTF-8, falling back to GBK), split into chapters
//! at headings such as `第一章` or `第一卷`, and packaged together with an optional
//! cover image into an EPUB 2.0 container held entirely in memory.
//!
//! ## Features
//!
//! - Chapter detection with a pluggable heading grammar.
//! - Title from the file name (`《书名》` markers included), author from an in-text `作者：` marker.
//! - Cover title page scaled with the image's intrinsic aspect ratio.
//! - Validation of the package structure before any byte is written.
//! - Optional async file helpers via the `async` feature.
//!
//! ## Quick Start
//!
//! ```rust, no_run
//! # use txt_epub::{ConversionRequest, Converter};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::default();
//!
//! let text = std::fs::read("《测试小说》.txt")?;
//! let cover = std::fs::read("cover.jpg")?;
//! let request = ConversionRequest::new(text, "《测试小说》.txt").with_cover(cover, "image/jpeg");
//!
//! let output = converter.convert(&request)?;
//! println!("{} chapters", output.chapter_count);
//! std::fs::write(&output.output_file_name, &output.archive_bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `async`: Enable `txt_epub::async_api`, which reads the source files with `tokio::fs`.

pub(crate) mod utils;

pub mod archive;
#[cfg(feature = "async")]
pub mod async_api;
pub mod builder;
pub mod config;
pub mod convert;
pub mod cover;
pub mod encoding;
pub mod error;
pub mod metadata;
pub mod package;
pub mod segmenter;
pub mod types;

pub use config::ConvertOptions;
pub use convert::{ConversionOutput, ConversionRequest, Converter};
pub use encoding::DecodeText;
pub use error::ConvertError;
