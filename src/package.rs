//! Package Assembler
//!
//! Turns the resolved metadata, the chapters and the optional cover into the
//! complete virtual file tree of an EPUB 2.0 publication.
//!
//! ## Layout
//!
//! ```text
//! mimetype
//! style.css
//! cover.<ext>            (with a cover)
//! titlepage.xhtml        (with a cover)
//! OEBPS/chapter1.xhtml
//! ...
//! META-INF/container.xml
//! toc.ncx
//! content.opf
//! ```

use log::debug;

use crate::{
    archive::VirtualArchive,
    builder::{
        EpubBuilder, UNIQUE_IDENTIFIER_ID,
        content::{Block, ContentBuilder},
    },
    config::{ConvertOptions, IdentifierStrategy},
    error::ConvertError,
    types::{BookMetadata, Chapter, CoverAsset, ManifestItem, MetadataItem, NavPoint, SpineItem},
    utils::{content_hash, timestamp_millis},
};

pub const PACKAGE_PATH: &str = "content.opf";
pub const STYLESHEET_PATH: &str = "style.css";
pub const TITLEPAGE_PATH: &str = "titlepage.xhtml";

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Path of the n-th chapter document, counting from 1
pub fn chapter_path(index: usize) -> String {
    format!("OEBPS/chapter{}.xhtml", index)
}

/// Assembles the virtual file tree of the publication
///
/// # Parameters
/// - `metadata`: Title and author of the book
/// - `chapters`: Chapters in reading order
/// - `cover`: The decoded cover, if any
/// - `options`: Language, stylesheet, title page label and identifier strategy
///
/// # Return
/// - `Ok(VirtualArchive)`: Every file of the publication
/// - `Err(ConvertError)`: There is no chapter, or the package is inconsistent
pub fn assemble_package(
    metadata: &BookMetadata,
    chapters: &[Chapter],
    cover: Option<&CoverAsset>,
    options: &ConvertOptions,
) -> Result<VirtualArchive, ConvertError> {
    if chapters.is_empty() {
        return Err(ConvertError::NoChapterStructureDetected);
    }

    let identifier = match options.identifier {
        IdentifierStrategy::Timestamp => timestamp_millis(),
        IdentifierStrategy::ContentHash => content_hash(&metadata.title, &metadata.author, chapters),
    };

    let mut builder = EpubBuilder::new()?;
    builder
        .add_rootfile(PACKAGE_PATH)
        .add_metadata(MetadataItem::new("identifier", &identifier).with_id(UNIQUE_IDENTIFIER_ID))
        .add_metadata(MetadataItem::new("title", &metadata.title))
        .add_metadata(MetadataItem::new("creator", &metadata.author))
        .add_metadata(MetadataItem::new("language", &options.language))
        .set_catalog_title(&metadata.title)
        .set_catalog_author(&metadata.author);

    builder.add_manifest(
        ManifestItem::new("style", STYLESHEET_PATH, "text/css"),
        options.stylesheet.as_bytes().to_vec(),
    )?;

    if let Some(cover) = cover {
        let image_path = cover.file_name();
        builder
            .add_manifest(
                ManifestItem::new("cover-image", &image_path, &cover.media_type()),
                cover.bytes.clone(),
            )?
            .set_cover("cover-image");

        let mut titlepage = ContentBuilder::new(&options.language);
        titlepage.set_title(&options.cover_title).add_block(Block::Cover {
            href: image_path,
            width: cover.width,
            height: cover.height,
        });

        builder
            .add_manifest(
                ManifestItem::new("titlepage", TITLEPAGE_PATH, XHTML_MEDIA_TYPE),
                titlepage.make()?,
            )?
            .add_spine(SpineItem::new("titlepage"))
            .add_catalog_item(NavPoint::new(&options.cover_title, TITLEPAGE_PATH))
            .set_guide_cover(TITLEPAGE_PATH);
    }

    for (index, chapter) in chapters.iter().enumerate() {
        let id = format!("chap{}", index + 1);
        let path = chapter_path(index + 1);

        let mut document = ContentBuilder::new(&options.language);
        document
            .set_title(&chapter.title)
            .set_stylesheet(&format!("../{}", STYLESHEET_PATH))
            .add_block(Block::Markup {
                content: chapter.content.clone(),
            });

        builder
            .add_manifest(ManifestItem::new(&id, &path, XHTML_MEDIA_TYPE), document.make()?)?
            .add_spine(SpineItem::new(&id))
            .add_catalog_item(NavPoint::new(&chapter.title, &path));
    }

    debug!(
        "Assembling \"{}\" with {} chapters, cover: {}",
        metadata.title,
        chapters.len(),
        cover.is_some()
    );

    builder.make()
}
