//! Epub Builder
//!
//! This module provides functionality for building the package files of an EPUB
//! 2.0 publication. The `EpubBuilder` structure collects metadata, manifest items,
//! the spine and the navigation map, then writes the container descriptor, the
//! NCX navigation document and the OPF package document into a [VirtualArchive].
//!
//! ## Usage
//!
//! ```rust, no_run
//! # fn main() -> Result<(), txt_epub::error::ConvertError> {
//! use txt_epub::{
//!     builder::EpubBuilder,
//!     types::{ManifestItem, MetadataItem, NavPoint, SpineItem},
//! };
//!
//! let mut builder = EpubBuilder::new()?;
//! builder
//!     .add_rootfile("content.opf")
//!     .add_metadata(MetadataItem::new("title", "Test Book"))
//!     .add_metadata(MetadataItem::new("language", "zh"))
//!     .add_metadata(MetadataItem::new("identifier", "1700000000000").with_id("book-id"))
//!     .add_manifest(
//!         ManifestItem::new("chap1", "OEBPS/chapter1.xhtml", "application/xhtml+xml"),
//!         b"<html/>".to_vec(),
//!     )?
//!     .add_spine(SpineItem::new("chap1"))
//!     .add_catalog_item(NavPoint::new("Chapter 1", "OEBPS/chapter1.xhtml"));
//!
//! let _archive = builder.make()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes
//!
//! - Everything is built in memory; nothing touches the file system.
//! - Resource paths are relative to the package document.

pub mod content;

use std::io::Cursor;

use indexmap::IndexMap;
use log::debug;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    archive::{ArchiveEntry, CONTAINER_PATH, VirtualArchive},
    error::{ConvertError, PackageError},
    types::{ManifestItem, MetadataItem, NavPoint, SpineItem},
    utils::{ELEMENT_IN_DC_NAMESPACE, generation_date},
};

pub(crate) type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Id of the identifier metadata item referenced by `unique-identifier`
pub const UNIQUE_IDENTIFIER_ID: &str = "book-id";

pub const NCX_ID: &str = "ncx";
pub const NCX_PATH: &str = "toc.ncx";
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// EPUB Builder
///
/// The main structure used to create the package files of an EPUB 2.0 publication.
#[derive(Debug)]
pub struct EpubBuilder {
    /// Files written so far, starting with the `mimetype` marker
    archive: VirtualArchive,

    /// List of root file paths
    rootfiles: Vec<String>,

    /// List of metadata items
    metadata: Vec<MetadataItem>,

    /// Manifest items in declaration order, keyed by id
    manifest: IndexMap<String, ManifestItem>,

    /// List of spine items, defining the reading order
    spine: Vec<SpineItem>,

    catalog_title: String,

    catalog_author: Option<String>,

    /// List of catalog navigation points, one per spine item
    catalog: Vec<NavPoint>,

    /// Manifest id of the cover image
    cover: Option<String>,

    /// Href of the cover page, referenced from the guide
    guide_cover: Option<String>,
}

impl EpubBuilder {
    /// Create a new `EpubBuilder` instance
    ///
    /// The `mimetype` entry is created immediately, so it is the first entry of
    /// the archive.
    pub fn new() -> Result<Self, ConvertError> {
        let mut archive = VirtualArchive::new();
        archive.insert(ArchiveEntry::mimetype())?;

        Ok(EpubBuilder {
            archive,

            rootfiles: vec![],
            metadata: vec![],
            manifest: IndexMap::new(),
            spine: vec![],

            catalog_title: String::new(),
            catalog_author: None,
            catalog: vec![],

            cover: None,
            guide_cover: None,
        })
    }

    /// Add a rootfile path
    ///
    /// The first rootfile is the path of the package document written by `make`.
    pub fn add_rootfile(&mut self, rootfile: &str) -> &mut Self {
        self.rootfiles.push(rootfile.to_string());
        self
    }

    /// Add metadata item
    ///
    /// Required metadata includes title, language, and an identifier with id 'book-id'.
    /// Missing this data will result in an error when building the package.
    pub fn add_metadata(&mut self, item: MetadataItem) -> &mut Self {
        self.metadata.push(item);
        self
    }

    /// Add manifest item and its content
    ///
    /// The content is stored in the archive at the item's path, resolved relative
    /// to the package document.
    ///
    /// # Return
    /// - `Ok(&mut Self)` - Successful addition, returns a reference to itself
    /// - `Err(ConvertError)` - The id or the path is already taken, or no rootfile is set
    pub fn add_manifest(
        &mut self,
        manifest_item: ManifestItem,
        content: Vec<u8>,
    ) -> Result<&mut Self, ConvertError> {
        if self.manifest.contains_key(&manifest_item.id) {
            return Err(PackageError::DuplicateManifestId {
                manifest_id: manifest_item.id,
            }
            .into());
        }

        let path = self.resolve_path(&manifest_item.path)?;
        self.archive.insert(ArchiveEntry::new(&path, content))?;
        self.manifest.insert(manifest_item.id.clone(), manifest_item);

        Ok(self)
    }

    /// Add spine item
    ///
    /// The spine item defines the reading order of the book.
    pub fn add_spine(&mut self, item: SpineItem) -> &mut Self {
        self.spine.push(item);
        self
    }

    /// Set catalog title
    pub fn set_catalog_title(&mut self, title: &str) -> &mut Self {
        self.catalog_title = title.to_string();
        self
    }

    /// Set catalog author
    pub fn set_catalog_author(&mut self, author: &str) -> &mut Self {
        self.catalog_author = Some(author.to_string());
        self
    }

    /// Add catalog item
    ///
    /// Added directory items will be added to the end of the existing list.
    /// Play orders are assigned when the navigation document is made.
    pub fn add_catalog_item(&mut self, item: NavPoint) -> &mut Self {
        self.catalog.push(item);
        self
    }

    /// Declare the cover image
    ///
    /// # Parameters
    /// - `manifest_id`: Manifest id of the cover image
    pub fn set_cover(&mut self, manifest_id: &str) -> &mut Self {
        self.cover = Some(manifest_id.to_string());
        self
    }

    /// Reference the cover page from the guide
    pub fn set_guide_cover(&mut self, href: &str) -> &mut Self {
        self.guide_cover = Some(href.to_string());
        self
    }

    /// Builds the package files
    ///
    /// # Return
    /// - `Ok(VirtualArchive)`: Every file of the publication, ready to be written
    /// - `Err(ConvertError)`: The package violates a structural invariant
    pub fn make(mut self) -> Result<VirtualArchive, ConvertError> {
        if !self.validate_metadata() {
            return Err(PackageError::MissingNecessaryMetadata.into());
        }
        self.validate_spine()?;
        self.validate_cover()?;

        // The NCX registers itself in the manifest, so it must be created before the OPF file.
        self.make_container_xml()?;
        self.make_navigation_document()?;
        self.make_opf_file()?;

        debug!(
            "Built package with {} manifest items and {} spine items",
            self.manifest.len(),
            self.spine.len()
        );

        Ok(self.archive)
    }

    /// Creates the `container.xml` file
    fn make_container_xml(&mut self) -> Result<(), ConvertError> {
        if self.rootfiles.is_empty() {
            return Err(PackageError::MissingRootfile.into());
        }

        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        writer.write_event(Event::Start(BytesStart::new("container").with_attributes(
            [
                ("version", "1.0"),
                ("xmlns", "urn:oasis:names:tc:opendocument:xmlns:container"),
            ],
        )))?;
        writer.write_event(Event::Start(BytesStart::new("rootfiles")))?;

        for rootfile in &self.rootfiles {
            writer.write_event(Event::Empty(BytesStart::new("rootfile").with_attributes([
                ("full-path", rootfile.as_str()),
                ("media-type", "application/oebps-package+xml"),
            ])))?;
        }

        writer.write_event(Event::End(BytesEnd::new("rootfiles")))?;
        writer.write_event(Event::End(BytesEnd::new("container")))?;

        let file_data = writer.into_inner().into_inner();
        self.archive
            .insert(ArchiveEntry::new(CONTAINER_PATH, file_data))?;

        Ok(())
    }

    /// Creates the NCX navigation document
    ///
    /// Navigation points are numbered with a dense play order starting at 1, in
    /// spine order.
    fn make_navigation_document(&mut self) -> Result<(), ConvertError> {
        self.validate_catalog()?;

        for (index, nav) in self.catalog.iter_mut().enumerate() {
            nav.play_order = Some(index + 1);
        }

        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("ncx").with_attributes([
            ("xmlns", "http://www.daisy.org/z3986/2005/ncx/"),
            ("version", "2005-1"),
        ])))?;

        // make head
        let uid = self.unique_identifier().unwrap_or_default();
        writer.write_event(Event::Start(BytesStart::new("head")))?;
        for (name, content) in [
            ("dtb:uid", uid.as_str()),
            ("dtb:depth", "1"),
            ("dtb:totalPageCount", "0"),
            ("dtb:maxPageNumber", "0"),
        ] {
            writer.write_event(Event::Empty(
                BytesStart::new("meta").with_attributes([("name", name), ("content", content)]),
            ))?;
        }
        writer.write_event(Event::End(BytesEnd::new("head")))?;

        Self::make_text_element(&mut writer, "docTitle", &self.catalog_title)?;
        if let Some(author) = &self.catalog_author {
            Self::make_text_element(&mut writer, "docAuthor", author)?;
        }

        // make navMap
        writer.write_event(Event::Start(BytesStart::new("navMap")))?;
        for nav in &self.catalog {
            let play_order = nav.play_order.unwrap_or_default().to_string();
            let id = format!("navPoint-{}", play_order);

            writer.write_event(Event::Start(BytesStart::new("navPoint").with_attributes([
                ("id", id.as_str()),
                ("playOrder", play_order.as_str()),
            ])))?;
            Self::make_text_element(&mut writer, "navLabel", &nav.label)?;
            writer.write_event(Event::Empty(
                BytesStart::new("content").with_attributes([("src", nav.content.as_str())]),
            ))?;
            writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("navMap")))?;

        writer.write_event(Event::End(BytesEnd::new("ncx")))?;

        let file_data = writer.into_inner().into_inner();
        self.add_manifest(ManifestItem::new(NCX_ID, NCX_PATH, NCX_MEDIA_TYPE), file_data)?;

        Ok(())
    }

    /// Creates the `OPF` file
    fn make_opf_file(&mut self) -> Result<(), ConvertError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        writer.write_event(Event::Start(BytesStart::new("package").with_attributes([
            ("xmlns", "http://www.idpf.org/2007/opf"),
            ("unique-identifier", UNIQUE_IDENTIFIER_ID),
            ("version", "2.0"),
        ])))?;

        self.make_opf_metadata(&mut writer)?;
        self.make_opf_manifest(&mut writer)?;
        self.make_opf_spine(&mut writer)?;
        self.make_opf_guide(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("package")))?;

        let rootfile = self.rootfiles.first().ok_or(PackageError::MissingRootfile)?;
        let file_data = writer.into_inner().into_inner();
        self.archive.insert(ArchiveEntry::new(rootfile, file_data))?;

        Ok(())
    }

    fn make_opf_metadata(&mut self, writer: &mut XmlWriter) -> Result<(), ConvertError> {
        if !self.metadata.iter().any(|item| item.property == "date") {
            self.metadata
                .push(MetadataItem::new("date", &generation_date()));
        }

        writer.write_event(Event::Start(BytesStart::new("metadata").with_attributes([
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:opf", "http://www.idpf.org/2007/opf"),
        ])))?;

        for metadata in &self.metadata {
            if ELEMENT_IN_DC_NAMESPACE.contains(&metadata.property.as_str()) {
                let tag_name = format!("dc:{}", metadata.property);

                writer.write_event(Event::Start(
                    BytesStart::new(tag_name.as_str()).with_attributes(metadata.attributes()),
                ))?;
                writer.write_event(Event::Text(BytesText::new(metadata.value.as_str())))?;
                writer.write_event(Event::End(BytesEnd::new(tag_name.as_str())))?;
            } else {
                writer.write_event(Event::Empty(BytesStart::new("meta").with_attributes([
                    ("name", metadata.property.as_str()),
                    ("content", metadata.value.as_str()),
                ])))?;
            }
        }

        if let Some(cover) = &self.cover {
            writer.write_event(Event::Empty(
                BytesStart::new("meta").with_attributes([("name", "cover"), ("content", cover.as_str())]),
            ))?;
        }

        writer.write_event(Event::End(BytesEnd::new("metadata")))?;

        Ok(())
    }

    fn make_opf_manifest(&self, writer: &mut XmlWriter) -> Result<(), ConvertError> {
        writer.write_event(Event::Start(BytesStart::new("manifest")))?;

        for manifest in self.manifest.values() {
            writer.write_event(Event::Empty(
                BytesStart::new("item").with_attributes(manifest.attributes()),
            ))?;
        }

        writer.write_event(Event::End(BytesEnd::new("manifest")))?;

        Ok(())
    }

    fn make_opf_spine(&self, writer: &mut XmlWriter) -> Result<(), ConvertError> {
        writer.write_event(Event::Start(
            BytesStart::new("spine").with_attributes([("toc", NCX_ID)]),
        ))?;

        for spine in &self.spine {
            writer.write_event(Event::Empty(
                BytesStart::new("itemref").with_attributes(spine.attributes()),
            ))?;
        }

        writer.write_event(Event::End(BytesEnd::new("spine")))?;

        Ok(())
    }

    fn make_opf_guide(&self, writer: &mut XmlWriter) -> Result<(), ConvertError> {
        let Some(href) = &self.guide_cover else {
            return Ok(());
        };

        writer.write_event(Event::Start(BytesStart::new("guide")))?;
        writer.write_event(Event::Empty(BytesStart::new("reference").with_attributes([
            ("type", "cover"),
            ("title", "Cover"),
            ("href", href.as_str()),
        ])))?;
        writer.write_event(Event::End(BytesEnd::new("guide")))?;

        Ok(())
    }

    /// Writes `<tag><text>value</text></tag>`
    fn make_text_element(writer: &mut XmlWriter, tag: &str, value: &str) -> Result<(), ConvertError> {
        writer.write_event(Event::Start(BytesStart::new(tag)))?;
        writer.write_event(Event::Start(BytesStart::new("text")))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("text")))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;

        Ok(())
    }

    /// Resolves a manifest path relative to the package document's directory
    fn resolve_path(&self, href: &str) -> Result<String, ConvertError> {
        let rootfile = self.rootfiles.first().ok_or(PackageError::MissingRootfile)?;

        Ok(match rootfile.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, href),
            None => href.to_string(),
        })
    }

    fn unique_identifier(&self) -> Option<String> {
        self.metadata
            .iter()
            .find(|item| {
                item.property == "identifier"
                    && item.id.as_deref() == Some(UNIQUE_IDENTIFIER_ID)
            })
            .map(|item| item.value.clone())
    }

    /// Verify metadata integrity
    ///
    /// Check if the required metadata items are included: title, language, and identifier with book-id.
    fn validate_metadata(&self) -> bool {
        let has_title = self.metadata.iter().any(|item| item.property == "title");
        let has_language = self.metadata.iter().any(|item| item.property == "language");
        let has_identifier = self.unique_identifier().is_some();

        has_title && has_identifier && has_language
    }

    /// Check that the spine is not empty and only references manifest items
    fn validate_spine(&self) -> Result<(), ConvertError> {
        if self.spine.is_empty() {
            return Err(PackageError::EmptySpine.into());
        }

        if let Some(item) = self
            .spine
            .iter()
            .find(|item| !self.manifest.contains_key(&item.idref))
        {
            return Err(PackageError::SpineItemNotFound {
                idref: item.idref.clone(),
            }
            .into());
        }

        Ok(())
    }

    fn validate_cover(&self) -> Result<(), ConvertError> {
        match &self.cover {
            Some(id) if !self.manifest.contains_key(id) => Err(PackageError::CoverNotFound {
                manifest_id: id.clone(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Check that the catalog follows the spine one-to-one
    ///
    /// The navigation document sits next to the package document, so a catalog
    /// item's content must equal the href of the spine item at the same position.
    fn validate_catalog(&self) -> Result<(), ConvertError> {
        let length = self.catalog.len().max(self.spine.len());

        for position in 0..length {
            let href = self
                .spine
                .get(position)
                .and_then(|item| self.manifest.get(&item.idref))
                .map(|item| item.path.as_str());
            let content = self.catalog.get(position).map(|nav| nav.content.as_str());

            if href.is_none() || href != content {
                return Err(PackageError::CatalogSpineMismatch {
                    position: position + 1,
                }
                .into());
            }
        }

        Ok(())
    }
}
