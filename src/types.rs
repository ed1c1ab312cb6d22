/// A chapter extracted from the source text
///
/// Chapters are created once by the segmenter and never modified afterwards.
/// Their order in a sequence is the order in which their headings appear in
/// the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// The raw heading line, trimmed
    pub title: String,

    /// Pre-rendered body markup
    ///
    /// A heading element followed by one paragraph element per non-empty body line.
    /// All text inside is already XML-escaped.
    pub content: String,
}

/// A decoded cover image ready to be embedded
#[derive(Debug, Clone)]
pub struct CoverAsset {
    /// The original image bytes, embedded unchanged
    pub bytes: Vec<u8>,

    /// The MIME subtype in lower case, e.g. "jpeg", "jpg", "png" or "webp"
    ///
    /// It is the declared subtype unless the content is recognisably another
    /// accepted format. It is used as the extension of the stored image file.
    pub mime_subtype: String,

    /// Intrinsic pixel width
    pub width: u32,

    /// Intrinsic pixel height
    pub height: u32,
}

impl CoverAsset {
    /// Path of the cover image inside the archive
    pub fn file_name(&self) -> String {
        format!("cover.{}", self.mime_subtype)
    }

    /// Media type declared in the manifest
    ///
    /// `image/jpg` is not a registered media type, so the "jpg" subtype is
    /// declared as `image/jpeg`.
    pub fn media_type(&self) -> String {
        match self.mime_subtype.as_str() {
            "jpg" => "image/jpeg".to_string(),
            subtype => format!("image/{}", subtype),
        }
    }
}

/// Book-level metadata resolved from the file name and the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub chapter_count: usize,
}

/// Represents a metadata item in the package document
///
/// Items whose property belongs to the Dublin Core namespace are written as
/// `dc:*` elements, all others as `meta` elements.
#[derive(Debug, Clone)]
pub struct MetadataItem {
    /// Optional unique identifier for this metadata item
    ///
    /// The identifier item referenced by the package's `unique-identifier`
    /// attribute must carry this id.
    pub id: Option<String>,

    /// The metadata property name, e.g. "title", "creator", "identifier"
    pub property: String,

    /// The metadata value
    pub value: String,
}

impl MetadataItem {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            id: None,
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, &str)> {
        let mut attributes = Vec::new();
        if let Some(id) = &self.id {
            attributes.push(("id", id.as_str()));
        }
        attributes
    }
}

/// Represents a resource item declared in the manifest
#[derive(Debug, Clone)]
pub struct ManifestItem {
    /// The unique id of the resource
    pub id: String,

    /// The path to the resource relative to the package document
    pub path: String,

    /// The media type of the resource
    pub mime: String,
}

impl ManifestItem {
    pub fn new(id: &str, path: &str, mime: &str) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            mime: mime.to_string(),
        }
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, &str)> {
        vec![
            ("id", self.id.as_str()),
            ("href", self.path.as_str()),
            ("media-type", self.mime.as_str()),
        ]
    }
}

/// Represents an item in the spine, defining the reading order
#[derive(Debug, Clone)]
pub struct SpineItem {
    /// The ID reference to a manifest item
    ///
    /// The referenced ID must exist in the manifest.
    pub idref: String,
}

impl SpineItem {
    pub fn new(idref: &str) -> Self {
        Self {
            idref: idref.to_string(),
        }
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, &str)> {
        vec![("idref", self.idref.as_str())]
    }
}

/// Represents a navigation point in the table of contents
///
/// The navigation map of this crate is flat: every spine item owns exactly one
/// navigation point.
#[derive(Debug, Clone)]
pub struct NavPoint {
    /// The display label of this navigation point
    pub label: String,

    /// The content document path this navigation point references,
    /// relative to the navigation document
    pub content: String,

    /// The reading order position of this navigation point
    ///
    /// It is `None` until the builder numbers the navigation map.
    pub play_order: Option<usize>,
}

impl NavPoint {
    pub fn new(label: &str, content: &str) -> Self {
        Self {
            label: label.to_string(),
            content: content.to_string(),
            play_order: None,
        }
    }
}
