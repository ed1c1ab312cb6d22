//! Content Builder
//!
//! This module provides functionality for creating the XHTML content documents of
//! the package: one document per chapter and the optional cover title page.
//!
//! ## Usage
//! ``` rust, no_run
//! # fn main() -> Result<(), txt_epub::error::ConvertError> {
//! use txt_epub::builder::content::{Block, ContentBuilder};
//!
//! let mut builder = ContentBuilder::new("zh");
//! builder
//!     .set_title("第一章 开始")
//!     .set_stylesheet("../style.css")
//!     .add_block(Block::Markup {
//!         content: "<h2>第一章 开始</h2><p>这是第一段。</p>".to_string(),
//!     });
//! let _xhtml = builder.make()?;
//! # Ok(())
//! # }
//! ```

use std::io::Cursor;

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{builder::XmlWriter, error::ConvertError};

const XHTML_DOCTYPE: &str =
    r#"html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd""#;

/// Content Block
///
/// The content block is the basic unit of content in a content document.
#[derive(Debug)]
pub enum Block {
    /// Pre-rendered body markup
    ///
    /// The markup is written verbatim, so it must already be escaped and well-formed.
    Markup { content: String },

    /// Full-page cover image
    ///
    /// The image is wrapped in an SVG viewport using its intrinsic size, so that
    /// reading systems scale it without distorting the aspect ratio.
    Cover {
        /// Image path relative to the document
        href: String,
        width: u32,
        height: u32,
    },
}

impl Block {
    /// Make the block
    ///
    /// Convert block data to xhtml markup.
    pub(crate) fn make(&self, writer: &mut XmlWriter) -> Result<(), ConvertError> {
        match self {
            Block::Markup { content } => {
                writer.write_event(Event::Text(BytesText::from_escaped(content.as_str())))?;
            }

            Block::Cover {
                href,
                width,
                height,
            } => {
                let view_box = format!("0 0 {} {}", width, height);
                let width = width.to_string();
                let height = height.to_string();

                writer.write_event(Event::Start(BytesStart::new("div").with_attributes([(
                    "style",
                    "text-align: center; margin: 0; padding: 0;",
                )])))?;
                writer.write_event(Event::Start(BytesStart::new("svg").with_attributes([
                    ("xmlns", "http://www.w3.org/2000/svg"),
                    ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
                    ("version", "1.1"),
                    ("width", "100%"),
                    ("height", "100%"),
                    ("viewBox", view_box.as_str()),
                    ("preserveAspectRatio", "xMidYMid meet"),
                ])))?;
                writer.write_event(Event::Empty(BytesStart::new("image").with_attributes([
                    ("width", width.as_str()),
                    ("height", height.as_str()),
                    ("xlink:href", href.as_str()),
                ])))?;
                writer.write_event(Event::End(BytesEnd::new("svg")))?;
                writer.write_event(Event::End(BytesEnd::new("div")))?;
            }
        }

        Ok(())
    }

    fn is_cover(&self) -> bool {
        matches!(self, Block::Cover { .. })
    }
}

/// Content Builder
///
/// Assembles blocks into a complete XHTML document held in memory.
#[derive(Debug)]
pub struct ContentBuilder {
    blocks: Vec<Block>,
    language: String,
    title: String,

    /// Stylesheet path relative to the document
    stylesheet: Option<String>,
}

impl ContentBuilder {
    /// Creates a new ContentBuilder instance
    ///
    /// ## Parameters
    /// - `language`: The language code for the document
    pub fn new(language: &str) -> Self {
        Self {
            blocks: vec![],
            language: language.to_string(),
            title: String::new(),
            stylesheet: None,
        }
    }

    /// Sets the title of the document
    ///
    /// Sets the title that will be displayed in the document's head section.
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Links a stylesheet from the document's head section
    pub fn set_stylesheet(&mut self, href: &str) -> &mut Self {
        self.stylesheet = Some(href.to_string());
        self
    }

    pub fn add_block(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Make the document
    ///
    /// ## Return
    /// - `Ok(Vec<u8>)`: The UTF-8 encoded XHTML document
    /// - `Err(ConvertError)`: Error occurred while writing the document
    pub fn make(&self) -> Result<Vec<u8>, ConvertError> {
        let has_cover = self.blocks.iter().any(Block::is_cover);
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        // SVG is not part of the XHTML 1.1 DTD
        if !has_cover {
            writer.write_event(Event::DocType(BytesText::from_escaped(XHTML_DOCTYPE)))?;
        }

        writer.write_event(Event::Start(BytesStart::new("html").with_attributes([
            ("xmlns", "http://www.w3.org/1999/xhtml"),
            ("xml:lang", self.language.as_str()),
        ])))?;

        // make head
        writer.write_event(Event::Start(BytesStart::new("head")))?;
        writer.write_event(Event::Empty(BytesStart::new("meta").with_attributes([
            ("http-equiv", "Content-Type"),
            ("content", "text/html; charset=UTF-8"),
        ])))?;

        if has_cover {
            writer.write_event(Event::Empty(BytesStart::new("meta").with_attributes([
                ("name", "calibre:cover"),
                ("content", "true"),
            ])))?;
        }

        writer.write_event(Event::Start(BytesStart::new("title")))?;
        writer.write_event(Event::Text(BytesText::new(&self.title)))?;
        writer.write_event(Event::End(BytesEnd::new("title")))?;

        if let Some(href) = &self.stylesheet {
            writer.write_event(Event::Empty(BytesStart::new("link").with_attributes([
                ("rel", "stylesheet"),
                ("type", "text/css"),
                ("href", href.as_str()),
            ])))?;
        }

        writer.write_event(Event::End(BytesEnd::new("head")))?;

        // make body
        writer.write_event(Event::Start(BytesStart::new("body")))?;
        for block in &self.blocks {
            block.make(&mut writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("body")))?;

        writer.write_event(Event::End(BytesEnd::new("html")))?;

        Ok(writer.into_inner().into_inner())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use quick_xml::{Reader, events::Event};

    use crate::builder::content::{Block, ContentBuilder};

    /// Reads the document to the end, failing on malformed XML
    pub(crate) fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        let mut depth = 0i32;

        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => depth -= 1,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => panic!("malformed xml: {}", err),
            }
        }

        assert_eq!(depth, 0);
    }

    #[test]
    fn test_make_chapter_document() {
        let mut builder = ContentBuilder::new("zh");
        builder
            .set_title("第一章 <开始>")
            .set_stylesheet("../style.css")
            .add_block(Block::Markup {
                content: "<h2>第一章 &lt;开始&gt;</h2><p>这是第一段。</p>".to_string(),
            });

        let xhtml = String::from_utf8(builder.make().unwrap()).unwrap();
        assert_well_formed(&xhtml);

        assert!(xhtml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xhtml.contains("<!DOCTYPE html PUBLIC"));
        assert!(xhtml.contains(r#"xml:lang="zh""#));
        assert!(xhtml.contains("<title>第一章 &lt;开始&gt;</title>"));
        assert!(xhtml.contains(r#"<link rel="stylesheet" type="text/css" href="../style.css"/>"#));
        assert!(xhtml.contains("<body><h2>第一章 &lt;开始&gt;</h2><p>这是第一段。</p></body>"));
        assert!(!xhtml.contains("calibre:cover"));
    }

    /// The cover page scales the image with its true aspect ratio
    #[test]
    fn test_make_cover_document() {
        let mut builder = ContentBuilder::new("zh");
        builder.set_title("封面").add_block(Block::Cover {
            href: "cover.png".to_string(),
            width: 600,
            height: 800,
        });

        let xhtml = String::from_utf8(builder.make().unwrap()).unwrap();
        assert_well_formed(&xhtml);

        assert!(!xhtml.contains("<!DOCTYPE"));
        assert!(xhtml.contains(r#"<meta name="calibre:cover" content="true"/>"#));
        assert!(xhtml.contains(r#"viewBox="0 0 600 800""#));
        assert!(xhtml.contains(r#"<image width="600" height="800" xlink:href="cover.png"/>"#));
        assert!(!xhtml.contains("stylesheet"));
    }
}
