//! Virtual file tree and Archive Writer
//!
//! The package assembler builds a [VirtualArchive], an insertion-ordered map from
//! archive paths to entries, and hands it whole to an [ArchiveWriter]. The writer
//! owns the compression mechanics; the archive owns path uniqueness.

use std::io::{Cursor, Write};

use indexmap::IndexMap;
use log::debug;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::{ConvertError, PackageError};

pub const MIMETYPE_PATH: &str = "mimetype";
pub const MIMETYPE_CONTENT: &str = "application/epub+zip";
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// One file of the output container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the container, using `/` separators
    pub path: String,

    pub content: Vec<u8>,

    /// Whether the entry is stored without compression
    pub store_raw: bool,
}

impl ArchiveEntry {
    /// Create a compressed entry
    pub fn new<C: Into<Vec<u8>>>(path: &str, content: C) -> Self {
        Self {
            path: path.to_string(),
            content: content.into(),
            store_raw: false,
        }
    }

    /// Create the uncompressed `mimetype` marker entry
    pub fn mimetype() -> Self {
        Self {
            path: MIMETYPE_PATH.to_string(),
            content: MIMETYPE_CONTENT.as_bytes().to_vec(),
            store_raw: true,
        }
    }
}

/// Insertion-ordered set of archive entries keyed by path
#[derive(Debug, Clone, Default)]
pub struct VirtualArchive {
    entries: IndexMap<String, ArchiveEntry>,
}

impl VirtualArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry
    ///
    /// # Return
    /// - `Ok(&mut Self)`: The entry was added after all existing entries
    /// - `Err(ConvertError)`: An entry already exists at the same path
    pub fn insert(&mut self, entry: ArchiveEntry) -> Result<&mut Self, ConvertError> {
        if self.entries.contains_key(&entry.path) {
            return Err(PackageError::DuplicateEntryPath { path: entry.path }.into());
        }

        self.entries.insert(entry.path.clone(), entry);
        Ok(self)
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.values()
    }

    /// Paths in insertion order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Check the container-level invariants
    ///
    /// The `mimetype` entry must exist with the exact marker content and be the
    /// only raw entry, and the container descriptor must exist.
    pub fn validate(&self) -> Result<(), ConvertError> {
        match self.entries.get(MIMETYPE_PATH) {
            Some(entry) if entry.content == MIMETYPE_CONTENT.as_bytes() && entry.store_raw => {}
            _ => return Err(PackageError::InvalidMimetype.into()),
        }

        if let Some(entry) = self
            .entries
            .values()
            .find(|entry| entry.store_raw && entry.path != MIMETYPE_PATH)
        {
            return Err(PackageError::UnexpectedRawEntry {
                path: entry.path.clone(),
            }
            .into());
        }

        if !self.entries.contains_key(CONTAINER_PATH) {
            return Err(PackageError::MissingContainer.into());
        }

        Ok(())
    }
}

/// Serializes a virtual archive into a zip container
///
/// A writer holds no state between calls; every call produces a fresh container.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    compression_level: Option<i64>,
}

impl ArchiveWriter {
    /// Create a writer
    ///
    /// # Parameters
    /// - `compression_level`: Deflate level, `None` for the backend default
    pub fn new(compression_level: Option<i64>) -> Self {
        Self { compression_level }
    }

    /// Write the archive into memory
    ///
    /// The `mimetype` entry is always written first, whatever its position in
    /// the virtual archive; the other entries follow in insertion order.
    ///
    /// # Return
    /// - `Ok(Vec<u8>)`: The container bytes
    /// - `Err(ConvertError)`: The archive is invalid or could not be serialized
    pub fn write(&self, archive: &VirtualArchive) -> Result<Vec<u8>, ConvertError> {
        archive.validate()?;

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let ordered = archive
            .entries()
            .filter(|entry| entry.path == MIMETYPE_PATH)
            .chain(archive.entries().filter(|entry| entry.path != MIMETYPE_PATH));

        for entry in ordered {
            let options = if entry.store_raw { stored } else { deflated };
            zip.start_file(entry.path.as_str(), options)?;
            zip.write_all(&entry.content)
                .map_err(|err| ConvertError::ArchiveSerializationFailure { source: err.into() })?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!("Wrote {} entries, {} bytes", archive.len(), bytes.len());

        Ok(bytes)
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(Some(crate::config::DEFAULT_COMPRESSION_LEVEL))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::{CompressionMethod, ZipArchive};

    use crate::{
        archive::{ArchiveEntry, ArchiveWriter, CONTAINER_PATH, VirtualArchive},
        error::{ConvertError, PackageError},
    };

    fn minimal_archive() -> VirtualArchive {
        let mut archive = VirtualArchive::new();
        archive
            .insert(ArchiveEntry::new(CONTAINER_PATH, "<container/>"))
            .unwrap()
            .insert(ArchiveEntry::mimetype())
            .unwrap()
            .insert(ArchiveEntry::new("content.opf", "<package/>"))
            .unwrap();
        archive
    }

    #[test]
    fn test_insert_keeps_order() {
        let archive = minimal_archive();

        assert_eq!(archive.len(), 3);
        assert_eq!(
            archive.paths().collect::<Vec<_>>(),
            vec![CONTAINER_PATH, "mimetype", "content.opf"]
        );
    }

    #[test]
    fn test_insert_duplicate_path() {
        let mut archive = minimal_archive();

        let result = archive.insert(ArchiveEntry::new("content.opf", "again"));
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            ConvertError::PackageError {
                source: PackageError::DuplicateEntryPath {
                    path: "content.opf".to_string()
                }
            }
        );
    }

    #[test]
    fn test_validate_missing_mimetype() {
        let mut archive = VirtualArchive::new();
        archive
            .insert(ArchiveEntry::new(CONTAINER_PATH, "<container/>"))
            .unwrap();

        assert_eq!(
            archive.validate().unwrap_err(),
            ConvertError::PackageError {
                source: PackageError::InvalidMimetype
            }
        );
    }

    /// A compressed mimetype entry violates the container invariants
    #[test]
    fn test_validate_compressed_mimetype() {
        let mut archive = VirtualArchive::new();
        archive
            .insert(ArchiveEntry::new("mimetype", "application/epub+zip"))
            .unwrap()
            .insert(ArchiveEntry::new(CONTAINER_PATH, "<container/>"))
            .unwrap();

        assert!(archive.validate().is_err());
    }

    #[test]
    fn test_validate_unexpected_raw_entry() {
        let mut archive = minimal_archive();
        let mut entry = ArchiveEntry::new("cover.png", vec![1, 2, 3]);
        entry.store_raw = true;
        archive.insert(entry).unwrap();

        assert_eq!(
            archive.validate().unwrap_err(),
            ConvertError::PackageError {
                source: PackageError::UnexpectedRawEntry {
                    path: "cover.png".to_string()
                }
            }
        );
    }

    #[test]
    fn test_validate_missing_container() {
        let mut archive = VirtualArchive::new();
        archive.insert(ArchiveEntry::mimetype()).unwrap();

        assert_eq!(
            archive.validate().unwrap_err(),
            ConvertError::PackageError {
                source: PackageError::MissingContainer
            }
        );
    }

    /// The mimetype entry is written first and stored, all others are deflated
    #[test]
    fn test_write_archive() {
        let archive = minimal_archive();

        let bytes = ArchiveWriter::default().write(&archive).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);

        {
            let mut mimetype = zip.by_index(0).unwrap();
            assert_eq!(mimetype.name(), "mimetype");
            assert_eq!(mimetype.compression(), CompressionMethod::Stored);

            let mut content = String::new();
            mimetype.read_to_string(&mut content).unwrap();
            assert_eq!(content, "application/epub+zip");
        }

        for index in 1..zip.len() {
            let file = zip.by_index(index).unwrap();
            assert_eq!(file.compression(), CompressionMethod::Deflated);
        }

        let mut opf = String::new();
        zip.by_name("content.opf")
            .unwrap()
            .read_to_string(&mut opf)
            .unwrap();
        assert_eq!(opf, "<package/>");
    }

    #[test]
    fn test_write_with_backend_default_level() {
        let archive = minimal_archive();

        let bytes = ArchiveWriter::new(None).write(&archive).unwrap();
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);
    }
}
