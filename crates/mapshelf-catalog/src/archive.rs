//! Read access to packaged (zipped) maps
//!
//! Every call opens the archive, does its work and closes it again before
//! returning, so scanning hundreds of maps never holds more than one handle.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::CatalogError;

/// What the catalog needs from an archive format
pub trait ArchiveReader {
    /// Names of all entries in the archive
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>, CatalogError>;

    /// Whether an entry with exactly this name exists
    fn entry_exists(&self, archive: &Path, name: &str) -> Result<bool, CatalogError> {
        Ok(self.list_entries(archive)?.iter().any(|entry| entry == name))
    }

    /// Contents of the named entry, `None` if there is no such entry
    fn open_entry(&self, archive: &Path, name: &str) -> Result<Option<Vec<u8>>, CatalogError>;
}

/// [`ArchiveReader`] for zip files
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    pub fn new() -> Self {
        Self
    }

    fn open(archive: &Path) -> Result<zip::ZipArchive<File>, CatalogError> {
        let file = File::open(archive).map_err(|e| read_error(archive, e))?;
        zip::ZipArchive::new(file).map_err(|e| read_error(archive, e))
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>, CatalogError> {
        let zip = Self::open(archive)?;
        Ok(zip.file_names().map(str::to_string).collect())
    }

    fn entry_exists(&self, archive: &Path, name: &str) -> Result<bool, CatalogError> {
        let zip = Self::open(archive)?;
        let exists = zip.file_names().any(|entry| entry == name);
        Ok(exists)
    }

    fn open_entry(&self, archive: &Path, name: &str) -> Result<Option<Vec<u8>>, CatalogError> {
        let mut zip = Self::open(archive)?;
        let mut entry = match zip.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(read_error(archive, e)),
        };

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut contents)
            .map_err(|e| read_error(archive, e))?;
        Ok(Some(contents))
    }
}

fn read_error(archive: &Path, reason: impl std::fmt::Display) -> CatalogError {
    CatalogError::ArchiveRead {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}
