//! Finding the descriptor of a single map

use std::fs;
use std::path::Path;

use crate::codec;
use crate::legacy::{LegacyGenerator, sibling_descriptor_path};
use crate::{
    ARCHIVE_SUFFIX, ArchiveReader, CatalogError, DESCRIPTOR_FILE_NAME, DESCRIPTOR_SUFFIX,
    DescriptorBuilder, MapDescriptor,
};

/// Resolves a path in the maps directory to its map descriptor
///
/// * a folder is expected to hold `map.yml` at its root; a folder without one
///   is a map still in development and is skipped quietly
/// * a `.yml` file is read directly
/// * a `.zip` is read from its embedded `map.yml`, else from a previously
///   generated `<zip>.yml`, else a descriptor is generated for it
pub struct MapLocator<A: ArchiveReader> {
    archives: A,
}

impl<A: ArchiveReader> MapLocator<A> {
    pub fn new(archives: A) -> Self {
        Self { archives }
    }

    pub fn archives(&self) -> &A {
        &self.archives
    }

    /// Descriptor of the map at `path`, if it has a valid one
    pub fn locate(&self, path: &Path) -> Option<MapDescriptor> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let parsed = if path.is_dir() {
            self.read_from_folder(path)
        } else if path.is_file() && file_name.ends_with(DESCRIPTOR_SUFFIX) {
            read_from_file(path)
        } else if path.is_file() && file_name.ends_with(ARCHIVE_SUFFIX) {
            self.read_from_archive(path)
        } else {
            return None;
        };

        match parsed {
            Ok(Some(builder)) => accept(path, builder),
            Ok(None) => None,
            Err(e @ CatalogError::GenerationWrite { .. }) => {
                tracing::error!("{}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Skipping map {}: {}", path.display(), e);
                None
            }
        }
    }

    fn read_from_folder(&self, folder: &Path) -> Result<Option<DescriptorBuilder>, CatalogError> {
        let descriptor = folder.join(DESCRIPTOR_FILE_NAME);
        if !descriptor.is_file() {
            tracing::debug!(
                "No {} in {}, assuming a map in development",
                DESCRIPTOR_FILE_NAME,
                folder.display()
            );
            return Ok(None);
        }
        read_from_file(&descriptor)
    }

    fn read_from_archive(&self, archive: &Path) -> Result<Option<DescriptorBuilder>, CatalogError> {
        if self.archives.entry_exists(archive, DESCRIPTOR_FILE_NAME)? {
            let bytes = self.archives.open_entry(archive, DESCRIPTOR_FILE_NAME)?;
            return Ok(bytes.map(|bytes| codec::parse(&String::from_utf8_lossy(&bytes))));
        }

        let sibling = sibling_descriptor_path(archive);
        if sibling.is_file() {
            return read_from_file(&sibling);
        }

        LegacyGenerator::new(&self.archives).generate(archive)?;
        read_from_file(&sibling)
    }
}

fn read_from_file(path: &Path) -> Result<Option<DescriptorBuilder>, CatalogError> {
    let contents = fs::read_to_string(path)?;
    Ok(Some(codec::parse(&contents)))
}

/// Validate a parsed descriptor, reporting why it is rejected
fn accept(source: &Path, builder: DescriptorBuilder) -> Option<MapDescriptor> {
    match builder.build() {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            tracing::warn!(
                "Invalid map descriptor ({}) detected for {}. \
                 Check the file carefully and correct any mistakes. {}",
                DESCRIPTOR_FILE_NAME,
                source.display(),
                e
            );
            None
        }
    }
}
