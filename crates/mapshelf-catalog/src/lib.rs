//! Installed map catalog for mapshelf
//!
//! Finds the `map.yml` descriptor of every map in a maps directory, whether the
//! map is an unpacked folder, a zip, or a standalone descriptor file, and
//! builds an immutable index over what was found. Legacy zips that predate
//! `map.yml` get a descriptor generated from their game XML files.

pub mod archive;
pub mod codec;
mod descriptor;
mod index;
mod legacy;
mod locator;

pub use archive::{ArchiveReader, ZipArchiveReader};
pub use descriptor::{DescriptorBuilder, GameEntry, MapDescriptor};
pub use index::{CatalogEntry, GameLocation, MapIndex};
pub use legacy::{LegacyGenerator, parse_major_version, properties_path, sibling_descriptor_path};
pub use locator::MapLocator;

use std::path::PathBuf;
use thiserror::Error;

/// File name of a map descriptor inside a map folder or zip
pub const DESCRIPTOR_FILE_NAME: &str = "map.yml";

/// Suffix of standalone descriptor files
pub const DESCRIPTOR_SUFFIX: &str = ".yml";

/// Suffix of packaged maps
pub const ARCHIVE_SUFFIX: &str = ".zip";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed map descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Failed to read archive {path}: {reason}")]
    ArchiveRead { path: PathBuf, reason: String },

    #[error("Failed to write generated descriptor {path}: {source}")]
    GenerationWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is a standalone descriptor without map content")]
    DescriptorOnly(PathBuf),

    #[error("Invalid game XML: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
