//! Descriptor generation for legacy map zips
//!
//! Maps packaged before `map.yml` existed carry only their game XML files plus
//! a `<zip>.properties` file written next to the zip when it was downloaded.
//! From those two sources we can work out everything a descriptor needs, and
//! we write the result next to the zip as `<zip>.yml` so the work is done once.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::{ArchiveReader, CatalogError, DescriptorBuilder, GameEntry, DESCRIPTOR_SUFFIX};

/// Suffix of the legacy download properties file
pub const PROPERTIES_SUFFIX: &str = ".properties";

/// Key of the download version inside the properties file
pub const VERSION_PROPERTY: &str = "map.version";

/// Name of the game XML property holding the map name
const MAP_NAME_PROPERTY: &str = "mapName";

/// Where a descriptor generated for `archive` is written
pub fn sibling_descriptor_path(archive: &Path) -> PathBuf {
    append_suffix(archive, DESCRIPTOR_SUFFIX)
}

/// Where the legacy download properties of `archive` live
pub fn properties_path(archive: &Path) -> PathBuf {
    append_suffix(archive, PROPERTIES_SUFFIX)
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Major component of a `major.minor[...]` version string
pub fn parse_major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.trim().parse().ok()
}

/// What a single game XML tells us
#[derive(Debug, Clone, PartialEq, Eq)]
struct GameXmlInfo {
    game_name: String,
    map_name: Option<String>,
}

/// Builds descriptors for zips that do not have one
pub struct LegacyGenerator<'a, A: ArchiveReader + ?Sized> {
    archives: &'a A,
}

impl<'a, A: ArchiveReader + ?Sized> LegacyGenerator<'a, A> {
    pub fn new(archives: &'a A) -> Self {
        Self { archives }
    }

    /// Describe `archive` and persist the result as its sibling descriptor
    pub fn generate(&self, archive: &Path) -> Result<DescriptorBuilder, CatalogError> {
        let descriptor = self.describe(archive)?;
        let yaml = codec::encode_builder(&descriptor)?;

        let target = sibling_descriptor_path(archive);
        fs::write(&target, yaml).map_err(|source| CatalogError::GenerationWrite {
            path: target.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote map descriptor {} for legacy map {}",
            target.display(),
            archive.display()
        );
        Ok(descriptor)
    }

    /// Work out the descriptor of `archive` without writing anything
    pub fn describe(&self, archive: &Path) -> Result<DescriptorBuilder, CatalogError> {
        let mut xml_entries: Vec<String> = self
            .archives
            .list_entries(archive)?
            .into_iter()
            .filter(|name| name.to_lowercase().ends_with(".xml"))
            .collect();
        xml_entries.sort();

        let mut map_name = String::new();
        let mut games = Vec::new();

        for entry in &xml_entries {
            let Some(bytes) = self.archives.open_entry(archive, entry)? else {
                continue;
            };

            match parse_game_xml(&String::from_utf8_lossy(&bytes)) {
                Ok(info) => {
                    if let Some(name) = info.map_name {
                        map_name = name;
                    }
                    let xml_path = entry.trim_start_matches('/');
                    games.push(GameEntry::new(info.game_name, xml_path));
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping {} in {}: {}",
                        entry,
                        archive.display(),
                        e
                    );
                }
            }
        }

        Ok(DescriptorBuilder::default()
            .map_name(map_name)
            .version(read_download_version(archive))
            .games(games))
    }
}

/// Pull the game name and map name out of a game XML document
fn parse_game_xml(text: &str) -> Result<GameXmlInfo, CatalogError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| CatalogError::Xml(e.to_string()))?;

    let root = doc.root_element();
    let game_name = root
        .children()
        .find(|node| node.has_tag_name("info"))
        .and_then(|info| info.attribute("name"))
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| CatalogError::Xml("no <info name=\"...\"> element".to_string()))?;

    let map_name = root
        .descendants()
        .filter(|node| node.has_tag_name("property"))
        .find(|node| node.attribute("name") == Some(MAP_NAME_PROPERTY))
        .and_then(|property| {
            property.attribute("value").map(str::to_string).or_else(|| {
                property
                    .children()
                    .find(|child| child.has_tag_name("value"))
                    .and_then(|value| value.text())
                    .map(|text| text.trim().to_string())
            })
        });

    Ok(GameXmlInfo {
        game_name: game_name.to_string(),
        map_name,
    })
}

/// Major download version from the properties file, `0` when unknown
fn read_download_version(archive: &Path) -> u32 {
    let path = properties_path(archive);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No download properties for {}", archive.display());
            return 0;
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return 0;
        }
    };

    parse_properties(&contents)
        .get(VERSION_PROPERTY)
        .and_then(|version| parse_major_version(version))
        .unwrap_or(0)
}

/// Minimal `key=value` / `key: value` properties reader
fn parse_properties(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
