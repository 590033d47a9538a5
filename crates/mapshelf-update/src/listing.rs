//! Published map listing
//!
//! The listing is a YAML document naming every downloadable map:
//!
//! ```yaml
//! - mapName: World War II Classic
//!   version: 3
//!   url: https://example.org/world_war_ii_classic.zip
//!   mapCategory: BEST
//!   description: The first release.
//! ```
//!
//! Fetching it over the network is up to the embedding application; anything
//! that can produce the entries implements [`ListingSource`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use mapshelf_catalog::MapIndex;
use serde::{Deserialize, Serialize};

use crate::UpdateError;

/// How a published map is rated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MapCategory {
    Best,
    Good,
    Experimental,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of the published listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDownload {
    pub map_name: String,

    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub map_category: MapCategory,
}

impl MapDownload {
    pub fn new(map_name: impl Into<String>, version: u32) -> Self {
        Self {
            map_name: map_name.into(),
            version: Some(version),
            url: String::new(),
            description: None,
            map_category: MapCategory::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Something that can produce the published listing
pub trait ListingSource {
    fn fetch(&self) -> Result<Vec<MapDownload>, UpdateError>;
}

/// Parse a listing document
pub fn parse_listing(text: &str) -> Result<Vec<MapDownload>, UpdateError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml_ng::from_str(text)?)
}

/// Listing read from a YAML file, e.g. one a downloader saved to disk
#[derive(Debug, Clone)]
pub struct FileListing {
    path: PathBuf,
}

impl FileListing {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ListingSource for FileListing {
    fn fetch(&self) -> Result<Vec<MapDownload>, UpdateError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            UpdateError::ListingFailed(format!("{}: {}", self.path.display(), e))
        })?;
        parse_listing(&contents)
    }
}

/// Listing held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticListing(pub Vec<MapDownload>);

impl ListingSource for StaticListing {
    fn fetch(&self) -> Result<Vec<MapDownload>, UpdateError> {
        Ok(self.0.clone())
    }
}

/// Published version of every map, by published name
///
/// Entries without a version are left out. If a name is listed twice the
/// later entry wins.
pub fn available_versions(downloads: &[MapDownload]) -> BTreeMap<String, u32> {
    downloads
        .iter()
        .filter_map(|download| {
            download
                .version
                .map(|version| (download.map_name.clone(), version))
        })
        .collect()
}

/// The listing split by what is installed
#[derive(Debug, Clone, Default)]
pub struct DownloadList {
    available: Vec<MapDownload>,
    installed: Vec<MapDownload>,
    out_of_date: Vec<MapDownload>,
}

impl DownloadList {
    /// Sort each listed map into not installed, installed, and installed but
    /// older than the listed version (matched by exact map name)
    pub fn new(downloads: impl IntoIterator<Item = MapDownload>, index: &MapIndex) -> Self {
        let mut list = Self::default();

        for download in downloads {
            match index.version_of(&download.map_name) {
                Some(installed_version) => {
                    if download
                        .version
                        .is_some_and(|version| version > installed_version)
                    {
                        list.out_of_date.push(download.clone());
                    }
                    list.installed.push(download);
                }
                None => list.available.push(download),
            }
        }

        list
    }

    /// Listed maps that are not installed
    pub fn available(&self) -> &[MapDownload] {
        &self.available
    }

    pub fn installed(&self) -> &[MapDownload] {
        &self.installed
    }

    /// Installed maps with a newer listed version
    pub fn out_of_date(&self) -> &[MapDownload] {
        &self.out_of_date
    }

    pub fn available_excluding(&self, excluded: &[MapDownload]) -> Vec<MapDownload> {
        exclude(&self.available, excluded)
    }

    pub fn out_of_date_excluding(&self, excluded: &[MapDownload]) -> Vec<MapDownload> {
        exclude(&self.out_of_date, excluded)
    }
}

fn exclude(downloads: &[MapDownload], excluded: &[MapDownload]) -> Vec<MapDownload> {
    downloads
        .iter()
        .filter(|download| !excluded.contains(download))
        .cloned()
        .collect()
}
