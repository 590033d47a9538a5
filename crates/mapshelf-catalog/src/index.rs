//! Index over every map installed in a maps directory

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    ARCHIVE_SUFFIX, ArchiveReader, CatalogError, DESCRIPTOR_FILE_NAME, DESCRIPTOR_SUFFIX,
    MapDescriptor, MapLocator,
};

/// A descriptor and the folder, zip or `.yml` file it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub descriptor: MapDescriptor,
    pub location: PathBuf,
}

/// A game XML inside an installed map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLocation {
    /// Map folder or zip
    pub package: PathBuf,
    /// XML path relative to the map root
    pub xml_path: String,
}

impl GameLocation {
    /// Folder or zip holding the game XML
    ///
    /// A map indexed through a standalone `<zip>.yml` is read from the zip
    /// next to it. Any other standalone descriptor has no content of its own.
    pub fn content_package(&self) -> Result<PathBuf, CatalogError> {
        if self.package.is_dir() {
            return Ok(self.package.clone());
        }

        let file_name = self
            .package
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !file_name.ends_with(DESCRIPTOR_SUFFIX) {
            return Ok(self.package.clone());
        }

        let archive = self.package.with_extension("");
        let is_archive = file_name
            .strip_suffix(DESCRIPTOR_SUFFIX)
            .is_some_and(|stem| stem.ends_with(ARCHIVE_SUFFIX));
        if is_archive && archive.is_file() {
            Ok(archive)
        } else {
            Err(CatalogError::DescriptorOnly(self.package.clone()))
        }
    }

    /// Read the game XML out of its map
    pub fn read(&self, archives: &impl ArchiveReader) -> Result<Vec<u8>, CatalogError> {
        let package = self.content_package()?;
        if package.is_dir() {
            return Ok(fs::read(package.join(&self.xml_path))?);
        }

        archives
            .open_entry(&package, &self.xml_path)?
            .ok_or_else(|| CatalogError::ArchiveRead {
                path: package.clone(),
                reason: format!("no entry named {}", self.xml_path),
            })
    }
}

impl fmt::Display for GameLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!/{}", self.package.display(), self.xml_path)
    }
}

/// Immutable snapshot of the installed maps
///
/// Entries are kept in location order. Where two maps collide (the same
/// descriptor twice, the same map name, or the same game name) the entry with
/// the lexicographically smallest location wins.
#[derive(Debug, Clone, Default)]
pub struct MapIndex {
    entries: Vec<CatalogEntry>,
}

impl MapIndex {
    /// Scan the direct children of `maps_dir`
    ///
    /// Children without a valid descriptor are skipped. A missing or
    /// unreadable maps directory gives an empty index.
    pub fn build<A: ArchiveReader>(maps_dir: &Path, locator: &MapLocator<A>) -> Self {
        let children = match list_children(maps_dir) {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!("Cannot read maps directory {}: {}", maps_dir.display(), e);
                return Self::default();
            }
        };

        let index = Self::from_entries(children.into_iter().filter_map(|child| {
            tracing::debug!("Looking for a {} in {}", DESCRIPTOR_FILE_NAME, child.display());
            locator
                .locate(&child)
                .map(|descriptor| (descriptor, child))
        }));

        tracing::info!(
            "Indexed {} maps in {}",
            index.len(),
            maps_dir.display()
        );
        index
    }

    /// Build a snapshot from already known descriptors
    pub fn from_entries(entries: impl IntoIterator<Item = (MapDescriptor, PathBuf)>) -> Self {
        let mut entries: Vec<CatalogEntry> = entries
            .into_iter()
            .map(|(descriptor, location)| CatalogEntry {
                descriptor,
                location,
            })
            .collect();
        entries.sort_by(|a, b| a.location.cmp(&b.location));

        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.descriptor.clone()));

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every game name across all maps, sorted, duplicates kept
    pub fn sorted_game_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .flat_map(|entry| entry.descriptor.games())
            .map(|game| game.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn has_game(&self, game_name: &str) -> bool {
        self.find_game_location(game_name).is_some()
    }

    /// Where the XML of the named game can be found
    pub fn find_game_location(&self, game_name: &str) -> Option<GameLocation> {
        self.entries.iter().find_map(|entry| {
            entry
                .descriptor
                .game_xml_path(game_name)
                .map(|xml_path| GameLocation {
                    package: entry.location.clone(),
                    xml_path: xml_path.to_string(),
                })
        })
    }

    /// Installed version of every map, by map name
    pub fn name_to_version(&self) -> BTreeMap<String, u32> {
        let mut versions = BTreeMap::new();
        for entry in &self.entries {
            versions
                .entry(entry.descriptor.map_name().to_string())
                .or_insert(entry.descriptor.version());
        }
        versions
    }

    /// Installed version of the map with exactly this name
    pub fn version_of(&self, map_name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.map_name() == map_name)
            .map(|entry| entry.descriptor.version())
    }
}

fn list_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?.map(|entry| entry.map(|entry| entry.path()));
    Ok(collect_children(dir, entries))
}

/// Sorted children, skipping any entry the directory listing fails on
fn collect_children(
    dir: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    children.sort();
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor(map_name: &str, version: u32, games: &[(&str, &str)]) -> MapDescriptor {
        games
            .iter()
            .fold(
                MapDescriptor::builder().map_name(map_name).version(version),
                |builder, (name, path)| builder.game(*name, *path),
            )
            .build()
            .unwrap()
    }

    fn sample_index() -> MapIndex {
        MapIndex::from_entries([
            (
                descriptor("Pacific", 4, &[("Pacific 1940", "games/p40.xml")]),
                PathBuf::from("/maps/pacific.zip"),
            ),
            (
                descriptor(
                    "Big World",
                    2,
                    &[
                        ("Big World 1942", "games/bw42.xml"),
                        ("Big World Lite", "games/lite.xml"),
                    ],
                ),
                PathBuf::from("/maps/big_world"),
            ),
        ])
    }

    #[test]
    fn test_sorted_game_names() {
        assert_eq!(
            sample_index().sorted_game_names(),
            vec!["Big World 1942", "Big World Lite", "Pacific 1940"]
        );
    }

    #[test]
    fn test_sorted_game_names_keeps_duplicates() {
        let index = MapIndex::from_entries([
            (descriptor("A", 1, &[("Same", "a.xml")]), PathBuf::from("/maps/a")),
            (descriptor("B", 1, &[("Same", "b.xml")]), PathBuf::from("/maps/b")),
        ]);
        assert_eq!(index.sorted_game_names(), vec!["Same", "Same"]);
    }

    #[test]
    fn test_find_game_location() {
        let index = sample_index();
        let location = index.find_game_location("Big World Lite").unwrap();
        assert_eq!(location.package, PathBuf::from("/maps/big_world"));
        assert_eq!(location.xml_path, "games/lite.xml");
        assert_eq!(location.to_string(), "/maps/big_world!/games/lite.xml");

        assert!(index.has_game("Pacific 1940"));
        assert!(!index.has_game("pacific 1940"));
        assert_eq!(index.find_game_location("Missing"), None);
    }

    #[test]
    fn test_duplicate_game_resolves_to_first_location() {
        let index = MapIndex::from_entries([
            (descriptor("Z", 1, &[("Same", "z.xml")]), PathBuf::from("/maps/z.zip")),
            (descriptor("A", 1, &[("Same", "a.xml")]), PathBuf::from("/maps/a.zip")),
        ]);
        let location = index.find_game_location("Same").unwrap();
        assert_eq!(location.package, PathBuf::from("/maps/a.zip"));
    }

    #[test]
    fn test_name_to_version() {
        let versions = sample_index().name_to_version();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions.get("Pacific"), Some(&4));
        assert_eq!(versions.get("Big World"), Some(&2));
    }

    #[test]
    fn test_duplicate_map_name_resolves_to_first_location() {
        let index = MapIndex::from_entries([
            (descriptor("Dup", 9, &[("G2", "g.xml")]), PathBuf::from("/maps/dup_b.zip")),
            (descriptor("Dup", 3, &[("G1", "g.xml")]), PathBuf::from("/maps/dup_a.zip")),
        ]);
        assert_eq!(index.name_to_version().get("Dup"), Some(&3));
        assert_eq!(index.version_of("Dup"), Some(3));
    }

    #[test]
    fn test_equal_descriptors_collapse() {
        let same = descriptor("Twin", 1, &[("Twin Game", "t.xml")]);
        let index = MapIndex::from_entries([
            (same.clone(), PathBuf::from("/maps/twin.zip.yml")),
            (same, PathBuf::from("/maps/twin.zip")),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].location, PathBuf::from("/maps/twin.zip"));
    }

    #[test]
    fn test_version_of() {
        let index = sample_index();
        assert_eq!(index.version_of("Pacific"), Some(4));
        assert_eq!(index.version_of("pacific"), None);
    }

    #[test]
    fn test_empty_index() {
        let index = MapIndex::default();
        assert!(index.is_empty());
        assert!(index.sorted_game_names().is_empty());
        assert!(index.name_to_version().is_empty());
    }

    #[test]
    fn test_read_game_from_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("games")).unwrap();
        fs::write(dir.path().join("games/g.xml"), "<game/>").unwrap();

        let location = GameLocation {
            package: dir.path().to_path_buf(),
            xml_path: "games/g.xml".to_string(),
        };
        let bytes = location.read(&crate::ZipArchiveReader::new()).unwrap();
        assert_eq!(bytes, b"<game/>");
    }

    #[test]
    fn test_unreadable_entry_does_not_abort_listing() {
        let children = collect_children(
            Path::new("/maps"),
            [
                Ok(PathBuf::from("/maps/b.zip")),
                Err(std::io::Error::other("stale handle")),
                Ok(PathBuf::from("/maps/a")),
            ],
        );
        assert_eq!(
            children,
            vec![PathBuf::from("/maps/a"), PathBuf::from("/maps/b.zip")]
        );
    }

    #[test]
    fn test_read_game_through_archive_descriptor() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("legacy.zip");
        let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        writer
            .start_file("games/g.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<game/>").unwrap();
        writer.finish().unwrap();
        let sibling = dir.path().join("legacy.zip.yml");
        fs::write(&sibling, "map_name: Legacy\n").unwrap();

        let location = GameLocation {
            package: sibling,
            xml_path: "games/g.xml".to_string(),
        };
        assert_eq!(location.content_package().unwrap(), archive);
        let bytes = location.read(&crate::ZipArchiveReader::new()).unwrap();
        assert_eq!(bytes, b"<game/>");
    }

    #[test]
    fn test_read_game_from_standalone_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join("gone.zip.yml");
        let standalone = dir.path().join("notes.yml");
        fs::write(&orphan, "map_name: Gone\n").unwrap();
        fs::write(&standalone, "map_name: Notes\n").unwrap();

        for package in [orphan, standalone] {
            let location = GameLocation {
                package: package.clone(),
                xml_path: "games/g.xml".to_string(),
            };
            let err = location.read(&crate::ZipArchiveReader::new()).unwrap_err();
            assert!(
                matches!(err, CatalogError::DescriptorOnly(ref path) if *path == package),
                "unexpected error: {}",
                err
            );
        }
    }

    #[test]
    fn test_index_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MapIndex>();
    }
}
