//! Map update checks for mapshelf
//!
//! Compares the versions of the installed maps against a published listing
//! and decides how often that comparison runs.
//!
//! Local and published map names follow different conventions (`Big Map`,
//! `big_map-master`, `big_map.zip.properties`), so names are matched through
//! [`normalize_name`]. Checks are gated by an [`UpdateScheduler`] that keeps
//! the time of the last check in a [`CheckStateStore`].

mod listing;
mod reconcile;
mod scheduler;

use std::collections::BTreeSet;
use std::path::Path;

use mapshelf_catalog::{ArchiveReader, CatalogError, MapIndex, MapLocator};
use thiserror::Error;

pub use listing::{
    DownloadList, FileListing, ListingSource, MapCategory, MapDownload, StaticListing,
    available_versions, parse_listing,
};
pub use reconcile::{compute_out_of_date, normalize_name};
pub use scheduler::{
    CheckStateStore, MemoryStateStore, THRESHOLD_DAYS, UpdateScheduler, now_millis,
};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Failed to fetch map listing: {0}")]
    ListingFailed(String),

    #[error("Failed to persist update check state: {0}")]
    StateStore(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Result of one map update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckOutcome {
    /// The last check was too recent
    NotDue,
    /// The listing could not be fetched or was empty
    ListingUnavailable,
    UpToDate,
    /// Published names of the maps with a newer version
    OutOfDate(BTreeSet<String>),
}

/// Full update check: scheduler gate, listing fetch, index scan, reconcile
pub struct MapUpdateCheck<S: CheckStateStore, L: ListingSource> {
    scheduler: UpdateScheduler<S>,
    listing: L,
    force: bool,
}

impl<S: CheckStateStore, L: ListingSource> MapUpdateCheck<S, L> {
    pub fn new(scheduler: UpdateScheduler<S>, listing: L) -> Self {
        Self {
            scheduler,
            listing,
            force: false,
        }
    }

    /// Run even if the last check was recent
    ///
    /// The check time is still recorded.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn scheduler(&self) -> &UpdateScheduler<S> {
        &self.scheduler
    }

    /// Check the maps installed in `maps_dir` against the listing
    pub fn run<A: ArchiveReader>(
        &mut self,
        maps_dir: &Path,
        locator: &MapLocator<A>,
    ) -> UpdateCheckOutcome {
        if self.force {
            if let Err(e) = self.scheduler.mark_checked(now_millis()) {
                tracing::warn!("Failed to record map update check time: {}", e);
            }
        } else if !self.scheduler.is_check_due() {
            tracing::debug!(
                "Map update check not due, threshold is {} days",
                self.scheduler.threshold().as_secs() / 86_400
            );
            return UpdateCheckOutcome::NotDue;
        }

        let downloads = match self.listing.fetch() {
            Ok(downloads) if !downloads.is_empty() => downloads,
            Ok(_) => {
                tracing::warn!("Map listing is empty, skipping update check");
                return UpdateCheckOutcome::ListingUnavailable;
            }
            Err(e) => {
                tracing::warn!("Skipping map update check: {}", e);
                return UpdateCheckOutcome::ListingUnavailable;
            }
        };

        let available = available_versions(&downloads);
        let installed = MapIndex::build(maps_dir, locator).name_to_version();
        let out_of_date = compute_out_of_date(&installed, &available);

        if out_of_date.is_empty() {
            tracing::info!("All {} installed maps are up to date", installed.len());
            UpdateCheckOutcome::UpToDate
        } else {
            tracing::info!("{} maps have updates available", out_of_date.len());
            UpdateCheckOutcome::OutOfDate(out_of_date)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapshelf_catalog::ZipArchiveReader;
    use std::fs;

    fn maps_dir_with(maps: &[(&str, u32)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, version) in maps {
            let folder = dir.path().join(name.replace(' ', "_"));
            fs::create_dir_all(&folder).unwrap();
            fs::write(
                folder.join("map.yml"),
                format!(
                    "map_name: {}\nversion: {}\ngames:\n  - name: {} Game\n    xml_path: games/g.xml\n",
                    name, version, name
                ),
            )
            .unwrap();
        }
        dir
    }

    fn locator() -> MapLocator<ZipArchiveReader> {
        MapLocator::new(ZipArchiveReader::new())
    }

    struct FailingListing;

    impl ListingSource for FailingListing {
        fn fetch(&self) -> Result<Vec<MapDownload>, UpdateError> {
            Err(UpdateError::ListingFailed("connection refused".to_string()))
        }
    }

    #[test]
    fn test_out_of_date() {
        let maps = maps_dir_with(&[("Big Map", 1), ("Small Map", 4)]);
        let listing = StaticListing(vec![
            MapDownload::new("big_map-master", 2),
            MapDownload::new("Small Map", 4),
        ]);

        let mut check =
            MapUpdateCheck::new(UpdateScheduler::new(MemoryStateStore::default()), listing);

        assert_eq!(
            check.run(maps.path(), &locator()),
            UpdateCheckOutcome::OutOfDate(BTreeSet::from(["big_map-master".to_string()]))
        );
    }

    #[test]
    fn test_second_run_is_not_due() {
        let maps = maps_dir_with(&[("Big Map", 1)]);
        let listing = StaticListing(vec![MapDownload::new("Big Map", 1)]);
        let mut check =
            MapUpdateCheck::new(UpdateScheduler::new(MemoryStateStore::default()), listing);

        assert_eq!(check.run(maps.path(), &locator()), UpdateCheckOutcome::UpToDate);
        assert_eq!(check.run(maps.path(), &locator()), UpdateCheckOutcome::NotDue);
    }

    #[test]
    fn test_force_bypasses_scheduler_and_records_check() {
        let maps = maps_dir_with(&[("Big Map", 1)]);
        let listing = StaticListing(vec![MapDownload::new("Big Map", 1)]);
        let recent = now_millis() - 1_000;
        let mut check =
            MapUpdateCheck::new(UpdateScheduler::new(MemoryStateStore::new(Some(recent))), listing)
                .force(true);

        assert_eq!(check.run(maps.path(), &locator()), UpdateCheckOutcome::UpToDate);
        assert!(check.scheduler().store().last_check().unwrap() >= recent);
    }

    #[test]
    fn test_listing_failure_is_not_fatal() {
        let maps = maps_dir_with(&[("Big Map", 1)]);
        let mut check = MapUpdateCheck::new(
            UpdateScheduler::new(MemoryStateStore::default()),
            FailingListing,
        );

        assert_eq!(
            check.run(maps.path(), &locator()),
            UpdateCheckOutcome::ListingUnavailable
        );
    }

    #[test]
    fn test_empty_listing() {
        let maps = maps_dir_with(&[]);
        let mut check = MapUpdateCheck::new(
            UpdateScheduler::new(MemoryStateStore::default()),
            StaticListing::default(),
        );

        assert_eq!(
            check.run(maps.path(), &locator()),
            UpdateCheckOutcome::ListingUnavailable
        );
    }

    #[test]
    fn test_error_display() {
        let err = UpdateError::ListingFailed("timeout".to_string());
        assert_eq!(err.to_string(), "Failed to fetch map listing: timeout");

        let err: UpdateError = CatalogError::MalformedDescriptor("no games".to_string()).into();
        assert!(err.to_string().contains("no games"));
    }
}
