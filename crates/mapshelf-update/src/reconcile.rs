//! Installed vs. published map version comparison

use std::collections::{BTreeMap, BTreeSet};

/// Suffix left on map names taken from legacy download property files
const LEGACY_PROPERTIES_SUFFIX: &str = ".zip.properties";

/// Suffix left on map names taken from repository branch downloads
const BRANCH_SUFFIX: &str = "-master";

/// Canonical form of a map name for matching local and published names
///
/// Lowercases, turns spaces into underscores, then strips the legacy
/// `.zip.properties` and `-master` suffixes until neither is left. The result
/// is a fixed point: normalizing it again changes nothing.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = name.replace(' ', "_").to_lowercase();

    loop {
        if let Some(stripped) = normalized.strip_suffix(LEGACY_PROPERTIES_SUFFIX) {
            normalized = stripped.to_string();
        } else if let Some(stripped) = normalized.strip_suffix(BRANCH_SUFFIX) {
            normalized = stripped.to_string();
        } else {
            return normalized;
        }
    }
}

/// Published map names whose version is newer than the installed one
///
/// Each installed map is matched by normalized name against the published
/// maps in key order; only the first match is compared. Names are reported
/// as published, not normalized. Maps present on only one side are ignored.
pub fn compute_out_of_date(
    installed: &BTreeMap<String, u32>,
    available: &BTreeMap<String, u32>,
) -> BTreeSet<String> {
    let available: Vec<(String, &String, u32)> = available
        .iter()
        .map(|(name, version)| (normalize_name(name), name, *version))
        .collect();

    let mut out_of_date = BTreeSet::new();
    for (installed_name, installed_version) in installed {
        let normalized = normalize_name(installed_name);

        let matched = available
            .iter()
            .find(|(available_name, _, _)| *available_name == normalized);

        if let Some((_, published_name, published_version)) = matched {
            if published_version > installed_version {
                tracing::debug!(
                    "{} is out of date: installed {}, published {}",
                    installed_name,
                    installed_version,
                    published_version
                );
                out_of_date.insert((*published_name).clone());
            }
        }
    }
    out_of_date
}
