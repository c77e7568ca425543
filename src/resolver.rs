//! Dependency resolution against the locations registries.
//!
//! For every discovered plugin record the resolver looks up its registry
//! entry (exact version first, `any_version` fallback), resolves each
//! declared library and include reference on the filesystem, applies the
//! exclusion filter, and aggregates link/include/rpath fragments per
//! (category, directory). The filesystem is only read here; classification
//! never mutates anything, so resolving the same tree twice yields
//! byte-identical aggregates.

use crate::markers::split_references;
use crate::plugin::{PluginCategory, PluginRecord, PluginStatus};
use crate::registry::{LocationsRegistry, RequirementKey};
use crate::scan::ScanOutcome;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Third-party packages resolved by the downstream build system's own
/// detection machinery instead of by direct path lookup.
pub const AUTO_DETECTED_PACKAGES: [&str; 2] = ["ROOT", "GSL"];

/// Aggregated build inputs for one (category, directory) bucket.
///
/// Link fragments and auto-detect names are order-preserving but
/// deduplicated; directory sets are order-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBuildSet {
    pub link_fragments: Vec<String>,
    pub library_dirs: BTreeSet<PathBuf>,
    pub include_dirs: BTreeSet<PathBuf>,
    pub auto_libs: Vec<String>,
}

/// The complete result of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// One build set per (category, directory) that had at least one
    /// discovered plugin, even if everything in it ended up missing or
    /// excluded.
    pub build_sets: BTreeMap<(PluginCategory, String), ResolvedBuildSet>,
    /// Static archives accumulate verbatim into one space-joined string,
    /// never deduplicated; it is consumed whole at final link time.
    pub static_links: String,
    /// All records with their final statuses.
    pub records: Vec<PluginRecord>,
}

/// The resolver: an exclusion-prefix filter plus the resolution pass itself.
#[derive(Debug, Default)]
pub struct Resolver {
    exclusions: Vec<String>,
}

impl Resolver {
    pub fn new(exclusions: Vec<String>) -> Self {
        Resolver { exclusions }
    }

    fn is_excluded(&self, record: &PluginRecord) -> bool {
        let key = record.identity.exclusion_key();
        self.exclusions.iter().any(|prefix| key.starts_with(prefix))
    }

    /// Resolve every record of a scan outcome against the per-category
    /// registries.
    pub fn resolve(
        &self,
        outcome: &ScanOutcome,
        registries: &BTreeMap<PluginCategory, LocationsRegistry>,
    ) -> Result<Resolution> {
        let mut records = outcome.records.clone();
        let mut build_sets: BTreeMap<(PluginCategory, String), ResolvedBuildSet> = BTreeMap::new();
        let mut static_links = String::new();

        // Every bucket with a discovered plugin gets a build set up front,
        // and the scan-time auto-detect candidates seed it. Buckets key off
        // the category subtree the record came from, like the listings.
        for record in &records {
            build_sets
                .entry((record.tree_category, record.directory.clone()))
                .or_default();
        }
        for ((category, directory), names) in &outcome.auto_candidates {
            let set = build_sets
                .entry((*category, directory.clone()))
                .or_default();
            for name in names {
                push_unique(&mut set.auto_libs, name);
            }
        }

        let empty = LocationsRegistry::empty();
        for record in &mut records {
            let category = record.identity.category;
            let name = record.identity.name.clone();
            let version = record.identity.version.canonical();

            // Exclusion is checked against the identity, not against any
            // particular reference, and always wins.
            if self.is_excluded(record) {
                record.status.exclude();
                log::debug!("plugin {} v{} excluded by filter", name, version);
                continue;
            }

            let registry = registries.get(&category).unwrap_or(&empty);
            let groups = match registry.lookup(&name, &version) {
                Some(groups) => groups,
                None => continue,
            };
            let set = build_sets
                .get_mut(&(record.tree_category, record.directory.clone()))
                .expect("build set seeded for every record");

            for group in groups {
                for (key, value) in &group.entries {
                    match key {
                        RequirementKey::Libraries => {
                            for reference in split_references(value) {
                                resolve_library(
                                    &reference,
                                    record,
                                    set,
                                    &mut static_links,
                                    &version,
                                )?;
                            }
                        }
                        RequirementKey::Includes => {
                            for reference in split_references(value) {
                                resolve_include(&reference, record, set, &version)?;
                            }
                        }
                        RequirementKey::Unknown(raw) => {
                            log::warn!(
                                "unknown locations entry {} for {} plugin {} v{}",
                                raw,
                                category,
                                name,
                                version
                            );
                        }
                    }
                }
            }
        }

        Ok(Resolution {
            build_sets,
            static_links,
            records,
        })
    }
}

fn resolve_library(
    reference: &str,
    record: &mut PluginRecord,
    set: &mut ResolvedBuildSet,
    static_links: &mut String,
    version: &str,
) -> Result<()> {
    let path = Path::new(reference);
    if path.is_file() {
        record.status.mark_found();
        let absolute = absolute_path(path)?;
        log::info!(
            "found library {} needed for {} plugin {} v{}",
            absolute.display(),
            record.identity.category,
            record.identity.name,
            version
        );
        if reference.ends_with(".a") {
            static_links.push_str(&absolute.to_string_lossy());
            static_links.push(' ');
        } else if let (Some(dir), Some(file_name)) =
            (absolute.parent(), absolute.file_name().and_then(|n| n.to_str()))
        {
            let fragment = format!("-L{} -l{}", dir.display(), dynamic_stem(file_name));
            push_unique(&mut set.link_fragments, &fragment);
            set.library_dirs.insert(dir.to_path_buf());
        }
    } else if AUTO_DETECTED_PACKAGES.contains(&reference) {
        push_unique(&mut set.auto_libs, reference);
    } else {
        record.status.mark_missing();
    }
    Ok(())
}

fn resolve_include(
    reference: &str,
    record: &mut PluginRecord,
    set: &mut ResolvedBuildSet,
    version: &str,
) -> Result<()> {
    let path = Path::new(reference);
    if path.is_dir() {
        record.status.mark_found();
        let absolute = absolute_path(path)?;
        log::info!(
            "found include path {} needed for {} plugin {} v{}",
            absolute.display(),
            record.identity.category,
            record.identity.name,
            version
        );
        set.include_dirs.insert(absolute);
    } else {
        record.status.mark_missing();
    }
    Ok(())
}

/// Dynamic library stem: leading `lib` prefix and everything from the first
/// dot onward are dropped, so `libfoo.so.3` links as `-lfoo`.
fn dynamic_stem(file_name: &str) -> &str {
    let stem = file_name.strip_prefix("lib").unwrap_or(file_name);
    stem.split('.').next().unwrap_or(stem)
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("failed to make {} absolute", path.display()))
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
