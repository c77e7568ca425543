//! Source-tree scanning and marker association.
//!
//! The scan walks the two category subtrees (`src/scanners`, `src/objectives`),
//! one plugin-group directory at a time, in directory-listing order. Every
//! recognized source file is read fully, comment-stripped, and searched for
//! markers; the per-file marker stream is then folded left to right with the
//! nearest preceding declaration as state, which attributes each requirement
//! marker to exactly one plugin identity.
//!
//! A malformed file (unterminated comment, requirement marker before any
//! declaration) is skipped with a warning; its markers contribute nothing and
//! the remaining files are still scanned.

use crate::comments::strip_comments;
use crate::error::ScanError;
use crate::markers::{extract_markers, neat_split, parse_declaration, Marker, MarkerKind};
use crate::plugin::{PluginCategory, PluginRecord};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SOURCE_SUFFIXES: [&str; 4] = ["cpp", "c", "cc", "cxx"];
const HEADER_SUFFIXES: [&str; 2] = ["hpp", "h"];

/// Source and header files of one plugin-group directory, sorted by path.
/// Headers are listed for descriptor emission but never scanned.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    pub sources: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
}

/// Required-config-key manifest: category → plugin name → canonical version
/// → comma-joined entry text, exactly as it will be rendered into the
/// requirement manifest file.
pub type ConfigManifest = BTreeMap<PluginCategory, BTreeMap<String, BTreeMap<String, String>>>;

/// Everything one scan pass produces, before resolution.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// One record per distinct (identity, directory) pair.
    pub records: Vec<PluginRecord>,
    /// Per (category, directory) source/header listings.
    pub listings: BTreeMap<(PluginCategory, String), DirectoryListing>,
    /// Library names declared via `reqd_libraries`, per (category, directory).
    /// These double as auto-detect candidates for the build system.
    pub auto_candidates: BTreeMap<(PluginCategory, String), Vec<String>>,
    /// Required configuration keys declared via `reqd_inifile_entries`.
    pub config_manifest: ConfigManifest,
}

impl ScanOutcome {
    fn record_index(&mut self, record: PluginRecord) -> usize {
        if let Some(i) = self.records.iter().position(|r| {
            r.identity.lookup_token == record.identity.lookup_token
                && r.tree_category == record.tree_category
                && r.directory == record.directory
        }) {
            return i;
        }
        self.records.push(record);
        self.records.len() - 1
    }
}

/// Markers harvested from a single file, pending merge into the outcome.
#[derive(Debug, Default)]
struct FileFinds {
    records: Vec<PluginRecord>,
    auto_candidates: Vec<String>,
    /// (record index, comma-free entry text) pairs for the config manifest.
    config_entries: Vec<(usize, String)>,
}

/// Scan the whole source tree under `root`.
///
/// Reads only; nothing under `root` is modified, so repeated scans of an
/// unchanged tree produce identical outcomes.
pub fn scan_tree(root: &Path) -> Result<ScanOutcome> {
    let mut outcome = ScanOutcome::default();

    for category in PluginCategory::all() {
        let src_root = root.join("src").join(category.subdir());
        if !src_root.is_dir() {
            log::warn!("no {} plugin directory at {}", category, src_root.display());
            continue;
        }

        let mut directories = Vec::new();
        for entry in fs::read_dir(&src_root)
            .with_context(|| format!("failed to read directory {}", src_root.display()))?
        {
            let entry = entry?;
            if entry.path().is_dir() {
                directories.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        directories.sort();

        for directory in directories {
            let mut listing = DirectoryListing::default();
            collect_files(
                &src_root.join(&directory),
                &SOURCE_SUFFIXES,
                &mut listing.sources,
            )?;
            listing.sources.sort();

            let include_dir = root
                .join("include")
                .join(category.subdir())
                .join(&directory);
            if include_dir.is_dir() {
                collect_files(&include_dir, &HEADER_SUFFIXES, &mut listing.headers)?;
                listing.headers.sort();
            }

            for source in &listing.sources {
                log::debug!(
                    "scanning {} for {} plugin declarations",
                    source.display(),
                    category
                );
                let text = match fs::read_to_string(source) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("skipping unreadable file {}: {}", source.display(), e);
                        continue;
                    }
                };
                match scan_file(&text, category, &directory) {
                    Ok(finds) => merge_finds(&mut outcome, category, &directory, finds),
                    Err(e) => log::warn!("skipping malformed file {}: {}", source.display(), e),
                }
            }

            outcome
                .listings
                .insert((category, directory.clone()), listing);
        }
    }

    Ok(outcome)
}

/// Strip, extract, and fold the marker stream of one file.
///
/// The fold keeps the most recent successfully parsed declaration as the
/// "current" record; requirement markers accumulate into it. A requirement
/// marker seen before any declaration fails the whole file.
fn scan_file(text: &str, category: PluginCategory, directory: &str) -> Result<FileFinds, ScanError> {
    let stripped = strip_comments(text)?;
    let markers = extract_markers(&stripped);

    let mut finds = FileFinds::default();
    let mut current: Option<usize> = None;

    for marker in markers {
        if marker.kind.is_declaration() {
            // Declarations too malformed to name a plugin are skipped without
            // disturbing the current association state. The keyword decides
            // the identity's category even when it disagrees with the
            // subtree the file sits in.
            if let Some(identity) = parse_declaration(&marker) {
                finds
                    .records
                    .push(PluginRecord::new(identity, category, directory.to_string()));
                current = Some(finds.records.len() - 1);
            }
            continue;
        }

        let index = current.ok_or(ScanError::OrphanRequirement {
            offset: marker.offset,
        })?;
        match marker.kind {
            MarkerKind::LibsRequired => {
                let libraries = library_names(&marker);
                finds.records[index]
                    .required_libraries
                    .extend(libraries.iter().cloned());
                finds.auto_candidates.extend(libraries);
            }
            MarkerKind::ConfigRequired => {
                finds
                    .config_entries
                    .push((index, marker.payload().to_string()));
            }
            MarkerKind::ScannerDecl | MarkerKind::ObjectiveDecl => unreachable!(),
        }
    }

    Ok(finds)
}

/// Library names from a `reqd_libraries` payload: comma-split, quotes dropped.
fn library_names(marker: &Marker) -> Vec<String> {
    neat_split(marker.payload(), &[',', '"'])
}

fn merge_finds(
    outcome: &mut ScanOutcome,
    category: PluginCategory,
    directory: &str,
    finds: FileFinds,
) {
    // Config entries refer to file-local record indices; resolve their
    // identities before the records are deduplicated into the outcome.
    for (index, entry) in &finds.config_entries {
        let identity = &finds.records[*index].identity;
        let slot = outcome
            .config_manifest
            .entry(category)
            .or_default()
            .entry(identity.name.clone())
            .or_default()
            .entry(identity.version.canonical())
            .or_default();
        if slot.is_empty() {
            *slot = entry.clone();
        } else {
            slot.push(',');
            slot.push_str(entry);
        }
    }

    for record in finds.records {
        let index = outcome.record_index(record.clone());
        if outcome.records[index].required_libraries != record.required_libraries {
            // Same (identity, directory) declared in more than one file:
            // requirement lists accumulate onto the one shared record.
            let merged = &mut outcome.records[index];
            for library in record.required_libraries {
                if !merged.required_libraries.contains(&library) {
                    merged.required_libraries.push(library);
                }
            }
        }
    }

    if !finds.auto_candidates.is_empty() {
        outcome
            .auto_candidates
            .entry((category, directory.to_string()))
            .or_default()
            .extend(finds.auto_candidates);
    }
}

fn collect_files(dir: &Path, suffixes: &[&str], out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, suffixes, out)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if suffixes.contains(&ext) {
                out.push(path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginStatus;
    use tempfile::TempDir;

    fn write_plugin_file(root: &Path, category: &str, directory: &str, name: &str, text: &str) {
        let dir = root.join("src").join(category).join(directory);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn discovers_plugins_and_requirements() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(
            tree.path(),
            "scanners",
            "alpha",
            "alpha.cpp",
            r#"
scanner_plugin(Alpha, version(1, 2, 0))
{
    reqd_libraries("libalpha.so");
    reqd_inifile_entries("point_number", "grid_pts");
}
"#,
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.identity.name, "Alpha");
        assert_eq!(record.identity.version.canonical(), "1.2.0");
        assert_eq!(record.status, PluginStatus::NotLinked);
        assert_eq!(record.required_libraries, vec!["libalpha.so"]);
        assert_eq!(record.directory, "alpha");

        let manifest = &outcome.config_manifest[&PluginCategory::Scanner]["Alpha"]["1.2.0"];
        assert_eq!(manifest, "\"point_number\",\"grid_pts\"");

        let auto = &outcome.auto_candidates[&(PluginCategory::Scanner, "alpha".to_string())];
        assert_eq!(auto, &vec!["libalpha.so".to_string()]);
    }

    #[test]
    fn requirements_attach_to_nearest_preceding_declaration() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(
            tree.path(),
            "objectives",
            "shared",
            "two.cpp",
            r#"
objective_plugin(First)
{
    reqd_libraries("libfirst.so");
}
objective_plugin(Second, version(2))
{
    reqd_libraries("libsecond.so");
}
"#,
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].required_libraries, vec!["libfirst.so"]);
        assert_eq!(outcome.records[1].required_libraries, vec!["libsecond.so"]);
    }

    #[test]
    fn declaration_keyword_may_disagree_with_tree_category() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(
            tree.path(),
            "objectives",
            "odd",
            "odd.cpp",
            "scanner_plugin(Odd, version(1)) {\n}\n",
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.identity.category, PluginCategory::Scanner);
        assert_eq!(record.tree_category, PluginCategory::Objective);
        assert_eq!(record.directory, "odd");
    }

    #[test]
    fn markers_inside_comments_are_ignored() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(
            tree.path(),
            "scanners",
            "quiet",
            "quiet.cpp",
            "// scanner_plugin(Ghost, version(9))\n/* reqd_libraries(\"x\") */\nint real_code;\n",
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn malformed_file_is_skipped_but_others_survive() {
        let tree = TempDir::new().unwrap();
        // Orphan requirement: marker before any declaration.
        write_plugin_file(
            tree.path(),
            "scanners",
            "broken",
            "a_broken.cpp",
            "reqd_libraries(\"liborphan.so\");\n",
        );
        write_plugin_file(
            tree.path(),
            "scanners",
            "broken",
            "b_good.cpp",
            "scanner_plugin(Survivor) {\n}\n",
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].identity.name, "Survivor");
    }

    #[test]
    fn unterminated_comment_skips_only_that_file() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(
            tree.path(),
            "scanners",
            "mixed",
            "a_bad.cpp",
            "/* never closed\nscanner_plugin(Hidden) {\n",
        );
        write_plugin_file(
            tree.path(),
            "scanners",
            "mixed",
            "b_fine.cpp",
            "scanner_plugin(Fine, version(1)) {\n}\n",
        );

        let outcome = scan_tree(tree.path()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].identity.name, "Fine");
    }

    #[test]
    fn listings_include_sources_and_headers() {
        let tree = TempDir::new().unwrap();
        write_plugin_file(tree.path(), "scanners", "alpha", "a.cpp", "int a;");
        write_plugin_file(tree.path(), "scanners", "alpha", "b.cxx", "int b;");
        write_plugin_file(tree.path(), "scanners", "alpha", "notes.txt", "ignored");
        let inc = tree.path().join("include").join("scanners").join("alpha");
        fs::create_dir_all(&inc).unwrap();
        fs::write(inc.join("a.hpp"), "").unwrap();

        let outcome = scan_tree(tree.path()).unwrap();
        let listing = &outcome.listings[&(PluginCategory::Scanner, "alpha".to_string())];
        assert_eq!(listing.sources.len(), 2);
        assert_eq!(listing.headers.len(), 1);
    }
}
