//! Build-descriptor emission.
//!
//! Renders the resolver's aggregates into three generated files under the
//! scanned tree: the plugin build descriptor (source/header lists, link and
//! rpath fragments, auto-detect blocks, status table), the static-link
//! accumulation file, and the required-config-key manifest. Each file is
//! first written as a `.candidate` and only promoted over the live file when
//! the content actually differs, so untouched outputs keep their timestamps
//! and downstream rebuilds are not triggered needlessly.

use crate::resolver::Resolution;
use crate::scan::ScanOutcome;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const DESCRIPTOR_FILE: &str = "plugin_descriptor.cmake";
const LINKAGE_FILE: &str = "linkage.cmake";
const MANIFEST_FILE: &str = "reqd_entries.yaml";

fn banner(comment: &str) -> String {
    let stamp = chrono::Local::now().format("%I:%M%p on %B %d, %Y");
    format!(
        "{c} This file has been automatically generated by pluginscan.\n\
         {c} Please do not modify.\n\
         {c} Generated at {stamp}.\n\n",
        c = comment,
        stamp = stamp
    )
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Render the per-directory build descriptor.
pub fn render_descriptor(root: &Path, outcome: &ScanOutcome, resolution: &Resolution) -> String {
    let mut out = banner("#");

    for ((category, directory), listing) in &outcome.listings {
        out.push_str(&format!("set( {}_plugin_sources_{}\n", category, directory));
        for source in &listing.sources {
            out.push_str(&format!("                {}\n", display_relative(source, root)));
        }
        out.push_str(")\n\n");

        out.push_str(&format!("set( {}_plugin_headers_{}\n", category, directory));
        for header in &listing.headers {
            out.push_str(&format!("                {}\n", display_relative(header, root)));
        }
        out.push_str(")\n\n");
    }

    for ((category, directory), set) in &resolution.build_sets {
        out.push_str(&format!("set( {}_plugin_libraries_{}\n", category, directory));
        if !set.link_fragments.is_empty() {
            out.push_str(&format!(
                "                \"{}\"\n",
                set.link_fragments.join(" ")
            ));
        }
        out.push_str(")\n\n");

        out.push_str(&format!("set( {}_plugin_rpath_{}\n", category, directory));
        if !set.library_dirs.is_empty() {
            let dirs: Vec<String> = set
                .library_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect();
            out.push_str(&format!("                \"{}\"\n", dirs.join(";")));
        }
        out.push_str(")\n\n");

        out.push_str(&format!("set( {}_plugin_includes_{}\n", category, directory));
        if !set.include_dirs.is_empty() {
            let dirs: Vec<String> = set
                .include_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect();
            out.push_str(&format!("                \"{}\"\n", dirs.join(";")));
        }
        out.push_str(")\n\n");

        if !set.auto_libs.is_empty() {
            out.push_str(&format!(
                "set( {}_plugin_autodetect_{} \"{}\" )\n\n",
                category,
                directory,
                set.auto_libs.join(";")
            ));
        }
    }

    for record in &resolution.records {
        out.push_str(&format!(
            "set( {} {} )\n",
            record.identity.lookup_token,
            record.status.flag()
        ));
    }

    out
}

/// Render the global static whole-archive link accumulation.
pub fn render_linkage(resolution: &Resolution) -> String {
    let mut out = banner("#");
    if resolution.static_links.is_empty() {
        out.push_str("set( plugin_static_links \"\" )\n");
    } else {
        out.push_str(&format!(
            "set( plugin_static_links \"{}\" )\n",
            resolution.static_links.trim_end()
        ));
    }
    out
}

/// Render the required-config-key manifest as YAML.
pub fn render_manifest(outcome: &ScanOutcome) -> String {
    let mut out = banner("#");
    for (category, plugins) in &outcome.config_manifest {
        out.push_str(&format!("{}:\n", category));
        for (name, versions) in plugins {
            out.push_str(&format!("  {}:\n", name));
            for (version, entries) in versions {
                out.push_str(&format!("    {}: [{}]\n", version, entries));
            }
        }
        out.push('\n');
    }
    out
}

/// Line-by-line comparison that ignores the generation timestamp in the
/// banner, so re-rendering an unchanged tree in a later minute does not
/// count as a change.
fn same_except_stamp(existing: &str, candidate: &str) -> bool {
    let existing: Vec<&str> = existing.lines().collect();
    let candidate: Vec<&str> = candidate.lines().collect();
    existing.len() == candidate.len()
        && existing.iter().zip(&candidate).all(|(a, b)| {
            a == b || (a.contains("Generated at") && b.contains("Generated at"))
        })
}

/// Write `content` to `<target>.candidate` and promote it over `target`
/// only if the content differs (timestamp banner aside). Returns true when
/// the target was replaced.
pub fn update_only_if_different(target: &Path, content: &str) -> Result<bool> {
    let mut candidate = target.as_os_str().to_os_string();
    candidate.push(".candidate");
    let candidate = PathBuf::from(candidate);

    fs::write(&candidate, content)
        .with_context(|| format!("failed to write {}", candidate.display()))?;

    let unchanged = match fs::read_to_string(target) {
        Ok(existing) => same_except_stamp(&existing, content),
        Err(_) => false,
    };

    if unchanged {
        fs::remove_file(&candidate)
            .with_context(|| format!("failed to remove {}", candidate.display()))?;
        Ok(false)
    } else {
        fs::rename(&candidate, target).with_context(|| {
            format!(
                "failed to promote {} over {}",
                candidate.display(),
                target.display()
            )
        })?;
        log::info!("updated {}", target.display());
        Ok(true)
    }
}

/// Emit all three generated files under `root`.
pub fn write_outputs(root: &Path, outcome: &ScanOutcome, resolution: &Resolution) -> Result<()> {
    update_only_if_different(
        &root.join(DESCRIPTOR_FILE),
        &render_descriptor(root, outcome, resolution),
    )?;
    update_only_if_different(&root.join(LINKAGE_FILE), &render_linkage(resolution))?;
    update_only_if_different(&root.join(MANIFEST_FILE), &render_manifest(outcome))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn promotes_candidate_when_content_differs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.cmake");

        assert!(update_only_if_different(&target, "first").unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "first");
        assert!(update_only_if_different(&target, "second").unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
    }

    #[test]
    fn stamp_only_difference_does_not_rewrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.cmake");

        let first = "# Generated at 09:00AM on January 01, 2026.\nset( x 1 )\n";
        let later_stamp = "# Generated at 09:01AM on January 01, 2026.\nset( x 1 )\n";
        let changed_body = "# Generated at 09:01AM on January 01, 2026.\nset( x 2 )\n";

        assert!(update_only_if_different(&target, first).unwrap());
        assert!(!update_only_if_different(&target, later_stamp).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), first);

        assert!(update_only_if_different(&target, changed_body).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), changed_body);
    }

    #[test]
    fn leaves_unchanged_target_alone() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.cmake");

        assert!(update_only_if_different(&target, "same").unwrap());
        assert!(!update_only_if_different(&target, "same").unwrap());
        // No stray candidate left behind either way.
        assert!(!dir.path().join("out.cmake.candidate").exists());
    }
}
