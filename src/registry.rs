//! The versioned plugin locations registry.
//!
//! One YAML document per plugin category maps plugin names to version keys
//! (an exact canonical version string, or the wildcard `any_version`) and
//! each version key to an ordered list of requirement groups. Group keys are
//! loosely spelled in the documents (`lib`, `libs`, `library`, ... all mean
//! the same thing); they are normalized into a typed key here, at the parse
//! boundary, so the resolver never sees raw strings.
//!
//! A missing registry file is seeded by copying its `.example` template into
//! place before loading.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// A normalized requirement-group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementKey {
    Libraries,
    Includes,
    Unknown(String),
}

impl RequirementKey {
    pub fn normalize(key: &str) -> RequirementKey {
        match key {
            "lib" | "libs" | "library" | "libraries" => RequirementKey::Libraries,
            "inc" | "incs" | "include" | "includes" | "include_path" | "include_paths" => {
                RequirementKey::Includes
            }
            other => RequirementKey::Unknown(other.to_string()),
        }
    }
}

/// One requirement group: normalized keys with their delimited value lists,
/// in deterministic (key-sorted) order.
#[derive(Debug, Clone, Default)]
pub struct RequirementGroup {
    pub entries: Vec<(RequirementKey, String)>,
}

/// In-memory registry for one plugin category.
#[derive(Debug, Clone, Default)]
pub struct LocationsRegistry {
    plugins: HashMap<String, HashMap<String, Vec<RequirementGroup>>>,
}

/// Raw YAML shape: name → version key → list of key/value groups.
type RawDocument = HashMap<String, HashMap<String, Vec<BTreeMap<String, String>>>>;

impl LocationsRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a registry file, seeding it from `<path>.example` if absent.
    ///
    /// If neither the file nor its template exists, an empty registry is
    /// returned (every plugin of the category then stays `not_linked`)
    /// rather than failing the whole run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            let template = template_path(path);
            if template.is_file() {
                fs::copy(&template, path).with_context(|| {
                    format!(
                        "failed to seed {} from {}",
                        path.display(),
                        template.display()
                    )
                })?;
                log::info!("seeded {} from its example template", path.display());
            } else {
                log::warn!(
                    "no locations file or template at {}; nothing will be linked",
                    path.display()
                );
                return Ok(Self::empty());
            }
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse YAML from {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let raw: Option<RawDocument> = serde_yaml::from_str(text)?;
        let mut plugins = HashMap::new();
        for (name, versions) in raw.unwrap_or_default() {
            let mut normalized = HashMap::new();
            for (version, groups) in versions {
                let groups = groups
                    .into_iter()
                    .map(|group| RequirementGroup {
                        entries: group
                            .into_iter()
                            .map(|(key, value)| (RequirementKey::normalize(&key), value))
                            .collect(),
                    })
                    .collect();
                normalized.insert(version, groups);
            }
            plugins.insert(name, normalized);
        }
        Ok(LocationsRegistry { plugins })
    }

    /// Requirement groups for a plugin at a given canonical version: the
    /// exact version key wins, `any_version` is the fallback.
    pub fn lookup(&self, name: &str, version: &str) -> Option<&[RequirementGroup]> {
        let versions = self.plugins.get(name)?;
        versions
            .get(version)
            .or_else(|| versions.get("any_version"))
            .map(|groups| groups.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }
}

fn template_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".example");
    std::path::PathBuf::from(name)
}
