use serde::{Deserialize, Serialize};
use std::fmt;

/// The two plugin categories recognized in the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginCategory {
    Scanner,
    Objective,
}

impl PluginCategory {
    /// Both categories, in the fixed order the scan processes them.
    pub fn all() -> [PluginCategory; 2] {
        [PluginCategory::Objective, PluginCategory::Scanner]
    }

    /// Short key used in lookup tokens and the requirement manifest.
    pub fn key(&self) -> &'static str {
        match self {
            PluginCategory::Scanner => "scan",
            PluginCategory::Objective => "like",
        }
    }

    /// Subdirectory name under `src/` and `include/` holding this category.
    pub fn subdir(&self) -> &'static str {
        match self {
            PluginCategory::Scanner => "scanners",
            PluginCategory::Objective => "objectives",
        }
    }

    /// File name of this category's locations registry under `config/`.
    pub fn locations_file(&self) -> &'static str {
        match self {
            PluginCategory::Scanner => "scanner_locations.yaml",
            PluginCategory::Objective => "objective_locations.yaml",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginCategory::Scanner => write!(f, "scanner"),
            PluginCategory::Objective => write!(f, "objective"),
        }
    }
}

/// A plugin version as declared in source: three numeric-ish components kept
/// as strings, plus an optional pre-release tag. Unspecified components
/// default to `"0"` and the tag to empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PluginVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub tag: String,
}

impl Default for PluginVersion {
    fn default() -> Self {
        PluginVersion {
            major: "0".to_string(),
            minor: "0".to_string(),
            patch: "0".to_string(),
            tag: String::new(),
        }
    }
}

impl PluginVersion {
    /// Canonical string form: `major.minor.patch`, with `-tag` appended when
    /// a pre-release tag is present.
    pub fn canonical(&self) -> String {
        let base = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.tag.is_empty() {
            base
        } else {
            format!("{}-{}", base, self.tag)
        }
    }

    /// Parse a canonical version string back into its components.
    pub fn parse(s: &str) -> PluginVersion {
        let mut version = PluginVersion::default();
        let (numbers, tag) = match s.split_once('-') {
            Some((n, t)) => (n, t),
            None => (s, ""),
        };
        let mut parts = numbers.split('.');
        if let Some(major) = parts.next() {
            version.major = major.to_string();
        }
        if let Some(minor) = parts.next() {
            version.minor = minor.to_string();
        }
        if let Some(patch) = parts.next() {
            version.patch = patch.to_string();
        }
        version.tag = tag.to_string();
        version
    }

    /// All four components joined with underscores, e.g. `1_2_0_` for a
    /// tagless 1.2.0. Used in lookup tokens and exclusion matching.
    pub fn underscore_token(&self) -> String {
        format!("{}_{}_{}_{}", self.major, self.minor, self.patch, self.tag)
    }
}

/// The identity of one discovered plugin: name, category, and version, plus
/// a synthesized token that uniquely encodes all three for map indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub name: String,
    pub category: PluginCategory,
    pub version: PluginVersion,
    pub lookup_token: String,
}

impl PluginIdentity {
    pub fn new(name: String, category: PluginCategory, version: PluginVersion) -> Self {
        let lookup_token = format!(
            "libs_present_{}__t__{}__v__{}",
            name,
            category.key(),
            version.underscore_token()
        );
        PluginIdentity {
            name,
            category,
            version,
            lookup_token,
        }
    }

    /// The string matched against exclusion prefixes:
    /// `name + "_" + underscore-joined version components`.
    pub fn exclusion_key(&self) -> String {
        format!("{}_{}", self.name, self.version.underscore_token())
    }
}

/// Availability of one plugin after resolution.
///
/// Transitions are monotonic: `NotLinked → {Found, Missing} → Excluded`.
/// `Found` takes precedence over `Missing`, and `Excluded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    NotLinked,
    Found,
    Missing,
    Excluded,
}

impl PluginStatus {
    /// A successful reference resolution. No effect once excluded.
    pub fn mark_found(&mut self) {
        if *self != PluginStatus::Excluded {
            *self = PluginStatus::Found;
        }
    }

    /// A failed reference resolution. Never downgrades a prior `Found` and
    /// never overrides `Excluded`.
    pub fn mark_missing(&mut self) {
        if matches!(self, PluginStatus::NotLinked | PluginStatus::Missing) {
            *self = PluginStatus::Missing;
        }
    }

    /// Exclusion-filter match. Terminal from any state.
    pub fn exclude(&mut self) {
        *self = PluginStatus::Excluded;
    }

    /// Numeric flag written into the status table of the build descriptor.
    pub fn flag(&self) -> u8 {
        match self {
            PluginStatus::NotLinked | PluginStatus::Missing => 0,
            PluginStatus::Found => 1,
            PluginStatus::Excluded => 2,
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::NotLinked => write!(f, "not_linked"),
            PluginStatus::Found => write!(f, "found"),
            PluginStatus::Missing => write!(f, "missing"),
            PluginStatus::Excluded => write!(f, "excluded"),
        }
    }
}

/// One discovered plugin: its identity, where it was discovered, the
/// libraries its markers declared, and its resolution status.
///
/// `identity.category` comes from the declaration keyword and drives
/// registry lookups; `tree_category` is the category subtree the file was
/// found under and drives aggregation buckets. The two normally agree, but
/// a declaration placed under the other category's subtree is accepted and
/// keeps both facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    pub identity: PluginIdentity,
    pub status: PluginStatus,
    pub required_libraries: Vec<String>,
    pub tree_category: PluginCategory,
    pub directory: String,
}

impl PluginRecord {
    pub fn new(identity: PluginIdentity, tree_category: PluginCategory, directory: String) -> Self {
        PluginRecord {
            identity,
            status: PluginStatus::NotLinked,
            required_libraries: Vec::new(),
            tree_category,
            directory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_canonical_round_trips() {
        let version = PluginVersion {
            major: "1".to_string(),
            minor: "2".to_string(),
            patch: "0".to_string(),
            tag: String::new(),
        };
        assert_eq!(version.canonical(), "1.2.0");
        assert_eq!(PluginVersion::parse(&version.canonical()), version);

        let tagged = PluginVersion {
            tag: "beta".to_string(),
            ..version
        };
        assert_eq!(tagged.canonical(), "1.2.0-beta");
        assert_eq!(PluginVersion::parse(&tagged.canonical()), tagged);
    }

    #[test]
    fn version_defaults() {
        let version = PluginVersion::default();
        assert_eq!(version.canonical(), "0.0.0");
        assert_eq!(version.underscore_token(), "0_0_0_");
    }

    #[test]
    fn lookup_token_distinguishes_all_fields() {
        let base = PluginIdentity::new(
            "Foo".to_string(),
            PluginCategory::Scanner,
            PluginVersion::parse("1.2.0"),
        );
        let other_name = PluginIdentity::new(
            "Bar".to_string(),
            PluginCategory::Scanner,
            PluginVersion::parse("1.2.0"),
        );
        let other_category = PluginIdentity::new(
            "Foo".to_string(),
            PluginCategory::Objective,
            PluginVersion::parse("1.2.0"),
        );
        let other_version = PluginIdentity::new(
            "Foo".to_string(),
            PluginCategory::Scanner,
            PluginVersion::parse("1.2.1"),
        );
        let tagged = PluginIdentity::new(
            "Foo".to_string(),
            PluginCategory::Scanner,
            PluginVersion::parse("1.2.0-beta"),
        );
        let tokens = [
            &base.lookup_token,
            &other_name.lookup_token,
            &other_category.lookup_token,
            &other_version.lookup_token,
            &tagged.lookup_token,
        ];
        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn status_found_beats_missing() {
        let mut status = PluginStatus::NotLinked;
        status.mark_found();
        assert_eq!(status, PluginStatus::Found);
        status.mark_missing();
        assert_eq!(status, PluginStatus::Found);
    }

    #[test]
    fn status_missing_then_found_recovers() {
        let mut status = PluginStatus::NotLinked;
        status.mark_missing();
        assert_eq!(status, PluginStatus::Missing);
        status.mark_found();
        assert_eq!(status, PluginStatus::Found);
    }

    #[test]
    fn status_excluded_is_terminal() {
        let mut status = PluginStatus::Found;
        status.exclude();
        assert_eq!(status, PluginStatus::Excluded);
        status.mark_found();
        status.mark_missing();
        assert_eq!(status, PluginStatus::Excluded);
    }
}
