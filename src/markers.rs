//! Marker extraction and plugin identity parsing.
//!
//! Four marker kinds are recognized in comment-stripped source text: the two
//! plugin declaration forms (`scanner_plugin(...) {` / `objective_plugin(...) {`)
//! and the two requirement forms (`reqd_libraries(...)` /
//! `reqd_inifile_entries(...)`, lower or upper case). All matches for one
//! file are merged into a single stream ordered by byte offset; that order
//! is what associates each requirement marker with the nearest preceding
//! declaration.

use crate::plugin::{PluginCategory, PluginIdentity, PluginVersion};
use regex::Regex;
use std::sync::OnceLock;

/// The four marker kinds, in no particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    ScannerDecl,
    ObjectiveDecl,
    LibsRequired,
    ConfigRequired,
}

impl MarkerKind {
    pub fn is_declaration(&self) -> bool {
        matches!(self, MarkerKind::ScannerDecl | MarkerKind::ObjectiveDecl)
    }
}

/// One marker occurrence within a single file. Offsets are comparable only
/// within the same file.
#[derive(Debug, Clone)]
pub struct Marker {
    pub offset: usize,
    pub kind: MarkerKind,
    pub text: String,
}

impl Marker {
    /// The text between the marker's parentheses. For requirement markers
    /// the stored text is already whitespace-free, so this is the literal
    /// argument list.
    pub fn payload(&self) -> &str {
        let open = match self.text.find('(') {
            Some(i) => i + 1,
            None => return "",
        };
        let close = self.text.rfind(')').unwrap_or(self.text.len());
        if close <= open {
            return "";
        }
        &self.text[open..close]
    }
}

fn scanner_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\bscanner_plugin\s*?\(.*?\)\s*?\{").unwrap())
}

fn objective_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\bobjective_plugin\s*?\(.*?\)\s*?\{").unwrap())
}

fn libs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\b(?:reqd_libraries|REQD_LIBRARIES)\s*?\(.*?\)").unwrap())
}

fn config_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\b(?:reqd_inifile_entries|REQD_INIFILE_ENTRIES)\s*?\(.*?\)").unwrap()
    })
}

fn remove_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Extract all markers from comment-stripped text, sorted by byte offset.
pub fn extract_markers(stripped: &str) -> Vec<Marker> {
    let mut markers = Vec::new();

    for m in scanner_decl_re().find_iter(stripped) {
        markers.push(Marker {
            offset: m.start(),
            kind: MarkerKind::ScannerDecl,
            text: m.as_str().to_string(),
        });
    }
    for m in objective_decl_re().find_iter(stripped) {
        markers.push(Marker {
            offset: m.start(),
            kind: MarkerKind::ObjectiveDecl,
            text: m.as_str().to_string(),
        });
    }
    for m in libs_re().find_iter(stripped) {
        markers.push(Marker {
            offset: m.start(),
            kind: MarkerKind::LibsRequired,
            text: remove_whitespace(m.as_str()),
        });
    }
    for m in config_re().find_iter(stripped) {
        markers.push(Marker {
            offset: m.start(),
            kind: MarkerKind::ConfigRequired,
            text: remove_whitespace(m.as_str()),
        });
    }

    markers.sort_by_key(|m| m.offset);
    markers
}

/// Split `s` on any of the given characters, dropping empty fragments.
pub fn neat_split(s: &str, separators: &[char]) -> Vec<String> {
    s.split(|c: char| separators.contains(&c))
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// Split a requirement-group value into individual references
/// (comma/whitespace/semicolon delimited).
pub fn split_references(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// Parse a declaration marker into a plugin identity.
///
/// Tokenizes the marker text on parentheses, commas, braces, and whitespace.
/// The first token is the keyword, the second the plugin name; a literal
/// `version` third token introduces up to four version components. Returns
/// `None` for a declaration too malformed to name a plugin; such markers are
/// skipped without failing the file.
pub fn parse_declaration(marker: &Marker) -> Option<PluginIdentity> {
    let tokens = neat_split(&marker.text, &['(', ')', ',', '{', '}', ' ', '\t', '\r', '\n']);
    let category = match marker.kind {
        MarkerKind::ScannerDecl => PluginCategory::Scanner,
        MarkerKind::ObjectiveDecl => PluginCategory::Objective,
        _ => return None,
    };
    let name = tokens.get(1)?.clone();

    let mut version = PluginVersion::default();
    if tokens.get(2).map(String::as_str) == Some("version") {
        if let Some(major) = tokens.get(3) {
            version.major = major.clone();
        }
        if let Some(minor) = tokens.get(4) {
            version.minor = minor.clone();
        }
        if let Some(patch) = tokens.get(5) {
            version.patch = patch.clone();
        }
        if let Some(tag) = tokens.get(6) {
            version.tag = tag.clone();
        }
    }

    Some(PluginIdentity::new(name, category, version))
}
