//! pluginscan core library
//!
//! Plugin declaration scanner and build-descriptor resolver. The scanner
//! walks a source tree holding two plugin categories (`scanner` and
//! `objective`), extracts plugin metadata embedded in C/C++ sources via
//! marker patterns, cross-references it against per-category versioned
//! locations registries, and resolves concrete library/include paths for
//! every discovered plugin.
//!
//! # Pipeline
//!
//! Data flows one way through the crate:
//!
//! source tree → stripped text (`comments`) → markers (`markers`) →
//! plugin records (`scan`) → resolved build sets (`resolver`) →
//! descriptor files (`emit`)
//!
//! ## Scanning (`scan` module)
//! - `scan_tree()` - Walk both category subtrees, strip comments, extract
//!   markers, and fold them into plugin records with their requirements
//!
//! ## Resolution (`resolver` module)
//! - `Resolver::resolve()` - Look up each record in its locations registry,
//!   classify declared library/include references against the filesystem,
//!   apply the exclusion filter, and aggregate per-directory link fragments
//!
//! ## Registry (`registry` module)
//! - `LocationsRegistry::load()` - Versioned YAML store with `any_version`
//!   fallback, seeded from an `.example` template when absent
//!
//! ## Emission (`emit` module)
//! - `write_outputs()` - Render build descriptors and the requirement
//!   manifest, rewriting files only when their content changed
//!
//! The scan itself never mutates the tree it inspects; only `emit` writes,
//! and only the generated descriptor files.

pub mod comments;
pub mod emit;
pub mod error;
pub mod markers;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod scan;

pub use error::ScanError;
pub use plugin::{PluginCategory, PluginIdentity, PluginRecord, PluginStatus, PluginVersion};
pub use registry::LocationsRegistry;
pub use resolver::{Resolution, ResolvedBuildSet, Resolver};
pub use scan::{scan_tree, ScanOutcome};
