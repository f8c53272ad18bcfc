//! Manifest document model and parsing for Daybreak.
//!
//! A manifest describes a set of applications, runtimes, and servers published by
//! one source. This crate defines the parsed representation (`Manifest`), the
//! entities it carries (`Package`, `Server`), and the TOML document format used
//! both for remote manifests and for the local catalog snapshot.

pub mod manifest;

pub use manifest::{
    parse_manifest_bytes, parse_manifest_file, parse_manifest_str, Manifest, ManifestError,
    Package, Server,
};
