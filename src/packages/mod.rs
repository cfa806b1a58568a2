// src/packages/mod.rs

//! Package archive support for pkgadd
//!
//! This module reads package archives: it splits the `+`-prefixed metadata
//! entries from content, parses `+MANIFEST`, and hands the installer a
//! `Package` plus a reader positioned over the content entries.

pub mod archive;
pub mod manifest;
pub mod traits;

pub use archive::{ContentReader, OpenedPackage};
pub use traits::{
    Dependency, DependencyStatus, Exec, ExecKind, InstalledFile, Package, Script, ScriptKind,
};
