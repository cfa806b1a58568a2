// src/packages/traits.rs

//! Common package types shared by the archive reader, database and installer

use std::fmt;
use std::str::FromStr;

/// A package loaded from an archive's metadata
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: String,
    pub version: String,
    /// Stable unique key, distinct from name and version
    pub origin: String,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub architecture: Option<String>,
    pub maintainer: Option<String>,
    pub www: Option<String>,
    pub prefix: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub scripts: Vec<Script>,
    pub execs: Vec<Exec>,
}

impl Package {
    /// Create a package with just its identity
    pub fn new(name: String, version: String, origin: String) -> Self {
        Self {
            name,
            version,
            origin,
            ..Default::default()
        }
    }

    /// `name-version`, the identity passed to lifecycle scripts
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Install status of a dependency, recomputed on every resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyStatus {
    Installed,
    #[default]
    NotFound,
}

/// Reference to another package this one requires
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub origin: String,
    pub version: String,
    pub status: DependencyStatus,
}

impl Dependency {
    pub fn new(name: String, origin: String, version: String) -> Self {
        Self {
            name,
            origin,
            version,
            status: DependencyStatus::NotFound,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Lifecycle point a script is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    PreInstall,
    /// Generic install script, run both before and after extraction
    Install,
    PostInstall,
    PreDeinstall,
    Deinstall,
    PostDeinstall,
}

impl ScriptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptKind::PreInstall => "pre-install",
            ScriptKind::Install => "install",
            ScriptKind::PostInstall => "post-install",
            ScriptKind::PreDeinstall => "pre-deinstall",
            ScriptKind::Deinstall => "deinstall",
            ScriptKind::PostDeinstall => "post-deinstall",
        }
    }

    /// Map a `+`-prefixed archive metadata entry name to a script kind
    pub fn from_entry_name(name: &str) -> Option<Self> {
        match name {
            "+PRE_INSTALL" => Some(ScriptKind::PreInstall),
            "+INSTALL" => Some(ScriptKind::Install),
            "+POST_INSTALL" => Some(ScriptKind::PostInstall),
            "+PRE_DEINSTALL" => Some(ScriptKind::PreDeinstall),
            "+DEINSTALL" => Some(ScriptKind::Deinstall),
            "+POST_DEINSTALL" => Some(ScriptKind::PostDeinstall),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pre-install" => Ok(ScriptKind::PreInstall),
            "install" => Ok(ScriptKind::Install),
            "post-install" => Ok(ScriptKind::PostInstall),
            "pre-deinstall" => Ok(ScriptKind::PreDeinstall),
            "deinstall" => Ok(ScriptKind::Deinstall),
            "post-deinstall" => Ok(ScriptKind::PostDeinstall),
            _ => Err(format!("Invalid script kind: {}", s)),
        }
    }
}

/// A lifecycle script body
#[derive(Debug, Clone)]
pub struct Script {
    pub kind: ScriptKind,
    pub body: String,
}

impl Script {
    pub fn new(kind: ScriptKind, body: String) -> Self {
        Self { kind, body }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecKind {
    RunOnInstall,
    RunOnDeinstall,
}

impl ExecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecKind::RunOnInstall => "exec",
            ExecKind::RunOnDeinstall => "unexec",
        }
    }
}

impl FromStr for ExecKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exec" => Ok(ExecKind::RunOnInstall),
            "unexec" => Ok(ExecKind::RunOnDeinstall),
            _ => Err(format!("Invalid exec kind: {}", s)),
        }
    }
}

/// One-shot command run verbatim at a lifecycle point
#[derive(Debug, Clone)]
pub struct Exec {
    pub kind: ExecKind,
    pub command: String,
}

impl Exec {
    pub fn new(kind: ExecKind, command: String) -> Self {
        Self { kind, command }
    }
}

/// A regular file written to disk during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    /// Path relative to the install root
    pub path: String,
    pub sha256: String,
    pub size: i64,
    pub mode: i32,
}
