// src/install/mod.rs

//! Package installation
//!
//! `Installer::add` drives one install through a fixed sequence of phases:
//!
//! ```text
//! Load -> CheckNotInstalled -> ResolveDeps -> PreInstallScripts -> Extract
//!      -> PostInstallScripts -> RunExecs -> Register
//! ```
//!
//! Any failure before `Register` stops the sequence; the database is only
//! written once everything else succeeded. Files already extracted by a
//! failed run are left on disk.

pub mod deps;
pub mod extract;
pub mod scripts;

use crate::db::PackageDb;
use crate::error::{Error, Result};
use crate::packages::archive;
use crate::packages::traits::Package;
use extract::ExtractOptions;
use scripts::{ScriptInterpreter, ScriptRunner};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use scripts::ShellInterpreter;

/// Install-wide settings
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory content entries are extracted under
    pub root: PathBuf,
    /// Restore file ownership from the archive
    pub preserve_owner: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            preserve_owner: running_as_root(),
        }
    }
}

impl InstallOptions {
    /// Options for installing under `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            root: self.root.clone(),
            preserve_owner: self.preserve_owner,
        }
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Install phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Load,
    CheckNotInstalled,
    ResolveDeps,
    PreInstallScripts,
    Extract,
    PostInstallScripts,
    RunExecs,
    Register,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallPhase::Load => "load",
            InstallPhase::CheckNotInstalled => "check-not-installed",
            InstallPhase::ResolveDeps => "resolve-deps",
            InstallPhase::PreInstallScripts => "pre-install-scripts",
            InstallPhase::Extract => "extract",
            InstallPhase::PostInstallScripts => "post-install-scripts",
            InstallPhase::RunExecs => "run-execs",
            InstallPhase::Register => "register",
        };
        f.write_str(name)
    }
}

/// Installs package archives into a root and registers them in a database
pub struct Installer<'a, D: PackageDb + ?Sized> {
    db: &'a mut D,
    interpreter: &'a dyn ScriptInterpreter,
    options: InstallOptions,
    /// Origins currently being installed, outermost first
    in_progress: Vec<String>,
}

impl<'a, D: PackageDb + ?Sized> Installer<'a, D> {
    pub fn new(
        db: &'a mut D,
        interpreter: &'a dyn ScriptInterpreter,
        options: InstallOptions,
    ) -> Self {
        Self {
            db,
            interpreter,
            options,
            in_progress: Vec::new(),
        }
    }

    /// Install the package archive at `path` and any missing dependencies
    ///
    /// Returns the loaded package once it is registered.
    pub fn add(&mut self, path: &Path) -> Result<Package> {
        if path.as_os_str().is_empty() {
            return Err(Error::BadArgument("path"));
        }

        info!("Installing {}", path.display());
        trace_phase(path, InstallPhase::Load);
        let opened = archive::open(path)?;
        let mut pkg = opened.package;

        trace_phase(path, InstallPhase::CheckNotInstalled);
        if self.db.is_installed(&pkg.origin)? {
            return Err(Error::AlreadyInstalled {
                origin: pkg.origin.clone(),
            });
        }
        if self.in_progress.contains(&pkg.origin) {
            let mut chain = self.in_progress.clone();
            chain.push(pkg.origin.clone());
            return Err(Error::DependencyCycle(chain.join(" -> ")));
        }

        self.in_progress.push(pkg.origin.clone());
        let result = self.install_loaded(path, &mut pkg, opened.content);
        self.in_progress.pop();
        result?;

        info!("Installed {} ({})", pkg.full_name(), pkg.origin);
        Ok(pkg)
    }

    /// Phases after the installed check. `content` is dropped on every exit path.
    fn install_loaded(
        &mut self,
        path: &Path,
        pkg: &mut Package,
        content: Option<archive::ContentReader>,
    ) -> Result<()> {
        trace_phase(path, InstallPhase::ResolveDeps);
        self.resolve_dependencies(pkg, path)?;

        let runner = ScriptRunner::new(self.interpreter);

        trace_phase(path, InstallPhase::PreInstallScripts);
        runner.run_pre_install(pkg);

        trace_phase(path, InstallPhase::Extract);
        let files = match content {
            Some(mut reader) => extract::extract_all(&mut reader, &self.options.extract_options())?,
            None => {
                debug!("{} has no content to extract", pkg.full_name());
                Vec::new()
            }
        };

        trace_phase(path, InstallPhase::PostInstallScripts);
        runner.run_post_install(pkg);

        trace_phase(path, InstallPhase::RunExecs);
        runner.run_execs(pkg);

        trace_phase(path, InstallPhase::Register);
        self.db.register(pkg, &files)?;

        Ok(())
    }
}

fn trace_phase(path: &Path, phase: InstallPhase) {
    debug!("{}: {}", path.display(), phase);
}
