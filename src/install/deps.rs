// src/install/deps.rs

//! Dependency resolution against the package database
//!
//! Missing dependencies are installed from archives that sit next to the
//! package being installed, named `<name>-<version><ext>` with the same
//! extension as that package. After every nested install all statuses are
//! recomputed, since one install can satisfy several dependencies.

use super::Installer;
use crate::db::PackageDb;
use crate::error::{Error, Result};
use crate::packages::traits::{Dependency, DependencyStatus, Package};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Recompute the install status of every dependency
pub fn resolve_statuses<D: PackageDb + ?Sized>(pkg: &mut Package, db: &D) -> Result<()> {
    for dep in &mut pkg.dependencies {
        dep.status = if db.is_installed(&dep.origin)? {
            DependencyStatus::Installed
        } else {
            DependencyStatus::NotFound
        };
    }
    Ok(())
}

/// Extension of an archive's file name, from the last `.` on
pub fn archive_extension(archive: &Path) -> Result<String> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match name.rfind('.') {
        Some(pos) => Ok(name[pos..].to_string()),
        None => Err(Error::NoExtension(archive.display().to_string())),
    }
}

/// Where the archive for `dep` is expected, next to `archive`
pub fn sibling_archive_path(archive: &Path, ext: &str, dep: &Dependency) -> PathBuf {
    let dir = archive.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{}{}", dep.full_name(), ext))
}

impl<D: PackageDb + ?Sized> Installer<'_, D> {
    /// Make sure every dependency of `pkg` is installed, installing missing ones
    pub(super) fn resolve_dependencies(&mut self, pkg: &mut Package, archive: &Path) -> Result<()> {
        if pkg.dependencies.is_empty() {
            return Ok(());
        }

        let ext = archive_extension(archive)?;
        resolve_statuses(pkg, &*self.db)?;

        for i in 0..pkg.dependencies.len() {
            if pkg.dependencies[i].status == DependencyStatus::Installed {
                continue;
            }

            let dep = &pkg.dependencies[i];
            let dep_path = sibling_archive_path(archive, &ext, dep);
            if !dep_path.exists() {
                return Err(Error::MissingDependency(dep.full_name()));
            }

            info!(
                "Installing dependency {} for {}",
                dep.full_name(),
                pkg.full_name()
            );
            self.add(&dep_path).map_err(|e| Error::DependencyInstall {
                path: dep_path.clone(),
                source: Box::new(e),
            })?;

            resolve_statuses(pkg, &*self.db)?;
        }

        // A sibling archive can carry a different origin than the one declared
        if let Some(dep) = pkg
            .dependencies
            .iter()
            .find(|d| d.status != DependencyStatus::Installed)
        {
            return Err(Error::MissingDependency(dep.full_name()));
        }

        debug!("All dependencies of {} are installed", pkg.full_name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MatchKind, models::PackageRecord};
    use crate::packages::traits::InstalledFile;

    /// In-memory database that knows a fixed set of origins
    struct StaticDb(Vec<&'static str>);

    impl PackageDb for StaticDb {
        fn query(&self, pattern: &str, _match_kind: MatchKind) -> Result<Vec<PackageRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|o| **o == pattern)
                .map(|o| {
                    PackageRecord::from_package(&Package::new("x".into(), "1".into(), o.to_string()))
                })
                .collect())
        }

        fn register(&mut self, _pkg: &Package, _files: &[InstalledFile]) -> Result<i64> {
            unreachable!("resolution never registers")
        }
    }

    fn dep(name: &str, version: &str) -> Dependency {
        Dependency::new(name.into(), format!("local/{}", name), version.into())
    }

    #[test]
    fn test_archive_extension() {
        assert_eq!(archive_extension(Path::new("/pkgs/foo-1.0.tgz")).unwrap(), ".tgz");
        assert_eq!(archive_extension(Path::new("foo-1.0.tar.gz")).unwrap(), ".gz");
        assert!(matches!(
            archive_extension(Path::new("/pkgs/foo")),
            Err(Error::NoExtension(_))
        ));
        // Only the file name counts, not dotted directories
        assert!(archive_extension(Path::new("/pkgs.d/foo")).is_err());
    }

    #[test]
    fn test_sibling_archive_path() {
        let path = sibling_archive_path(Path::new("/pkgs/foo-1.0.tgz"), ".tgz", &dep("bar", "2.0"));
        assert_eq!(path, PathBuf::from("/pkgs/bar-2.0.tgz"));

        let path = sibling_archive_path(Path::new("foo-1.0.txz"), ".txz", &dep("bar", "2.0"));
        assert_eq!(path, PathBuf::from("bar-2.0.txz"));
    }

    #[test]
    fn test_resolve_statuses() {
        let db = StaticDb(vec!["local/bar"]);
        let mut pkg = Package::new("foo".into(), "1.0".into(), "local/foo".into());
        pkg.dependencies = vec![dep("bar", "2.0"), dep("baz", "3.0")];

        resolve_statuses(&mut pkg, &db).unwrap();

        assert_eq!(pkg.dependencies[0].status, DependencyStatus::Installed);
        assert_eq!(pkg.dependencies[1].status, DependencyStatus::NotFound);
    }
}
