// src/db/mod.rs

//! Database layer for pkgadd
//!
//! This module handles all SQLite operations including:
//! - Database initialization and schema creation
//! - Connection management
//! - Transaction handling
//! - The `PackageDb` interface the installer queries and registers through

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use crate::packages::traits::{InstalledFile, Package};
use models::{DependencyEntry, ExecEntry, FileEntry, PackageRecord, ScriptEntry};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// How a query pattern is matched against installed packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Origin equals the pattern
    Exact,
    /// Shell glob against origin or name
    Glob,
    /// Every installed package, pattern ignored
    All,
}

/// Package database operations consumed by the installer
pub trait PackageDb {
    /// Look up installed packages
    fn query(&self, pattern: &str, match_kind: MatchKind) -> Result<Vec<PackageRecord>>;

    /// Record a package and everything it installed as one unit
    fn register(&mut self, pkg: &Package, files: &[InstalledFile]) -> Result<i64>;

    /// Whether a package with this origin is registered
    fn is_installed(&self, origin: &str) -> Result<bool> {
        Ok(!self.query(origin, MatchKind::Exact)?.is_empty())
    }
}

impl PackageDb for Connection {
    fn query(&self, pattern: &str, match_kind: MatchKind) -> Result<Vec<PackageRecord>> {
        match match_kind {
            MatchKind::Exact => Ok(PackageRecord::find_by_origin(self, pattern)?
                .into_iter()
                .collect()),
            MatchKind::Glob => PackageRecord::find_by_glob(self, pattern),
            MatchKind::All => PackageRecord::list_all(self),
        }
    }

    fn register(&mut self, pkg: &Package, files: &[InstalledFile]) -> Result<i64> {
        let package_id = transaction(self, |tx| {
            let mut record = PackageRecord::from_package(pkg);
            let package_id = record.insert(tx)?;

            for dep in &pkg.dependencies {
                DependencyEntry::new(package_id, dep).insert(tx)?;
            }
            for script in &pkg.scripts {
                ScriptEntry::new(package_id, script).insert(tx)?;
            }
            for exec in &pkg.execs {
                ExecEntry::new(package_id, exec).insert(tx)?;
            }
            for file in files {
                FileEntry::new(package_id, file).insert(tx)?;
            }

            Ok(package_id)
        })?;

        debug!(
            "Registered {} ({}) as package {} with {} files",
            pkg.full_name(),
            pkg.origin,
            package_id,
            files.len()
        );
        Ok(package_id)
    }
}

/// Run `f` inside a transaction, committing on success and rolling back on error
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Initialize a new package database at the specified path
///
/// Creates the database file, sets up pragmas and applies all schema
/// migrations. This is idempotent - calling it on an existing database is safe.
pub fn init(db_path: &str) -> Result<()> {
    debug!("Initializing database at: {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::InitError(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

/// Open an existing package database
///
/// Pending migrations are applied so older databases keep working.
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::DatabaseNotFound(db_path.to_string()));
    }

    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::traits::{Dependency, Script, ScriptKind};
    use tempfile::NamedTempFile;

    fn temp_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        init(&db_path).unwrap();
        let conn = open(&db_path).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_init_creates_database() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        // Remove the temp file so init can create it
        drop(temp_file);

        let result = init(&db_path);
        assert!(result.is_ok());
        assert!(Path::new(&db_path).exists());
    }

    #[test]
    fn test_open_nonexistent_database() {
        let result = open("/nonexistent/path/db.sqlite");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::DatabaseNotFound(_)));
    }

    #[test]
    fn test_register_and_query_exact() {
        let (_temp, mut conn) = temp_db();

        let mut pkg = Package::new("foo".into(), "1.0".into(), "local/foo".into());
        pkg.dependencies
            .push(Dependency::new("bar".into(), "local/bar".into(), "2.0".into()));
        pkg.scripts
            .push(Script::new(ScriptKind::Install, "echo $2".into()));

        assert!(!conn.is_installed("local/foo").unwrap());
        let id = conn.register(&pkg, &[]).unwrap();
        assert!(conn.is_installed("local/foo").unwrap());

        let records = conn.query("local/foo", MatchKind::Exact).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, Some(id));
        assert_eq!(DependencyEntry::find_by_package(&conn, id).unwrap().len(), 1);
        assert_eq!(ScriptEntry::find_by_package(&conn, id).unwrap().len(), 1);

        // Exact match does not treat the pattern as a glob
        assert!(conn.query("local/*", MatchKind::Exact).unwrap().is_empty());
        assert_eq!(conn.query("local/*", MatchKind::Glob).unwrap().len(), 1);
        assert_eq!(conn.query("", MatchKind::All).unwrap().len(), 1);
    }

    #[test]
    fn test_register_is_all_or_nothing() {
        let (_temp, mut conn) = temp_db();

        let pkg = Package::new("foo".into(), "1.0".into(), "local/foo".into());
        conn.register(&pkg, &[]).unwrap();

        // Same origin again violates the unique constraint; nothing new may land
        let mut again = Package::new("foo".into(), "1.1".into(), "local/foo".into());
        again
            .scripts
            .push(Script::new(ScriptKind::PostInstall, "true".into()));
        assert!(matches!(conn.register(&again, &[]), Err(Error::Database(_))));

        let scripts: i64 = conn
            .query_row("SELECT COUNT(*) FROM scripts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(scripts, 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (_temp, mut conn) = temp_db();

        let result: Result<()> = transaction(&mut conn, |tx| {
            PackageRecord::from_package(&Package::new("a".into(), "1".into(), "x/a".into()))
                .insert(tx)?;
            Err(Error::Fatal("abort".into()))
        });
        assert!(result.is_err());
        assert!(PackageRecord::list_all(&conn).unwrap().is_empty());
    }
}
