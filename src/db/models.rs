// src/db/models.rs

//! Data models for pkgadd database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating and reading records.

use crate::error::Result;
use crate::packages::traits::{Dependency, Exec, ExecKind, InstalledFile, Package, Script, ScriptKind};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::str::FromStr;

const PACKAGE_COLUMNS: &str = "id, origin, name, version, comment, description, architecture, maintainer, www, prefix, installed_at";

/// An installed package row
#[derive(Debug, Clone, Serialize)]
pub struct PackageRecord {
    pub id: Option<i64>,
    pub origin: String,
    pub name: String,
    pub version: String,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub architecture: Option<String>,
    pub maintainer: Option<String>,
    pub www: Option<String>,
    pub prefix: Option<String>,
    pub installed_at: Option<String>,
}

impl PackageRecord {
    /// Build the row for a loaded package
    pub fn from_package(pkg: &Package) -> Self {
        Self {
            id: None,
            origin: pkg.origin.clone(),
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            comment: pkg.comment.clone(),
            description: pkg.description.clone(),
            architecture: pkg.architecture.clone(),
            maintainer: pkg.maintainer.clone(),
            www: pkg.www.clone(),
            prefix: pkg.prefix.clone(),
            installed_at: None,
        }
    }

    /// Insert this package into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO packages (origin, name, version, comment, description, architecture, maintainer, www, prefix)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &self.origin,
                &self.name,
                &self.version,
                &self.comment,
                &self.description,
                &self.architecture,
                &self.maintainer,
                &self.www,
                &self.prefix,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a package by exact origin
    pub fn find_by_origin(conn: &Connection, origin: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE origin = ?1",
            PACKAGE_COLUMNS
        ))?;

        let record = stmt.query_row([origin], Self::from_row).optional()?;

        Ok(record)
    }

    /// Find packages whose origin or name matches a shell glob
    pub fn find_by_glob(conn: &Connection, pattern: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE origin GLOB ?1 OR name GLOB ?1 ORDER BY name, version",
            PACKAGE_COLUMNS
        ))?;

        let records = stmt
            .query_map([pattern], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// List all installed packages
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages ORDER BY name, version",
            PACKAGE_COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// `name-version` of the installed package
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Convert a database row to a PackageRecord
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            origin: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            comment: row.get(4)?,
            description: row.get(5)?,
            architecture: row.get(6)?,
            maintainer: row.get(7)?,
            www: row.get(8)?,
            prefix: row.get(9)?,
            installed_at: row.get(10)?,
        })
    }
}

/// Parse a TEXT column into a typed enum, reporting a conversion failure otherwise
fn parse_column<T: FromStr<Err = String>>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// A declared dependency of an installed package
#[derive(Debug, Clone, Serialize)]
pub struct DependencyEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub name: String,
    pub origin: String,
    pub version: String,
}

impl DependencyEntry {
    pub fn new(package_id: i64, dep: &Dependency) -> Self {
        Self {
            id: None,
            package_id,
            name: dep.name.clone(),
            origin: dep.origin.clone(),
            version: dep.version.clone(),
        }
    }

    /// Insert this dependency into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO dependencies (package_id, name, origin, version) VALUES (?1, ?2, ?3, ?4)",
            params![&self.package_id, &self.name, &self.origin, &self.version],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find all dependencies for a package
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, name, origin, version FROM dependencies WHERE package_id = ?1 ORDER BY id",
        )?;

        let deps = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(deps)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            name: row.get(2)?,
            origin: row.get(3)?,
            version: row.get(4)?,
        })
    }
}

/// A lifecycle script stored with its package
#[derive(Debug, Clone)]
pub struct ScriptEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub kind: ScriptKind,
    pub body: String,
}

impl ScriptEntry {
    pub fn new(package_id: i64, script: &Script) -> Self {
        Self {
            id: None,
            package_id,
            kind: script.kind,
            body: script.body.clone(),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO scripts (package_id, kind, body) VALUES (?1, ?2, ?3)",
            params![&self.package_id, self.kind.as_str(), &self.body],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, kind, body FROM scripts WHERE package_id = ?1 ORDER BY id",
        )?;

        let scripts = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(scripts)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            kind: parse_column(row, 2)?,
            body: row.get(3)?,
        })
    }
}

/// An exec or unexec command stored with its package
#[derive(Debug, Clone)]
pub struct ExecEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub kind: ExecKind,
    pub command: String,
}

impl ExecEntry {
    pub fn new(package_id: i64, exec: &Exec) -> Self {
        Self {
            id: None,
            package_id,
            kind: exec.kind,
            command: exec.command.clone(),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO execs (package_id, kind, command) VALUES (?1, ?2, ?3)",
            params![&self.package_id, self.kind.as_str(), &self.command],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, kind, command FROM execs WHERE package_id = ?1 ORDER BY id",
        )?;

        let execs = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(execs)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            kind: parse_column(row, 2)?,
            command: row.get(3)?,
        })
    }
}

/// A File represents a tracked file written by a package
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub package_id: i64,
    pub path: String,
    pub sha256_hash: String,
    pub size: i64,
    pub permissions: i32,
}

impl FileEntry {
    pub fn new(package_id: i64, file: &InstalledFile) -> Self {
        Self {
            id: None,
            package_id,
            path: file.path.clone(),
            sha256_hash: file.sha256.clone(),
            size: file.size,
            permissions: file.mode,
        }
    }

    /// Insert this file into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (package_id, path, sha256_hash, size, permissions)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.package_id,
                &self.path,
                &self.sha256_hash,
                &self.size,
                &self.permissions,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find all files belonging to a package
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, path, sha256_hash, size, permissions
             FROM files WHERE package_id = ?1 ORDER BY path",
        )?;

        let files = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Convert a database row to a FileEntry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            path: row.get(2)?,
            sha256_hash: row.get(3)?,
            size: row.get(4)?,
            permissions: row.get(5)?,
        })
    }
}
