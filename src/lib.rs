// src/lib.rs

//! pkgadd package installer
//!
//! Installs package archives into a root filesystem and records them in a
//! SQLite package database.
//!
//! # Architecture
//!
//! - Database-first: installed state lives in SQLite, registration is the commit point
//! - Archives: compressed tarballs with `+`-prefixed metadata entries up front
//! - Dependencies: missing ones are installed from sibling archives, recursively
//! - Scripts: pre/post install hooks run through an injectable interpreter
//! - Config samples: `*.pkgconf` entries never clobber an existing real config

pub mod db;
mod error;
pub mod install;
pub mod packages;

pub use error::{Error, Result};
pub use install::{InstallOptions, Installer};
