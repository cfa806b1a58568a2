// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pkgadd::db::models::{DependencyEntry, ExecEntry, FileEntry, ScriptEntry};
use pkgadd::db::{self, MatchKind, PackageDb};
use pkgadd::install::ShellInterpreter;
use pkgadd::{Error, InstallOptions, Installer};
use std::io;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_DB_PATH: &str = "/var/db/pkgadd/local.sqlite";

#[derive(Parser)]
#[command(name = "pkgadd")]
#[command(author, version, about = "Install package archives and their dependencies", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the package database
    Init {
        /// Database path
        #[arg(short, long, env = "PKGADD_DB", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Install a package archive, pulling missing dependencies from the same directory
    Add {
        /// Path to the package archive
        archive: PathBuf,
        /// Database path
        #[arg(short, long, env = "PKGADD_DB", default_value = DEFAULT_DB_PATH)]
        db_path: String,
        /// Install root directory
        #[arg(short, long, env = "PKGADD_ROOT", default_value = "/")]
        root: PathBuf,
        /// Shell used to run package scripts
        #[arg(short, long, env = "PKGADD_SHELL", default_value = "/bin/sh")]
        shell: PathBuf,
    },
    /// Query installed packages
    Query {
        /// Glob matched against origin or name (shows all if omitted)
        pattern: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Database path
        #[arg(short, long, env = "PKGADD_DB", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Show everything recorded for an installed package
    Info {
        /// Package origin
        origin: String,
        /// Database path
        #[arg(short, long, env = "PKGADD_DB", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Some(Commands::Init { db_path }) => {
            info!("Initializing package database at: {}", db_path);
            db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path);
            Ok(())
        }
        Some(Commands::Add {
            archive,
            db_path,
            root,
            shell,
        }) => {
            let mut conn = db::open(&db_path)?;
            let interpreter = ShellInterpreter::new(&shell, &root);
            let options = InstallOptions::with_root(root);
            let mut installer = Installer::new(&mut conn, &interpreter, options);

            match installer.add(&archive) {
                Ok(pkg) => {
                    println!("Installed package: {} ({})", pkg.full_name(), pkg.origin);
                    println!("  Dependencies: {}", pkg.dependencies.len());
                    Ok(())
                }
                Err(Error::AlreadyInstalled { origin }) => {
                    println!("Package {} is already installed", origin);
                    Ok(())
                }
                Err(e) => {
                    Err(e).with_context(|| format!("Failed to install {}", archive.display()))
                }
            }
        }
        Some(Commands::Query {
            pattern,
            json,
            db_path,
        }) => {
            let conn = db::open(&db_path)?;
            let records = match pattern.as_deref() {
                Some(pattern) => conn.query(pattern, MatchKind::Glob)?,
                None => conn.query("", MatchKind::All)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No packages found.");
            } else {
                println!("Installed packages:");
                for record in &records {
                    print!("  {} ({})", record.full_name(), record.origin);
                    if let Some(comment) = &record.comment {
                        print!(" - {}", comment);
                    }
                    println!();
                }
                println!("\nTotal: {} package(s)", records.len());
            }
            Ok(())
        }
        Some(Commands::Info { origin, db_path }) => {
            let conn = db::open(&db_path)?;
            let record = conn
                .query(&origin, MatchKind::Exact)?
                .into_iter()
                .next()
                .with_context(|| format!("Package {} is not installed", origin))?;
            let id = record
                .id
                .context("Installed package record has no id")?;

            println!("{} ({})", record.full_name(), record.origin);
            for (label, value) in [
                ("Comment", &record.comment),
                ("Architecture", &record.architecture),
                ("Maintainer", &record.maintainer),
                ("WWW", &record.www),
                ("Prefix", &record.prefix),
                ("Installed", &record.installed_at),
            ] {
                if let Some(value) = value {
                    println!("  {}: {}", label, value);
                }
            }

            let deps = DependencyEntry::find_by_package(&conn, id)?;
            println!("  Dependencies: {}", deps.len());
            for dep in &deps {
                println!("    {}-{} ({})", dep.name, dep.version, dep.origin);
            }

            let scripts = ScriptEntry::find_by_package(&conn, id)?;
            println!("  Scripts: {}", scripts.len());
            for script in &scripts {
                println!("    {}", script.kind);
            }

            let execs = ExecEntry::find_by_package(&conn, id)?;
            println!("  Execs: {}", execs.len());
            for exec in &execs {
                println!("    @{} {}", exec.kind.as_str(), exec.command);
            }

            let files = FileEntry::find_by_package(&conn, id)?;
            println!("  Files: {}", files.len());
            for file in &files {
                println!("    {}", file.path);
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pkgadd", &mut io::stdout());
            Ok(())
        }
        None => {
            println!("pkgadd v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'pkgadd --help' for usage information");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_defaults() {
        let cli = Cli::try_parse_from(["pkgadd", "add", "/pkgs/foo-1.0.tgz"]).unwrap();
        match cli.command {
            Some(Commands::Add { archive, root, .. }) => {
                assert_eq!(archive, PathBuf::from("/pkgs/foo-1.0.tgz"));
                // PKGADD_ROOT may be set in the environment running the tests
                if std::env::var_os("PKGADD_ROOT").is_none() {
                    assert_eq!(root, PathBuf::from("/"));
                }
            }
            _ => panic!("expected add"),
        }
    }
}
