// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "/var/db/pkgadd/local.sqlite";

fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .env("PKGADD_DB")
        .default_value(DEFAULT_DB_PATH)
        .help("Database path")
}

fn build_cli() -> Command {
    Command::new("pkgadd")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pkgadd Contributors")
        .about("Install package archives and their dependencies")
        .subcommand_required(false)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("init")
                .about("Initialize the package database")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("add")
                .about("Install a package archive, pulling missing dependencies from the same directory")
                .arg(Arg::new("archive").required(true).help("Path to the package archive"))
                .arg(db_path_arg())
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .env("PKGADD_ROOT")
                        .default_value("/")
                        .help("Install root directory"),
                )
                .arg(
                    Arg::new("shell")
                        .short('s')
                        .long("shell")
                        .env("PKGADD_SHELL")
                        .default_value("/bin/sh")
                        .help("Shell used to run package scripts"),
                ),
        )
        .subcommand(
            Command::new("query")
                .about("Query installed packages")
                .arg(Arg::new("pattern").help("Glob matched against origin or name (optional)"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of a table"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("Show everything recorded for an installed package")
                .arg(Arg::new("origin").required(true).help("Package origin"))
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(Arg::new("shell").required(true).help("Target shell")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("pkgadd.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
