// src/packages/manifest.rs

//! `+MANIFEST` parser
//!
//! The manifest is a line-oriented `key = value` file, the same shape as an
//! Arch `.PKGINFO`. Repeated keys (`dep`, `exec`, `unexec`) accumulate.

use crate::error::{Error, Result};
use crate::packages::traits::{Dependency, Exec, ExecKind, Package};

/// Parsed `+MANIFEST` content before validation
#[derive(Default)]
struct ManifestInfo {
    name: Option<String>,
    version: Option<String>,
    origin: Option<String>,
    comment: Option<String>,
    architecture: Option<String>,
    maintainer: Option<String>,
    www: Option<String>,
    prefix: Option<String>,
    dependencies: Vec<Dependency>,
    execs: Vec<Exec>,
}

/// Parse manifest text into a `Package` with no scripts attached
pub fn parse(content: &str) -> Result<Package> {
    let mut info = ManifestInfo::default();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "name" => info.name = Some(value.to_string()),
            "version" => info.version = Some(value.to_string()),
            "origin" => info.origin = Some(value.to_string()),
            "comment" => info.comment = Some(value.to_string()),
            "arch" => info.architecture = Some(value.to_string()),
            "maintainer" => info.maintainer = Some(value.to_string()),
            "www" => info.www = Some(value.to_string()),
            "prefix" => info.prefix = Some(value.to_string()),
            "dep" => info.dependencies.push(parse_dependency(value, lineno + 1)?),
            "exec" => info
                .execs
                .push(Exec::new(ExecKind::RunOnInstall, value.to_string())),
            "unexec" => info
                .execs
                .push(Exec::new(ExecKind::RunOnDeinstall, value.to_string())),
            _ => {}
        }
    }

    let name = required(info.name, "name")?;
    let version = required(info.version, "version")?;
    let origin = required(info.origin, "origin")?;

    let mut pkg = Package::new(name, version, origin);
    pkg.comment = info.comment;
    pkg.architecture = info.architecture;
    pkg.maintainer = info.maintainer;
    pkg.www = info.www;
    pkg.prefix = info.prefix;
    pkg.dependencies = info.dependencies;
    pkg.execs = info.execs;

    Ok(pkg)
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Archive(format!(
            "Package {} not found in +MANIFEST",
            key
        ))),
    }
}

/// `dep = <name> <origin> <version>`
fn parse_dependency(value: &str, lineno: usize) -> Result<Dependency> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    match fields.as_slice() {
        [name, origin, version] => Ok(Dependency::new(
            name.to_string(),
            origin.to_string(),
            version.to_string(),
        )),
        _ => Err(Error::Archive(format!(
            "Malformed dependency on +MANIFEST line {}: expected '<name> <origin> <version>', got '{}'",
            lineno, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parsing() {
        let content = r#"
# Sample +MANIFEST
name = foo
version = 1.0
origin = local/foo
comment = A test package
arch = amd64
prefix = /usr/local
dep = bar local/bar 2.0
dep = baz devel/baz 0.3_1
exec = /usr/bin/true
unexec = /usr/bin/false
"#;

        let pkg = parse(content).unwrap();
        assert_eq!(pkg.name, "foo");
        assert_eq!(pkg.version, "1.0");
        assert_eq!(pkg.origin, "local/foo");
        assert_eq!(pkg.comment.as_deref(), Some("A test package"));
        assert_eq!(pkg.prefix.as_deref(), Some("/usr/local"));
        assert_eq!(pkg.dependencies.len(), 2);
        assert_eq!(pkg.dependencies[0].name, "bar");
        assert_eq!(pkg.dependencies[0].origin, "local/bar");
        assert_eq!(pkg.dependencies[1].version, "0.3_1");
        assert_eq!(pkg.execs.len(), 2);
        assert_eq!(pkg.execs[0].kind, ExecKind::RunOnInstall);
        assert_eq!(pkg.execs[1].kind, ExecKind::RunOnDeinstall);
        assert!(pkg.scripts.is_empty());
    }

    #[test]
    fn test_exec_keeps_equals_in_command() {
        let pkg = parse("name = a\nversion = 1\norigin = x/a\nexec = env FOO=bar true\n").unwrap();
        assert_eq!(pkg.execs[0].command, "env FOO=bar true");
    }

    #[test]
    fn test_missing_origin_is_rejected() {
        let err = parse("name = foo\nversion = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
        assert!(err.to_string().contains("origin"));
    }

    #[test]
    fn test_malformed_dependency_is_rejected() {
        let err = parse("name = foo\nversion = 1.0\norigin = local/foo\ndep = bar 2.0\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }
}
