// src/install/scripts.rs

//! Lifecycle script execution
//!
//! Scripts are handed to a `ScriptInterpreter` as a single command string:
//!
//! ```text
//! set -- <name>-<version> [<PHASE>]
//! <script body>
//! ```
//!
//! Generic `+INSTALL` scripts run twice, with `INSTALL` before extraction and
//! `POST-INSTALL` after. Pre/post specific scripts only get the identity.
//! Exec hooks run verbatim. A failing script is logged and never aborts the
//! install.

use crate::error::Result;
use crate::packages::traits::{ExecKind, Package, ScriptKind};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Phase argument for generic install scripts before extraction
pub const PHASE_INSTALL: &str = "INSTALL";
/// Phase argument for generic install scripts after extraction
pub const PHASE_POST_INSTALL: &str = "POST-INSTALL";

/// Something that can run a shell command string
#[cfg_attr(test, mockall::automock)]
pub trait ScriptInterpreter {
    /// Run `command`, returning its exit code (-1 when terminated by a signal)
    fn execute(&self, command: &str) -> Result<i32>;
}

/// Runs commands through `<shell> -c`
pub struct ShellInterpreter {
    shell: PathBuf,
    root: PathBuf,
}

impl ShellInterpreter {
    pub fn new(shell: &Path, root: &Path) -> Self {
        Self {
            shell: shell.to_path_buf(),
            root: root.to_path_buf(),
        }
    }
}

impl Default for ShellInterpreter {
    fn default() -> Self {
        Self::new(Path::new("/bin/sh"), Path::new("/"))
    }
}

impl ScriptInterpreter for ShellInterpreter {
    fn execute(&self, command: &str) -> Result<i32> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .env("PKG_ROOTDIR", &self.root)
            .stdin(Stdio::null())
            .output()?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!("[script] {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!("[script] {}", line);
        }

        Ok(output.status.code().unwrap_or(-1))
    }
}

/// Build the command string for a script body
pub fn script_command(pkg: &Package, body: &str, phase: Option<&str>) -> String {
    match phase {
        Some(phase) => format!("set -- {} {}\n{}", pkg.full_name(), phase, body),
        None => format!("set -- {}\n{}", pkg.full_name(), body),
    }
}

/// Runs a package's scripts at the install lifecycle points
pub struct ScriptRunner<'a> {
    interpreter: &'a dyn ScriptInterpreter,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(interpreter: &'a dyn ScriptInterpreter) -> Self {
        Self { interpreter }
    }

    /// Before extraction: `+PRE_INSTALL`, then `+INSTALL` with `INSTALL`
    pub fn run_pre_install(&self, pkg: &Package) {
        for script in scripts_of(pkg, ScriptKind::PreInstall) {
            self.run(pkg, "pre-install", &script_command(pkg, script, None));
        }
        for script in scripts_of(pkg, ScriptKind::Install) {
            self.run(pkg, "install", &script_command(pkg, script, Some(PHASE_INSTALL)));
        }
    }

    /// After extraction: `+INSTALL` with `POST-INSTALL`, then `+POST_INSTALL`
    pub fn run_post_install(&self, pkg: &Package) {
        for script in scripts_of(pkg, ScriptKind::Install) {
            self.run(
                pkg,
                "post-install",
                &script_command(pkg, script, Some(PHASE_POST_INSTALL)),
            );
        }
        for script in scripts_of(pkg, ScriptKind::PostInstall) {
            self.run(pkg, "post-install", &script_command(pkg, script, None));
        }
    }

    /// Run every install-time exec hook verbatim
    pub fn run_execs(&self, pkg: &Package) {
        for exec in pkg.execs.iter().filter(|e| e.kind == ExecKind::RunOnInstall) {
            self.run(pkg, "exec", &exec.command);
        }
    }

    fn run(&self, pkg: &Package, label: &str, command: &str) {
        debug!("Running {} script for {}", label, pkg.full_name());

        match self.interpreter.execute(command) {
            Ok(0) => {}
            Ok(code) => warn!(
                "{} script for {} exited with status {}",
                label,
                pkg.full_name(),
                code
            ),
            Err(e) => warn!(
                "{} script for {} could not be run: {}",
                label,
                pkg.full_name(),
                e
            ),
        }
    }
}

fn scripts_of(pkg: &Package, kind: ScriptKind) -> impl Iterator<Item = &str> {
    pkg.scripts
        .iter()
        .filter(move |s| s.kind == kind)
        .map(|s| s.body.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::packages::traits::{Exec, Script};
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn package() -> Package {
        let mut pkg = Package::new("foo".into(), "1.0".into(), "local/foo".into());
        pkg.scripts = vec![
            Script::new(ScriptKind::Install, "echo install $2".into()),
            Script::new(ScriptKind::PostInstall, "echo post".into()),
            Script::new(ScriptKind::PreInstall, "echo pre".into()),
            Script::new(ScriptKind::PreDeinstall, "echo never".into()),
        ];
        pkg.execs = vec![
            Exec::new(ExecKind::RunOnInstall, "/usr/bin/true".into()),
            Exec::new(ExecKind::RunOnDeinstall, "/usr/bin/false".into()),
        ];
        pkg
    }

    #[test]
    fn test_script_command_format() {
        let pkg = package();
        assert_eq!(
            script_command(&pkg, "echo hi", Some(PHASE_INSTALL)),
            "set -- foo-1.0 INSTALL\necho hi"
        );
        assert_eq!(script_command(&pkg, "echo hi", None), "set -- foo-1.0\necho hi");
    }

    #[test]
    fn test_lifecycle_order() {
        let pkg = package();
        let mut interpreter = MockScriptInterpreter::new();
        let mut seq = Sequence::new();

        for expected in [
            "set -- foo-1.0\necho pre",
            "set -- foo-1.0 INSTALL\necho install $2",
            "set -- foo-1.0 POST-INSTALL\necho install $2",
            "set -- foo-1.0\necho post",
            "/usr/bin/true",
        ] {
            interpreter
                .expect_execute()
                .with(eq(expected))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(0));
        }

        let runner = ScriptRunner::new(&interpreter);
        runner.run_pre_install(&pkg);
        runner.run_post_install(&pkg);
        runner.run_execs(&pkg);
    }

    #[test]
    fn test_script_failures_are_absorbed() {
        let pkg = package();
        let mut interpreter = MockScriptInterpreter::new();
        interpreter.expect_execute().times(2).returning(|command| {
            if command.contains("pre") {
                Ok(1)
            } else {
                Err(Error::Fatal("no shell".into()))
            }
        });

        // Both pre-extraction scripts still run even though each fails
        ScriptRunner::new(&interpreter).run_pre_install(&pkg);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_interpreter_passes_positional_args() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let pkg = package();
        let body = format!("echo \"$1 $2 $PKG_ROOTDIR\" > {}", out.display());

        let interpreter = ShellInterpreter::new(Path::new("/bin/sh"), dir.path());
        let code = interpreter
            .execute(&script_command(&pkg, &body, Some(PHASE_POST_INSTALL)))
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap().trim(),
            format!("foo-1.0 POST-INSTALL {}", dir.path().display())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_interpreter_reports_exit_code() {
        let interpreter = ShellInterpreter::default();
        assert_eq!(interpreter.execute("exit 3").unwrap(), 3);
    }
}
