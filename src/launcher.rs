//! Starting the MOPAC executable.
//!
//! A job can run in one of two modes:
//!
//! - [`LaunchMode::Attached`]: the caller blocks until MOPAC exits and sees
//!   its failure status
//! - [`LaunchMode::Detached`]: MOPAC keeps running after the call returns and
//!   may outlive the calling process
//!
//! Detaching is platform specific, so it sits behind the [`Launcher`] trait.
//! [`ShellLauncher`] uses `sh -c "nohup … &"` and needs a POSIX shell;
//! [`DirectLauncher`] spawns the engine and lets go of the child handle,
//! which works everywhere the standard library can spawn processes.

use crate::error::{Result, RunnerError};
use log::{debug, info};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Whether to wait for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Block until the engine exits
    Attached,
    /// Return as soon as the engine has been started
    Detached,
}

impl LaunchMode {
    /// `Attached` if `wait`, else `Detached`
    pub fn from_wait(wait: bool) -> Self {
        if wait {
            LaunchMode::Attached
        } else {
            LaunchMode::Detached
        }
    }
}

/// Strategy for starting the engine on a deck.
pub trait Launcher: fmt::Debug {
    /// Runs `command deck` in the given mode.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::CommandNotFound`] if the executable (or the shell
    ///   needed to detach) is missing or not executable
    /// - [`RunnerError::Calculation`] if an attached run exits unsuccessfully
    fn launch(&self, command: &str, deck: &Path, mode: LaunchMode) -> Result<()>;
}

/// Detaches through a POSIX shell with `nohup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLauncher {
    /// Shell used for detached runs
    pub shell: String,
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str, deck: &Path, mode: LaunchMode) -> Result<()> {
        let exe = require_executable(command)?;
        match mode {
            LaunchMode::Attached => run_attached(&exe, deck),
            LaunchMode::Detached => {
                let shell = require_executable(&self.shell)?;
                let script = format!(
                    "nohup {} {} &",
                    shell_quote(&exe.to_string_lossy()),
                    shell_quote(&deck.to_string_lossy())
                );
                debug!("Detaching via {}: {}", shell.display(), script);
                let status = Command::new(&shell)
                    .arg("-c")
                    .arg(&script)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .map_err(|e| {
                        RunnerError::Calculation(format!(
                            "failed to start {}: {}",
                            shell.display(),
                            e
                        ))
                    })?;
                if !status.success() {
                    return Err(RunnerError::Calculation(format!(
                        "{} refused to start MOPAC ({})",
                        shell.display(),
                        status
                    )));
                }
                info!("MOPAC started in background on {}", deck.display());
                Ok(())
            }
        }
    }
}

/// Detaches by spawning the engine directly and dropping the child handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectLauncher;

impl Launcher for DirectLauncher {
    fn launch(&self, command: &str, deck: &Path, mode: LaunchMode) -> Result<()> {
        let exe = require_executable(command)?;
        match mode {
            LaunchMode::Attached => run_attached(&exe, deck),
            LaunchMode::Detached => {
                let child = Command::new(&exe)
                    .arg(deck)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| {
                        RunnerError::Calculation(format!(
                            "failed to start {}: {}",
                            exe.display(),
                            e
                        ))
                    })?;
                info!(
                    "MOPAC started in background on {} (pid {})",
                    deck.display(),
                    child.id()
                );
                Ok(())
            }
        }
    }
}

/// Launcher suited to the target platform.
pub fn default_launcher() -> Box<dyn Launcher> {
    #[cfg(unix)]
    {
        Box::new(ShellLauncher::default())
    }
    #[cfg(not(unix))]
    {
        Box::new(DirectLauncher)
    }
}

fn run_attached(exe: &Path, deck: &Path) -> Result<()> {
    info!("Running {} {}", exe.display(), deck.display());
    let output = Command::new(exe)
        .arg(deck)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            RunnerError::Calculation(format!("failed to start {}: {}", exe.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RunnerError::Calculation(format!(
            "{} exited with {} on {}: {}",
            exe.display(),
            output.status,
            deck.display(),
            stderr.trim()
        )));
    }
    Ok(())
}

fn require_executable(command: &str) -> Result<PathBuf> {
    resolve_executable(command).ok_or_else(|| RunnerError::CommandNotFound {
        command: command.to_string(),
    })
}

/// Locates an executable.
///
/// A command containing a path separator is checked as given; a bare name is
/// searched on `PATH`.
pub fn resolve_executable(command: &str) -> Option<PathBuf> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }
    let path = Path::new(command);
    if path.components().count() > 1 {
        return is_executable(path).then(|| path.to_path_buf());
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .map(|dir| dir.join(command))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Quotes `s` for a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_mode_from_wait() {
        assert_eq!(LaunchMode::from_wait(true), LaunchMode::Attached);
        assert_eq!(LaunchMode::from_wait(false), LaunchMode::Detached);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("job.mop"), "'job.mop'");
        assert_eq!(shell_quote("my job's.mop"), r"'my job'\''s.mop'");
    }

    #[test]
    fn test_missing_executable() {
        assert!(resolve_executable("").is_none());
        assert!(resolve_executable("definitely-not-a-mopac-binary-3141").is_none());
        assert!(resolve_executable("./no/such/MOPAC2012.exe").is_none());

        let err = ShellLauncher::default()
            .launch(
                "definitely-not-a-mopac-binary-3141",
                Path::new("job.mop"),
                LaunchMode::Attached,
            )
            .unwrap_err();
        assert!(matches!(err, RunnerError::CommandNotFound { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        #[test]
        fn test_resolves_shell_on_path() {
            let sh = resolve_executable("sh").unwrap();
            assert!(sh.is_absolute());
        }

        #[test]
        fn test_non_executable_file_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("MOPAC2012.exe");
            fs::write(&path, "not a program").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
            assert!(resolve_executable(path.to_str().unwrap()).is_none());
        }

        #[test]
        fn test_attached_success_and_failure() {
            let launcher = ShellLauncher::default();
            launcher
                .launch("true", Path::new("job.mop"), LaunchMode::Attached)
                .unwrap();

            let err = launcher
                .launch("false", Path::new("job.mop"), LaunchMode::Attached)
                .unwrap_err();
            assert!(matches!(err, RunnerError::Calculation(_)));
        }

        #[test]
        fn test_detached_returns_once_started() {
            ShellLauncher::default()
                .launch("true", Path::new("job.mop"), LaunchMode::Detached)
                .unwrap();
            DirectLauncher
                .launch("true", Path::new("job.mop"), LaunchMode::Detached)
                .unwrap();
        }

        #[test]
        fn test_detached_without_shell() {
            let launcher = ShellLauncher {
                shell: "no-such-shell-2718".to_string(),
            };
            let err = launcher
                .launch("true", Path::new("job.mop"), LaunchMode::Detached)
                .unwrap_err();
            assert!(matches!(err, RunnerError::CommandNotFound { ref command } if command == "no-such-shell-2718"));
        }
    }
}
