//! Blocking subprocess execution

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

/// How a child's output streams are wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture stdout and stderr, nothing reaches the console
    Capture,
    /// Stream stdout live, capture stderr for error reporting
    CaptureStderr,
    /// Stream both streams live
    Inherit,
}

/// Result of a subprocess execution
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code, -1 when terminated by a signal
    pub exit_code: i32,

    /// Captured standard output (empty unless captured)
    pub stdout: String,

    /// Captured standard error (empty unless captured)
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(status: ExitStatus, stdout: String, stderr: String, duration: Duration) -> Self {
        let exit_code = status.code().unwrap_or(-1);
        Self {
            success: status.success(),
            exit_code,
            stdout,
            stderr,
            duration,
        }
    }
}

/// Run a command to completion
///
/// Only launch failures are errors; a non-zero exit is reported through
/// [`CommandResult::success`].
pub fn run_command<S: AsRef<str>>(
    program: &str,
    args: &[S],
    cwd: Option<&Path>,
    mode: OutputMode,
) -> io::Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(AsRef::as_ref));
    cmd.stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(
        "running: {} {} (cwd: {:?})",
        program,
        args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" "),
        cwd
    );

    let (stdout, stderr) = match mode {
        OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
        OutputMode::CaptureStderr => (Stdio::inherit(), Stdio::piped()),
        OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
    };

    let output = cmd.stdout(stdout).stderr(stderr).output()?;

    let duration = start.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    debug!(
        "{} exited with {:?} after {:.2?}",
        program,
        output.status.code(),
        duration
    );

    Ok(CommandResult::from_status(
        output.status,
        stdout,
        stderr,
        duration,
    ))
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_both_streams() {
        let result = run_command(
            "sh",
            &["-c", "echo out; echo err 1>&2"],
            None,
            OutputMode::Capture,
        )
        .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let result = run_command("sh", &["-c", "exit 7"], None, OutputMode::Capture).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 7);
    }

    #[test]
    fn test_cwd_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_command("pwd", &[] as &[&str], Some(dir.path()), OutputMode::Capture).unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let result = run_command(
            "cmbuild-no-such-program",
            &[] as &[&str],
            None,
            OutputMode::Capture,
        );
        assert!(result.is_err());
        assert!(!command_exists("cmbuild-no-such-program"));
    }
}
