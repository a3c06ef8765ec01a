//! External process invocation.
//!
//! The compiler and the runtime are opaque programs. Both adapters go
//! through [`ProcessRunner`] so tests can substitute a scripted fake.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Poll interval while waiting on a child with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// A program invocation: program, arguments, working directory, extra env.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the child runs in. The parent's directory never changes.
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Value following `flag` in the argument list (e.g. the path after `-o`).
    #[must_use]
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exited on its own; `None` when killed by a signal.
    Exited(Option<i32>),
    /// Killed after exceeding the timeout.
    TimedOut(Duration),
}

impl Outcome {
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(Some(0)))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(Some(code)) => write!(f, "exit code {code}"),
            Self::Exited(None) => f.write_str("terminated by signal"),
            Self::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub outcome: Outcome,
    /// Trailing lines of the child's stderr.
    pub stderr: String,
}

impl ProcessReport {
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            outcome: Outcome::Exited(Some(code)),
            stderr: String::new(),
        }
    }

    /// Map a timeout to [`Error::Timeout`]; any other outcome is returned as-is.
    pub fn check_timeout(self, command: &CommandSpec) -> Result<Self> {
        match self.outcome {
            Outcome::TimedOut(after) => Err(Error::Timeout {
                command: command.to_string(),
                after,
            }),
            Outcome::Exited(_) => Ok(self),
        }
    }
}

/// Runs external commands synchronously.
pub trait ProcessRunner {
    /// Run `command` to completion (or timeout) and report how it ended.
    fn run(&self, command: &CommandSpec) -> Result<ProcessReport>;
}

/// [`ProcessRunner`] backed by `std::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
    inherit_stdout: bool,
}

impl SystemRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: None,
            inherit_stdout: false,
        }
    }

    /// Kill children that run longer than `timeout`. `None` waits forever.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pass child stdout through instead of discarding it.
    #[must_use]
    pub const fn with_inherit_stdout(mut self, inherit: bool) -> Self {
        self.inherit_stdout = inherit;
        self
    }

    fn wait(&self, child: &mut std::process::Child) -> Result<Outcome> {
        let Some(timeout) = self.timeout else {
            return Ok(Outcome::Exited(child.wait()?.code()));
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Outcome::Exited(status.code()));
            }
            if start.elapsed() > timeout {
                warn!(pid = child.id(), "child exceeded timeout, killing");
                kill_group(child);
                child.wait()?;
                return Ok(Outcome::TimedOut(timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessReport> {
        debug!(command = %command, dir = %command.working_dir.display(), "spawning");

        // A file instead of a pipe: a chatty child can't block on a full pipe
        // while the parent is polling.
        let mut stderr_file = tempfile::tempfile()?;
        let stdout = if self.inherit_stdout {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::from(stderr_file.try_clone()?));
        // Own process group, so a timeout also reaches grandchildren
        // (`cargo run` forks the benchmark binary).
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let outcome = self.wait(&mut child)?;

        stderr_file.seek(SeekFrom::Start(0))?;
        let mut raw = Vec::new();
        stderr_file.read_to_end(&mut raw)?;

        debug!(command = %command, %outcome, "child finished");
        Ok(ProcessReport {
            outcome,
            stderr: last_lines(&String::from_utf8_lossy(&raw), STDERR_TAIL_LINES),
        })
    }
}

/// Kill `child` and everything in its process group.
///
/// The child may exit between `try_wait` and here, so failures are ignored.
fn kill_group(child: &mut std::process::Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(child.id())
            && let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL)
        {
            debug!(pgid, error = %e, "killpg failed");
        }
    }
    let _ = child.kill();
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Remove a file, treating absence as success. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_and_arg_after() {
        let cmd = CommandSpec::new("./evm2near", ".").args(["test/calc.sol", "-o", "calc.wasm"]);
        assert_eq!(cmd.to_string(), "./evm2near test/calc.sol -o calc.wasm");
        assert_eq!(cmd.arg_after("-o"), Some("calc.wasm"));
        assert_eq!(cmd.arg_after("-b"), None);
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\nc\n", 2), "b\nc");
        assert_eq!(last_lines("a", 5), "a");
        assert_eq!(last_lines("", 5), "");
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calc.wasm");
        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, b"\0asm").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("sh", dir.path()).args(["-c", "echo boom >&2; exit 3"]);
        let report = SystemRunner::new().run(&cmd).unwrap();
        assert_eq!(report.outcome, Outcome::Exited(Some(3)));
        assert_eq!(report.stderr, "boom");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_working_dir_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("sh", dir.path())
            .args(["-c", "echo \"$GASBENCH_REVISION\" > out.txt"])
            .env("GASBENCH_REVISION", "abc1234");
        let report = SystemRunner::new().run(&cmd).unwrap();
        assert!(report.outcome.success());
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "abc1234");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("sleep", dir.path()).args(["5"]);
        let runner = SystemRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let report = runner.run(&cmd).unwrap();
        assert_eq!(report.outcome, Outcome::TimedOut(Duration::from_millis(100)));
        assert!(matches!(
            report.check_timeout(&cmd),
            Err(Error::Timeout { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("sh", dir.path())
            .args(["-c", "(sleep 1; touch marker) & wait"]);
        let runner = SystemRunner::new().with_timeout(Some(Duration::from_millis(200)));
        let report = runner.run(&cmd).unwrap();
        assert_eq!(report.outcome, Outcome::TimedOut(Duration::from_millis(200)));
        assert_eq!(report.outcome.to_string(), "timed out after 200ms");

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!dir.path().join("marker").exists(), "grandchild outlived the timeout");
    }

    #[test]
    fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("gasbench-no-such-program", dir.path());
        let err = SystemRunner::new().run(&cmd).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
