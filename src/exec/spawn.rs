//! Child process creation: parent-side spawn and the child-entry exec path
//!
//! Fork/exec "returns twice" semantics are modelled as two functions:
//! [`spawn_child`] is the parent branch, handing back the process and its
//! pipe; [`exec_replace`] is the child-entry path, which replaces the
//! current process image and never returns. Because `Command::spawn` fuses
//! fork and exec, a failure to launch surfaces on the spawning side; it is
//! mapped to the same diagnostics and status codes the child-entry path
//! terminates with, so both report launch failures identically.

use std::fmt;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::Ordering;

use log::{debug, trace};

use crate::exceptions::{LadleError, Result};
use crate::exec::invocation::{Invocation, PipeMode, StderrMode};
use crate::exec::pipe::PipeHandle;
use crate::exit_codes::{EXIT_COMMAND_NOT_FOUND, EXIT_EXEC_FAILED};

/// Exit status of a child, or the synthesized status of a failed launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
    signal: Option<i32>,
}

impl ExitStatus {
    pub(crate) fn from_std(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus {
            code: status.code(),
            signal: status.signal(),
        }
    }

    /// Status for a child role that could not replace its process image:
    /// 127 when the target was missing, 1 otherwise
    pub fn from_launch_failure(code: i32) -> Self {
        ExitStatus {
            code: Some(code),
            signal: None,
        }
    }

    /// Whether the child reported success (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The exit code, if the child exited normally
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// The terminating signal, if the child was killed by one
    pub fn signal(&self) -> Option<i32> {
        self.signal
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "{code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Parent-side handle to a spawned child and its pipe
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    pipe: PipeHandle,
}

impl ChildHandle {
    /// OS process id of the child
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The live pipe shared with the child
    pub fn pipe_mut(&mut self) -> &mut PipeHandle {
        &mut self.pipe
    }

    /// Release our pipe ends and wait for the child to exit
    ///
    /// Consumes the handle: a status is produced at most once per
    /// invocation.
    pub fn wait(self) -> Result<ExitStatus> {
        let ChildHandle { mut child, pipe } = self;
        drop(pipe);
        let status = child.wait()?;
        Ok(ExitStatus::from_std(status))
    }
}

/// What came back from the spawn point: a live handle in the parent role,
/// or the already-mapped status of a child role that failed to launch
#[derive(Debug)]
pub enum SpawnOutcome {
    /// The child is running; the parent holds the pipe
    Spawned(ChildHandle),
    /// The target could not be launched; diagnostics have been printed and
    /// the status carries the launch-failure contract (127 or 1)
    LaunchFailed(ExitStatus),
}

/// Spawn the invocation's target connected through a single pipe
///
/// The child's stdout is always piped; in [`PipeMode::ReadWrite`] its stdin
/// is piped too (and the read side made non-blocking for the pre-drain).
/// Stderr goes to the null sink unless the invocation says otherwise. The
/// parent never executes the target itself.
pub fn spawn_child(invocation: &Invocation, mode: PipeMode) -> Result<SpawnOutcome> {
    let Some(program) = invocation.program() else {
        return Err(LadleError::Generic("empty argument vector".to_string()));
    };
    debug!("spawning {:?}", invocation.argv());

    let mut cmd = base_command(invocation, program);
    cmd.stdout(Stdio::piped());
    cmd.stdin(match mode {
        PipeMode::Read => Stdio::inherit(),
        PipeMode::ReadWrite => Stdio::piped(),
    });

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return Ok(SpawnOutcome::LaunchFailed(report_launch_failure(
                invocation, &err,
            )));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| LadleError::Generic("child stdout was not piped".to_string()))?;
    let pipe = match mode {
        PipeMode::Read => PipeHandle::new_read(stdout),
        PipeMode::ReadWrite => {
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| LadleError::Generic("child stdin was not piped".to_string()))?;
            PipeHandle::new_read_write(stdout, stdin)?
        }
    };

    trace!("child pid {}", child.id());
    Ok(SpawnOutcome::Spawned(ChildHandle { child, pipe }))
}

/// Child-entry path: replace the current process image with the target
///
/// Does not return on success. On failure the process terminates directly
/// with the launch-status contract: a missing target prints a "command not
/// found" diagnostic and exits 127; anything else prints an "exec failed"
/// diagnostic and exits 1. Diagnostics are suppressed when the invocation
/// explicitly discards the error stream. The invoking program's logic never
/// continues in this process.
pub fn exec_replace(invocation: &Invocation) -> ! {
    let Some(program) = invocation.program() else {
        eprintln!("ladle: exec failed: empty argument vector");
        std::process::exit(EXIT_EXEC_FAILED);
    };
    trace!("replacing process image with {:?}", invocation.argv());

    let err = base_command(invocation, program).exec();
    let status = report_launch_failure(invocation, &err);
    std::process::exit(status.code().unwrap_or(EXIT_EXEC_FAILED));
}

/// Spawn with inherited standard streams and wait for the child
///
/// Used by the CLI's spawn mode: the pid is published through
/// [`crate::CHILD_PID`] so signals can be forwarded while the child runs. A
/// launch failure is reported through the same mapping as everywhere else
/// and comes back as a plain status.
pub fn run_attached(invocation: &Invocation) -> Result<ExitStatus> {
    let Some(program) = invocation.program() else {
        return Err(LadleError::Generic("empty argument vector".to_string()));
    };
    debug!("running attached: {:?}", invocation.argv());

    let mut child = match base_command(invocation, program).spawn() {
        Ok(child) => child,
        Err(err) => return Ok(report_launch_failure(invocation, &err)),
    };

    crate::CHILD_PID.store(child.id(), Ordering::SeqCst);
    let status = child.wait();
    crate::CHILD_PID.store(0, Ordering::SeqCst);

    Ok(ExitStatus::from_std(status?))
}

/// Apply argv, environment, working directory, and stderr disposition
fn base_command(invocation: &Invocation, program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(invocation.args());
    for (key, value) in invocation.env_overrides() {
        cmd.env(key, value);
    }
    if let Some(path) = invocation.build_path_env() {
        cmd.env("PATH", path);
    }
    if let Some(dir) = invocation.cwd() {
        cmd.current_dir(dir);
    }
    match invocation.stderr_mode() {
        StderrMode::Inherit => {
            cmd.stderr(Stdio::inherit());
        }
        StderrMode::Null | StderrMode::Discard => {
            cmd.stderr(Stdio::null());
        }
    }
    cmd
}

/// Map a launch error to the status contract, printing the diagnostic
/// unless the error stream is explicitly discarded
fn report_launch_failure(invocation: &Invocation, err: &io::Error) -> ExitStatus {
    let quiet = invocation.stderr_mode() == StderrMode::Discard;
    let program = invocation.program().unwrap_or("");
    if err.kind() == io::ErrorKind::NotFound {
        if !quiet {
            eprintln!("ladle: command not found: {program}");
        }
        ExitStatus::from_launch_failure(EXIT_COMMAND_NOT_FOUND)
    } else {
        if !quiet {
            eprintln!("ladle: exec failed: {program}");
        }
        ExitStatus::from_launch_failure(EXIT_EXEC_FAILED)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExitStatus, SpawnOutcome, run_attached, spawn_child};
    use crate::exec::invocation::{ExecConfig, Invocation, PipeMode, StderrMode};

    fn quiet(argv: &[&str]) -> Invocation {
        Invocation::with_config(
            argv.iter().copied(),
            &ExecConfig {
                inherit_stderr: false,
            },
        )
        .stderr(StderrMode::Discard)
    }

    #[test]
    fn test_spawn_empty_argv_is_an_error() {
        assert!(spawn_child(&quiet(&[]), PipeMode::Read).is_err());
    }

    #[test]
    fn test_spawn_missing_target_maps_to_127() {
        match spawn_child(&quiet(&["ladle-no-such-command"]), PipeMode::Read).unwrap() {
            SpawnOutcome::LaunchFailed(status) => {
                assert_eq!(status.code(), Some(127));
                assert!(!status.success());
            }
            SpawnOutcome::Spawned(_) => panic!("expected launch failure"),
        }
    }

    #[test]
    fn test_wait_reports_child_status() {
        let handle = match spawn_child(&quiet(&["sh", "-c", "exit 13"]), PipeMode::Read).unwrap() {
            SpawnOutcome::Spawned(handle) => handle,
            SpawnOutcome::LaunchFailed(status) => panic!("launch failed: {status}"),
        };
        let status = handle.wait().unwrap();
        assert_eq!(status.code(), Some(13));
        assert!(!status.success());
    }

    #[test]
    fn test_run_attached_passes_status_through() {
        let status = run_attached(&quiet(&["true"])).unwrap();
        assert!(status.success());

        let status = run_attached(&quiet(&["ladle-no-such-command"])).unwrap();
        assert_eq!(status.code(), Some(127));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExitStatus::from_launch_failure(127).to_string(), "127");
    }
}
