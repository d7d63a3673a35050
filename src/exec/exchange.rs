//! The Exchanger: capture-only and interactive pipe conversations
//!
//! [`popen_read`] passively captures a child's output to end-of-stream.
//! [`popen_write`] additionally hands the live pipe to a caller-supplied
//! callback for interactive writes before capturing the remainder. The
//! `safe_` variants inspect the exit status afterwards and raise a
//! structured error on failure; the plain variants leave status inspection
//! to the caller.

use log::trace;

use crate::exceptions::{LadleError, Result};
use crate::exec::invocation::{Invocation, PipeMode};
use crate::exec::pipe::PipeHandle;
use crate::exec::spawn::{ChildHandle, ExitStatus, SpawnOutcome, spawn_child};

/// Everything one invocation produced: the exit status and the captured
/// output, frozen once the child has been waited on
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    status: ExitStatus,
    stdout: Vec<u8>,
}

impl ExecutionResult {
    fn launch_failed(status: ExitStatus) -> Self {
        ExecutionResult {
            status,
            stdout: Vec::new(),
        }
    }

    /// The child's exit status
    pub fn status(&self) -> ExitStatus {
        self.status
    }

    /// Whether the child reported success
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The captured output bytes
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Take ownership of the captured output
    pub fn into_stdout(self) -> Vec<u8> {
        self.stdout
    }
}

/// Run the invocation and capture its output until end-of-stream
///
/// No interactive phase: the pipe is read to end-of-file, the child is
/// waited on, and the output comes back with the status. A launch failure
/// yields empty output with the mapped status (127 or 1).
pub fn popen_read(invocation: &Invocation) -> Result<ExecutionResult> {
    let mut handle = match spawn_child(invocation, PipeMode::Read)? {
        SpawnOutcome::Spawned(handle) => handle,
        SpawnOutcome::LaunchFailed(status) => return Ok(ExecutionResult::launch_failed(status)),
    };

    let mut output = Vec::new();
    handle.pipe_mut().read_to_end(&mut output)?;
    finish(handle, output)
}

/// Run the invocation, letting `with_pipe` write to the child before the
/// remaining output is captured
///
/// Sequence: drain whatever output is already available without blocking
/// (so a chatty child cannot stall on a full pipe before the caller starts
/// writing), invoke the callback with the live pipe, close the write side,
/// block until the pipe is readable again, then drain the remainder.
///
/// The callback runs as a single synchronous call with no concurrent
/// draining: writing more than the pipe's kernel buffer capacity without
/// the child also reading can deadlock both sides. That limit is not
/// resolved here.
pub fn popen_write<F>(invocation: &Invocation, with_pipe: F) -> Result<ExecutionResult>
where
    F: FnOnce(&mut PipeHandle) -> std::io::Result<()>,
{
    let mut handle = match spawn_child(invocation, PipeMode::ReadWrite)? {
        SpawnOutcome::Spawned(handle) => handle,
        SpawnOutcome::LaunchFailed(status) => return Ok(ExecutionResult::launch_failed(status)),
    };

    let mut output = Vec::new();
    handle.pipe_mut().drain_available(&mut output)?;
    trace!("pre-drain captured {} bytes", output.len());

    with_pipe(handle.pipe_mut())?;

    handle.pipe_mut().close_write();
    handle.pipe_mut().wait_readable()?;
    handle.pipe_mut().drain_to_end(&mut output)?;
    finish(handle, output)
}

/// [`popen_read`], raising on a non-success status
///
/// The error carries the invocation's argument vector, the status, and the
/// captured stdout bytes tagged as such.
pub fn safe_popen_read(invocation: &Invocation) -> Result<Vec<u8>> {
    ensure_success(invocation, popen_read(invocation)?)
}

/// [`popen_write`], raising on a non-success status
pub fn safe_popen_write<F>(invocation: &Invocation, with_pipe: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut PipeHandle) -> std::io::Result<()>,
{
    ensure_success(invocation, popen_write(invocation, with_pipe)?)
}

fn finish(handle: ChildHandle, output: Vec<u8>) -> Result<ExecutionResult> {
    let status = handle.wait()?;
    trace!("child exited with {status}, {} bytes captured", output.len());
    Ok(ExecutionResult {
        status,
        stdout: output,
    })
}

fn ensure_success(invocation: &Invocation, result: ExecutionResult) -> Result<Vec<u8>> {
    if result.success() {
        return Ok(result.into_stdout());
    }
    let status = result.status();
    Err(LadleError::ExecutionFailed {
        argv: invocation.argv().to_vec(),
        status,
        output: vec![("stdout".to_string(), result.into_stdout())],
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{popen_read, popen_write, safe_popen_read, safe_popen_write};
    use crate::exceptions::LadleError;
    use crate::exec::invocation::{ExecConfig, Invocation, StderrMode};
    use crate::exec::pipe::IO_CHUNK_SIZE;

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
    fn test_read_no_output_is_empty() {
        let result = popen_read(&quiet(&["true"])).unwrap();
        assert!(result.success());
        assert!(result.stdout().is_empty());
    }

    #[test]
    fn test_read_captures_output_exactly() {
        let result = popen_read(&quiet(&["echo", "hi"])).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout(), b"hi\n");
    }

    #[test]
    fn test_safe_read_returns_same_bytes_without_raising() {
        let output = safe_popen_read(&quiet(&["echo", "hi"])).unwrap();
        assert_eq!(output, b"hi\n");
    }

    #[test]
    fn test_plain_read_keeps_failure_status_and_output() {
        let result = popen_read(&quiet(&["sh", "-c", "printf boom; exit 3"])).unwrap();
        assert!(!result.success());
        assert_eq!(result.status().code(), Some(3));
        assert_eq!(result.stdout(), b"boom");
    }

    #[test]
    fn test_safe_read_raises_with_captured_output() {
        let invocation = quiet(&["sh", "-c", "printf boom; exit 3"]);
        let plain = popen_read(&invocation).unwrap();
        match safe_popen_read(&invocation) {
            Err(LadleError::ExecutionFailed {
                argv,
                status,
                output,
            }) => {
                assert_eq!(argv, invocation.argv());
                assert_eq!(status.code(), Some(3));
                assert_eq!(output, vec![("stdout".to_string(), plain.into_stdout())]);
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_exchange_echoes_payload() {
        let output = safe_popen_write(&quiet(&["cat"]), |pipe| {
            pipe.write_all(b"hello pipe\n")
        })
        .unwrap();
        assert_eq!(output, b"hello pipe\n");
    }

    #[test]
    fn test_exchange_payload_larger_than_one_chunk() {
        let payload = vec![b'x'; IO_CHUNK_SIZE * 3 + 17];
        let expected = payload.clone();
        let output =
            safe_popen_write(&quiet(&["cat"]), move |pipe| pipe.write_all(&payload)).unwrap();
        assert_eq!(output, expected);
    }

    #[test]
    fn test_exchange_captures_output_written_before_input() {
        let output = safe_popen_write(&quiet(&["sh", "-c", "echo ready; cat"]), |pipe| {
            pipe.write_all(b"more\n")
        })
        .unwrap();
        assert_eq!(output, b"ready\nmore\n");
    }

    #[test]
    fn test_exchange_with_no_writes() {
        let output = safe_popen_write(&quiet(&["echo", "quiet"]), |_pipe| Ok(())).unwrap();
        assert_eq!(output, b"quiet\n");
    }

    #[test]
    fn test_callback_may_close_write_side_itself() {
        let output = safe_popen_write(&quiet(&["cat"]), |pipe| {
            pipe.write_all(b"once")?;
            pipe.close_write();
            assert!(!pipe.write_side_open());
            // Writing after close reports a closed pipe instead of blocking.
            assert!(pipe.write_all(b"again").is_err());
            Ok(())
        })
        .unwrap();
        assert_eq!(output, b"once");
    }

    #[test]
    fn test_missing_command_reads_as_status_127() {
        let result = popen_read(&quiet(&["ladle-no-such-command"])).unwrap();
        assert_eq!(result.status().code(), Some(127));
        assert!(result.stdout().is_empty());
    }

    #[test]
    fn test_missing_command_raises_status_127_in_safe_mode() {
        match safe_popen_read(&quiet(&["ladle-no-such-command"])) {
            Err(LadleError::ExecutionFailed { status, .. }) => {
                assert_eq!(status.code(), Some(127));
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_command_in_exchange_mode() {
        let result = popen_write(&quiet(&["ladle-no-such-command"]), |_pipe| Ok(())).unwrap();
        assert_eq!(result.status().code(), Some(127));
    }

    #[test]
    fn test_sequential_invocations_do_not_share_buffers() {
        let invocation = quiet(&["echo", "hi"]);
        let first = popen_read(&invocation).unwrap();
        let second = popen_read(&invocation).unwrap();
        assert_eq!(first.stdout(), b"hi\n");
        assert_eq!(second.stdout(), b"hi\n");
    }

    #[test]
    fn test_callback_error_propagates() {
        let result = popen_write(&quiet(&["cat"]), |_pipe| {
            Err(std::io::Error::other("caller gave up"))
        });
        assert!(result.is_err());
    }
}
