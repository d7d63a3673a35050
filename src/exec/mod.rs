//! Pipe-attached process execution
//!
//! This module owns the whole lifecycle of one external command: describing
//! it ([`invocation`]), creating the child and its pipe ([`spawn`]), and
//! carrying the byte conversation through to a status ([`exchange`]).
//!
//! - [`invocation`] holds the immutable command description and the
//!   call-boundary configuration.
//! - [`pipe`] owns the parent's ends of the channel and the non-blocking
//!   drain primitives.
//! - [`spawn`] is the Invoker: parent-side spawn, the child-entry exec
//!   path, and the launch-failure status mapping.
//! - [`exchange`] is the Exchanger: capture-only and interactive modes plus
//!   the safe variants that raise on failure.

pub mod exchange;
pub mod invocation;
pub mod pipe;
pub mod spawn;

pub use exchange::{ExecutionResult, popen_read, popen_write, safe_popen_read, safe_popen_write};
pub use invocation::{ExecConfig, Invocation, PipeMode, StderrMode};
pub use pipe::{IO_CHUNK_SIZE, PipeHandle};
pub use spawn::{ChildHandle, ExitStatus, SpawnOutcome, exec_replace, run_attached, spawn_child};
