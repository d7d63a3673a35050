//! Ladle - pipe-attached subprocess execution utilities
//!
//! This crate launches external programs attached to the caller through a
//! single pipe, either passively capturing their output or interactively
//! exchanging bytes before capturing the remainder, and distinguishes
//! "launch failed" from "ran and exited non-zero" while propagating
//! captured output alongside failures. On top of the execution core it
//! carries an ordered, deduplicated search-path container and a small
//! service listing/cleanup command set.

// Enforce strict code quality and reliability
#![deny(
    // Safety: unsafe code is confined to the pipe primitives, which opt
    // back in explicitly
    unsafe_code,

    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,

    // All warnings must be fixed
    warnings,
)]
#![warn(
    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_enum_variant,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]

pub mod exceptions;
pub mod exec;
pub mod exit_codes;
pub mod logger;
pub mod services;
pub mod utils;
pub mod version;

use std::sync::atomic::AtomicU32;

// Re-export the execution API
pub use exceptions::{LadleError, Result};
pub use exec::{
    ExecConfig, ExecutionResult, ExitStatus, Invocation, PipeHandle, StderrMode, popen_read,
    popen_write, safe_popen_read, safe_popen_write,
};
pub use utils::SearchPath;

/// Pid of the child run by the CLI's spawn mode, for signal forwarding
///
/// Zero when no attached child is running. Library invocations never touch
/// this; each one owns its own child and pipe pair.
pub static CHILD_PID: AtomicU32 = AtomicU32::new(0);
