//! Standard exit codes for ladle binaries
//!
//! The launch-failure codes are part of the execution contract: a child role
//! that cannot replace its process image terminates with one of these, and
//! the library maps spawn failures to the same values.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Process-image replacement failed for a reason other than a missing target
/// (permissions, resource limits, ...)
pub const EXIT_EXEC_FAILED: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Service listing or cleanup error
pub const EXIT_SERVICE_ERROR: i32 = 108;

/// Target executable was not found on the search path
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;
