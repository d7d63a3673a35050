//! Parent-side handle to the byte channel shared with a child
//!
//! This module uses unsafe code for `fcntl(2)` and `poll(2)` on the raw pipe
//! descriptors; everything else goes through `std::process` handles.
#![allow(unsafe_code)]

use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::process::{ChildStdin, ChildStdout};

/// Chunk size for non-blocking reads
///
/// A tuning constant, not a guarantee to callers.
pub const IO_CHUNK_SIZE: usize = 4096;

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn poll_readable(fd: RawFd) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    loop {
        let rc = unsafe { libc::poll(&mut fds, 1, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(());
    }
}

/// One bidirectional byte channel connecting parent and child
///
/// Owns the parent ends after spawn: the child's stdout as the read side
/// and, in read-write mode, the child's stdin as the write side. The write
/// side is closed at most once; the `Option` enforces it. Implements
/// [`std::io::Write`] so interactive callbacks can feed the child directly.
#[derive(Debug)]
pub struct PipeHandle {
    reader: ChildStdout,
    writer: Option<ChildStdin>,
}

impl PipeHandle {
    /// Read-only handle; the descriptor stays blocking
    pub(crate) fn new_read(reader: ChildStdout) -> Self {
        PipeHandle {
            reader,
            writer: None,
        }
    }

    /// Read-write handle; the read side is switched to non-blocking so the
    /// pre-drain loop can never stall
    pub(crate) fn new_read_write(reader: ChildStdout, writer: ChildStdin) -> io::Result<Self> {
        set_nonblocking(reader.as_raw_fd())?;
        Ok(PipeHandle {
            reader,
            writer: Some(writer),
        })
    }

    /// Append whatever the child has already produced, without blocking
    ///
    /// Reads [`IO_CHUNK_SIZE`] bytes at a time until a read would block or
    /// the stream ends. Returns `true` on end-of-file; would-block is
    /// control flow, not a failure.
    pub(crate) fn drain_available(&mut self, out: &mut Vec<u8>) -> io::Result<bool> {
        let mut buf = [0u8; IO_CHUNK_SIZE];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(true),
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the write side, signalling end-of-input to the child
    ///
    /// Safe to call when the side is already closed or was never open; the
    /// descriptor itself is closed exactly once.
    pub fn close_write(&mut self) {
        self.writer.take();
    }

    /// Whether the write side is still open
    pub fn write_side_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Block until the read side is reported readable (or at end-of-file)
    pub(crate) fn wait_readable(&self) -> io::Result<()> {
        poll_readable(self.reader.as_raw_fd())
    }

    /// Drain the remaining output to end-of-stream, blocking via `poll(2)`
    /// whenever no bytes are ready
    pub(crate) fn drain_to_end(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        loop {
            if self.drain_available(out)? {
                return Ok(());
            }
            self.wait_readable()?;
        }
    }

    /// Blocking read of the whole stream, for read-only mode
    pub(crate) fn read_to_end(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        self.reader.read_to_end(out)
    }
}

impl Write for PipeHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "pipe write side is closed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
