//! Stage input streams.

use std::io::{self, Read};

use crate::ports::StageInput;

/// The process's standard input.
///
/// `close` closes the underlying descriptor; any later read or close reports
/// the stream as closed.
pub struct StdinInput {
    handle: Option<io::Stdin>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            handle: Some(io::stdin()),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

impl StageInput for StdinInput {
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let handle = self.handle.as_ref().ok_or_else(closed_error)?;
        let mut buf = Vec::new();
        handle.lock().read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        let handle = self.handle.take().ok_or_else(closed_error)?;
        close_stdin(&handle)
    }
}

#[cfg(unix)]
fn close_stdin(handle: &io::Stdin) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    close_fd(handle.as_raw_fd())
}

#[cfg(not(unix))]
fn close_stdin(_handle: &io::Stdin) -> io::Result<()> {
    Ok(())
}

/// Closes a raw descriptor, surfacing the errno as an `io::Error`.
#[cfg(unix)]
fn close_fd(fd: std::os::fd::RawFd) -> io::Result<()> {
    nix::unistd::close(fd).map_err(io::Error::from)
}

/// An in-memory input, for feeding a stage from a buffer.
pub struct MemoryInput {
    data: Option<Vec<u8>>,
    closed: bool,
}

impl MemoryInput {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StageInput for MemoryInput {
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(self.data.take().unwrap_or_default())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.closed = true;
        Ok(())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "input already closed")
}
