//! Read strategies for the merged output pipe.
//!
//! A session picks one strategy when it starts and keeps it for its lifetime:
//!
//! - [`BlockingStream`]: a plain blocking `read`. End of stream triggers a
//!   liveness probe.
//! - [`PollSeek`]: asks the OS how many bytes are waiting in the pipe, reads
//!   exactly that many, and probes liveness on every iteration. Used where a
//!   blocking read on a console pipe cannot be relied upon to return.

use std::io::{self, PipeReader, Read};
use std::time::Duration;

/// Upper bound for one blocking read
pub const READ_CHUNK_SIZE: usize = 4096;

/// How a session reads its output pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    BlockingStream,
    PollSeek,
}

impl IoMode {
    /// Host default: poll-seek on Windows, blocking reads elsewhere
    pub fn detect() -> Self {
        if cfg!(windows) {
            IoMode::PollSeek
        } else {
            IoMode::BlockingStream
        }
    }

    /// Whether a terminate must be followed by a blocking wait before the
    /// session can be considered gone.
    pub fn requires_wait_after_terminate(self) -> bool {
        self == IoMode::PollSeek
    }

    /// Build the reader for a freshly spawned session
    pub fn strategy(self, reader: PipeReader, idle_delay: Duration) -> Box<dyn ReadStrategy> {
        match self {
            IoMode::BlockingStream => Box::new(BlockingStream::new(reader, idle_delay)),
            IoMode::PollSeek => Box::new(PollSeek::new(reader, idle_delay)),
        }
    }
}

impl std::fmt::Display for IoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoMode::BlockingStream => f.write_str("blocking-stream"),
            IoMode::PollSeek => f.write_str("poll-seek"),
        }
    }
}

/// When the reader loop checks whether the process is still alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePolicy {
    /// Only after a read returned nothing
    OnEmptyRead,
    /// After every read, including ones that returned data
    EveryIteration,
}

/// One way of pulling bytes out of the output pipe
pub trait ReadStrategy: Send {
    /// Append available output to `buf`, returning how many bytes were added.
    ///
    /// `Ok(0)` means nothing was read: end of stream for a blocking read, an
    /// empty pipe for a poll.
    fn read_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    fn probe_policy(&self) -> ProbePolicy;

    /// Pause between reads that produced nothing
    fn idle_delay(&self) -> Duration;
}

/// Blocking reads of up to [`READ_CHUNK_SIZE`] bytes
pub struct BlockingStream {
    reader: PipeReader,
    idle_delay: Duration,
}

impl BlockingStream {
    pub fn new(reader: PipeReader, idle_delay: Duration) -> Self {
        Self { reader, idle_delay }
    }
}

impl ReadStrategy for BlockingStream {
    fn read_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let n = self.reader.read(&mut chunk)?;
        buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn probe_policy(&self) -> ProbePolicy {
        ProbePolicy::OnEmptyRead
    }

    fn idle_delay(&self) -> Duration {
        self.idle_delay
    }
}

/// Reads exactly the bytes the pipe reports as pending
pub struct PollSeek {
    reader: PipeReader,
    idle_delay: Duration,
}

impl PollSeek {
    pub fn new(reader: PipeReader, idle_delay: Duration) -> Self {
        Self { reader, idle_delay }
    }
}

impl ReadStrategy for PollSeek {
    fn read_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let pending = pending_bytes(&self.reader)?;
        if pending == 0 {
            return Ok(0);
        }
        (&mut self.reader).take(pending as u64).read_to_end(buf)
    }

    fn probe_policy(&self) -> ProbePolicy {
        ProbePolicy::EveryIteration
    }

    fn idle_delay(&self) -> Duration {
        self.idle_delay
    }
}

/// Number of bytes that can be read from the pipe without blocking
#[cfg(unix)]
fn pending_bytes(reader: &PipeReader) -> io::Result<usize> {
    use std::os::fd::AsRawFd;

    let mut available: libc::c_int = 0;
    // SAFETY: FIONREAD writes a single c_int through the pointer, which stays
    // valid for the duration of the call.
    let rc = unsafe {
        libc::ioctl(
            reader.as_raw_fd(),
            libc::FIONREAD,
            &mut available as *mut libc::c_int,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(available.max(0) as usize)
}

#[cfg(windows)]
fn pending_bytes(reader: &PipeReader) -> io::Result<usize> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::System::Pipes::PeekNamedPipe;

    let mut available: u32 = 0;
    // SAFETY: the handle is owned by `reader` and outlives the call; null
    // buffer pointers are permitted when only the byte count is requested.
    let ok = unsafe {
        PeekNamedPipe(
            reader.as_raw_handle(),
            std::ptr::null_mut(),
            0,
            std::ptr::null_mut(),
            &mut available,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(available as usize)
}
