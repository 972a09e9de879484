//! Child-to-parent "change directory" channel.
//!
//! A child process cannot move its parent's working directory. Programs that
//! want to (a bookmark jumper, say) write a path to the descriptor named by
//! `SEASHELL_REPORT_FD`; once the pipeline is done the shell reads it and
//! changes directory itself.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use log::debug;
use nix::errno::Errno;
use nix::unistd::pipe;

use crate::error::Result;

pub const REPORT_FD_ENV: &str = "SEASHELL_REPORT_FD";

/// Longest message read; anything past it is ignored.
pub const MAX_MESSAGE: usize = 4096;

pub struct ReportChannel {
    reader: File,
    writer: Option<OwnedFd>,
}

impl ReportChannel {
    pub fn open() -> Result<Self> {
        let (reader, writer) = pipe()?;
        // the reader stays in the shell; children only inherit the writer
        set_flags(reader.as_raw_fd())?;
        Ok(Self {
            reader: File::from(reader),
            writer: Some(writer),
        })
    }

    /// Descriptor number handed to children, if the write end is still open.
    pub fn writer_fd(&self) -> Option<RawFd> {
        self.writer.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn close_writer(&mut self) {
        self.writer = None;
    }

    /// Read the message, if any. Never blocks: a descendant still holding
    /// the write end just means nothing was reported.
    pub fn receive(mut self) -> Option<PathBuf> {
        self.close_writer();
        let mut message = Vec::new();
        match (&self.reader).take(MAX_MESSAGE as u64).read_to_end(&mut message) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                debug!("report channel read failed: {}", e);
                return None;
            }
        }
        decode(&message)
    }
}

fn set_flags(fd: RawFd) -> Result<()> {
    // SAFETY: plain fcntl calls on a descriptor we own
    unsafe {
        let flags = Errno::result(libc::fcntl(fd, libc::F_GETFL))?;
        Errno::result(libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))?;
        Errno::result(libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
    }
    Ok(())
}

fn decode(message: &[u8]) -> Option<PathBuf> {
    let end = message
        .iter()
        .rposition(|b| !matches!(b, b'\0' | b'\n' | b'\r' | b' ' | b'\t'))?;
    let path = PathBuf::from(OsStr::from_bytes(&message[..=end]));
    debug!("report channel message: {}", path.display());
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode() {
        assert_eq!(decode(b""), None);
        assert_eq!(decode(b"\n\0\0"), None);
        assert_eq!(decode(b"/tmp/work\n"), Some(PathBuf::from("/tmp/work")));
        assert_eq!(decode(b"/a b/c\0\0\0"), Some(PathBuf::from("/a b/c")));
    }

    #[test]
    fn test_receive_written_message() {
        let mut channel = ReportChannel::open().unwrap();
        let writer = channel.writer.take().unwrap();
        let mut writer = File::from(writer);
        writer.write_all(b"/srv/data\n").unwrap();
        drop(writer);
        assert_eq!(channel.receive(), Some(PathBuf::from("/srv/data")));
    }

    #[test]
    fn test_receive_nothing() {
        let channel = ReportChannel::open().unwrap();
        assert!(channel.writer_fd().is_some());
        assert_eq!(channel.receive(), None);
    }

    #[test]
    fn test_receive_does_not_block_on_open_writer() {
        let mut channel = ReportChannel::open().unwrap();
        // a second holder of the write end keeps the pipe open
        let extra = channel.writer.as_ref().unwrap().try_clone().unwrap();
        channel.close_writer();
        assert_eq!(channel.receive(), None);
        drop(extra);
    }
}
