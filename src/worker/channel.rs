//! Output channel separation.
//!
//! A worker's original stdout is the result channel: exactly one outcome
//! line per job, nothing else. Model libraries and numeric kernels print
//! banners to stdout without asking, so before any of them initialize, the
//! guard duplicates fd 1 into a private descriptor and rebinds fd 1 to
//! stderr. From then on every stray `println!`/`printf` in the process lands
//! on the diagnostic channel, and only the holder of the [`ResultChannel`]
//! can reach the protocol consumer.

use std::fs::File;
use std::io::{self, Write};

use crate::log_warn;

/// Write half of the protocol: the stream outcome lines go to.
#[derive(Debug)]
pub enum ResultChannel {
    /// Duplicated original stdout. Stray stdout writes cannot reach it.
    Guarded(File),
    /// Degraded mode: plain stdout, no corruption guarantee.
    Passthrough(io::Stdout),
}

impl Write for ResultChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ResultChannel::Guarded(file) => file.write(buf),
            ResultChannel::Passthrough(stdout) => stdout.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ResultChannel::Guarded(file) => file.flush(),
            ResultChannel::Passthrough(stdout) => stdout.flush(),
        }
    }
}

impl ResultChannel {
    pub fn is_guarded(&self) -> bool {
        matches!(self, ResultChannel::Guarded(_))
    }
}

/// One-shot stdout guard. Install before loading any engine.
#[derive(Debug)]
pub struct ChannelGuard {
    result: ResultChannel,
}

impl ChannelGuard {
    /// Snapshot the real stdout and rebind fd 1 to stderr. If the platform
    /// refuses the descriptor shuffle the guard degrades to plain stdout
    /// and the process keeps running without the separation guarantee.
    pub fn install() -> Self {
        match redirect_stdout() {
            Some(file) => ChannelGuard {
                result: ResultChannel::Guarded(file),
            },
            None => {
                log_warn!(
                    "stdout guard unavailable; library output may corrupt the result channel"
                );
                ChannelGuard {
                    result: ResultChannel::Passthrough(io::stdout()),
                }
            }
        }
    }

    pub fn into_result_channel(self) -> ResultChannel {
        self.result
    }
}

#[cfg(unix)]
fn redirect_stdout() -> Option<File> {
    use std::os::fd::FromRawFd;

    // SAFETY: fds 1 and 2 belong to this process; the duplicated fd is owned
    // by exactly one File for the rest of the process lifetime.
    unsafe {
        let saved = libc::dup(1);
        if saved < 0 {
            return None;
        }
        if libc::dup2(2, 1) < 0 {
            libc::close(saved);
            return None;
        }
        Some(File::from_raw_fd(saved))
    }
}

#[cfg(windows)]
fn redirect_stdout() -> Option<File> {
    use std::os::windows::io::{FromRawHandle, RawHandle};

    extern "C" {
        fn _dup(fd: i32) -> i32;
        fn _dup2(fd1: i32, fd2: i32) -> i32;
        fn _close(fd: i32) -> i32;
        fn _get_osfhandle(fd: i32) -> isize;
    }

    // SAFETY: same contract as the Unix path, through the CRT descriptor
    // table. The CRT fd stays open so the OS handle remains valid.
    unsafe {
        let saved = _dup(1);
        if saved < 0 {
            return None;
        }
        if _dup2(2, 1) < 0 {
            _close(saved);
            return None;
        }
        let handle = _get_osfhandle(saved);
        if handle == -1 || handle == -2 {
            return None;
        }
        Some(File::from_raw_handle(handle as RawHandle))
    }
}

#[cfg(not(any(unix, windows)))]
fn redirect_stdout() -> Option<File> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // install() is exercised end to end by the integration tests, which
    // spawn real worker binaries and assert their stdout stays clean.
    // Swapping fd 1 inside the test harness would eat the harness's own
    // output, so only the channel plumbing is covered here.

    #[test]
    fn test_passthrough_write() {
        let mut channel = ResultChannel::Passthrough(io::stdout());
        assert!(!channel.is_guarded());
        channel.flush().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_guarded_write_goes_to_wrapped_fd() {
        use std::io::Read;
        use std::os::fd::FromRawFd;

        let mut fds = [0i32; 2];
        // SAFETY: plain pipe; each end is wrapped in exactly one File.
        let (read_fd, write_fd) = unsafe {
            assert_eq!(libc::pipe(fds.as_mut_ptr()), 0);
            (fds[0], fds[1])
        };

        let file = unsafe { File::from_raw_fd(write_fd) };
        let mut channel = ResultChannel::Guarded(file);
        assert!(channel.is_guarded());
        channel.write_all(b"result line\n").unwrap();
        channel.flush().unwrap();
        drop(channel);

        let mut reader = unsafe { File::from_raw_fd(read_fd) };
        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "result line\n");
    }
}
