//! Raw file-descriptor helpers used by the tracked file handles

use libc::{c_void, fstat, off_t, pread};
use std::io;
use std::os::unix::io::RawFd;

/// Get the size of a file using its raw file descriptor
pub fn file_size_fd(fd: RawFd) -> io::Result<u64> {
    let mut stat_buf: libc::stat = unsafe { std::mem::zeroed() };

    let result = unsafe { fstat(fd, &mut stat_buf) };

    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(stat_buf.st_size as u64)
    }
}

/// Perform pread using raw file descriptor
///
/// Reads at `offset` without moving the descriptor's file position, so
/// several cursors can share one descriptor.
pub fn pread_fd(fd: RawFd, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    loop {
        let result = unsafe {
            pread(
                fd,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                offset as off_t,
            )
        };

        if result >= 0 {
            return Ok(result as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Ask the kernel to drop the cached pages of a file so the next read
/// starts cold.
///
/// Only Linux exposes `posix_fadvise`; elsewhere this is a no-op.
pub fn evict_page_cache(fd: RawFd) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        let ret = unsafe { libc::posix_fadvise(fd, 0, 0, libc::POSIX_FADV_DONTNEED) };
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }
        Ok(())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = fd;
        Ok(())
    }
}
