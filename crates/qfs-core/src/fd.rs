//! Raw file-descriptor syscall wrappers for the operations layer.
//!
//! Open handles are opaque kernel integers. Whoever obtains a handle from
//! `open`/`create` owns it and is responsible for the matching `release`.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;

use crate::error::{FsError, Result};

fn cpath(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| FsError::Io(io::Error::from_raw_os_error(libc::EINVAL)))
}

fn last_error() -> FsError {
    FsError::Io(io::Error::last_os_error())
}

fn check(code: libc::c_int) -> Result<()> {
    if code < 0 {
        Err(last_error())
    } else {
        Ok(())
    }
}

pub(crate) fn open(path: &Path, flags: i32, mode: u32) -> Result<RawFd> {
    let path = cpath(path)?;
    let fd = unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
    if fd < 0 {
        return Err(last_error());
    }
    Ok(fd)
}

pub(crate) fn close(fd: RawFd) -> Result<()> {
    check(unsafe { libc::close(fd) })
}

fn seek(fd: RawFd, offset: i64) -> Result<()> {
    let position = unsafe { libc::lseek(fd, offset as libc::off_t, libc::SEEK_SET) };
    if position < 0 {
        return Err(last_error());
    }
    Ok(())
}

/// Seek to `offset` and read up to `size` bytes.
pub(crate) fn seek_read(fd: RawFd, offset: i64, size: usize) -> Result<Vec<u8>> {
    seek(fd, offset)?;

    let mut buffer = vec![0u8; size];
    let count = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut libc::c_void, size) };
    if count < 0 {
        return Err(last_error());
    }

    buffer.truncate(count as usize);
    Ok(buffer)
}

/// Seek to `offset` and write `data`, returning the number of bytes written.
pub(crate) fn seek_write(fd: RawFd, offset: i64, data: &[u8]) -> Result<usize> {
    seek(fd, offset)?;

    let count = unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
    if count < 0 {
        return Err(last_error());
    }

    Ok(count as usize)
}

pub(crate) fn truncate(fd: RawFd, length: i64) -> Result<()> {
    check(unsafe { libc::ftruncate(fd, length as libc::off_t) })
}

pub(crate) fn fsync(fd: RawFd) -> Result<()> {
    check(unsafe { libc::fsync(fd) })
}

#[cfg(target_os = "linux")]
pub(crate) fn fdatasync(fd: RawFd) -> Result<()> {
    check(unsafe { libc::fdatasync(fd) })
}

/// Host access check; any denial is reported as the raw errno.
pub(crate) fn access(path: &Path, amode: i32) -> Result<()> {
    let path = cpath(path)?;
    check(unsafe { libc::access(path.as_ptr(), amode) })
}

pub(crate) fn statvfs(path: &Path) -> Result<libc::statvfs> {
    let path = cpath(path)?;
    let mut out = std::mem::MaybeUninit::<libc::statvfs>::zeroed();
    let code = unsafe { libc::statvfs(path.as_ptr(), out.as_mut_ptr()) };
    if code != 0 {
        return Err(last_error());
    }

    Ok(unsafe { out.assume_init() })
}
