//! File-related system call implementations.
//!
//! User buffers are processed a page at a time, so a buffer spanning
//! valid and invalid pages performs the valid prefix of the transfer
//! before the fault terminates the process.

use crate::fs::{console, fs_lock, ramfs, FileDesc, FileRef, STDIN_FILENO, STDOUT_FILENO};
use crate::prelude::*;
use crate::util::mem_util::{copy_byte_to_user, copy_from_user, copy_to_user};
use crate::vm::{pg_ofs, PAGE_SIZE};

/// Resolves `handle` in the current process's descriptor table.
///
/// The `EBADF` this produces is fatal to the process once it reaches the
/// dispatch layer.
fn lookup_fd(handle: FileDesc) -> Result<FileRef> {
    let process = current!().process();
    let files = process.files().lock().unwrap();
    files.get(handle)
}

pub fn do_create(path: &str, initial_size: usize) -> Result<bool> {
    let _guard = fs_lock();
    Ok(ramfs::create(path, initial_size).is_ok())
}

pub fn do_remove(path: &str) -> Result<bool> {
    let _guard = fs_lock();
    Ok(ramfs::remove(path).is_ok())
}

pub fn do_open(path: &str) -> Result<i32> {
    let _guard = fs_lock();
    let file = match ramfs::open(path) {
        Ok(file) => file,
        Err(_) => return Ok(-1),
    };
    let process = current!().process();
    let handle = process.files().lock().unwrap().put(file);
    Ok(handle)
}

pub fn do_filesize(handle: FileDesc) -> Result<i32> {
    let file = lookup_fd(handle)?;
    let _guard = fs_lock();
    Ok(file.len() as i32)
}

pub fn do_read(handle: FileDesc, buf: u32, size: u32) -> Result<i32> {
    // Keyboard reads bypass the file system, one byte at a time.
    if handle == STDIN_FILENO {
        for i in 0..size {
            let byte = console::getc();
            copy_byte_to_user(buf + i, byte)?;
        }
        return Ok(size as i32);
    }

    let file = lookup_fd(handle)?;
    let _guard = fs_lock();
    let mut bytes_read: i32 = 0;
    let mut udst = buf;
    let mut left = size;
    while left > 0 {
        let page_left = PAGE_SIZE - pg_ofs(udst);
        let read_amt = min(left, page_left) as usize;

        let mut chunk = vec![0u8; read_amt];
        let n = file.read(&mut chunk)?;
        copy_to_user(udst, &chunk[..n])?;
        bytes_read += n as i32;

        // A short read means end of file.
        if n < read_amt {
            break;
        }
        udst += n as u32;
        left -= n as u32;
    }
    Ok(bytes_read)
}

pub fn do_write(handle: FileDesc, buf: u32, size: u32) -> Result<i32> {
    let file = if handle == STDOUT_FILENO {
        None
    } else {
        Some(lookup_fd(handle)?)
    };

    let _guard = fs_lock();
    let mut bytes_written: i32 = 0;
    let mut usrc = buf;
    let mut left = size;
    while left > 0 {
        let page_left = PAGE_SIZE - pg_ofs(usrc);
        let write_amt = min(left, page_left) as usize;

        let mut chunk = vec![0u8; write_amt];
        copy_from_user(usrc, &mut chunk)?;
        let n = match &file {
            None => {
                console::putbuf(&chunk);
                write_amt
            }
            Some(file) => file.write(&chunk)?,
        };
        bytes_written += n as i32;

        // A short write means the device is full (or writes are denied).
        if n < write_amt {
            break;
        }
        usrc += n as u32;
        left -= n as u32;
    }
    Ok(bytes_written)
}

pub fn do_seek(handle: FileDesc, position: u32) -> Result<i32> {
    let file = lookup_fd(handle)?;
    let _guard = fs_lock();
    file.seek(position as usize);
    Ok(0)
}

pub fn do_tell(handle: FileDesc) -> Result<i32> {
    let file = lookup_fd(handle)?;
    let _guard = fs_lock();
    Ok(file.tell() as i32)
}

pub fn do_close(handle: FileDesc) -> Result<i32> {
    let file = {
        let process = current!().process();
        let mut files = process.files().lock().unwrap();
        files.del(handle)?
    };
    crate::fs::safe_file_close(file);
    Ok(0)
}
