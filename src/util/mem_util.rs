//! Safe access to user memory from kernel code.
//!
//! All accessors translate through the page directory active on the calling
//! thread, so a kernel path touching user memory sees the address space of
//! the process it runs on behalf of. Any invalid access surfaces as
//! `EFAULT`; the syscall layer escalates that to process termination.

use crate::prelude::*;
use crate::vm::{page_dir, PAGE_SIZE};

fn active_dir() -> Result<crate::vm::PageDirRef> {
    page_dir::active().ok_or_else(|| errno!(EFAULT, "no user address space is active"))
}

pub fn copy_from_user(uaddr: u32, buf: &mut [u8]) -> Result<()> {
    active_dir()?.read_user(uaddr, buf)
}

pub fn copy_to_user(uaddr: u32, buf: &[u8]) -> Result<()> {
    active_dir()?.write_user(uaddr, buf)
}

pub fn copy_u32_from_user(uaddr: u32) -> Result<u32> {
    let mut word = [0u8; 4];
    copy_from_user(uaddr, &mut word)?;
    Ok(u32::from_le_bytes(word))
}

pub fn copy_u32_to_user(uaddr: u32, val: u32) -> Result<()> {
    copy_to_user(uaddr, &val.to_le_bytes())
}

pub fn copy_byte_from_user(uaddr: u32) -> Result<u8> {
    let mut byte = [0u8; 1];
    copy_from_user(uaddr, &mut byte)?;
    Ok(byte[0])
}

pub fn copy_byte_to_user(uaddr: u32, byte: u8) -> Result<()> {
    copy_to_user(uaddr, &[byte])
}

/// Copies a NUL-terminated string out of user memory, one byte at a time.
/// Strings longer than a page are truncated at `PAGE_SIZE` bytes.
pub fn copy_cstring_from_user(uaddr: u32) -> Result<String> {
    let dir = active_dir()?;
    let mut bytes = Vec::new();
    for i in 0..PAGE_SIZE {
        let mut byte = [0u8; 1];
        dir.read_user(uaddr + i, &mut byte)?;
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }
    String::from_utf8(bytes).map_err(|_| errno!(EINVAL, "user string is not UTF-8"))
}
