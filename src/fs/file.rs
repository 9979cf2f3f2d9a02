//! Open-file handles.
//!
//! A `File` pairs an inode with a seek position. Handles are independent:
//! two opens of the same name read and write the same bytes through
//! separate positions. A handle that has denied writes re-allows them when
//! it is closed (dropped).

use std::sync::Mutex;

use crate::fs::ramfs::InodeRef;
use crate::prelude::*;

pub type FileRef = Arc<File>;

#[derive(Debug)]
pub struct File {
    inode: InodeRef,
    pos: Mutex<usize>,
    denies_write: AtomicBool,
}

impl File {
    pub(super) fn new(inode: InodeRef) -> Self {
        Self {
            inode,
            pos: Mutex::new(0),
            denies_write: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.inode.len()
    }

    pub fn tell(&self) -> usize {
        *self.pos.lock().unwrap()
    }

    /// Positions past EOF are legal; reads there return 0 bytes and writes
    /// extend the file with a zero gap.
    pub fn seek(&self, pos: usize) {
        *self.pos.lock().unwrap() = pos;
    }

    /// Reads up to `buf.len()` bytes at the current position.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut pos = self.pos.lock().unwrap();
        let n = self.read_at(*pos, buf)?;
        *pos += n;
        Ok(n)
    }

    /// Reads at an explicit offset without moving the position.
    pub fn read_at(&self, ofs: usize, buf: &mut [u8]) -> Result<usize> {
        let data = self.inode.data.read().unwrap();
        if ofs >= data.len() {
            return Ok(0);
        }
        let n = min(buf.len(), data.len() - ofs);
        buf[..n].copy_from_slice(&data[ofs..ofs + n]);
        Ok(n)
    }

    /// Writes at the current position. Returns the number of bytes written,
    /// which is 0 while writes to the inode are denied.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.inode.deny_write_cnt.load(Ordering::Acquire) > 0 {
            return Ok(0);
        }
        let mut pos = self.pos.lock().unwrap();
        let mut data = self.inode.data.write().unwrap();
        let end = *pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[*pos..end].copy_from_slice(buf);
        *pos = end;
        Ok(buf.len())
    }

    /// Refuses writes to the underlying inode until this handle closes or
    /// calls [`File::allow_write`]. Held open for an executable's lifetime.
    pub fn deny_write(&self) {
        if !self.denies_write.swap(true, Ordering::AcqRel) {
            self.inode.deny_write_cnt.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn allow_write(&self) {
        if self.denies_write.swap(false, Ordering::AcqRel) {
            self.inode.deny_write_cnt.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn inode(&self) -> &InodeRef {
        &self.inode
    }
}

impl Drop for File {
    fn drop(&mut self) {
        self.allow_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ramfs;

    #[test]
    fn independent_positions() {
        ramfs::create_with_data("file-pos", b"abcdef").unwrap();
        let a = ramfs::open("file-pos").unwrap();
        let b = ramfs::open("file-pos").unwrap();
        let mut buf = [0u8; 3];
        a.read(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        b.read(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        assert_eq!(a.tell(), 3);
    }

    #[test]
    fn deny_write_round_trip() {
        ramfs::create_with_data("file-deny", b"xyz").unwrap();
        let exe = ramfs::open("file-deny").unwrap();
        exe.deny_write();
        let writer = ramfs::open("file-deny").unwrap();
        assert_eq!(writer.write(b"!!!").unwrap(), 0);
        drop(exe);
        assert_eq!(writer.write(b"!!!").unwrap(), 3);
        let mut buf = [0u8; 3];
        writer.seek(0);
        writer.read(&mut buf).unwrap();
        assert_eq!(&buf, b"!!!");
    }

    #[test]
    fn write_past_eof_zero_fills() {
        ramfs::create_with_data("file-gap", b"").unwrap();
        let f = ramfs::open("file-gap").unwrap();
        f.seek(4);
        f.write(b"zz").unwrap();
        assert_eq!(f.len(), 6);
        let mut buf = [0xaau8; 6];
        f.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"\0\0\0\0zz");
    }
}
