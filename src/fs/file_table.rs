//! The per-process file-descriptor table.
//!
//! Handles are small integers minted from a monotonically increasing
//! counter that starts at 2; 0 and 1 are the console and never appear in
//! the table. A handle is never reused within one process lifetime.

use crate::prelude::*;

pub type FileDesc = i32;

/// First handle value ever issued; 0 and 1 are reserved for the console.
const FIRST_HANDLE: FileDesc = 2;

#[derive(Debug)]
struct FileTableEntry {
    handle: FileDesc,
    file: FileRef,
}

#[derive(Debug)]
pub struct FileTable {
    entries: Vec<FileTableEntry>,
    next_handle: FileDesc,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    /// Binds `file` to a fresh handle.
    pub fn put(&mut self, file: FileRef) -> FileDesc {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entries.push(FileTableEntry { handle, file });
        handle
    }

    pub fn get(&self, handle: FileDesc) -> Result<FileRef> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.file.clone())
            .ok_or_else(|| errno!(EBADF, "no open file for handle"))
    }

    pub fn del(&mut self, handle: FileDesc) -> Result<FileRef> {
        let i = self
            .entries
            .iter()
            .position(|entry| entry.handle == handle)
            .ok_or_else(|| errno!(EBADF, "no open file for handle"))?;
        Ok(self.entries.swap_remove(i).file)
    }

    /// Handles currently open, unordered.
    pub fn handles(&self) -> Vec<FileDesc> {
        self.entries.iter().map(|entry| entry.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ramfs;

    #[test]
    fn handles_count_up_from_two() {
        ramfs::create_with_data("ftab-a", b"").unwrap();
        let mut table = FileTable::new();
        let h1 = table.put(ramfs::open("ftab-a").unwrap());
        let h2 = table.put(ramfs::open("ftab-a").unwrap());
        assert_eq!((h1, h2), (2, 3));
        table.del(h1).unwrap();
        // Closed handles are not recycled.
        let h3 = table.put(ramfs::open("ftab-a").unwrap());
        assert_eq!(h3, 4);
        assert_eq!(table.get(h1).unwrap_err().errno(), EBADF);
        assert_eq!(table.len(), 2);
    }
}
