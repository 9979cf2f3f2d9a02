//! The block-file system and console device the process core consumes.
//!
//! The file system is an in-memory store of named flat files, internally
//! synchronized. On top of it sit per-open-file handles with independent
//! positions, the per-process descriptor table, and a global lock that
//! serializes compound file-system operations issued by system calls.

use std::sync::{Mutex, MutexGuard};

pub mod console;
pub mod file;
pub mod file_table;
pub mod ramfs;
pub mod syscalls;

pub use self::file::{File, FileRef};
pub use self::file_table::{FileDesc, FileTable};

/// Reserved descriptor for console input.
pub const STDIN_FILENO: FileDesc = 0;
/// Reserved descriptor for console output.
pub const STDOUT_FILENO: FileDesc = 1;

lazy_static! {
    static ref FS_LOCK: Mutex<()> = Mutex::new(());
}

/// Serializes file-system operations across processes.
pub fn fs_lock() -> MutexGuard<'static, ()> {
    FS_LOCK.lock().unwrap()
}

/// Closes `file` under the file-system lock.
pub fn safe_file_close(file: FileRef) {
    let _guard = fs_lock();
    drop(file);
}
