//! The in-memory file store.
//!
//! Files are flat byte vectors named by short strings: a block-device
//! file system reduced to the contract the rest of the kernel consumes,
//! which is create, remove, open, and inode-level write denial while an
//! executable is mapped.
//!
//! Removal unlinks the name at once; the inode itself lives until the last
//! open handle drops, so running executables survive deletion.

use std::sync::Mutex;

use crate::prelude::*;
use crate::process::task::UserImageRef;

/// Longest file name the directory format stores.
pub const NAME_MAX: usize = 14;

#[derive(Debug)]
pub struct Inode {
    pub(super) data: RwLock<Vec<u8>>,
    /// While positive, writes through any handle are refused.
    pub(super) deny_write_cnt: AtomicUsize,
    /// Simulated text of an executable: entry functions keyed by address.
    image: RwLock<Option<UserImageRef>>,
}

pub type InodeRef = Arc<Inode>;

impl Inode {
    fn new(data: Vec<u8>) -> InodeRef {
        Arc::new(Self {
            data: RwLock::new(data),
            deny_write_cnt: AtomicUsize::new(0),
            image: RwLock::new(None),
        })
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    pub fn image(&self) -> Option<UserImageRef> {
        self.image.read().unwrap().clone()
    }
}

struct Filesys {
    files: HashMap<String, InodeRef>,
}

lazy_static! {
    static ref FILESYS: Mutex<Filesys> = Mutex::new(Filesys {
        files: HashMap::new(),
    });
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return_errno!(ENOENT, "empty file name");
    }
    if name.len() > NAME_MAX {
        return_errno!(ENAMETOOLONG, "file name too long");
    }
    Ok(())
}

/// Creates a file of `initial_size` zero bytes.
pub fn create(name: &str, initial_size: usize) -> Result<()> {
    check_name(name)?;
    let mut fs = FILESYS.lock().unwrap();
    if fs.files.contains_key(name) {
        return_errno!(EEXIST, "file already exists");
    }
    fs.files
        .insert(name.to_string(), Inode::new(vec![0u8; initial_size]));
    Ok(())
}

/// Creates a file with the given contents, replacing any previous file of
/// that name. This is how executables reach the store; a real disk would
/// carry them in an image built ahead of time.
pub fn create_with_data(name: &str, data: &[u8]) -> Result<()> {
    check_name(name)?;
    let mut fs = FILESYS.lock().unwrap();
    fs.files.insert(name.to_string(), Inode::new(data.to_vec()));
    Ok(())
}

/// Unlinks `name`. Open handles keep working.
pub fn remove(name: &str) -> Result<()> {
    let mut fs = FILESYS.lock().unwrap();
    fs.files
        .remove(name)
        .map(|_| ())
        .ok_or_else(|| errno!(ENOENT, "no such file"))
}

/// Opens `name`, yielding a fresh handle with position 0.
pub fn open(name: &str) -> Result<FileRef> {
    let fs = FILESYS.lock().unwrap();
    let inode = fs
        .files
        .get(name)
        .cloned()
        .ok_or_else(|| errno!(ENOENT, "no such file"))?;
    Ok(Arc::new(crate::fs::File::new(inode)))
}

/// Attaches simulated user text to an existing executable file.
pub fn register_image(name: &str, image: UserImageRef) -> Result<()> {
    let fs = FILESYS.lock().unwrap();
    let inode = fs
        .files
        .get(name)
        .ok_or_else(|| errno!(ENOENT, "no such file"))?;
    *inode.image.write().unwrap() = Some(image);
    Ok(())
}
