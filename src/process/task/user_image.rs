//! Simulated user text.
//!
//! An image stands in for the machine code of an executable: a map from
//! virtual entry addresses to host functions. The loader still maps the
//! real ELF bytes into the address space; this table is what the simulated
//! CPU consults when control transfers into them.
//!
//! By convention a thread stub registered here finds, at its entry,
//! `esp` pointing at a null return address with the user function pointer
//! and its argument above it, exactly the frame `setup_thread` builds.

use super::UserContext;
use crate::prelude::*;

pub type UserImageRef = Arc<UserImage>;

type EntryFn = Box<dyn Fn(&UserContext) + Send + Sync>;

pub struct UserImage {
    entries: HashMap<u32, EntryFn>,
}

impl UserImage {
    pub fn builder() -> UserImageBuilder {
        UserImageBuilder {
            entries: HashMap::new(),
        }
    }

    /// The code registered at `addr`, if any.
    pub fn entry(&self, addr: u32) -> Option<&EntryFn> {
        self.entries.get(&addr)
    }
}

impl Debug for UserImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut addrs: Vec<&u32> = self.entries.keys().collect();
        addrs.sort();
        f.debug_struct("UserImage").field("entries", &addrs).finish()
    }
}

pub struct UserImageBuilder {
    entries: HashMap<u32, EntryFn>,
}

impl UserImageBuilder {
    /// Registers `f` as the code at virtual address `addr`.
    pub fn entry(mut self, addr: u32, f: impl Fn(&UserContext) + Send + Sync + 'static) -> Self {
        self.entries.insert(addr, Box::new(f));
        self
    }

    pub fn build(self) -> UserImageRef {
        Arc::new(UserImage {
            entries: self.entries,
        })
    }
}
