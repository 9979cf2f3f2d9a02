use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::prelude::*;

/// A self-managed thread id: allocated on creation, returned to the pool
/// when dropped. Ids are handed out counting upward from 1 and only reused
/// after wrapping around, following the *nix tradition.
#[derive(Debug, PartialEq)]
pub struct ThreadId {
    tid: pid_t,
}

impl ThreadId {
    pub fn new() -> ThreadId {
        let tid = ID_ALLOC.lock().unwrap().alloc();
        Self { tid }
    }

    pub fn as_u32(&self) -> pid_t {
        self.tid
    }
}

impl Drop for ThreadId {
    fn drop(&mut self) {
        ID_ALLOC.lock().unwrap().free(self.tid);
    }
}

lazy_static! {
    static ref ID_ALLOC: Mutex<IdAlloc> = Mutex::new(IdAlloc::new());
}

#[derive(Debug)]
struct IdAlloc {
    next_id: pid_t,
    in_use: BTreeSet<pid_t>,
}

impl IdAlloc {
    fn new() -> Self {
        Self {
            next_id: 0,
            in_use: BTreeSet::new(),
        }
    }

    fn alloc(&mut self) -> pid_t {
        loop {
            // 0 is never a valid tid.
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if self.in_use.insert(self.next_id) {
                return self.next_id;
            }
        }
    }

    fn free(&mut self, id: pid_t) {
        self.in_use.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_recycled() {
        let a = ThreadId::new();
        let b = ThreadId::new();
        assert_ne!(a.as_u32(), b.as_u32());
        assert!(a.as_u32() > 0 && b.as_u32() > 0);
        let freed = b.tid;
        drop(b);
        let alloc = ID_ALLOC.lock().unwrap();
        assert!(!alloc.in_use.contains(&freed));
        assert!(alloc.in_use.contains(&a.tid));
    }
}
