use super::{Thread, ThreadId, ThreadName};
use crate::prelude::*;
use crate::process::ThreadRef;

/// Builds a bare thread: identity only. The process, join status and user
/// stack are attached later by the lifecycle code, the same order the
/// machinery brings them into existence.
#[derive(Debug)]
pub struct ThreadBuilder {
    tid: Option<ThreadId>,
    name: Option<ThreadName>,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        Self {
            tid: None,
            name: None,
        }
    }

    pub fn tid(mut self, tid: ThreadId) -> Self {
        self.tid = Some(tid);
        self
    }

    pub fn name(mut self, name: ThreadName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn build(self) -> Result<ThreadRef> {
        let tid = self.tid.unwrap_or_else(ThreadId::new);
        let name = self.name.unwrap_or_default();
        Ok(Arc::new(Thread::new(tid, name)))
    }
}
