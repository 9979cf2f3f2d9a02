//! The user frame pool.
//!
//! A fixed number of 4 KiB frames, sized at boot, from which all user pages
//! (segments and stacks) are drawn. A frame is returned to the pool when
//! the last handle to it is dropped.

use std::sync::Mutex;

use crate::prelude::*;
use crate::vm::PAGE_SIZE;

bitflags! {
    pub struct AllocFlags: u32 {
        /// Zero the frame before handing it out.
        const ZERO = 0b1;
    }
}

/// One frame of the user pool, addressable by the kernel through this
/// handle while possibly mapped into a user address space.
pub struct Frame {
    data: Mutex<Box<[u8]>>,
}

pub type FrameRef = Arc<Frame>;

impl Frame {
    fn new(zeroed: bool) -> Self {
        // Frames are recycled through the host allocator, so a non-zeroed
        // frame still starts out zeroed; the flag only matters for intent.
        let _ = zeroed;
        Self {
            data: Mutex::new(vec![0u8; PAGE_SIZE as usize].into_boxed_slice()),
        }
    }

    pub fn write(&self, ofs: usize, buf: &[u8]) {
        let mut data = self.data.lock().unwrap();
        data[ofs..ofs + buf.len()].copy_from_slice(buf);
    }

    pub fn read(&self, ofs: usize, buf: &mut [u8]) {
        let data = self.data.lock().unwrap();
        buf.copy_from_slice(&data[ofs..ofs + buf.len()]);
    }

    pub fn zero(&self, ofs: usize, len: usize) {
        let mut data = self.data.lock().unwrap();
        for byte in &mut data[ofs..ofs + len] {
            *byte = 0;
        }
    }

    /// Runs `f` over the frame contents. Used by the loader and the stack
    /// builder, which own the frame before it becomes user-visible.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data.lock().unwrap();
        f(&mut data)
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        USER_POOL.lock().unwrap().free += 1;
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame {{ .. }}")
    }
}

struct UserPool {
    free: usize,
}

lazy_static! {
    static ref USER_POOL: Mutex<UserPool> = Mutex::new(UserPool {
        free: crate::config::ConfigResourceLimits::default().user_pool_pages,
    });
}

/// Resizes the pool. Called once from [`crate::boot`].
pub fn init_user_pool(pages: usize) {
    USER_POOL.lock().unwrap().free = pages;
}

pub fn free_user_frames() -> usize {
    USER_POOL.lock().unwrap().free
}

/// Allocates one frame from the user pool.
pub fn alloc_user_frame(flags: AllocFlags) -> Result<FrameRef> {
    {
        let mut pool = USER_POOL.lock().unwrap();
        if pool.free == 0 {
            return_errno!(ENOMEM, "user pool exhausted");
        }
        pool.free -= 1;
    }
    Ok(Arc::new(Frame::new(flags.contains(AllocFlags::ZERO))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trip() {
        let frame = alloc_user_frame(AllocFlags::ZERO).unwrap();
        frame.write(100, b"hello");
        let mut buf = [0u8; 5];
        frame.read(100, &mut buf);
        assert_eq!(&buf, b"hello");
        frame.zero(100, 5);
        frame.read(100, &mut buf);
        assert_eq!(&buf, &[0; 5]);
    }

    #[test]
    fn dropping_returns_to_pool() {
        // Other tests allocate concurrently, so only the net effect of this
        // test is observable: a burst of allocations must all be satisfied
        // and returning them must not wedge the pool.
        let frames: Vec<_> = (0..32)
            .map(|_| alloc_user_frame(AllocFlags::ZERO).unwrap())
            .collect();
        drop(frames);
        assert!(free_user_frames() > 0);
    }
}
