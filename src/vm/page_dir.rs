//! Per-process page directories and the simulated CR3.
//!
//! A page directory maps user pages to frames. Each host thread has an
//! *active* directory slot standing in for the CPU's page-table base
//! register; user-memory accessors translate through the active directory,
//! so they see exactly what the user program the thread is running sees.

use std::cell::RefCell;

use crate::prelude::*;
use crate::vm::page_alloc::FrameRef;
use crate::vm::{check_user_range, pg_ofs, pg_round_down, PAGE_SIZE};

pub type PageDirRef = Arc<PageDir>;

#[derive(Debug)]
struct PageTableEntry {
    frame: FrameRef,
    writable: bool,
}

#[derive(Debug)]
pub struct PageDir {
    map: Mutex<HashMap<u32, PageTableEntry>>,
}

impl PageDir {
    pub fn new() -> PageDirRef {
        Arc::new(Self {
            map: Mutex::new(HashMap::new()),
        })
    }

    /// Adds a mapping from user page `upage` to `frame`.
    ///
    /// Fails if `upage` is already mapped.
    pub fn set_page(&self, upage: u32, frame: FrameRef, writable: bool) -> Result<()> {
        debug_assert_eq!(pg_ofs(upage), 0);
        let mut map = self.map.lock().unwrap();
        if map.contains_key(&upage) {
            return_errno!(EEXIST, "user page already mapped");
        }
        map.insert(upage, PageTableEntry { frame, writable });
        Ok(())
    }

    /// The frame mapped at `upage`, if any.
    pub fn get_page(&self, upage: u32) -> Option<FrameRef> {
        let map = self.map.lock().unwrap();
        map.get(&upage).map(|pte| pte.frame.clone())
    }

    /// Removes the mapping at `upage`; the frame is freed once the last
    /// kernel handle drops.
    pub fn clear_page(&self, upage: u32) {
        self.map.lock().unwrap().remove(&upage);
    }

    pub fn mapped_pages(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    /// Tears down every mapping, freeing the backing frames. The directory
    /// must not be active on any thread when this runs.
    pub fn destroy(&self) {
        self.map.lock().unwrap().clear();
    }

    /// Copies `buf.len()` bytes out of user memory at `uaddr`.
    pub fn read_user(&self, uaddr: u32, buf: &mut [u8]) -> Result<()> {
        self.walk(uaddr, buf.len(), false, |frame, frame_ofs, chunk| {
            frame.read(frame_ofs, &mut buf[chunk]);
        })
    }

    /// Copies `buf` into user memory at `uaddr`, honoring the writable bit.
    pub fn write_user(&self, uaddr: u32, buf: &[u8]) -> Result<()> {
        self.walk(uaddr, buf.len(), true, |frame, frame_ofs, chunk| {
            frame.write(frame_ofs, &buf[chunk]);
        })
    }

    /// Page-by-page translation loop shared by the user-memory accessors.
    fn walk(
        &self,
        uaddr: u32,
        len: usize,
        for_write: bool,
        mut access: impl FnMut(&FrameRef, usize, std::ops::Range<usize>),
    ) -> Result<()> {
        check_user_range(uaddr, len as u32)?;
        let mut done = 0usize;
        while done < len {
            let addr = uaddr + done as u32;
            let page_left = (PAGE_SIZE - pg_ofs(addr)) as usize;
            let chunk_len = min(page_left, len - done);
            let frame = {
                let map = self.map.lock().unwrap();
                let pte = map
                    .get(&pg_round_down(addr))
                    .ok_or_else(|| errno!(EFAULT, "unmapped user page"))?;
                if for_write && !pte.writable {
                    return_errno!(EFAULT, "write to read-only user page");
                }
                pte.frame.clone()
            };
            access(&frame, pg_ofs(addr) as usize, done..done + chunk_len);
            done += chunk_len;
        }
        Ok(())
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<PageDirRef>> = RefCell::new(None);
}

/// Loads `pd` into this thread's simulated page-table base register.
/// `None` activates the kernel-only directory.
pub fn activate(pd: Option<&PageDirRef>) {
    ACTIVE.with(|active| {
        *active.borrow_mut() = pd.cloned();
    });
}

/// The directory the current thread translates user addresses through.
pub fn active() -> Option<PageDirRef> {
    ACTIVE.with(|active| active.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::page_alloc::{alloc_user_frame, AllocFlags};
    use crate::vm::PHYS_BASE;

    fn dir_with_page(upage: u32, writable: bool) -> PageDirRef {
        let pd = PageDir::new();
        let frame = alloc_user_frame(AllocFlags::ZERO).unwrap();
        pd.set_page(upage, frame, writable).unwrap();
        pd
    }

    #[test]
    fn double_map_rejected() {
        let pd = dir_with_page(0x8048000, true);
        let frame = alloc_user_frame(AllocFlags::ZERO).unwrap();
        assert_eq!(
            pd.set_page(0x8048000, frame, true).unwrap_err().errno(),
            EEXIST
        );
    }

    #[test]
    fn read_write_crosses_pages() {
        let pd = PageDir::new();
        for upage in &[0x8048000u32, 0x8049000] {
            let frame = alloc_user_frame(AllocFlags::ZERO).unwrap();
            pd.set_page(*upage, frame, true).unwrap();
        }
        let data: Vec<u8> = (0..64).collect();
        pd.write_user(0x8049000 - 32, &data).unwrap();
        let mut back = vec![0u8; 64];
        pd.read_user(0x8049000 - 32, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn faults() {
        let pd = dir_with_page(0x8048000, false);
        let mut buf = [0u8; 4];
        assert_eq!(pd.read_user(0x8047ffc, &mut buf).unwrap_err().errno(), EFAULT);
        assert_eq!(pd.write_user(0x8048000, &buf).unwrap_err().errno(), EFAULT);
        assert_eq!(
            pd.read_user(PHYS_BASE - 2, &mut buf).unwrap_err().errno(),
            EFAULT
        );
    }

    #[test]
    fn destroy_unmaps_everything() {
        let pd = dir_with_page(0x8048000, true);
        assert_eq!(pd.mapped_pages(), 1);
        pd.destroy();
        assert_eq!(pd.mapped_pages(), 0);
        let mut buf = [0u8; 1];
        assert!(pd.read_user(0x8048000, &mut buf).is_err());
    }
}
