//! Machine power-off.
//!
//! The host cannot actually stop, so powering off latches a flag the
//! embedder can observe and takes the calling thread down; everything
//! else keeps whatever state it had, like RAM across a halt.

use std::sync::atomic::{AtomicBool, Ordering};

static POWERED_OFF: AtomicBool = AtomicBool::new(false);

pub fn power_off() -> ! {
    info!("machine power-off requested");
    POWERED_OFF.store(true, Ordering::Release);
    crate::process::task::thread_exit()
}

pub fn is_powered_off() -> bool {
    POWERED_OFF.load(Ordering::Acquire)
}
