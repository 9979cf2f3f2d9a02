//! The user-process and user-thread subsystem of a small teaching kernel,
//! hosted on ordinary OS threads.
//!
//! The crate bridges a handful of kernel primitives (threads, semaphores,
//! a page-frame pool, a page directory, a block-file system) and the
//! user-mode programs built on top of them: it loads ELF32 executables into
//! fresh address spaces, lays out the initial argv stack frame, tracks the
//! lifecycle of processes and their user threads, implements parent/child
//! wait and sibling join, and services the system-call surface.
//!
//! User-mode execution is simulated: an executable carries a table of entry
//! functions keyed by virtual address, and "returning from the interrupt"
//! into user code invokes the function registered at `eip`. Everything else
//! (page tables, stack frames, file descriptors, rendezvous records) is the
//! real machinery.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate bitvec;
extern crate goblin;
extern crate scroll;
extern crate serde;
extern crate serde_json;

use std::sync::Once;

use crate::config::Config;

#[macro_use]
mod error;
#[macro_use]
mod prelude;

pub mod config;
pub mod fs;
pub mod process;
pub mod shutdown;
pub mod sync;
pub mod syscall;
pub mod util;
pub mod vm;

pub use crate::error::{Errno, Error, Result};

static BOOT: Once = Once::new();

/// One-time crate initialization: sizes the user frame pool from the given
/// config and installs the panic plumbing that carries thread exits.
///
/// Calling `boot` more than once is allowed; only the first call takes
/// effect. Each host thread that wants to spawn or wait on user processes
/// must additionally call [`process::init_kernel_thread`].
pub fn boot(config: &Config) {
    BOOT.call_once(|| {
        config::set_boot_config(config);
        vm::page_alloc::init_user_pool(config.resource_limits.user_pool_pages);
        process::task::init_exit_hook();
        info!(
            "userproc booted: user pool = {} pages",
            config.resource_limits.user_pool_pages
        );
    });
}
