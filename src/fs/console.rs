//! The console device.
//!
//! Output is captured in a buffer the embedder can drain; input is a byte
//! queue the embedder feeds. Reads block until a byte arrives, like a
//! polled keyboard. Kernel messages (the per-process exit
//! line, loader diagnostics) go through [`print_fmt`] so they interleave
//! with user `write(1, ..)` output exactly as they would on real hardware.

use std::fmt;
use std::sync::{Condvar, Mutex};

use crate::prelude::*;

struct Console {
    output: Vec<u8>,
    input: VecDeque<u8>,
}

lazy_static! {
    static ref CONSOLE: Mutex<Console> = Mutex::new(Console {
        output: Vec::new(),
        input: VecDeque::new(),
    });
    static ref INPUT_READY: Condvar = Condvar::new();
}

/// Writes `buf` to the console.
pub fn putbuf(buf: &[u8]) {
    CONSOLE.lock().unwrap().output.extend_from_slice(buf);
}

/// Blocks until a byte of input is available and returns it.
pub fn getc() -> u8 {
    let mut console = CONSOLE.lock().unwrap();
    loop {
        if let Some(byte) = console.input.pop_front() {
            return byte;
        }
        console = INPUT_READY.wait(console).unwrap();
    }
}

/// Queues bytes for future `getc`/`read(0, ..)` calls.
pub fn feed_input(buf: &[u8]) {
    let mut console = CONSOLE.lock().unwrap();
    console.input.extend(buf.iter().copied());
    INPUT_READY.notify_all();
}

/// Drains and returns everything written to the console so far.
pub fn take_output() -> Vec<u8> {
    std::mem::take(&mut CONSOLE.lock().unwrap().output)
}

pub fn print_fmt(args: fmt::Arguments<'_>) {
    putbuf(args.to_string().as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn input_blocks_until_fed() {
        let reader = thread::spawn(|| getc());
        feed_input(b"A");
        // Either this reader or a concurrent one gets the byte; both only
        // ever see what was fed.
        let byte = reader.join().unwrap();
        assert_eq!(byte, b'A');
    }
}
