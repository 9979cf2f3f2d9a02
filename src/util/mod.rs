pub mod mem_util;
