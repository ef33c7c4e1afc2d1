#![allow(dead_code)]

use mmapper::{MapFlags, ProtFlags};

pub const PAGE: usize = 4096;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rw() -> ProtFlags {
    ProtFlags::PROT_READ | ProtFlags::PROT_WRITE
}

pub fn anon() -> MapFlags {
    MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS
}
