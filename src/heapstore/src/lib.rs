#[macro_use]
extern crate log;

pub mod heapfile;
pub mod heapfileiter;
pub mod storage_manager;
