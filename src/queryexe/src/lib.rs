#[macro_use]
extern crate log;

pub mod opiterator;
pub mod query;

pub use heapstore::storage_manager::StorageManager;
