//! Store backends implementing `EntityStore`.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
