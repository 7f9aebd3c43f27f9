//! Local key-value persistence for cached documents.
//!
//! Backends:
//! - `FileStore`: one JSON file per key, atomic writes
//! - `MemoryStore`: volatile map

mod file;
mod memory;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
