// Storage layer for persistent data

pub mod kv;
pub mod profile_store;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use profile_store::{ProfileStore, DEFAULT_PROFILE_KEY};
