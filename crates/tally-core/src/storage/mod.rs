//! Storage layer
//!
//! Durable key-value storage that mirrors the in-memory collections.
//!
//! ## Architecture
//!
//! - **KeyValueStore**: the port; async get/set/remove of string values
//! - **FileStore**: one JSON file per key, atomic writes
//! - **MemoryStore**: process-local map for tests and throwaway sessions
//!
//! The key-value store is only read authoritatively at startup hydration.

pub mod error;
pub mod file;
pub mod keys;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use keys::{Collection, StorageKeys, DEFAULT_NAMESPACE};
pub use kv::{KeyValueStore, MemoryStore};
