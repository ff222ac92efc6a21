//! Local persistence for sessions, profiles and preferences
//!
//! - `kv`: flat key-value backends (`FileStore` on disk, `MemoryStore` for tests)
//! - `token_store`: typed view over the namespaced keys used by the auth layer

pub mod kv;
pub mod token_store;

pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use token_store::{keys, TokenStore};
