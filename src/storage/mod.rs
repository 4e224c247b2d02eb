//! Upload storage.
//!
//! Item photos are written through a [`StorageBackend`]; the local filesystem
//! backend is the only one shipped, and its directory is served statically.

mod backend;
mod local;

pub use backend::{key_from_public_path, public_path, upload_key, StorageBackend, PUBLIC_PREFIX};
pub use local::LocalStorage;

#[cfg(test)]
pub use backend::StorageResult;
