//! Portal core types and utilities

pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_store;
pub mod identity;
pub mod store;

pub use error::{CoreError, CoreResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;
pub use identity::{Credentials, UserIdentity};
pub use store::{CredentialStore, KeyValueStore, MemoryStore, keys};
