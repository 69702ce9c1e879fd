pub mod base;
pub mod file_storage;
pub mod memory_storage;
pub mod token_store;

// Re-export the primary storage items so code outside can do
// "use crate::store::{Storage, create_storage, TokenStore};"
pub use base::{create_storage, Storage, StorageError};
pub use token_store::{StoredSession, TokenStore};
