//! Diligence Storage Library
//!
//! Object-storage adapter used by the upload pipeline. Backends implement
//! the [`Storage`] trait; the bucket for a document is determined by its
//! category and keys are generated per owner and subcategory (see
//! [`keys::object_key`]).

pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

pub use diligence_core::models::{StorageBackend, StorageLocator};
pub use factory::create_storage;
pub use keys::object_key;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
