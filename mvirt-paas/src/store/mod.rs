//! Entity repository.

mod error;
mod memory_store;
mod traits;

pub use error::{Result, StoreError};
pub use memory_store::MemoryStore;
pub use traits::{ClusterStore, Repository, TemplateStore, VmStore};
