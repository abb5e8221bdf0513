//! Persistence contract and its in-memory implementation.

pub mod repository {
    pub use crate::repository::*;
}

pub mod memory_store {
    pub use crate::memory_store::*;
}
