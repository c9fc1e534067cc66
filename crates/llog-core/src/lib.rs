//! # llog-core
//!
//! Core types, traits, and abstractions for the llog content registry.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other llog crates depend on, plus the pure registry query engine and
//! the virtual folder model.

pub mod defaults;
pub mod error;
pub mod folder;
pub mod logging;
pub mod memory;
pub mod models;
pub mod registry;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use memory::{MemoryFolderStore, MemoryFolderTree, MemoryItemStore, MemoryJobQueue};
pub use models::*;
pub use registry::{RegistryPage, RegistryQuery};
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
