//! # Spotlet Common Library
//!
//! Shared code for the spotlet crates including:
//! - Error type
//! - TOML configuration loading
//! - Persistent credential key-value store
//! - Catalog track models (`TrackRef`)

pub mod catalog;
pub mod config;
pub mod error;
pub mod store;

pub use catalog::TrackRef;
pub use error::{Error, Result};
pub use store::{CredentialStore, FileStore, MemoryStore};
