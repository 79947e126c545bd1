//! tgsync Vault - the document store that ingested messages land in
//!
//! - [`Vault`]: async store seam (folders, existence probes, create-only writes)
//! - [`FsVault`]: a directory on disk, e.g. an Obsidian vault
//! - [`MemoryVault`]: in-process store used by tests and dry runs
//! - [`PathAllocator`]: collision-free path allocation backed by a shared index

pub mod allocator;
pub mod error;
pub mod memory;
pub mod naming;
pub mod store;

pub use allocator::{AllocatedPaths, Clock, PathAllocator, SystemClock};
pub use error::VaultError;
pub use memory::MemoryVault;
pub use store::{FsVault, Vault};
