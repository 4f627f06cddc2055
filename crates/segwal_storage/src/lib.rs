//! # segwal Storage
//!
//! Virtual file system trait and implementations for segwal.
//!
//! This crate is the only channel for physical I/O in segwal. A [`Vfs`]
//! manages named files inside a directory; the files themselves are
//! **opaque byte stores** addressed by offset. The VFS knows nothing about
//! segment headers, frames or checksums.
//!
//! ## Design Principles
//!
//! - Files are created atomically and preallocated to a requested size
//! - Positioned reads and writes, no implicit cursor
//! - Durability only on explicit `sync`
//! - "File not found" is always distinguishable from other failures
//! - Everything is `Send + Sync` so readers can be shared across threads
//!
//! ## Available Implementations
//!
//! - [`MemVfs`] - For testing and crash simulation
//! - [`FsVfs`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use segwal_storage::{MemVfs, ReadableFile, Vfs, WritableFile};
//! use std::path::Path;
//!
//! let vfs = MemVfs::new();
//! let dir = Path::new("wal");
//! let mut file = vfs.create(dir, "a.wal", 64).unwrap();
//! file.write_at(0, b"hello world").unwrap();
//!
//! let mut buf = [0u8; 5];
//! file.read_at(6, &mut buf).unwrap();
//! assert_eq!(&buf, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod vfs;

pub use error::{StorageError, StorageResult};
pub use file::{FsFile, FsVfs};
pub use memory::{MemFile, MemVfs};
pub use vfs::{ReadableFile, Vfs, WritableFile};
