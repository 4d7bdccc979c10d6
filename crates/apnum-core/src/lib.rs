//! Core types for the apnum arbitrary-precision arithmetic kernel.
//!
//! - [`error`]: the failure taxonomy shared by every layer.
//! - [`context`]: runtime cache/memory geometry and the shared-memory lock.
//! - [`word`]: the three NTT element types and their verified prime triples.
//! - [`storage`]: cached and disk-backed digit storage with block access and
//!   sequential cursors.
//!
//! Higher layers (transform strategies, convolution, the numeric types)
//! live in their own crates and depend only on this one.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod context;
pub mod error;
pub mod storage;
pub mod word;

pub use context::{Context, SharedMemoryGuard};
pub use error::{ApError, Result};
pub use storage::{DataStorage, DataStorageBuilder, StorageReader, StorageWriter};
pub use word::{NttWord, Word};
