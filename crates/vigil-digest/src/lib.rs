//! Per-line content digests for flat text files.
//!
//! Turns a text file into a reusable fingerprint index: every physical line
//! is hashed (SHA-256 over its raw bytes) and the `hash -> line index`
//! mapping is persisted in a sidecar file next to the data file, so later
//! runs can reload it without rehashing.
//!
//! # Key Types
//!
//! - [`DigestStore`] -- Computes, caches and reloads digests
//! - [`Digest`] -- A [`DigestIndex`] plus the [`SourceLines`] it indexes
//! - [`LineHash`] -- The fingerprint of one line
//! - [`sidecar`] -- The `<index>:<hex>` record format and naming rule

pub mod error;
pub mod hash;
pub mod index;
pub mod sidecar;
pub mod store;

pub use error::{DigestError, DigestResult};
pub use hash::{HashError, LineHash};
pub use index::{Digest, DigestIndex, SourceLines};
pub use sidecar::{sha_filename, DEFAULT_SUFFIX};
pub use store::DigestStore;
