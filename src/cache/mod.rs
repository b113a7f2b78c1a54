// src/cache/mod.rs

//! Persisted dependency graph.
//!
//! - [`schema`]: the two on-disk forms, the strict decoder and migration
//!   from the mtime-validated form to the reverse-map form.
//! - [`codec`]: [`CacheCodec`], the only component that reads or writes the
//!   cache file.
//! - [`atomic`]: temp-file-then-rename writes and orphan sweeping.
//!
//! The file is always regenerable: deleting it costs one full rebuild.

pub mod atomic;
pub mod codec;
pub mod schema;

pub use codec::CacheCodec;
pub use schema::{
    CacheMiss, FileRecord, MtimeSnapshot, ReverseMapSnapshot, RuntimeEdgesTable, Snapshot,
};
