// src/watch/mod.rs

//! Long-lived watch sessions.
//!
//! - [`filter`]: the debounced, timer-gated per-test-file predicate a host
//!   registers in watch mode.
//! - [`watcher`]: `notify` wiring that forwards changed paths into tokio.
//! - [`hash`]: optional content-hash gate that drops no-op events.
//! - [`session`]: the CLI's watch loop tying the above to an [`Engine`].
//!
//! [`Engine`]: crate::engine::Engine

pub mod filter;
pub mod hash;
pub mod session;
pub mod watcher;

pub use filter::WatchFilter;
pub use hash::{compute_file_hash, ContentGate};
pub use session::run_watch_session;
pub use watcher::{spawn_watcher, WatcherHandle};
