//! Offline-first data layer for the leirad to-do list and budget tracker.
//!
//! Every mutation is written to the local cache immediately. When the remote
//! backend cannot be reached the mutation is also queued, and the queue is
//! replayed in FIFO order once connectivity returns.

pub mod errors;
pub mod finance;
pub mod models;
pub mod storage;
pub mod sync;

pub use errors::{Error, RemoteError, Result, RetryClass};
