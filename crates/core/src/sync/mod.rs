//! Sync overlay: optimistic local writes, the pending queue and its replay.

mod connectivity;
mod overlay;
mod pending_model;
mod remote;
mod replay;
mod session;

pub use connectivity::*;
pub use overlay::*;
pub use pending_model::*;
pub use remote::*;
pub use replay::{dispatch_operation, ReplayReport, ReplayStatus};
pub use session::*;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
