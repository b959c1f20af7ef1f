//! Session bookkeeping
//!
//! A session is one client-visible download lifecycle:
//! - an opaque `SessionId` minted per download request
//! - a subscription room in the progress broadcaster
//! - at most one `JobHandle` while its job runs

mod handle;
mod id;
mod registry;

pub use handle::{JobHandle, JobState};
pub use id::SessionId;
pub use registry::{JobLease, JobReporter, RegistryError, SessionRegistry};
