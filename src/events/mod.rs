//! Session-scoped progress events
//!
//! Jobs publish into a room keyed by session id; WebSocket connections that
//! joined the room receive the events. Nothing is buffered or replayed.

pub mod broadcaster;
pub mod messages;

pub use broadcaster::{Broadcaster, ConnectionId, Subscription};
pub use messages::{ProcessingStatusPayload, ProgressEvent, ProgressPayload, ReadyPayload};
