//! Live event stream for the running order.
//!
//! Every committed mutation that viewers care about is published here as an
//! [`EventEnvelope`]. The [`EventBus`] fans envelopes out to subscribers and
//! keeps a bounded log so reconnecting clients can catch up.

mod bus;
mod types;

pub use bus::{EventBus, ReplaySubscription, DEFAULT_CAPACITY, DEFAULT_REPLAY_LOG_SIZE};
pub use types::*;
