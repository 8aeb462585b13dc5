mod handler;
mod messages;

pub use handler::{ws_handler, IntentHandler, WsState, DEFAULT_HEARTBEAT_INTERVAL};
pub use messages::{
    ClientMessage, IntentError, IntentOutcome, MutationIntent, ServerMessage, SubscriptionFilter,
};
