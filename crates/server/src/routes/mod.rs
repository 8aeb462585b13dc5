pub mod competitions;
pub mod fees;
mod health;
pub mod judges;
pub mod performances;
pub mod scores;
pub mod sse;
pub mod ws;

pub use competitions::*;
pub use fees::*;
pub use health::*;
pub use judges::*;
pub use performances::*;
pub use scores::*;
pub use ws::websocket_handler;
