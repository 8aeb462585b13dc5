mod caller;
mod event;
mod fee;
mod judge;
mod performance;
mod score;

pub use caller::*;
pub use event::*;
pub use fee::*;
pub use judge::*;
pub use performance::*;
pub use score::*;
