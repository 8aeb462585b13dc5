mod event_repository;
mod judge_repository;
mod performance_repository;
mod score_repository;
mod sequence_writer;

pub use event_repository::*;
pub use judge_repository::*;
pub use performance_repository::*;
pub use score_repository::*;
pub use sequence_writer::*;
