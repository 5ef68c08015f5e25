pub mod outcome_log;
pub mod types;

pub use outcome_log::*;
pub use types::*;
