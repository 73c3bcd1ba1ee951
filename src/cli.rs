pub mod filter_args;
pub mod misc;

pub use crate::cli::filter_args::FilterArgs;
pub use crate::cli::misc::*;
