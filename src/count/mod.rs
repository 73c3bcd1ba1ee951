pub mod matrix;
pub mod umi;
pub mod whitelist;

pub use crate::count::{
    matrix::CountMatrix,
    umi::{DedupOutcome, UmiDeduplicator, UmiRegistry},
    whitelist::SpotWhitelist,
};
