pub mod record;

pub use crate::record::record::{BamRecord, ReadRecord, TaggedRecord};
