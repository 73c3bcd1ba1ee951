pub mod bam_io;
pub mod discard_log;
pub mod file_io;
pub mod matrix_io;

pub use crate::io::{
    bam_io::BamIO,
    discard_log::{DiscardLog, DISCARD_LOG_FILE},
    file_io::{gather_shards, ShardInput},
    matrix_io::{write_combined_matrix, write_feature_matrix, write_umi_dictionary, UMI_DICT_FILE},
};
