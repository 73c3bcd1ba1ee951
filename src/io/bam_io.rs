use crate::io::ShardInput;
use crate::record::BamRecord;
use crate::shard::ReadSink;
use crate::utils::{make_bam_reader, make_bam_writer};
use anyhow::{Context, Error};
use rust_htslib::bam::{Read, Reader, Writer};

/// Writes kept reads to the shard's output BAM.
pub struct BamSink {
    writer: Writer,
    pub written: u64,
}

impl ReadSink<BamRecord> for BamSink {
    fn write_read(&mut self, record: &BamRecord) -> Result<(), Error> {
        self.writer
            .write(record)
            .context("Failed to write record to output BAM")?;
        self.written += 1;
        Ok(())
    }
}

/// Reader and writer for one shard; the output header is copied from the input.
pub struct BamIO {
    pub reader: Reader,
    pub sink: BamSink,
}

impl BamIO {
    pub fn new(shard: &ShardInput, num_threads: usize) -> Result<Self, Error> {
        let (header, reader) = make_bam_reader(&shard.path, num_threads)?;
        let writer = make_bam_writer(&shard.out_path, &header, num_threads)?;

        Ok(Self {
            reader,
            sink: BamSink { writer, written: 0 },
        })
    }

    /// Records of the input in file order. A decoding failure surfaces as an
    /// error item and ends the shard.
    pub fn records(reader: &mut Reader) -> impl Iterator<Item = Result<BamRecord, Error>> + '_ {
        reader.records().map(|r| r.map_err(Error::from))
    }
}
