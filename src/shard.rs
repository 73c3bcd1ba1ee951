use crate::barcode::Axis;
use crate::context::FilterContext;
use crate::count::{CountMatrix, UmiRegistry};
use crate::io::DiscardLog;
use crate::processor::{ReadOutcome, ReadProcessor};
use crate::progbars::ShardProgress;
use crate::record::TaggedRecord;
use crate::report::FilterReport;
use anyhow::{Context, Error};
use log::info;
use smol_str::SmolStr;

pub const PROGRESS_STRIDE: u64 = 500_000;

/// Destination for reads that survive filtering.
pub trait ReadSink<R> {
    fn write_read(&mut self, record: &R) -> Result<(), Error>;
}

impl<R: Clone> ReadSink<R> for Vec<R> {
    fn write_read(&mut self, record: &R) -> Result<(), Error> {
        self.push(record.clone());
        Ok(())
    }
}

/// Per-shard cap on the number of kept SpotKeys sampled for the barcode rank table.
pub fn sample_cap(est_num_spots: usize, shard_count: usize) -> usize {
    (est_num_spots * 100).div_ceil(shard_count.max(1))
}

/// Everything a shard hands back to the merge step.
#[derive(Debug, Default)]
pub struct ShardResult {
    pub name: String,
    pub report: FilterReport,
    pub sample: Vec<SmolStr>,
    pub registry: UmiRegistry,
    pub matrix: CountMatrix,
}

/// Drives a [ReadProcessor] over one partition of the input. Owns all mutable
/// state for that partition; the only thing shared with other shards is the
/// optional discard log.
pub struct ShardRunner<'a> {
    name: String,
    axes: Vec<Axis>,
    feature_mode: bool,
    processor: ReadProcessor<'a>,
    sample: Vec<SmolStr>,
    sample_cap: usize,
    discard_log: Option<&'a DiscardLog>,
    progress: ShardProgress,
}

impl<'a> ShardRunner<'a> {
    pub fn new(
        name: &str,
        ctx: &'a FilterContext,
        sample_cap: usize,
        discard_log: Option<&'a DiscardLog>,
        progress: ShardProgress,
    ) -> Self {
        Self {
            name: name.to_string(),
            axes: ctx.axes(),
            feature_mode: ctx.feature_mode(),
            processor: ReadProcessor::new(ctx),
            sample: Vec::new(),
            sample_cap,
            discard_log,
            progress,
        }
    }

    pub fn run<R, I, S>(mut self, records: I, sink: &mut S) -> Result<ShardResult, Error>
    where
        R: TaggedRecord,
        I: IntoIterator<Item = Result<R, Error>>,
        S: ReadSink<R>,
    {
        info!("Started shard {}", self.name);

        for record in records {
            let mut record =
                record.with_context(|| format!("Failed to read record in shard {}", self.name))?;
            self.handle(&mut record, sink)?;

            let seen = self.processor.report.total_count;
            if seen % PROGRESS_STRIDE == 0 {
                info!(
                    "Shard {}: processed {} reads, kept {}",
                    self.name, seen, self.processor.report.total_count_kept
                );
                self.progress
                    .update(seen, self.processor.report.total_count_kept);
            }
        }

        let (report, registry, matrix) = self.processor.finish();
        self.progress
            .finish(report.total_count, report.total_count_kept);
        info!(
            "Finished shard {}: {} reads, {} kept",
            self.name, report.total_count, report.total_count_kept
        );

        Ok(ShardResult {
            name: self.name,
            report,
            sample: self.sample,
            registry,
            matrix,
        })
    }

    fn handle<R, S>(&mut self, record: &mut R, sink: &mut S) -> Result<(), Error>
    where
        R: TaggedRecord,
        S: ReadSink<R>,
    {
        let read = record.to_read_record(&self.axes, self.feature_mode);

        match self.processor.process(&read) {
            ReadOutcome::Keep(kept) => {
                if self.sample.len() < self.sample_cap {
                    self.sample.push(kept.spot.clone());
                }
                record.tag_kept(&self.axes, &kept)?;
                sink.write_read(record)
            }
            ReadOutcome::Discard(_) => match self.discard_log {
                Some(log) => log.append(record.read_id()),
                None => Ok(()),
            },
        }
    }
}
