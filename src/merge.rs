use crate::count::{CountMatrix, UmiRegistry};
use crate::report::FilterReport;
use crate::shard::ShardResult;
use smol_str::SmolStr;

/// Folds shard results into one run result. Every component merges by sum or
/// union, so the outcome does not depend on shard order or grouping.
#[derive(Debug, Default)]
pub struct ResultMerger {
    pub report: FilterReport,
    pub sample: Vec<SmolStr>,
    pub registry: UmiRegistry,
    pub matrix: CountMatrix,
    pub shards: Vec<String>,
}

impl ResultMerger {
    /// Start from a zeroed report so that every pre-registered well and feature
    /// survives into the output even if no shard saw it.
    pub fn new(report: FilterReport) -> Self {
        Self {
            report,
            ..Default::default()
        }
    }

    pub fn merge(&mut self, shard: ShardResult) {
        self.report.merge(shard.report);
        self.sample.extend(shard.sample);
        self.registry.merge(shard.registry);
        self.matrix.merge(shard.matrix);
        self.shards.push(shard.name);
    }

    pub fn merge_all(report: FilterReport, shards: impl IntoIterator<Item = ShardResult>) -> Self {
        let mut merger = Self::new(report);
        for shard in shards {
            merger.merge(shard);
        }
        merger
    }
}
