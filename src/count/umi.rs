use crate::count::matrix::CountMatrix;
use crate::count::whitelist::SpotWhitelist;
use crate::report::FilterReport;
use crate::resolve::FeatureIdentity;
use indexmap::IndexSet;
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap};

type SpotFeature = (SmolStr, SmolStr);

/// UMIs seen per (spot, feature) within one shard. The `seen` sets gate matrix
/// increments; `observed` counts every sighting, duplicates included.
#[derive(Clone, Debug, Default)]
pub struct UmiRegistry {
    seen: HashMap<SpotFeature, IndexSet<SmolStr>>,
    observed: HashMap<SpotFeature, HashMap<SmolStr, u64>>,
}

impl UmiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a sighting of `umi`, then insert it into the dedup set. Returns
    /// `true` if the UMI was new for this spot and feature.
    pub fn observe(&mut self, spot: &str, feature: &str, umi: &str) -> bool {
        let key = (SmolStr::from(spot), SmolStr::from(feature));

        *self
            .observed
            .entry(key.clone())
            .or_default()
            .entry(SmolStr::from(umi))
            .or_insert(0) += 1;

        self.seen.entry(key).or_default().insert(SmolStr::from(umi))
    }

    #[cfg(test)]
    pub fn contains(&self, spot: &str, feature: &str, umi: &str) -> bool {
        self.seen
            .get(&(SmolStr::from(spot), SmolStr::from(feature)))
            .is_some_and(|s| s.contains(umi))
    }

    #[cfg(test)]
    pub fn times_observed(&self, spot: &str, feature: &str, umi: &str) -> u64 {
        self.observed
            .get(&(SmolStr::from(spot), SmolStr::from(feature)))
            .and_then(|m| m.get(umi))
            .copied()
            .unwrap_or(0)
    }

    /// Set union of the dedup sets and sum of the sighting counts.
    pub fn merge(&mut self, other: UmiRegistry) {
        for (key, umis) in other.seen {
            self.seen.entry(key).or_default().extend(umis);
        }
        for (key, umis) in other.observed {
            let into = self.observed.entry(key).or_default();
            for (umi, n) in umis {
                *into.entry(umi).or_insert(0) += n;
            }
        }
    }

    /// Deterministic spot -> feature -> sorted UMI list view for export, over
    /// the full `spots` x `features` grid. Pairs never seen map to an empty list.
    pub fn to_grid<'a>(
        &'a self,
        spots: impl IntoIterator<Item = &'a SmolStr>,
        features: &'a [SmolStr],
    ) -> BTreeMap<&'a str, BTreeMap<&'a str, Vec<&'a str>>> {
        let mut out: BTreeMap<&str, BTreeMap<&str, Vec<&str>>> = spots
            .into_iter()
            .map(|spot| {
                let row = features.iter().map(|f| (f.as_str(), Vec::new())).collect();
                (spot.as_str(), row)
            })
            .collect();

        for ((spot, feature), umis) in &self.seen {
            let mut umis: Vec<&str> = umis.iter().map(|u| u.as_str()).collect();
            umis.sort_unstable();
            out.entry(spot.as_str())
                .or_default()
                .insert(feature.as_str(), umis);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupOutcome {
    /// spot is not in the whitelist; the read is dropped and not counted
    SpotMissing,
    /// UMI already counted for this spot and feature; the read is kept
    Duplicate,
    Added,
}

/// Gate between resolved feature reads and the count matrix: whitelist check,
/// then UMI deduplication.
pub struct UmiDeduplicator<'a> {
    whitelist: &'a SpotWhitelist,
    pub registry: UmiRegistry,
    pub matrix: CountMatrix,
}

impl<'a> UmiDeduplicator<'a> {
    pub fn new(whitelist: &'a SpotWhitelist) -> Self {
        Self {
            whitelist,
            registry: UmiRegistry::new(),
            matrix: CountMatrix::new(),
        }
    }

    /// Submitting the same (spot, feature, UMI) any number of times increments
    /// the matrix exactly once.
    pub fn submit(
        &mut self,
        spot: &str,
        feature: &FeatureIdentity,
        umi: &str,
        report: &mut FilterReport,
    ) -> DedupOutcome {
        if !self.whitelist.contains(spot) {
            if let Some(block) = report.feature_block(feature.interaction) {
                block.spot_missing += 1;
            }
            return DedupOutcome::SpotMissing;
        }

        if let Some(block) = report.feature_block(feature.interaction) {
            block.spot_found += 1;
        }

        if self.registry.observe(spot, &feature.name, umi) {
            self.matrix.increment(&feature.name, spot);
            if let Some(block) = report.feature_block(feature.interaction) {
                block.added += 1;
            }
            DedupOutcome::Added
        } else {
            if let Some(block) = report.feature_block(feature.interaction) {
                block.umi_found += 1;
            }
            DedupOutcome::Duplicate
        }
    }

    pub fn into_parts(self) -> (UmiRegistry, CountMatrix) {
        (self.registry, self.matrix)
    }
}
