use indexmap::IndexSet;
use smol_str::SmolStr;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

pub const FEATURE_PREFIX: &str = "feat_";

/// Sparse feature x spot table of deduplicated molecule counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountMatrix {
    counts: HashMap<(SmolStr, SmolStr), u64>,
}

impl CountMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, feature: &str, spot: &str) {
        *self
            .counts
            .entry((SmolStr::from(feature), SmolStr::from(spot)))
            .or_insert(0) += 1;
    }

    #[cfg(test)]
    pub fn get(&self, feature: &str, spot: &str) -> u64 {
        self.counts
            .get(&(SmolStr::from(feature), SmolStr::from(spot)))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Shards count disjoint spots, so merging is a plain cell-wise sum.
    pub fn merge(&mut self, other: CountMatrix) {
        for (key, n) in other.counts {
            *self.counts.entry(key).or_insert(0) += n;
        }
    }

    /// Row order for output: every legend feature (even if never counted), then
    /// any other counted feature (interactions) in sorted order.
    pub fn row_order(&self, legend_features: &[SmolStr]) -> Vec<SmolStr> {
        let known: IndexSet<&SmolStr> = legend_features.iter().collect();
        let extra: BTreeSet<&SmolStr> = self
            .counts
            .keys()
            .map(|(f, _)| f)
            .filter(|f| !known.contains(f))
            .collect();

        known.into_iter().chain(extra).cloned().collect()
    }

    /// Write the table as tab separated text with a header row of spots. Row
    /// names get the `feat_` prefix unless some already carry it.
    pub fn write_table(
        &self,
        w: &mut impl Write,
        rows: &[SmolStr],
        columns: &IndexSet<SmolStr>,
        write_header: bool,
    ) -> std::io::Result<()> {
        let add_prefix = !rows.iter().any(|r| r.starts_with(FEATURE_PREFIX));

        if write_header {
            write!(w, "GENE")?;
            for spot in columns {
                write!(w, "\t{spot}")?;
            }
            writeln!(w)?;
        }

        for feature in rows {
            if add_prefix {
                write!(w, "{FEATURE_PREFIX}{feature}")?;
            } else {
                write!(w, "{feature}")?;
            }
            for spot in columns {
                let n = self
                    .counts
                    .get(&(feature.clone(), spot.clone()))
                    .copied()
                    .unwrap_or(0);
                write!(w, "\t{n}")?;
            }
            writeln!(w)?;
        }

        Ok(())
    }
}
