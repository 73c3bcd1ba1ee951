use crate::barcode::{DistanceMetric, FeatureDictionary, Lookup};
use crate::report::FilterReport;
use smol_str::SmolStr;

/// Separator joining the two feature names of an interaction read.
pub const INTERACTION_SEPARATOR: char = '+';

/// A resolved feature name; `interaction` is set for composed `A+B` names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureIdentity {
    pub name: SmolStr,
    pub interaction: bool,
}

impl FeatureIdentity {
    pub fn single(name: &str) -> Self {
        Self {
            name: SmolStr::from(name),
            interaction: false,
        }
    }
}

/// Resolves feature (antibody) barcodes, and the optional second barcode of
/// interaction reads, against the feature legend.
pub struct FeatureResolver<'a> {
    dictionary: &'a FeatureDictionary,
    metric: DistanceMetric,
    max_dist: usize,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(dictionary: &'a FeatureDictionary, metric: DistanceMetric, max_dist: usize) -> Self {
        Self {
            dictionary,
            metric,
            max_dist,
        }
    }

    fn lookup(&self, observed: &str) -> Lookup<'a, SmolStr> {
        self.dictionary.lookup(observed, &self.metric, self.max_dist)
    }

    /// Resolve `primary`, then `secondary` if present. The primary feature tally
    /// is recorded as soon as it resolves, so it still counts when the secondary
    /// barcode later fails.
    pub fn resolve(
        &self,
        primary: Option<&str>,
        secondary: Option<&str>,
        report: &mut FilterReport,
    ) -> Option<FeatureIdentity> {
        let primary = primary?;

        let name = match self.lookup(primary) {
            Lookup::Exact(name) => {
                if let Some(f) = report.feature_block(false) {
                    f.direct += 1;
                    f.tally(name);
                }
                name
            }
            Lookup::Corrected(name) => {
                if let Some(f) = report.feature_block(false) {
                    f.corrected += 1;
                    f.tally(name);
                }
                name
            }
            Lookup::NoMatch => return None,
        };

        let Some(secondary) = secondary else {
            return Some(FeatureIdentity::single(name));
        };

        let (partner, corrected) = match self.lookup(secondary) {
            Lookup::Exact(partner) => (partner, false),
            Lookup::Corrected(partner) => (partner, true),
            Lookup::NoMatch => return None,
        };

        let composed = SmolStr::from(format!("{name}{INTERACTION_SEPARATOR}{partner}"));
        if let Some(inter) = report.feature_block(true) {
            if corrected {
                inter.corrected += 1;
            } else {
                inter.direct += 1;
            }
            inter.tally(&composed);
        }

        Some(FeatureIdentity {
            name: composed,
            interaction: true,
        })
    }
}
