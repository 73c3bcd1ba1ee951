use crate::context::FilterContext;
use crate::count::{CountMatrix, DedupOutcome, UmiDeduplicator, UmiRegistry};
use crate::record::ReadRecord;
use crate::report::FilterReport;
use crate::resolve::{CoordinateResolver, FeatureIdentity, FeatureResolver, ResolvedCoordinate};
use smol_str::SmolStr;

/// A read that passed every stage, with everything needed to tag it for output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeptRead {
    pub coordinate: ResolvedCoordinate,
    pub spot: SmolStr,
    pub feature: Option<FeatureIdentity>,
    pub dedup: Option<DedupOutcome>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    UnresolvedAxis,
    UnresolvedFeature,
    MissingUmi,
    SpotNotInWhitelist,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Keep(KeptRead),
    Discard(DiscardReason),
}

struct FeatureStage<'a> {
    resolver: FeatureResolver<'a>,
    dedup: UmiDeduplicator<'a>,
}

/// Per-read state machine: axes, then feature, then UMI dedup, then the
/// keep/discard decision. Owns the mutable state of one shard.
pub struct ReadProcessor<'a> {
    coordinates: CoordinateResolver<'a>,
    features: Option<FeatureStage<'a>>,
    pub report: FilterReport,
}

impl<'a> ReadProcessor<'a> {
    pub fn new(ctx: &'a FilterContext) -> Self {
        let features = ctx.features.as_ref().map(|f| FeatureStage {
            resolver: FeatureResolver::new(&f.legend.dictionary, ctx.legend.metric, f.max_dist),
            dedup: UmiDeduplicator::new(&f.whitelist),
        });

        Self {
            coordinates: CoordinateResolver::new(&ctx.legend),
            features,
            report: ctx.new_report(),
        }
    }

    pub fn process(&mut self, read: &ReadRecord) -> ReadOutcome {
        self.report.total_count += 1;

        // every axis is attempted so that each one contributes its statistics
        let Some(coordinate) = self
            .coordinates
            .resolve(&read.axis_barcodes, &mut self.report)
        else {
            return ReadOutcome::Discard(DiscardReason::UnresolvedAxis);
        };
        let spot = coordinate.spot_key();

        let (feature, dedup) = match self.features.as_mut() {
            None => (None, None),
            Some(stage) => {
                let Some(feature) = stage.resolver.resolve(
                    read.feature.as_deref(),
                    read.interaction.as_deref(),
                    &mut self.report,
                ) else {
                    return ReadOutcome::Discard(DiscardReason::UnresolvedFeature);
                };

                let Some(umi) = read.umi.as_deref() else {
                    return ReadOutcome::Discard(DiscardReason::MissingUmi);
                };

                match stage.dedup.submit(&spot, &feature, umi, &mut self.report) {
                    DedupOutcome::SpotMissing => {
                        return ReadOutcome::Discard(DiscardReason::SpotNotInWhitelist)
                    }
                    outcome => (Some(feature), Some(outcome)),
                }
            }
        };

        self.report.total_count_kept += 1;

        ReadOutcome::Keep(KeptRead {
            coordinate,
            spot,
            feature,
            dedup,
        })
    }

    pub fn finish(self) -> (FilterReport, UmiRegistry, CountMatrix) {
        match self.features {
            Some(stage) => {
                let (registry, matrix) = stage.dedup.into_parts();
                (self.report, registry, matrix)
            }
            None => (self.report, UmiRegistry::new(), CountMatrix::new()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::barcode::{
        Axis, AxisLegend, BarcodeLegend, CoordDictionary, DistanceMetric, FeatureLegend, Mode,
        Well,
    };
    use crate::context::FeatureContext;
    use crate::count::SpotWhitelist;

    pub(crate) fn context(feature_mode: bool) -> FilterContext {
        let mut x = CoordDictionary::new();
        x.insert("AAAA", Well::new("A01", 0)).unwrap();
        x.insert("TTTT", Well::new("A02", 1)).unwrap();

        let mut y = CoordDictionary::new();
        y.insert("CCCC", Well::new("B01", 0)).unwrap();
        y.insert("GGGG", Well::new("B02", 1)).unwrap();

        let legend = BarcodeLegend {
            metric: DistanceMetric::Hamming,
            axes: vec![
                AxisLegend {
                    axis: Axis::X,
                    dictionary: x,
                    max_dist: 1,
                },
                AxisLegend {
                    axis: Axis::Y,
                    dictionary: y,
                    max_dist: 1,
                },
            ],
        };

        let features = feature_mode.then(|| {
            let legend = "Barcode,Feature\nACGTACGTAC,CD3\nTTGGCCAATT,CD4\n";
            FeatureContext {
                legend: FeatureLegend::from_reader(legend.as_bytes()).unwrap(),
                whitelist: ["0x1", "1x1"].into_iter().map(SmolStr::from).collect::<SpotWhitelist>(),
                max_dist: 2,
                interact: true,
            }
        });

        FilterContext {
            mode: Mode::DbitSeq,
            legend,
            features,
        }
    }

    pub(crate) fn read(
        x: Option<&str>,
        y: Option<&str>,
        feature: Option<&str>,
        interaction: Option<&str>,
        umi: Option<&str>,
    ) -> ReadRecord {
        ReadRecord {
            axis_barcodes: vec![x.map(SmolStr::from), y.map(SmolStr::from)],
            feature: feature.map(SmolStr::from),
            interaction: interaction.map(SmolStr::from),
            umi: umi.map(SmolStr::from),
        }
    }

    #[test]
    fn test_keep_without_feature_mode() {
        let ctx = context(false);
        let mut p = ReadProcessor::new(&ctx);

        match p.process(&read(Some("AAAT"), Some("GGGG"), None, None, None)) {
            ReadOutcome::Keep(kept) => {
                assert_eq!(kept.spot, "0x1");
                assert_eq!(kept.feature, None);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(p.report.total_count_kept, 1);
        assert_eq!(p.report.all_direct, 0);
    }

    #[test]
    fn test_missing_axis_tag_discards() {
        let ctx = context(false);
        let mut p = ReadProcessor::new(&ctx);

        assert_eq!(
            p.process(&read(Some("AAAA"), None, None, None, None)),
            ReadOutcome::Discard(DiscardReason::UnresolvedAxis)
        );
        assert_eq!(p.report.total_count, 1);
        assert_eq!(p.report.total_count_kept, 0);
        assert_eq!(p.report.axes[&Axis::Y].well_counts.values().sum::<u64>(), 0);

        let (_, _, matrix) = p.finish();
        assert_eq!(matrix.total(), 0);
    }

    #[test]
    fn test_duplicate_umi_is_kept_but_not_counted() {
        let ctx = context(true);
        let mut p = ReadProcessor::new(&ctx);
        let r = read(Some("AAAA"), Some("GGGG"), Some("ACGTACGTAC"), None, Some("ACGTACGT"));

        let first = p.process(&r);
        let second = p.process(&r);

        assert!(matches!(
            first,
            ReadOutcome::Keep(KeptRead {
                dedup: Some(DedupOutcome::Added),
                ..
            })
        ));
        assert!(matches!(
            second,
            ReadOutcome::Keep(KeptRead {
                dedup: Some(DedupOutcome::Duplicate),
                ..
            })
        ));

        let feats = p.report.features.clone().unwrap();
        assert_eq!(feats.added, 1);
        assert_eq!(feats.umi_found, 1);

        let (_, _, matrix) = p.finish();
        assert_eq!(matrix.get("CD3", "0x1"), 1);
    }

    #[test]
    fn test_spot_outside_whitelist_discards() {
        let ctx = context(true);
        let mut p = ReadProcessor::new(&ctx);

        // 1x0 resolves but is not in the RNA spot list
        assert_eq!(
            p.process(&read(Some("TTTT"), Some("CCCC"), Some("ACGTACGTAC"), None, Some("AAAA"))),
            ReadOutcome::Discard(DiscardReason::SpotNotInWhitelist)
        );
        assert_eq!(p.report.all_direct, 1);
        assert_eq!(p.report.total_count_kept, 0);
    }

    #[test]
    fn test_failed_interaction_keeps_axis_statistics() {
        let ctx = context(true);
        let mut p = ReadProcessor::new(&ctx);

        assert_eq!(
            p.process(&read(
                Some("AAAA"),
                Some("GGGG"),
                Some("ACGTACGTAC"),
                Some("NNNNNNNNNN"),
                Some("AAAA")
            )),
            ReadOutcome::Discard(DiscardReason::UnresolvedFeature)
        );
        assert_eq!(p.report.axes[&Axis::X].direct, 1);
        assert_eq!(p.report.total_count_kept, 0);
    }

    #[test]
    fn test_missing_umi_discards() {
        let ctx = context(true);
        let mut p = ReadProcessor::new(&ctx);

        assert_eq!(
            p.process(&read(Some("AAAA"), Some("GGGG"), Some("ACGTACGTAC"), None, None)),
            ReadOutcome::Discard(DiscardReason::MissingUmi)
        );
    }

    #[test]
    fn test_interaction_counted_separately() {
        let ctx = context(true);
        let mut p = ReadProcessor::new(&ctx);

        let outcome = p.process(&read(
            Some("TTTT"),
            Some("GGGG"),
            Some("ACGTACGTAC"),
            Some("TTGGCCAATT"),
            Some("AAAA"),
        ));
        let ReadOutcome::Keep(kept) = outcome else {
            panic!("interaction read was discarded");
        };
        assert_eq!(kept.spot, "1x1");
        assert_eq!(kept.feature.unwrap().name, "CD3+CD4");

        let inter = p.report.interact.clone().unwrap();
        assert_eq!(inter.added, 1);
        assert_eq!(inter.per_name["CD3+CD4"], 1);

        let (_, registry, matrix) = p.finish();
        assert_eq!(matrix.get("CD3+CD4", "1x1"), 1);
        assert!(registry.contains("1x1", "CD3+CD4", "AAAA"));
    }
}
