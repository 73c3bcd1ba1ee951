use crate::barcode::{Axis, BarcodeLegend, FeatureLegend};
use crate::cli::FilterArgs;
use anyhow::{Context, Error};
use colored::Colorize;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

const LOCALE: Locale = Locale::en;

pub const MATRIX_FEATURES_FILE: &str = "DGE_matrix_features.txt.gz";
pub const MATRIX_COMBINED_FILE: &str = "DGE_matrix_rna_with_features.txt.gz";
pub const REPORT_JSON_FILE: &str = "recording_dictionary.json";
pub const REPORT_JSON_COPY_FILE: &str = "record_dictionary.json";

/// Resolution outcomes for a single axis. These describe axis matching, not the
/// final keep decision: a read can count here and still be discarded later.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AxisCounts {
    pub direct: u64,
    pub corrected: u64,
    pub well_counts: BTreeMap<String, u64>,
}

impl AxisCounts {
    fn merge(&mut self, other: AxisCounts) {
        self.direct += other.direct;
        self.corrected += other.corrected;
        for (well, n) in other.well_counts {
            *self.well_counts.entry(well).or_insert(0) += n;
        }
    }
}

/// Counters for the feature (or interaction) stage of feature mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FeatureCounts {
    pub direct: u64,
    pub corrected: u64,
    pub spot_found: u64,
    pub spot_missing: u64,
    pub umi_found: u64,
    pub added: u64,
    #[serde(flatten)]
    pub per_name: BTreeMap<String, u64>,
}

impl FeatureCounts {
    fn with_names<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        Self {
            per_name: names.map(|n| (n.to_string(), 0)).collect(),
            ..Default::default()
        }
    }

    pub fn tally(&mut self, name: &str) {
        match self.per_name.get_mut(name) {
            Some(n) => *n += 1,
            None => {
                self.per_name.insert(name.to_string(), 1);
            }
        }
    }

    fn merge(&mut self, other: FeatureCounts) {
        self.direct += other.direct;
        self.corrected += other.corrected;
        self.spot_found += other.spot_found;
        self.spot_missing += other.spot_missing;
        self.umi_found += other.umi_found;
        self.added += other.added;
        for (name, n) in other.per_name {
            *self.per_name.entry(name).or_insert(0) += n;
        }
    }
}

/// Statistics accumulated by one shard, and after merging, by the whole run.
/// Serialized flat: axis blocks sit at the top level under their axis name and
/// feature names sit beside the counters of their block.
/// All counters only ever grow; merging is a field-by-field sum, so it is
/// commutative and associative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub total_count: u64,
    pub total_count_kept: u64,
    pub all_direct: u64,
    #[serde(flatten)]
    pub axes: BTreeMap<Axis, AxisCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interact: Option<FeatureCounts>,
}

impl FilterReport {
    /// An empty report with every known well, feature and (if `interact`) feature
    /// pair pre-registered at zero.
    pub fn new(legend: &BarcodeLegend, features: Option<&FeatureLegend>, interact: bool) -> Self {
        let axes = legend
            .axes
            .iter()
            .map(|a| {
                let well_counts = a
                    .dictionary
                    .values()
                    .map(|w| (w.label.to_string(), 0))
                    .collect();
                (
                    a.axis,
                    AxisCounts {
                        well_counts,
                        ..Default::default()
                    },
                )
            })
            .collect();

        let (features, interact) = match features {
            Some(f) => {
                let pairs = if interact {
                    f.interaction_pairs()
                } else {
                    Vec::new()
                };
                (
                    Some(FeatureCounts::with_names(f.names.iter().map(|n| n.as_str()))),
                    Some(FeatureCounts::with_names(pairs.iter().map(|n| n.as_str()))),
                )
            }
            None => (None, None),
        };

        Self {
            axes,
            features,
            interact,
            ..Default::default()
        }
    }

    pub fn record_axis(&mut self, axis: Axis, well: &str, corrected: bool) {
        let counts = self.axes.entry(axis).or_default();
        if corrected {
            counts.corrected += 1;
        } else {
            counts.direct += 1;
        }
        *counts.well_counts.entry(well.to_string()).or_insert(0) += 1;
    }

    /// The feature block for plain reads, or the interaction block for dual-probe reads.
    pub fn feature_block(&mut self, interaction: bool) -> Option<&mut FeatureCounts> {
        if interaction {
            self.interact.as_mut()
        } else {
            self.features.as_mut()
        }
    }

    pub fn merge(&mut self, other: FilterReport) {
        self.total_count += other.total_count;
        self.total_count_kept += other.total_count_kept;
        self.all_direct += other.all_direct;

        for (axis, counts) in other.axes {
            self.axes.entry(axis).or_default().merge(counts);
        }

        merge_block(&mut self.features, other.features);
        merge_block(&mut self.interact, other.interact);
    }

    pub fn write_json(&self, path: &Path) -> Result<(), Error> {
        let f = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(f), self)?;
        Ok(())
    }

    fn pct(&self, n: u64) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            n as f64 / self.total_count as f64 * 100.0
        }
    }

    /// Write the human readable filtering log: run parameters followed by every
    /// counter as an absolute number and a percentage of all reads.
    pub fn write_to_log_file(
        &self,
        path: &Path,
        args: &FilterArgs,
        legend: &BarcodeLegend,
        features: Option<&FeatureLegend>,
        elapsed: Duration,
    ) -> Result<(), Error> {
        let f = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut w = BufWriter::new(f);

        writeln!(
            w,
            "Barcode filtering log - based on {} algorithm\n\
            ---------------------------------------\n\
            Parameters:",
            legend.metric
        )?;
        writeln!(w, "Input bam: {}", args.input)?;
        writeln!(w, "Mode: {}", args.mode)?;
        writeln!(w, "Estimated number of spots: {}", args.est_num_spots)?;
        writeln!(w, "Output directory: {}", args.out_dir.display())?;
        writeln!(w, "Barcode legend file: {}", args.bc_file.display())?;

        writeln!(w, "Read {} entries", self.total_count)?;
        writeln!(
            w,
            "Found {} [{:.2}%] complete spot barcodes",
            self.all_direct,
            self.pct(self.all_direct)
        )?;

        for a in &legend.axes {
            let counts = self.axes.get(&a.axis).cloned().unwrap_or_default();
            writeln!(
                w,
                "Found {} [{:.2}%] expected {}-coordinates, with {} matching {} [{:.2}%] (distance: {})",
                counts.direct,
                self.pct(counts.direct),
                a.axis,
                legend.metric,
                counts.corrected,
                self.pct(counts.corrected),
                a.max_dist
            )?;
        }

        writeln!(
            w,
            "Retained {} [{:.2}%] reads after {} matching and filtering",
            self.total_count_kept,
            self.pct(self.total_count_kept),
            legend.metric
        )?;

        if let (Some(feats), Some(legend)) = (&self.features, features) {
            writeln!(w)?;
            writeln!(w, "Statistics about DGE matrix generation for feature reads:")?;
            if let Some(rna) = &args.rna_dge_file {
                writeln!(w, "RNA spot list retrieved from: {}", rna.display())?;
            }
            self.write_block(&mut w, feats, args.feature_dist)?;

            for (barcode, name) in legend.entries() {
                writeln!(
                    w,
                    "Antibody feature {} ({}) was found {} times",
                    name,
                    barcode,
                    feats.per_name.get(name.as_str()).copied().unwrap_or(0)
                )?;
            }

            if let (true, Some(inter)) = (args.interact, &self.interact) {
                writeln!(w, "-------------------------------")?;
                writeln!(w, "Interaction reads")?;
                self.write_block(&mut w, inter, args.feature_dist)?;
                for (name, n) in &inter.per_name {
                    writeln!(w, "Interaction feature {name} was found {n} times")?;
                }
            }

            writeln!(
                w,
                "Feature spot-count matrix was saved into {}.",
                args.out_dir.join(MATRIX_FEATURES_FILE).display()
            )?;
            writeln!(
                w,
                "Combined spot-count matrix was saved into {}.",
                args.out_dir.join(MATRIX_COMBINED_FILE).display()
            )?;
        }

        writeln!(w, "Elapsed time for filtering: {:.2?}", elapsed)?;
        w.flush()?;
        Ok(())
    }

    fn write_block(
        &self,
        w: &mut impl Write,
        block: &FeatureCounts,
        feature_dist: usize,
    ) -> Result<(), Error> {
        writeln!(
            w,
            "Found {} [{:.2}%] expected feature barcodes",
            block.direct,
            self.pct(block.direct)
        )?;
        writeln!(
            w,
            "Found {} [{:.2}%] expected feature barcodes with distance {}",
            block.corrected,
            self.pct(block.corrected),
            feature_dist
        )?;
        writeln!(
            w,
            "Found {} [{:.2}%] complete spot barcodes in RNA spot list",
            block.spot_found,
            self.pct(block.spot_found)
        )?;
        writeln!(
            w,
            "Found {} [{:.2}%] complete spot barcodes missing from RNA spot list",
            block.spot_missing,
            self.pct(block.spot_missing)
        )?;
        writeln!(
            w,
            "Found {} [{:.2}%] cases where UMI was found directly in UMI list and was not added to DGE matrix.",
            block.umi_found,
            self.pct(block.umi_found)
        )?;
        writeln!(
            w,
            "Found {} [{:.2}%] unique UMIs with correct spot and feature barcode that were added to the DGE matrix",
            block.added,
            self.pct(block.added)
        )?;
        Ok(())
    }
}

fn merge_block(into: &mut Option<FeatureCounts>, other: Option<FeatureCounts>) {
    match (into.as_mut(), other) {
        (Some(a), Some(b)) => a.merge(b),
        (None, Some(b)) => *into = Some(b),
        (_, None) => (),
    }
}

// printed after the run completes
impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {}\n\
            {}: {}\n\
            {}: {}",
            "Input reads".cyan(),
            self.total_count.to_formatted_string(&LOCALE),
            "Reads with all barcodes matched directly".cyan(),
            self.all_direct.to_formatted_string(&LOCALE),
            "Reads retained".cyan(),
            self.total_count_kept.to_formatted_string(&LOCALE),
        )?;

        for (axis, counts) in &self.axes {
            write!(
                f,
                "\n{}: {} direct, {} corrected",
                format!("{axis}-coordinate").cyan(),
                counts.direct.to_formatted_string(&LOCALE),
                counts.corrected.to_formatted_string(&LOCALE),
            )?;
        }

        if let Some(feats) = &self.features {
            write!(
                f,
                "\n{}: {} direct, {} corrected, {} added to matrix, {} duplicate UMIs",
                "Features".cyan(),
                feats.direct.to_formatted_string(&LOCALE),
                feats.corrected.to_formatted_string(&LOCALE),
                feats.added.to_formatted_string(&LOCALE),
                feats.umi_found.to_formatted_string(&LOCALE),
            )?;
        }

        if let Some(inter) = self.interact.as_ref().filter(|i| i.direct + i.corrected > 0) {
            write!(
                f,
                "\n{}: {} direct, {} corrected, {} added to matrix, {} duplicate UMIs",
                "Interactions".cyan(),
                inter.direct.to_formatted_string(&LOCALE),
                inter.corrected.to_formatted_string(&LOCALE),
                inter.added.to_formatted_string(&LOCALE),
                inter.umi_found.to_formatted_string(&LOCALE),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ResultMerger;
    use clap::Parser;
    use std::fs::{create_dir_all, read_to_string};

    const LEGEND: &str = "\
WellPosition,Barcode,X,Y,string_matching_algorithm,X_maxdist,Y_maxdist
A1,AAAA,0,,hamming,1,1
A2,TTTT,1,,,,
B1,CCCC,,0,,,
B2,GGGG,,1,,,
";
    const FEATURES: &str = "Barcode,Feature\nACGTACGTAC,CD3\nTTGGCCAATT,CD4\nGGGGCCCCAA,CD8\n";

    fn legends() -> (BarcodeLegend, FeatureLegend) {
        (
            BarcodeLegend::from_reader(LEGEND.as_bytes(), crate::barcode::Mode::DbitSeq).unwrap(),
            FeatureLegend::from_reader(FEATURES.as_bytes()).unwrap(),
        )
    }

    fn zeroed(keys: &[&str]) -> BTreeMap<String, u64> {
        keys.iter().map(|k| (k.to_string(), 0)).collect()
    }

    fn report(direct: u64, corrected: u64) -> FilterReport {
        let mut r = FilterReport::default();
        r.total_count = direct + corrected;
        for _ in 0..direct {
            r.record_axis(Axis::X, "A01", false);
        }
        for _ in 0..corrected {
            r.record_axis(Axis::X, "B02", true);
        }
        r
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut a = report(10, 3);
        a.merge(report(15, 2));

        let x = &a.axes[&Axis::X];
        assert_eq!(x.direct, 25);
        assert_eq!(x.corrected, 5);
        assert_eq!(x.well_counts["A01"], 25);
        assert_eq!(x.well_counts["B02"], 5);
        assert_eq!(a.total_count, 30);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let parts = [report(1, 4), report(7, 0), report(2, 2)];

        let mut forward = FilterReport::default();
        parts.iter().cloned().for_each(|p| forward.merge(p));

        let mut backward = FilterReport::default();
        parts.iter().rev().cloned().for_each(|p| backward.merge(p));

        let mut grouped = parts[1].clone();
        grouped.merge(parts[2].clone());
        let mut regrouped = parts[0].clone();
        regrouped.merge(grouped);

        assert_eq!(forward, backward);
        assert_eq!(forward, regrouped);
    }

    #[test]
    fn test_merge_feature_blocks() {
        let mut a = FilterReport::default();
        let mut feats = FeatureCounts::default();
        feats.added = 2;
        feats.tally("CD3");
        a.features = Some(feats.clone());

        let mut b = FilterReport::default();
        feats.tally("CD4");
        b.features = Some(feats);

        a.merge(b);
        let merged = a.features.unwrap();
        assert_eq!(merged.added, 4);
        assert_eq!(merged.per_name["CD3"], 2);
        assert_eq!(merged.per_name["CD4"], 1);
    }

    #[test]
    fn test_new_registers_every_well_and_pair() {
        let (legend, features) = legends();
        let report = FilterReport::new(&legend, Some(&features), true);

        assert_eq!(report.axes[&Axis::X].well_counts, zeroed(&["A01", "A02"]));
        assert_eq!(report.axes[&Axis::Y].well_counts, zeroed(&["B01", "B02"]));
        assert_eq!(
            report.features.as_ref().unwrap().per_name,
            zeroed(&["CD3", "CD4", "CD8"])
        );
        assert_eq!(
            report.interact.as_ref().unwrap().per_name,
            zeroed(&["CD3+CD4", "CD3+CD8", "CD4+CD8"])
        );

        let merged = ResultMerger::merge_all(report.clone(), Vec::new());
        assert_eq!(merged.report, report);
    }

    #[test]
    fn test_no_pairs_without_interact() {
        let (legend, features) = legends();
        let report = FilterReport::new(&legend, Some(&features), false);
        assert!(report.interact.unwrap().per_name.is_empty());
    }

    #[test]
    fn test_write_json_is_flat() {
        let (legend, features) = legends();
        let mut report = FilterReport::new(&legend, Some(&features), true);
        report.total_count = 3;
        report.record_axis(Axis::X, "A02", true);
        if let Some(f) = report.feature_block(false) {
            f.tally("CD4");
        }

        let dir = std::env::temp_dir().join("dbitfilter_report_json_test");
        create_dir_all(&dir).unwrap();
        let path = dir.join(REPORT_JSON_FILE);
        report.write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&read_to_string(&path).unwrap()).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        for key in ["total_count", "total_count_kept", "all_direct", "X", "Y", "features", "interact"] {
            assert!(keys.contains(&key), "missing key {key}");
        }
        assert!(!keys.contains(&"axes"));

        assert_eq!(json["total_count"], 3);
        assert_eq!(json["X"]["corrected"], 1);
        assert_eq!(json["X"]["well_counts"]["A02"], 1);
        assert_eq!(json["Y"]["well_counts"]["B01"], 0);
        assert_eq!(json["features"]["CD4"], 1);
        assert_eq!(json["features"]["CD8"], 0);
        assert_eq!(json["interact"]["CD3+CD8"], 0);
    }

    #[test]
    fn test_write_json_without_features() {
        let (legend, _) = legends();
        let report = FilterReport::new(&legend, None, false);

        let dir = std::env::temp_dir().join("dbitfilter_report_json_plain_test");
        create_dir_all(&dir).unwrap();
        let path = dir.join(REPORT_JSON_FILE);
        report.write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&read_to_string(&path).unwrap()).unwrap();
        assert!(json.get("features").is_none());
        assert!(json.get("interact").is_none());
        assert!(json.get("X").is_some());
    }

    #[test]
    fn test_write_to_log_file() {
        let (legend, features) = legends();
        let mut report = FilterReport::new(&legend, Some(&features), true);
        report.total_count = 4;
        report.total_count_kept = 2;
        report.all_direct = 1;
        report.record_axis(Axis::X, "A01", false);
        if let Some(f) = report.feature_block(false) {
            f.direct += 1;
            f.added += 1;
            f.tally("CD3");
        }

        let args = FilterArgs::try_parse_from([
            "dbitfilter", "-i", "in.bam", "-b", "legend.csv", "--mode", "Dbit-seq", "-f",
            "features.csv", "-r", "DGE.txt.gz", "--interact",
        ])
        .unwrap();

        let dir = std::env::temp_dir().join("dbitfilter_report_log_test");
        create_dir_all(&dir).unwrap();
        let path = dir.join("filtering_log.txt");
        report
            .write_to_log_file(&path, &args, &legend, Some(&features), Duration::from_secs(2))
            .unwrap();

        let text = read_to_string(&path).unwrap();
        assert!(text.starts_with("Barcode filtering log - based on hamming algorithm"));
        assert!(text.contains("Mode: Dbit-seq"));
        assert!(text.contains("Read 4 entries"));
        assert!(text.contains("Found 1 [25.00%] complete spot barcodes"));
        assert!(text.contains("Found 1 [25.00%] expected X-coordinates"));
        assert!(text.contains("Retained 2 [50.00%] reads"));
        assert!(text.contains("RNA spot list retrieved from: DGE.txt.gz"));
        assert!(text.contains("Antibody feature CD3 (ACGTACGTAC) was found 1 times"));
        assert!(text.contains("Antibody feature CD8 (GGGGCCCCAA) was found 0 times"));
        assert!(text.contains("Interaction feature CD4+CD8 was found 0 times"));
        assert!(text.contains("Elapsed time for filtering"));
    }
}
