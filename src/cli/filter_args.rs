use crate::barcode::Mode;
use anyhow::Error;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

const DEFAULT_EST_NUM_SPOTS: usize = 2500;
const DEFAULT_FEATURE_DIST: usize = 2;
static DEFAULT_THREADS: std::sync::LazyLock<usize> = std::sync::LazyLock::new(num_cpus::get);

#[derive(Parser, Debug)]
#[command(version, about, override_help = FILTER_HELP)]
pub struct FilterArgs {
    #[arg(short = 'i')]
    pub input: String,

    #[arg(short = 'n', long = "est-num-spots", default_value_t = DEFAULT_EST_NUM_SPOTS)]
    pub est_num_spots: usize,

    #[arg(short = 'd', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(short = 'T', long = "tmp-dir", default_value = ".")]
    pub tmp_dir: PathBuf,

    #[arg(short = 'b', long = "bc-file")]
    pub bc_file: PathBuf,

    #[arg(long = "store-discarded")]
    pub store_discarded: bool,

    #[arg(short = 'm', long = "multi")]
    pub multi: bool,

    #[arg(long = "mode", default_value_t = Mode::XDbit)]
    pub mode: Mode,

    #[arg(short = 'f', long = "feature-file")]
    pub feature_file: Option<PathBuf>,

    #[arg(short = 'r', long = "rna-dge-file")]
    pub rna_dge_file: Option<PathBuf>,

    #[arg(long = "interact")]
    pub interact: bool,

    #[arg(long = "feature-dist", default_value_t = DEFAULT_FEATURE_DIST)]
    pub feature_dist: usize,

    #[arg(short = 't', long = "threads", default_value_t = *DEFAULT_THREADS)]
    pub threads: usize,

    #[arg(short = 'q', long = "progress", default_value_t = false)]
    pub progress: bool,
}

impl FilterArgs {
    pub fn validate(&self) -> Result<(), Error> {
        if self.threads == 0 {
            anyhow::bail!("Invalid value 0 for -t/--threads! Choose at least one thread");
        }
        if self.est_num_spots == 0 {
            anyhow::bail!("Invalid value 0 for -n/--est-num-spots! Choose a positive number");
        }
        if !self.bc_file.is_file() {
            anyhow::bail!("Barcode legend {} does not exist", self.bc_file.display());
        }
        if self.feature_file.is_some() && self.rna_dge_file.is_none() {
            anyhow::bail!("-f/--feature-file requires -r/--rna-dge-file to define the spot list");
        }
        if self.interact && self.feature_file.is_none() {
            anyhow::bail!("--interact is only meaningful together with -f/--feature-file");
        }
        Ok(())
    }
}

impl std::fmt::Display for FilterArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n\
            {}: {}\n",
            "Input".purple(),
            self.input,
            "Mode".purple(),
            self.mode,
            "Barcode legend".purple(),
            self.bc_file.display(),
            "Outdir".purple(),
            self.out_dir.display(),
            "Tmp dir".purple(),
            self.tmp_dir.display(),
            "Split input".purple(),
            self.multi,
            "Estimated spots".purple(),
            self.est_num_spots,
            "Threads".purple(),
            self.threads,
            "Store discarded".purple(),
            self.store_discarded,
        )?;

        if let Some(feature_file) = &self.feature_file {
            write!(
                f,
                "{}: {}\n\
                {}: {:?}\n\
                {}: {}\n\
                {}: {}\n",
                "Feature legend".purple(),
                feature_file.display(),
                "RNA DGE matrix".purple(),
                self.rna_dge_file,
                "Feature distance".purple(),
                self.feature_dist,
                "Interactions".purple(),
                self.interact,
            )?;
        }

        Ok(())
    }
}

const FILTER_HELP: &str = r#"

dbitfilter: resolve spatial barcodes, filter reads and count antibody features

usage:
    dbitfilter -i [*.bam|<split dir>] -b <barcode legend.csv> [OPTIONS]

arguments:

    [[required]]:
    -i: input: an unaligned BAM with barcode tags, or with -m a directory of split x*.bam files
    -b, --bc-file: barcode legend (CSV) with WellPosition, Barcode, one column per axis,
        string_matching_algorithm and <axis>_maxdist columns

    [[barcodes]]:
    --mode: barcoding chemistry. Choose from:
        - xDbit: three axes X, Y and Z (tags XX, XY, XZ) [default]
        - Dbit-seq: two axes X and Y (tags XX, XY)
    -n, --est-num-spots: estimated number of spots, bounds the barcode rank sample [2500]

    [[features]]
    -f, --feature-file: feature legend (CSV) with Barcode and Feature columns. Enables feature
        counting from the XG (and XH) tags with UMIs from the XM tag.
    -r, --rna-dge-file: RNA DGE matrix (.txt or .txt.gz). Its header defines the spots that
        may enter the feature matrix. Required with -f.
    --interact: also count dual-probe reads (XH tag) as interaction features "A+B"
    --feature-dist: maximum distance for feature barcode correction [2]

    [[output]]
    -d, --out-dir: directory for logs, statistics and matrices [.]
    -T, --tmp-dir: directory for the filtered BAM and UMI dictionary [.]
    --store-discarded: write the names of discarded reads to discarded_reads.txt

    [[performance]]
    -m, --multi: process every x*.bam in the input directory as a separate shard, in parallel
    -t, --threads: number of threads. Defaults to # sys threads.

    [[misc]]
    -q, --progress: show a progress spinner per shard, prints to standard error.

"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = FilterArgs::try_parse_from(["dbitfilter", "-i", "in.bam", "-b", "legend.csv"])
            .unwrap();
        assert_eq!(args.mode, Mode::XDbit);
        assert_eq!(args.est_num_spots, 2500);
        assert_eq!(args.feature_dist, 2);
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(args.feature_file.is_none());
    }

    #[test]
    fn test_mode_names() {
        let args = FilterArgs::try_parse_from([
            "dbitfilter", "-i", "split", "-m", "-b", "legend.csv", "--mode", "Dbit-seq",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::DbitSeq);
        assert!(args.multi);
    }

    #[test]
    fn test_validate_feature_requirements() {
        let args = FilterArgs::try_parse_from([
            "dbitfilter", "-i", "in.bam", "-b", "Cargo.toml", "-f", "features.csv",
        ])
        .unwrap();
        assert!(args.validate().is_err());

        let args = FilterArgs::try_parse_from([
            "dbitfilter", "-i", "in.bam", "-b", "Cargo.toml", "--interact",
        ])
        .unwrap();
        assert!(args.validate().is_err());

        let args =
            FilterArgs::try_parse_from(["dbitfilter", "-i", "in.bam", "-b", "Cargo.toml"]).unwrap();
        assert!(args.validate().is_ok());
    }
}
