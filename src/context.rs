use crate::barcode::{Axis, BarcodeLegend, FeatureLegend, Mode};
use crate::cli::FilterArgs;
use crate::count::SpotWhitelist;
use crate::report::FilterReport;
use anyhow::{Context, Error};
use log::info;
use smol_str::SmolStr;

/// Feature mode setup: the antibody legend and the spots allowed into the matrix.
#[derive(Debug)]
pub struct FeatureContext {
    pub legend: FeatureLegend,
    pub whitelist: SpotWhitelist,
    pub max_dist: usize,
    pub interact: bool,
}

impl FeatureContext {
    /// Legend feature names, followed by every interaction pair when `interact` is set.
    pub fn grid_features(&self) -> Vec<SmolStr> {
        let mut names = self.legend.names.clone();
        if self.interact {
            names.extend(self.legend.interaction_pairs());
        }
        names
    }
}

/// Everything built once before fan-out and shared read-only by all shards.
#[derive(Debug)]
pub struct FilterContext {
    pub mode: Mode,
    pub legend: BarcodeLegend,
    pub features: Option<FeatureContext>,
}

impl FilterContext {
    pub fn init_from_args(args: &FilterArgs) -> Result<Self, Error> {
        let legend = BarcodeLegend::from_path(&args.bc_file, args.mode)?;
        info!(
            "Loaded barcode legend with {} algorithm for axes {:?}",
            legend.metric,
            legend.axes.iter().map(|a| a.axis).collect::<Vec<Axis>>()
        );

        let features = match &args.feature_file {
            Some(feature_file) => {
                let legend = FeatureLegend::from_path(feature_file)?;
                let rna = args
                    .rna_dge_file
                    .as_ref()
                    .context("An RNA DGE matrix (-r) is required with a feature legend")?;
                let whitelist = SpotWhitelist::from_path(rna)?;
                info!(
                    "Loaded {} features and {} whitelisted spots",
                    legend.names.len(),
                    whitelist.len()
                );

                Some(FeatureContext {
                    legend,
                    whitelist,
                    max_dist: args.feature_dist,
                    interact: args.interact,
                })
            }
            None => None,
        };

        Ok(Self {
            mode: args.mode,
            legend,
            features,
        })
    }

    pub fn axes(&self) -> Vec<Axis> {
        self.legend.axes.iter().map(|a| a.axis).collect()
    }

    pub fn feature_mode(&self) -> bool {
        self.features.is_some()
    }

    /// A zeroed statistics accumulator shaped for this run.
    pub fn new_report(&self) -> FilterReport {
        match &self.features {
            Some(f) => FilterReport::new(&self.legend, Some(&f.legend), f.interact),
            None => FilterReport::new(&self.legend, None, false),
        }
    }
}
