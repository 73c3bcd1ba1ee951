use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use num_format::{Locale, ToFormattedString};
use std::time::Duration;

pub fn make_shard_spinner(multi: &MultiProgress, shard_name: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{prefix}:\t{spinner.white} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let bar = multi.add(ProgressBar::new_spinner().with_style(style));
    bar.set_prefix(shard_name.to_string());
    bar.enable_steady_tick(Duration::from_millis(200));
    bar
}

/// Spinner shown for one shard when `-q/--progress` is set, a no-op otherwise.
pub struct ShardProgress {
    bar: Option<ProgressBar>,
}

impl ShardProgress {
    pub fn new(multi: Option<&MultiProgress>, shard_name: &str) -> Self {
        Self {
            bar: multi.map(|m| make_shard_spinner(m, shard_name)),
        }
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn update(&self, reads: u64, kept: u64) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "{} reads, {} kept",
                reads.to_formatted_string(&Locale::en),
                kept.to_formatted_string(&Locale::en)
            ));
        }
    }

    pub fn finish(&self, reads: u64, kept: u64) {
        if let Some(bar) = &self.bar {
            self.update(reads, kept);
            bar.finish();
        }
    }
}
