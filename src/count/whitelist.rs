use crate::utils::{open_text, TextKind};
use anyhow::{Context, Error};
use indexmap::IndexSet;
use smol_str::SmolStr;
use std::io::BufRead;
use std::path::Path;

/// Spot keys present in the companion RNA count table. Feature reads from any
/// other spot are never counted. Order follows the RNA table columns.
#[derive(Clone, Debug, Default)]
pub struct SpotWhitelist {
    spots: IndexSet<SmolStr>,
}

impl SpotWhitelist {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match TextKind::of(path) {
            Some(_) => Self::from_reader(open_text(path)?)
                .with_context(|| format!("Failed to read spot list from {}", path.display())),
            None => anyhow::bail!(
                "Wrong file format for RNA DGE matrix {} (neither .txt nor .txt.gz)",
                path.display()
            ),
        }
    }

    /// Take the spot identities from the header line of a tab separated count
    /// table; the first column holds gene names and is skipped.
    pub fn from_reader(mut src: impl BufRead) -> Result<Self, Error> {
        let mut header = String::new();
        src.read_line(&mut header)?;

        let spots = header
            .trim_end_matches(&['\n', '\r'][..])
            .split('\t')
            .skip(1)
            .filter(|s| !s.is_empty())
            .map(SmolStr::from)
            .collect();

        Ok(Self { spots })
    }

    pub fn contains(&self, spot: &str) -> bool {
        self.spots.contains(spot)
    }

    pub fn spots(&self) -> &IndexSet<SmolStr> {
        &self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}

impl FromIterator<SmolStr> for SpotWhitelist {
    fn from_iter<I: IntoIterator<Item = SmolStr>>(iter: I) -> Self {
        Self {
            spots: iter.into_iter().collect(),
        }
    }
}
