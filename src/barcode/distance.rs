use anyhow::Error;
use std::fmt;
use std::str::FromStr;
use strsim::{hamming, levenshtein};

/// A string comparison strategy used for barcode error correction.
///
/// `None` means the two strings cannot be compared at all (e.g. Hamming on
/// strings of different length) and is treated as an infinite distance.
pub trait Distance: Sync {
    fn distance(&self, observed: &str, expected: &str) -> Option<usize>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceMetric {
    Hamming,
    Levenshtein,
}

impl Distance for DistanceMetric {
    fn distance(&self, observed: &str, expected: &str) -> Option<usize> {
        match self {
            DistanceMetric::Hamming => hamming(observed, expected).ok(),
            DistanceMetric::Levenshtein => Some(levenshtein(observed, expected)),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hamming" => Ok(DistanceMetric::Hamming),
            "levenshtein" => Ok(DistanceMetric::Levenshtein),
            other => anyhow::bail!(
                "Unknown string matching algorithm '{other}'; choose from hamming or levenshtein."
            ),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistanceMetric::Hamming => write!(f, "hamming"),
            DistanceMetric::Levenshtein => write!(f, "levenshtein"),
        }
    }
}

/// All dictionary entries within the distance threshold of an observed barcode,
/// as (entry index, distance) pairs in dictionary order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MatchSet {
    hits: Vec<(usize, usize)>,
}

impl MatchSet {
    pub fn collect<'a, D: Distance + ?Sized>(
        observed: &str,
        keys: impl Iterator<Item = &'a str>,
        metric: &D,
        threshold: usize,
    ) -> Self {
        let hits = keys
            .enumerate()
            .filter_map(|(i, key)| match metric.distance(observed, key) {
                Some(d) if d <= threshold => Some((i, d)),
                _ => None,
            })
            .collect();

        Self { hits }
    }

    #[cfg(test)]
    pub fn from_hits(hits: Vec<(usize, usize)>) -> Self {
        Self { hits }
    }

    /// The single qualifying entry, if there is exactly one. Both an empty and
    /// an ambiguous match set yield `None`.
    pub fn unique(&self) -> Option<usize> {
        match self.hits.as_slice() {
            [(idx, _)] => Some(*idx),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
