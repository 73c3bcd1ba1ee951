use crate::barcode::distance::{Distance, MatchSet};
use anyhow::Error;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// A plate well together with the spatial coordinate its barcode encodes on one axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Well {
    pub label: SmolStr,
    pub coord: i64,
}

impl Well {
    pub fn new(label: &str, coord: i64) -> Self {
        Self {
            label: SmolStr::from(label),
            coord,
        }
    }
}

/// Outcome of looking an observed barcode up in a [BarcodeDictionary].
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a, V> {
    Exact(&'a V),
    Corrected(&'a V),
    NoMatch,
}

/// An immutable map of expected barcodes, built once from a legend and shared
/// read-only by every shard. Insertion order follows the legend and is the
/// order in which candidates are scanned during correction.
#[derive(Clone, Debug)]
pub struct BarcodeDictionary<V> {
    entries: IndexMap<SmolStr, V>,
}

pub type CoordDictionary = BarcodeDictionary<Well>;
pub type FeatureDictionary = BarcodeDictionary<SmolStr>;

impl<V> Default for BarcodeDictionary<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> BarcodeDictionary<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, barcode: &str, value: V) -> Result<(), Error> {
        if self.entries.contains_key(barcode) {
            anyhow::bail!("Barcode {barcode} is listed more than once in the legend");
        }
        self.entries.insert(SmolStr::from(barcode), value);
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, barcode: &str) -> Option<&V> {
        self.entries.get(barcode)
    }

    /// Exact lookup first; on a miss, scan every key and accept the entry only
    /// if it is the single key within `threshold` of the observed barcode.
    pub fn lookup<D: Distance + ?Sized>(
        &self,
        observed: &str,
        metric: &D,
        threshold: usize,
    ) -> Lookup<'_, V> {
        if let Some(v) = self.entries.get(observed) {
            return Lookup::Exact(v);
        }

        let candidates = MatchSet::collect(
            observed,
            self.entries.keys().map(|k| k.as_str()),
            metric,
            threshold,
        );

        match candidates.unique() {
            Some(idx) => match self.entries.get_index(idx) {
                Some((_, v)) => Lookup::Corrected(v),
                None => Lookup::NoMatch,
            },
            None => Lookup::NoMatch,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &V)> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
