use crate::barcode::{AxisLegend, BarcodeLegend, Lookup, Well};
use crate::report::FilterReport;
use smol_str::SmolStr;

/// Separator between per-axis coordinates in a spot key.
pub const SPOT_KEY_SEPARATOR: &str = "x";

#[derive(Debug, PartialEq, Eq)]
pub enum AxisMatch<'a> {
    Exact(&'a Well),
    Corrected(&'a Well),
    NoMatch,
}

/// Per-axis integer coordinates of a read whose axes all resolved, in axis order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCoordinate {
    pub coords: Vec<i64>,
}

impl ResolvedCoordinate {
    /// The stable identity of the spot, e.g. `3x10x0`.
    pub fn spot_key(&self) -> SmolStr {
        let parts: Vec<String> = self.coords.iter().map(|c| c.to_string()).collect();
        SmolStr::from(parts.join(SPOT_KEY_SEPARATOR))
    }
}

/// Resolves the observed axis barcodes of a read to a spatial coordinate.
pub struct CoordinateResolver<'a> {
    legend: &'a BarcodeLegend,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(legend: &'a BarcodeLegend) -> Self {
        Self { legend }
    }

    pub fn resolve_axis(&self, axis: &'a AxisLegend, observed: Option<&str>) -> AxisMatch<'a> {
        // a read without the tag cannot be salvaged
        let Some(observed) = observed else {
            return AxisMatch::NoMatch;
        };

        match axis
            .dictionary
            .lookup(observed, &self.legend.metric, axis.max_dist)
        {
            Lookup::Exact(w) => AxisMatch::Exact(w),
            Lookup::Corrected(w) => AxisMatch::Corrected(w),
            Lookup::NoMatch => AxisMatch::NoMatch,
        }
    }

    /// Resolve every axis, recording each axis outcome in `report` even after an
    /// earlier axis has failed. `barcodes` holds the observed barcode for each
    /// axis in legend order.
    pub fn resolve(
        &self,
        barcodes: &[Option<SmolStr>],
        report: &mut FilterReport,
    ) -> Option<ResolvedCoordinate> {
        let mut coords = Vec::with_capacity(self.legend.axes.len());
        let mut all_found = true;
        let mut all_direct = true;

        for (i, axis) in self.legend.axes.iter().enumerate() {
            let observed = barcodes.get(i).and_then(|b| b.as_deref());

            match self.resolve_axis(axis, observed) {
                AxisMatch::Exact(w) => {
                    report.record_axis(axis.axis, &w.label, false);
                    coords.push(w.coord);
                }
                AxisMatch::Corrected(w) => {
                    report.record_axis(axis.axis, &w.label, true);
                    coords.push(w.coord);
                    all_direct = false;
                }
                AxisMatch::NoMatch => {
                    all_found = false;
                    all_direct = false;
                }
            }
        }

        if all_direct {
            report.all_direct += 1;
        }

        if all_found {
            Some(ResolvedCoordinate { coords })
        } else {
            None
        }
    }
}
