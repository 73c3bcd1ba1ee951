pub mod axis;
pub mod dictionary;
pub mod distance;
pub mod legend;

pub use crate::barcode::{
    axis::{Axis, Mode},
    dictionary::{CoordDictionary, FeatureDictionary, Lookup, Well},
    distance::DistanceMetric,
    legend::{AxisLegend, BarcodeLegend, FeatureLegend},
};
