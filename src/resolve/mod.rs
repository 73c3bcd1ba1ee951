pub mod coordinate;
pub mod feature;

pub use crate::resolve::{
    coordinate::{CoordinateResolver, ResolvedCoordinate},
    feature::{FeatureIdentity, FeatureResolver},
};
