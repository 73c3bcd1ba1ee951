use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// One coordinate dimension of the spatial barcode scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    /// BAM tag holding the raw barcode for this axis; overwritten with the
    /// resolved coordinate on output.
    pub fn tag(&self) -> &'static [u8; 2] {
        match self {
            Axis::X => b"XX",
            Axis::Y => b"XY",
            Axis::Z => b"XZ",
        }
    }

    /// Legend column holding the maximum distance for this axis.
    pub fn maxdist_column(&self) -> String {
        format!("{}_maxdist", self.name())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The barcoding chemistry, which fixes the active axis set for a run.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    #[value(name = "xDbit")]
    XDbit,
    #[value(name = "Dbit-seq")]
    DbitSeq,
}

impl Mode {
    pub fn axes(&self) -> &'static [Axis] {
        match self {
            Mode::XDbit => &[Axis::X, Axis::Y, Axis::Z],
            Mode::DbitSeq => &[Axis::X, Axis::Y],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::XDbit => write!(f, "xDbit"),
            Mode::DbitSeq => write!(f, "Dbit-seq"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_axes() {
        assert_eq!(Mode::XDbit.axes(), &[Axis::X, Axis::Y, Axis::Z]);
        assert_eq!(Mode::DbitSeq.axes(), &[Axis::X, Axis::Y]);
    }

    #[test]
    fn test_axis_tags() {
        assert_eq!(Axis::Z.tag(), b"XZ");
        assert_eq!(Axis::Y.maxdist_column(), "Y_maxdist");
    }
}
