use crate::barcode::Axis;
use crate::processor::KeptRead;
use anyhow::{Context, Error};
use rust_htslib::{bam, bam::record::Aux};
use smol_str::SmolStr;

pub const FEATURE_TAG: &[u8; 2] = b"XG";
pub const INTERACTION_TAG: &[u8; 2] = b"XH";
pub const UMI_TAG: &[u8; 2] = b"XM";
pub const SPOT_TAG: &[u8; 2] = b"XC";
pub const FEATURE_NAME_TAG: &[u8; 2] = b"gn";

/// The fields of a read the engine consumes, each present or absent. A missing
/// tag never fails extraction; it simply leaves the field `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadRecord {
    /// observed barcode per active axis, in axis order
    pub axis_barcodes: Vec<Option<SmolStr>>,
    pub feature: Option<SmolStr>,
    pub interaction: Option<SmolStr>,
    pub umi: Option<SmolStr>,
}

/// The record interface lets the shard runner work on BAM records as well as on
/// in-memory records. Implementors only provide string tag access; extraction
/// and output tagging are shared.
pub trait TaggedRecord {
    fn read_id(&self) -> &[u8];
    fn string_tag(&self, tag: &[u8]) -> Option<SmolStr>;
    fn set_string_tag(&mut self, tag: &[u8], value: &str) -> Result<(), Error>;

    fn to_read_record(&self, axes: &[Axis], feature_mode: bool) -> ReadRecord {
        let axis_barcodes = axes.iter().map(|a| self.string_tag(a.tag())).collect();

        if feature_mode {
            ReadRecord {
                axis_barcodes,
                feature: self.string_tag(FEATURE_TAG),
                interaction: self.string_tag(INTERACTION_TAG),
                umi: self.string_tag(UMI_TAG),
            }
        } else {
            ReadRecord {
                axis_barcodes,
                ..Default::default()
            }
        }
    }

    /// Overwrite each axis tag with its coordinate, then add the spot key and,
    /// in feature mode, the feature name.
    fn tag_kept(&mut self, axes: &[Axis], kept: &KeptRead) -> Result<(), Error> {
        for (axis, coord) in axes.iter().zip(kept.coordinate.coords.iter()) {
            self.set_string_tag(axis.tag(), &coord.to_string())?;
        }
        self.set_string_tag(SPOT_TAG, &kept.spot)?;
        if let Some(feature) = &kept.feature {
            self.set_string_tag(FEATURE_NAME_TAG, &feature.name)?;
        }
        Ok(())
    }
}

/// A wrapper around [rust_htslib::bam::Record]
pub type BamRecord = bam::Record;

impl TaggedRecord for BamRecord {
    fn read_id(&self) -> &[u8] {
        self.qname()
    }

    fn string_tag(&self, tag: &[u8]) -> Option<SmolStr> {
        match self.aux(tag) {
            Ok(Aux::String(s)) => Some(SmolStr::from(s)),
            _ => None,
        }
    }

    fn set_string_tag(&mut self, tag: &[u8], value: &str) -> Result<(), Error> {
        // htslib refuses to push a tag that already exists
        if self.aux(tag).is_ok() {
            self.remove_aux(tag)
                .with_context(|| format!("Failed to replace tag {}", String::from_utf8_lossy(tag)))?;
        }
        self.push_aux(tag, Aux::String(value))
            .with_context(|| format!("Failed to set tag {}", String::from_utf8_lossy(tag)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{FeatureIdentity, ResolvedCoordinate};

    fn create_bam_record(qname: &str, tags: &[(&str, &str)]) -> BamRecord {
        let mut record = BamRecord::new();
        record.set(qname.as_bytes(), None, b"ACGT", b"####");
        for (tag, value) in tags {
            record.push_aux(tag.as_bytes(), Aux::String(value)).unwrap();
        }
        record
    }

    #[test]
    fn test_extract_missing_tags() {
        let record = create_bam_record("read1", &[("XX", "AAAA"), ("XM", "ACGTACGT")]);
        let rr = record.to_read_record(&[Axis::X, Axis::Y], true);

        assert_eq!(rr.axis_barcodes, vec![Some(SmolStr::from("AAAA")), None]);
        assert_eq!(rr.umi.as_deref(), Some("ACGTACGT"));
        assert_eq!(rr.feature, None);
        assert_eq!(rr.interaction, None);
    }

    #[test]
    fn test_feature_tags_ignored_without_feature_mode() {
        let record = create_bam_record("read1", &[("XG", "ACGT")]);
        let rr = record.to_read_record(&[Axis::X], false);
        assert_eq!(rr.feature, None);
    }

    #[test]
    fn test_tag_kept_overwrites_axis_tags() {
        let mut record = create_bam_record("read1", &[("XX", "AAAA"), ("XY", "CCCC")]);
        let kept = KeptRead {
            coordinate: ResolvedCoordinate { coords: vec![4, 7] },
            spot: SmolStr::from("4x7"),
            feature: Some(FeatureIdentity::single("CD3")),
            dedup: None,
        };

        record.tag_kept(&[Axis::X, Axis::Y], &kept).unwrap();

        assert_eq!(record.string_tag(b"XX").as_deref(), Some("4"));
        assert_eq!(record.string_tag(b"XY").as_deref(), Some("7"));
        assert_eq!(record.string_tag(b"XC").as_deref(), Some("4x7"));
        assert_eq!(record.string_tag(b"gn").as_deref(), Some("CD3"));
        assert_eq!(record.read_id(), b"read1");
    }
}
