use crate::barcode::axis::{Axis, Mode};
use crate::barcode::dictionary::{CoordDictionary, FeatureDictionary, Well};
use crate::barcode::distance::DistanceMetric;
use anyhow::{Context, Error};
use csv::StringRecord;
use serde::Deserialize;
use smol_str::SmolStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const WELL_COLUMN: &str = "WellPosition";
const BARCODE_COLUMN: &str = "Barcode";
const ALGORITHM_COLUMN: &str = "string_matching_algorithm";

/// Expected barcodes and correction threshold for one axis.
#[derive(Debug)]
pub struct AxisLegend {
    pub axis: Axis,
    pub dictionary: CoordDictionary,
    pub max_dist: usize,
}

/// Everything the engine takes from the spatial barcode legend: one dictionary per
/// active axis and the string matching algorithm shared by all of them.
#[derive(Debug)]
pub struct BarcodeLegend {
    pub metric: DistanceMetric,
    pub axes: Vec<AxisLegend>,
}

/// Pad the column part of a well label to two digits, e.g. `A1` -> `A01`.
pub fn normalize_well(well: &str) -> Result<SmolStr, Error> {
    let well = well.trim();
    let mut chars = well.chars();
    let row = chars
        .next()
        .with_context(|| "Empty well position in barcode legend")?;
    let col = chars.as_str();
    if col.is_empty() {
        anyhow::bail!("Well position {well} has no column number");
    }
    Ok(SmolStr::from(format!("{row}{col:0>2}")))
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, Error> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("Barcode legend is missing required column '{name}'"))
}

// legends written by pandas store integers as floats once a column contains blanks
fn parse_integer(cell: &str) -> Result<Option<i64>, Error> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Ok(Some(v));
    }
    let v = cell
        .parse::<f64>()
        .with_context(|| format!("Invalid integer '{cell}' in barcode legend"))?;
    if v.fract() != 0.0 {
        anyhow::bail!("Invalid integer '{cell}' in barcode legend");
    }
    Ok(Some(v as i64))
}

impl BarcodeLegend {
    pub fn from_path(path: &Path, mode: Mode) -> Result<Self, Error> {
        let f = File::open(path)
            .with_context(|| format!("Failed to open barcode legend {}", path.display()))?;
        Self::from_reader(f, mode)
            .with_context(|| format!("Failed to load barcode legend {}", path.display()))
    }

    pub fn from_reader(src: impl Read, mode: Mode) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new().delimiter(b',').from_reader(src);
        let headers = reader.headers()?.clone();

        let well_idx = column_index(&headers, WELL_COLUMN)?;
        let bc_idx = column_index(&headers, BARCODE_COLUMN)?;
        let alg_idx = column_index(&headers, ALGORITHM_COLUMN)?;

        let mut axis_cols = Vec::with_capacity(mode.axes().len());
        for axis in mode.axes() {
            axis_cols.push((
                *axis,
                column_index(&headers, axis.name())?,
                column_index(&headers, &axis.maxdist_column())?,
            ));
        }

        let mut metric: Option<DistanceMetric> = None;
        let mut axes: Vec<AxisLegend> = Vec::with_capacity(axis_cols.len());

        for (i, result) in reader.records().enumerate() {
            let record = result?;

            // settings are taken from the first row only
            if i == 0 {
                metric = Some(record.get(alg_idx).unwrap_or_default().parse()?);

                for (axis, _, dist_idx) in &axis_cols {
                    let max_dist = parse_integer(record.get(*dist_idx).unwrap_or_default())?
                        .with_context(|| {
                            format!("Missing {} in first legend row", axis.maxdist_column())
                        })?;
                    if max_dist < 0 {
                        anyhow::bail!("{} must not be negative", axis.maxdist_column());
                    }
                    axes.push(AxisLegend {
                        axis: *axis,
                        dictionary: CoordDictionary::new(),
                        max_dist: max_dist as usize,
                    });
                }
            }

            let barcode = record.get(bc_idx).unwrap_or_default().trim();
            if barcode.is_empty() {
                continue;
            }
            let well = normalize_well(record.get(well_idx).unwrap_or_default())?;

            for ((_, coord_idx, _), axis_legend) in axis_cols.iter().zip(axes.iter_mut()) {
                if let Some(coord) = parse_integer(record.get(*coord_idx).unwrap_or_default())? {
                    axis_legend.dictionary.insert(
                        barcode,
                        Well {
                            label: well.clone(),
                            coord,
                        },
                    )?;
                }
            }
        }

        let metric = metric.with_context(|| "Barcode legend contains no rows")?;

        for axis_legend in &axes {
            if axis_legend.dictionary.is_empty() {
                anyhow::bail!(
                    "Barcode legend has no barcodes for the {}-coordinate required by mode {mode}",
                    axis_legend.axis
                );
            }
        }

        Ok(Self { metric, axes })
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCsvRow {
    #[serde(rename = "Barcode")]
    barcode: String,
    #[serde(rename = "Feature")]
    feature: String,
}

/// The antibody/feature legend: barcode -> feature name, in legend order.
#[derive(Debug)]
pub struct FeatureLegend {
    pub dictionary: FeatureDictionary,
    pub names: Vec<SmolStr>,
}

impl FeatureLegend {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let f = File::open(path)
            .with_context(|| format!("Failed to open feature legend {}", path.display()))?;
        Self::from_reader(f)
            .with_context(|| format!("Failed to load feature legend {}", path.display()))
    }

    pub fn from_reader(src: impl Read) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new().delimiter(b',').from_reader(src);
        let mut dictionary = FeatureDictionary::new();
        let mut names = Vec::new();

        for result in reader.deserialize() {
            let row: FeatureCsvRow = result?;
            let name = SmolStr::from(row.feature.trim());
            dictionary.insert(row.barcode.trim(), name.clone())?;
            names.push(name);
        }

        if dictionary.is_empty() {
            anyhow::bail!("Feature legend contains no barcodes");
        }

        Ok(Self { dictionary, names })
    }

    /// Every unordered pair of legend features, joined as `A+B` in legend order.
    pub fn interaction_pairs(&self) -> Vec<SmolStr> {
        let mut pairs = Vec::new();
        for (i, a) in self.names.iter().enumerate() {
            for b in &self.names[i + 1..] {
                pairs.push(SmolStr::from(format!("{a}+{b}")));
            }
        }
        pairs
    }

    /// Barcode and name of every legend entry.
    pub fn entries(&self) -> impl Iterator<Item = (&SmolStr, &SmolStr)> {
        self.dictionary.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGEND: &str = "\
WellPosition,Name,Barcode,X,Y,Z,string_matching_algorithm,X_maxdist,Y_maxdist,Z_maxdist
A1,bc1,AAAAAAAA,0,0,,hamming,1,1,0
A2,bc2,TTTTTTTT,1,,,,,,
B1,bc3,CCCCCCCC,,1.0,0,,,,
";

    #[test]
    fn test_normalize_well() {
        assert_eq!(normalize_well("A1").unwrap(), "A01");
        assert_eq!(normalize_well("H12").unwrap(), "H12");
        assert!(normalize_well("A").is_err());
    }

    #[test]
    fn test_barcode_legend_xdbit() {
        let legend = BarcodeLegend::from_reader(LEGEND.as_bytes(), Mode::XDbit).unwrap();
        assert_eq!(legend.metric, DistanceMetric::Hamming);
        assert_eq!(legend.axes.len(), 3);

        let x = &legend.axes[0];
        assert_eq!(x.axis, Axis::X);
        assert_eq!(x.max_dist, 1);
        assert_eq!(x.dictionary.len(), 2);
        assert_eq!(x.dictionary.get("TTTTTTTT"), Some(&Well::new("A02", 1)));

        let y = &legend.axes[1];
        assert_eq!(y.dictionary.get("CCCCCCCC"), Some(&Well::new("B01", 1)));

        let z = &legend.axes[2];
        assert_eq!(z.max_dist, 0);
        assert_eq!(z.dictionary.len(), 1);
    }

    #[test]
    fn test_barcode_legend_missing_column() {
        let legend = "WellPosition,Barcode,X,string_matching_algorithm,X_maxdist\nA1,AAAA,0,hamming,1\n";
        assert!(BarcodeLegend::from_reader(legend.as_bytes(), Mode::DbitSeq).is_err());
    }

    #[test]
    fn test_barcode_legend_unknown_algorithm() {
        let legend = LEGEND.replace("hamming", "jaccard");
        assert!(BarcodeLegend::from_reader(legend.as_bytes(), Mode::XDbit).is_err());
    }

    #[test]
    fn test_feature_legend() {
        let legend = "Barcode,Feature\nACGTACGTAC,CD3\nTTGGCCAATT,CD4\nGGGGCCCCAA,CD8\n";
        let legend = FeatureLegend::from_reader(legend.as_bytes()).unwrap();
        assert_eq!(legend.dictionary.get("TTGGCCAATT").unwrap(), "CD4");
        assert_eq!(
            legend.interaction_pairs(),
            vec!["CD3+CD4", "CD3+CD8", "CD4+CD8"]
        );
    }

    #[test]
    fn test_feature_legend_missing_column() {
        let legend = "Barcode,Name\nACGT,CD3\n";
        assert!(FeatureLegend::from_reader(legend.as_bytes()).is_err());
    }
}
