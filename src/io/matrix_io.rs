use crate::count::{CountMatrix, SpotWhitelist, UmiRegistry};
use crate::utils::{create_gz, finish_gz, open_text};
use anyhow::{Context, Error};
use smol_str::SmolStr;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

pub const UMI_DICT_FILE: &str = "umi_dictionary.json";

/// Gzipped feature x spot table, columns in whitelist order.
pub fn write_feature_matrix(
    path: &Path,
    matrix: &CountMatrix,
    rows: &[SmolStr],
    whitelist: &SpotWhitelist,
) -> Result<(), Error> {
    let mut gz = create_gz(path)?;
    matrix
        .write_table(&mut gz, rows, whitelist.spots(), true)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    finish_gz(gz)
}

/// The RNA table copied line by line, followed by the feature rows under the
/// same columns.
pub fn write_combined_matrix(
    path: &Path,
    rna: &Path,
    matrix: &CountMatrix,
    rows: &[SmolStr],
    whitelist: &SpotWhitelist,
) -> Result<(), Error> {
    let mut gz = create_gz(path)?;
    copy_rna_lines(open_text(rna)?, &mut gz)
        .with_context(|| format!("Failed to copy RNA matrix {}", rna.display()))?;
    matrix
        .write_table(&mut gz, rows, whitelist.spots(), false)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    finish_gz(gz)
}

fn copy_rna_lines(src: impl BufRead, w: &mut impl Write) -> std::io::Result<()> {
    for line in src.lines() {
        let line = line?;
        if !line.is_empty() {
            writeln!(w, "{}", line.trim_end_matches('\r'))?;
        }
    }
    Ok(())
}

/// Deduplicated UMIs for every whitelist spot and every feature name, with
/// empty lists for pairs never seen.
pub fn write_umi_dictionary(
    path: &Path,
    registry: &UmiRegistry,
    whitelist: &SpotWhitelist,
    features: &[SmolStr],
) -> Result<(), Error> {
    let f = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &registry.to_grid(whitelist.spots(), features))?;
    w.flush()?;
    Ok(())
}
