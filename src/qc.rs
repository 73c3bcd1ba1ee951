use crate::report::FilterReport;
use anyhow::{bail, Context, Error};
use log::warn;
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const PLATE_ROWS: usize = 8;
pub const PLATE_COLS: usize = 12;
pub const RANK_FILE: &str = "reads_per_barcode.tsv";

pub type PlateGrid = [[u64; PLATE_COLS]; PLATE_ROWS];

/// Zero-based (row, column) of a normalised well label such as `C07`.
pub fn well_index(well: &str) -> Result<(usize, usize), Error> {
    let mut chars = well.chars();
    let row = match chars.next() {
        Some(c @ 'A'..='H') => c as usize - 'A' as usize,
        _ => bail!("Well {well} is not on an 8 x 12 plate"),
    };
    let col: usize = chars
        .as_str()
        .parse()
        .with_context(|| format!("Well {well} has no column number"))?;
    if !(1..=PLATE_COLS).contains(&col) {
        bail!("Well {well} is not on an 8 x 12 plate");
    }
    Ok((row, col - 1))
}

/// Lay the read counts per well of one axis out on the plate.
pub fn plate_overview(well_counts: &BTreeMap<String, u64>) -> PlateGrid {
    let mut grid = [[0; PLATE_COLS]; PLATE_ROWS];
    for (well, n) in well_counts {
        match well_index(well) {
            Ok((r, c)) => grid[r][c] = *n,
            Err(e) => warn!("{e}; left out of plate overview"),
        }
    }
    grid
}

pub fn write_plate(w: &mut impl Write, grid: &PlateGrid) -> std::io::Result<()> {
    for col in 1..=PLATE_COLS {
        write!(w, "\t{col}")?;
    }
    writeln!(w)?;

    for (r, row) in grid.iter().enumerate() {
        write!(w, "{}", (b'A' + r as u8) as char)?;
        for n in row {
            write!(w, "\t{n}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Sampled reads per spot, most abundant first, with the cumulative fraction
/// of all sampled reads. Ties are broken by spot for a stable order.
pub fn barcode_rank(sample: &[SmolStr]) -> Vec<(SmolStr, u64, f64)> {
    let mut counts: HashMap<&SmolStr, u64> = HashMap::new();
    for spot in sample {
        *counts.entry(spot).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&SmolStr, u64)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total = sample.len() as f64;
    let mut cumulative = 0;
    ranked
        .into_iter()
        .map(|(spot, n)| {
            cumulative += n;
            (spot.clone(), n, cumulative as f64 / total)
        })
        .collect()
}

pub fn write_rank(w: &mut impl Write, ranked: &[(SmolStr, u64, f64)]) -> std::io::Result<()> {
    writeln!(w, "spot\treads\tcumulative_fraction")?;
    for (spot, n, frac) in ranked {
        writeln!(w, "{spot}\t{n}\t{frac:.6}")?;
    }
    Ok(())
}

/// Write one plate overview per axis and the barcode rank table into `out_dir`.
pub fn write_qc_tables(
    out_dir: &Path,
    report: &FilterReport,
    sample: &[SmolStr],
) -> Result<(), Error> {
    for (axis, counts) in &report.axes {
        let path = out_dir.join(format!("plate_overview_{axis}.tsv"));
        let f = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        write_plate(&mut w, &plate_overview(&counts.well_counts))?;
        w.flush()?;
    }

    let path = out_dir.join(RANK_FILE);
    let f = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_rank(&mut w, &barcode_rank(sample))?;
    w.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_index() {
        assert_eq!(well_index("A01").unwrap(), (0, 0));
        assert_eq!(well_index("H12").unwrap(), (7, 11));
        assert!(well_index("I01").is_err());
        assert!(well_index("A13").is_err());
        assert!(well_index("A").is_err());
    }

    #[test]
    fn test_plate_overview() {
        let counts: BTreeMap<String, u64> = [("A01", 5), ("B03", 2), ("Z99", 9)]
            .into_iter()
            .map(|(w, n)| (w.to_string(), n))
            .collect();

        let grid = plate_overview(&counts);
        assert_eq!(grid[0][0], 5);
        assert_eq!(grid[1][2], 2);
        assert_eq!(grid.iter().flatten().sum::<u64>(), 7);

        let mut out = Vec::new();
        write_plate(&mut out, &grid).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[1].starts_with("A\t5\t0"));
        assert!(lines[2].starts_with("B\t0\t0\t2"));
    }

    #[test]
    fn test_barcode_rank() {
        let sample: Vec<SmolStr> = ["1x1", "0x1", "1x1", "2x2", "1x1", "0x1"]
            .into_iter()
            .map(SmolStr::from)
            .collect();

        let ranked = barcode_rank(&sample);
        assert_eq!(ranked[0].0, "1x1");
        assert_eq!(ranked[0].1, 3);
        assert!((ranked[0].2 - 0.5).abs() < 1e-9);
        assert_eq!(ranked[1].0, "0x1");
        assert!((ranked[2].2 - 1.0).abs() < 1e-9);
    }
}
