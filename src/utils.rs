use anyhow::{Context, Error};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rust_htslib::bam::{Format, Header, Read, Reader, Writer};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn get_file_ext(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Plain or gzipped text table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Gzip,
}

impl TextKind {
    /// `.txt` or `.txt.gz`; anything else is not a count table.
    pub fn of(path: &Path) -> Option<TextKind> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".txt.gz") {
            Some(TextKind::Gzip)
        } else if get_file_ext(path) == Some("txt") {
            Some(TextKind::Plain)
        } else {
            None
        }
    }
}

pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    match TextKind::of(path) {
        Some(TextKind::Gzip) => Ok(Box::new(BufReader::new(MultiGzDecoder::new(f)))),
        _ => Ok(Box::new(BufReader::new(f))),
    }
}

pub fn create_gz(path: &Path) -> Result<GzEncoder<BufWriter<File>>, Error> {
    let f = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(GzEncoder::new(BufWriter::new(f), Compression::default()))
}

pub fn finish_gz(encoder: GzEncoder<BufWriter<File>>) -> Result<(), Error> {
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn make_bam_reader(input_file: &Path, num_threads: usize) -> Result<(Header, Reader), Error> {
    let mut bam_reader = Reader::from_path(input_file)
        .with_context(|| format!("Failed to open BAM {}", input_file.display()))?;
    bam_reader.set_threads(num_threads)?;
    let header = Header::from_template(bam_reader.header());

    Ok((header, bam_reader))
}

pub fn make_bam_writer(file_name: &Path, header: &Header, num_threads: usize) -> Result<Writer, Error> {
    let mut bam_writer = Writer::from_path(file_name, header, Format::Bam)
        .with_context(|| format!("Failed to create BAM {}", file_name.display()))?;
    bam_writer.set_threads(num_threads)?;
    Ok(bam_writer)
}
