use anyhow::{Context, Error};
use parking_lot::Mutex;
use std::fs::{remove_file, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

pub const DISCARD_LOG_FILE: &str = "discarded_reads.txt";

/// Append-only list of discarded read names, shared by every shard. Each
/// append holds the lock for one full line.
#[derive(Clone)]
pub struct DiscardLog {
    out: Arc<Mutex<BufWriter<Box<dyn Write + Send>>>>,
}

impl DiscardLog {
    /// Remove any log left over from an earlier run, then open a fresh one.
    pub fn create(out_dir: &Path) -> Result<Self, Error> {
        let path = out_dir.join(DISCARD_LOG_FILE);
        if path.exists() {
            remove_file(&path)
                .with_context(|| format!("Failed to remove old discard log {}", path.display()))?;
        }

        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open discard log {}", path.display()))?;

        Ok(Self::from_writer(f))
    }

    pub fn from_writer(w: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(BufWriter::new(Box::new(w)))),
        }
    }

    pub fn append(&self, read_id: &[u8]) -> Result<(), Error> {
        let mut out = self.out.lock();
        out.write_all(read_id)
            .and_then(|_| out.write_all(b"\n"))
            .context("Failed to write to discard log")
    }

    pub fn flush(&self) -> Result<(), Error> {
        self.out.lock().flush().context("Failed to flush discard log")
    }
}
