use anyhow::{bail, Context, Error};
use log::warn;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

pub const SINGLE_OUTPUT_FILE: &str = "unaligned_tagged_BC_filtered.bam";
const SHARD_PREFIX: &str = "x";
const SHARD_OUTPUT_PREFIX: &str = "out_";

/// One independently processable input BAM and the file its kept reads go to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardInput {
    pub name: String,
    pub path: PathBuf,
    pub out_path: PathBuf,
}

fn is_shard_file(name: &str) -> bool {
    name.starts_with(SHARD_PREFIX) && name.ends_with(".bam")
}

/// In single mode the input is one BAM whose output lands in `tmp_dir`. In
/// multi mode every `x*.bam` in the input directory is a shard, written back
/// beside itself as `out_<name>`. Shards are returned sorted by name.
pub fn gather_shards(input: &str, multi: bool, tmp_dir: &Path) -> Result<Vec<ShardInput>, Error> {
    let inpath = Path::new(input);

    if !multi {
        if !inpath.is_file() {
            bail!("Input BAM does not exist: {input}");
        }
        let name = inpath
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(input)
            .to_string();

        return Ok(vec![ShardInput {
            name,
            path: inpath.to_path_buf(),
            out_path: tmp_dir.join(SINGLE_OUTPUT_FILE),
        }]);
    }

    if !inpath.is_dir() {
        bail!("Input for multi mode must be a directory of split BAM files: {input}");
    }

    let entries =
        read_dir(inpath).with_context(|| format!("Failed to read directory: {input}"))?;

    let mut shards: Vec<ShardInput> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            let name = entry.file_name().to_str()?.to_string();

            if path.is_dir() || !is_shard_file(&name) {
                if name.ends_with(".bam") && !name.starts_with(SHARD_OUTPUT_PREFIX) {
                    warn!("Skipping file {name}; not a split BAM shard");
                }
                return None;
            }

            Some(ShardInput {
                out_path: inpath.join(format!("{SHARD_OUTPUT_PREFIX}{name}")),
                name,
                path,
            })
        })
        .collect();

    if shards.is_empty() {
        bail!("No split BAM files (x*.bam) found in {input}");
    }

    shards.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(shards)
}
