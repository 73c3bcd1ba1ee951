#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use crate::cli::*;
use crate::context::FilterContext;
use crate::io::{
    gather_shards, write_combined_matrix, write_feature_matrix, write_umi_dictionary, BamIO,
    DiscardLog, ShardInput, UMI_DICT_FILE,
};
use crate::merge::ResultMerger;
use crate::progbars::ShardProgress;
use crate::report::{
    MATRIX_COMBINED_FILE, MATRIX_FEATURES_FILE, REPORT_JSON_COPY_FILE, REPORT_JSON_FILE,
};
use crate::shard::{sample_cap, ShardResult, ShardRunner};
use anyhow::{Context, Error};
use clap::Parser;
use colored::Colorize;
use indicatif::MultiProgress;
use log::{error, info, LevelFilter};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs::create_dir_all;
use std::process::exit;
use std::time::Instant;

mod barcode;
mod cli;
mod context;
mod count;
mod io;
mod merge;
mod processor;
mod progbars;
mod qc;
mod record;
mod report;
mod resolve;
mod shard;
mod utils;

const LOG_FILE: &str = "dbitfilter.log";
const REPORT_LOG_FILE: &str = "filtering_log.txt";

fn main() {
    let args = FilterArgs::parse();

    if let Err(e) = args.validate() {
        eprintln!("{} {e:#}", "ERROR:".red());
        exit(1);
    }

    print_logo();
    print_init(&args);

    if let Err(e) = run(&args) {
        error!("{e:#}");
        eprintln!("{} {e:#}", "ERROR:".red());
        exit(1);
    }
}

fn run(args: &FilterArgs) -> Result<(), Error> {
    create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory {}", args.out_dir.display()))?;
    create_dir_all(&args.tmp_dir)
        .with_context(|| format!("Failed to create tmp directory {}", args.tmp_dir.display()))?;

    simple_logging::log_to_file(args.out_dir.join(LOG_FILE), LevelFilter::Info)
        .context("Failed to create log for filtering run")?;

    ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Invalid number of threads specified")?;

    let start = Instant::now();
    let ctx = FilterContext::init_from_args(args)?;
    let shards = gather_shards(&args.input, args.multi, &args.tmp_dir)?;
    info!("Running in {} mode over {} shard(s)", ctx.mode, shards.len());

    let discard_log = match args.store_discarded {
        true => Some(DiscardLog::create(&args.out_dir)?),
        false => None,
    };
    let multi = args.progress.then(MultiProgress::new);
    let cap = sample_cap(args.est_num_spots, shards.len());
    let hts_threads = (args.threads / shards.len()).max(1);
    let num_shards = shards.len();

    // any failing shard fails the run before anything is merged
    let results = shards
        .par_iter()
        .enumerate()
        .map(|(i, shard)| {
            print_file_info(&shard.name, i + 1, num_shards);
            let progress = ShardProgress::new(multi.as_ref(), &shard.name);
            process_shard(shard, &ctx, cap, hts_threads, discard_log.as_ref(), progress)
                .with_context(|| format!("Failed to process shard {}", shard.name))
        })
        .collect::<Result<Vec<ShardResult>, Error>>()?;

    if let Some(log) = &discard_log {
        log.flush()?;
    }

    let merged = ResultMerger::merge_all(ctx.new_report(), results);
    let elapsed = start.elapsed();
    info!(
        "Merged {} shard(s) in {:.2?}: {:?}",
        merged.shards.len(),
        elapsed,
        merged.shards
    );

    merged
        .report
        .write_json(&args.out_dir.join(REPORT_JSON_FILE))?;
    merged
        .report
        .write_json(&args.tmp_dir.join(REPORT_JSON_COPY_FILE))?;

    if let (Some(features), Some(rna)) = (&ctx.features, &args.rna_dge_file) {
        let rows = merged.matrix.row_order(&features.legend.names);
        write_feature_matrix(
            &args.out_dir.join(MATRIX_FEATURES_FILE),
            &merged.matrix,
            &rows,
            &features.whitelist,
        )?;
        write_combined_matrix(
            &args.out_dir.join(MATRIX_COMBINED_FILE),
            rna,
            &merged.matrix,
            &rows,
            &features.whitelist,
        )?;
        write_umi_dictionary(
            &args.tmp_dir.join(UMI_DICT_FILE),
            &merged.registry,
            &features.whitelist,
            &features.grid_features(),
        )?;
        info!(
            "Wrote {} feature rows with {} counted molecules",
            rows.len(),
            merged.matrix.total()
        );
    }

    merged.report.write_to_log_file(
        &args.out_dir.join(REPORT_LOG_FILE),
        args,
        &ctx.legend,
        ctx.features.as_ref().map(|f| &f.legend),
        elapsed,
    )?;

    qc::write_qc_tables(&args.out_dir, &merged.report, &merged.sample)?;

    println!("{}", "DONE".green());
    println!("{}\n", merged.report);
    info!("Finished in {:.2?}", start.elapsed());

    Ok(())
}

fn process_shard(
    shard: &ShardInput,
    ctx: &FilterContext,
    cap: usize,
    hts_threads: usize,
    discard_log: Option<&DiscardLog>,
    progress: ShardProgress,
) -> Result<ShardResult, Error> {
    let mut io = BamIO::new(shard, hts_threads)?;
    let result = ShardRunner::new(&shard.name, ctx, cap, discard_log, progress)
        .run(BamIO::records(&mut io.reader), &mut io.sink)?;

    info!(
        "Wrote {} reads to {}",
        io.sink.written,
        shard.out_path.display()
    );
    Ok(result)
}
