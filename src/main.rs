mod cli;
mod config;
mod pipelines;
mod utils;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use std::{env, fs};

use anyhow::Result;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};
use tokio::sync::Semaphore;

use crate::cli::parse;
use crate::config::defs::{RunConfig, TaskConfig};
use crate::utils::file::file_path_manipulator;
use crate::utils::notify::LogNotifier;
use crate::utils::system::{compute_max_parallel, detect_cores_and_load, detect_ram};
use pipelines::lineage;

#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Pangolin Pipelines\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}\n", dir);

    let (max_cores, cpu_load) = detect_cores_and_load().await?;
    let (total_ram, available_ram) = detect_ram()?;
    debug!(
        "Detected {} physical cores; CPU load {}%; available RAM ~{} GiB of ~{} GiB",
        max_cores,
        cpu_load,
        available_ram / 1_073_741_824,
        total_ram / 1_073_741_824
    );

    let task = TaskConfig {
        cpus: args.threads,
        memory_gb: args.task_memory_gb,
        retries: args.retries,
    };
    let max_parallel = args
        .max_parallel
        .unwrap_or_else(|| compute_max_parallel(max_cores, available_ram, &task));
    debug!("Classifying up to {} samples in parallel", max_parallel);

    let out_dir = setup_output_dir(&args, &dir)?;
    info!("Writing outputs to {:?}\n", out_dir);

    let run_config = Arc::new(RunConfig {
        cwd: dir,
        out_dir,
        args,
        task,
        classify_semaphore: Arc::new(Semaphore::new(max_parallel)),
    });

    if let Err(e) = lineage::run(run_config, Arc::new(LogNotifier)).await {
        error!(
            "Pipeline failed: {} at {} milliseconds.",
            e,
            run_start.elapsed().as_millis()
        );
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}

/// Sets up the output directory.
/// If `out_dir` is specified from args, uses it; otherwise, creates a
/// directory named `<manifest_stem>_YYYYMMDD`. Ensures the directory
/// exists.
///
/// # Arguments
/// * `args` - The parsed command-line arguments.
/// * `cwd` - The current working directory.
/// # Returns
/// path to the output directory.
fn setup_output_dir(args: &cli::args::Arguments, cwd: &PathBuf) -> Result<PathBuf> {
    let out_dir = match &args.out_dir {
        Some(out) => {
            let path = PathBuf::from(out);
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        }
        None => {
            let manifest_path =
                file_path_manipulator(&PathBuf::from(&args.samples), Some(cwd), None, None, "");
            let dir_base = manifest_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "pangolin_run".to_string());
            let timestamp = chrono::Local::now().format("%Y%m%d").to_string();
            cwd.join(format!("{}_{}", dir_base, timestamp))
        }
    };
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir)
}
