//! Lineage assignment pipeline: fan out pangolin over the sample batch,
//! fan in the per-sample reports, and roll them up with MultiQC.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use lazy_static::lazy_static;
use log::{debug, error, info, warn};
use regex::Regex;
use tokio::process::Command;

use crate::config::defs::{
    PipelineError, RunConfig, TaskConfig, EXCEPTION_PATTERN, MULTIQC_TAG, PANGOLIN_TAG,
};
use crate::utils::command::{check_versions, multiqc, pangolin};
use crate::utils::file::{
    classification_storage_target, file_path_manipulator, lineage_report_filename,
    report_storage_target,
};
use crate::utils::notify::{Notify, Severity};
use crate::utils::samples::{read_manifest, validate_samples, Sample};
use crate::utils::streams::capture_merged_output;

lazy_static! {
    static ref EXCEPTION_RE: Regex =
        Regex::new(EXCEPTION_PATTERN).expect("Failed to compile exception pattern");
}

/// Reference to the report produced for one sample, with its local path
/// and its destination in durable storage.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub sample: String,
    pub report_path: PathBuf,
    pub remote_path: String,
}

/// Reference to the single combined report, the terminal artifact of
/// the pipeline.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub report_path: PathBuf,
    pub remote_path: String,
}

/// Invokes `task` with the retry budget from `task_config`. This is the
/// orchestration-layer seam for retry policy; task bodies never retry
/// themselves.
pub async fn invoke_with_retries<T, F, Fut>(
    task_config: &TaskConfig,
    label: &str,
    task: F,
) -> Result<T, PipelineError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 0usize;
    loop {
        match task().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < task_config.retries => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {} of {}): {}",
                    label,
                    attempt,
                    task_config.retries + 1,
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs pangolin over one sample.
///
/// The report file name derives from the sample name, so reruns of the
/// same sample overwrite in place. The child's stdout and stderr are
/// consumed line-by-line as one interleaved stream; on a non-zero exit
/// any `Exception` lines found in the captured text are surfaced as
/// error notices before the failure is returned.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `notifier` - Sink for structured run notices.
/// * `sample` - Validated sample to classify.
///
/// # Returns
/// ClassificationResult with the local report path and its durable
/// storage destination.
pub async fn classify_sample(
    config: &RunConfig,
    notifier: &dyn Notify,
    sample: &Sample,
) -> Result<ClassificationResult, PipelineError> {
    let output_filename = lineage_report_filename(&sample.name);
    let output_path = file_path_manipulator(
        &PathBuf::from(&output_filename),
        Some(&config.out_dir),
        None,
        None,
        "",
    );

    let pangolin_args = pangolin::arg_generator(&config.args, &sample.fasta, &output_path);

    let mut child = Command::new(&config.args.pangolin_bin)
        .args(&pangolin_args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| PipelineError::SpawnError {
            tool: PANGOLIN_TAG.to_string(),
            error: e.to_string(),
        })?;

    let captured = capture_merged_output(&mut child, |line| debug!("[{}] {}", sample.name, line))
        .await
        .map_err(|e| PipelineError::IOError(e.to_string()))?;

    let status = child
        .wait()
        .await
        .map_err(|e| PipelineError::IOError(e.to_string()))?;

    let running_cmd = format!("{} {}", config.args.pangolin_bin, pangolin_args.join(" "));
    notifier.notify(Severity::Info, "Executing pangolin", &running_cmd);

    if !status.success() {
        let code = status.code().unwrap_or(-1); // killed by signal
        let captured_text = captured.join("\n");
        for found in EXCEPTION_RE.find_iter(&captured_text) {
            notifier.notify(
                Severity::Error,
                &format!(
                    "An error was raised while running pangolin for {}",
                    sample.name
                ),
                found.as_str(),
            );
        }
        return Err(PipelineError::ExecutionError {
            tool: PANGOLIN_TAG.to_string(),
            code,
            context: sample.name.clone(),
        });
    }

    Ok(ClassificationResult {
        sample: sample.name.clone(),
        report_path: output_path,
        remote_path: classification_storage_target(&output_filename),
    })
}

/// Rolls the per-sample reports up into one MultiQC summary. Inputs are
/// passed through in the order given.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `notifier` - Sink for structured run notices.
/// * `results` - Reports from every sample that classified successfully.
///
/// # Returns
/// AggregateReport with the local report path and its durable storage
/// destination.
pub async fn aggregate_reports(
    config: &RunConfig,
    notifier: &dyn Notify,
    results: &[ClassificationResult],
) -> Result<AggregateReport, PipelineError> {
    let output_path = file_path_manipulator(
        &PathBuf::from(&config.args.report_name),
        Some(&config.out_dir),
        None,
        None,
        "",
    );

    let input_paths: Vec<PathBuf> = results.iter().map(|r| r.report_path.clone()).collect();
    let multiqc_args = multiqc::arg_generator(&input_paths, &output_path);

    let output = Command::new(&config.args.multiqc_bin)
        .args(&multiqc_args)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| PipelineError::SpawnError {
            tool: MULTIQC_TAG.to_string(),
            error: e.to_string(),
        })?;

    let running_cmd = format!("{} {}", config.args.multiqc_bin, multiqc_args.join(" "));
    notifier.notify(Severity::Info, "Executing multiqc", &running_cmd);

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        error!(
            "multiqc failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
        return Err(PipelineError::ExecutionError {
            tool: MULTIQC_TAG.to_string(),
            code,
            context: "aggregate report".to_string(),
        });
    }

    Ok(AggregateReport {
        report_path: output_path,
        remote_path: report_storage_target(&config.args.report_name),
    })
}

/// Full pipeline: one classification task per manifest sample, bounded
/// by the run's semaphore, then one aggregation over the survivors.
/// A failed sample aborts only its own branch; the run fails outright
/// only when no sample classifies at all.
pub async fn run(config: Arc<RunConfig>, notifier: Arc<dyn Notify>) -> Result<(), PipelineError> {
    println!("\n-------------\n Lineage Assignment\n-------------\n");

    check_versions(&config.args)
        .await
        .map_err(|e| PipelineError::InvalidConfig(format!("tool preflight failed: {}", e)))?;

    let manifest_path = file_path_manipulator(
        &PathBuf::from(&config.args.samples),
        Some(&config.cwd),
        None,
        None,
        "",
    );
    let samples = read_manifest(&manifest_path)?;
    let samples = validate_samples(samples, &config.cwd)?;
    info!(
        "Loaded {} samples from {}",
        samples.len(),
        manifest_path.display()
    );

    let sample_names: Vec<String> = samples.iter().map(|s| s.name.clone()).collect();
    let mut handles = Vec::with_capacity(samples.len());
    for sample in samples {
        let config = Arc::clone(&config);
        let notifier = Arc::clone(&notifier);
        handles.push(tokio::spawn(async move {
            let _permit = config
                .classify_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::JoinError(e.to_string()))?;
            invoke_with_retries(&config.task, &sample.name, || {
                classify_sample(&config, notifier.as_ref(), &sample)
            })
            .await
        }));
    }

    let joined = join_all(handles).await;
    let mut results: Vec<ClassificationResult> = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    for (name, outcome) in sample_names.iter().zip(joined) {
        match outcome {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(e)) => {
                error!("Lineage assignment failed for {}: {}", name, e);
                failed.push(name.clone());
            }
            Err(e) => {
                error!("Classification task for {} aborted: {}", name, e);
                failed.push(name.clone());
            }
        }
    }

    if results.is_empty() {
        return Err(PipelineError::NoSuccessfulSamples);
    }
    if !failed.is_empty() {
        warn!(
            "{} of {} samples failed lineage assignment: {}",
            failed.len(),
            sample_names.len(),
            failed.join(", ")
        );
    }

    for result in &results {
        info!(
            "{}: report {} (destination {})",
            result.sample,
            result.report_path.display(),
            result.remote_path
        );
    }

    let report = aggregate_reports(&config, notifier.as_ref(), &results).await?;
    info!(
        "Aggregate report written to {} (destination {})",
        report.report_path.display(),
        report.remote_path
    );

    Ok(())
}
