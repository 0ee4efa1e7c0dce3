use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use lazy_static::lazy_static;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::cli::Arguments;

// External software
pub const GZIP_EXT: &str = "gz";
pub const PANGOLIN_TAG: &str = "pangolin";
pub const MULTIQC_TAG: &str = "multiqc";

lazy_static! {
    pub static ref TOOL_VERSIONS: HashMap<&'static str, f32> = {
        let mut m = HashMap::new();
        m.insert(PANGOLIN_TAG, 4.0);
        m.insert(MULTIQC_TAG, 1.9);

        m
    };
}

// Static Filenames
pub const LINEAGE_REPORT_SUFFIX: &str = "_lineage_report.csv";
pub const MULTIQC_REPORT_FILENAME: &str = "pangolin_multiqc_report.html";

// Durable storage layout: per-sample reports live under a fixed namespace,
// the aggregate report at the namespace root.
pub const STORAGE_SCHEME: &str = "storage://";
pub const PANGOLIN_OUTPUT_NAMESPACE: &str = "pangolin_outputs";

// Static Parameters
pub const FASTA_EXTS: &[&str] = &["fasta", "fa", "fna", "faa", "ffn", "frn"];

/// Marker for parseable sub-errors in classifier output.
pub const EXCEPTION_PATTERN: &str = "Exception.*";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{tool} exited with code {code} while processing {context}")]
    ExecutionError {
        tool: String,
        code: i32,
        context: String,
    },

    #[error("Failed to spawn {tool}: {error}. Is {tool} installed?")]
    SpawnError { tool: String, error: String },

    #[error("Invalid sample manifest: {0}")]
    InvalidManifest(String),

    #[error("Cannot find input file: {0}")]
    MissingInput(PathBuf),

    #[error("No samples were classified successfully; nothing to aggregate")]
    NoSuccessfulSamples,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    IOError(String),

    #[error("Task join failure: {0}")]
    JoinError(String),
}

/// Resources and retry budget granted to one classification task.
/// Retry policy belongs to the orchestration layer; the task
/// implementations never retry on their own.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    pub cpus: usize,
    pub memory_gb: u64,
    pub retries: usize,
}

pub struct RunConfig {
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub args: Arguments,
    pub task: TaskConfig,
    pub classify_semaphore: Arc<Semaphore>,
}
