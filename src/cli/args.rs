use clap::Parser;

use crate::config::defs::MULTIQC_REPORT_FILENAME;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "pangolin-pipelines",
    version,
    about = "Runs pangolin lineage assignment over viral genome assemblies and aggregates the per-sample reports into one MultiQC summary"
)]
pub struct Arguments {
    #[arg(
        short = 's',
        long = "samples",
        help = "CSV sample manifest with a 'name,fasta' header and one row per sample. FASTA paths may be relative to the current directory."
    )]
    pub samples: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(
        short = 'o',
        long = "out",
        help = "Output directory for all generated files. If not specified, a directory named '<manifest_stem>_YYYYMMDD' will be created in the current working directory."
    )]
    pub out_dir: Option<String>,

    #[arg(short = 't', long, default_value_t = 4, help = "Threads per pangolin invocation")]
    pub threads: usize,

    #[arg(long, help = "Samples classified concurrently. Defaults to what detected cores and RAM allow for the per-task resources.")]
    pub max_parallel: Option<usize>,

    #[arg(long, default_value_t = 0, help = "Additional attempts per sample after a failed classification")]
    pub retries: usize,

    #[arg(long, default_value_t = 8, help = "Advisory memory per classification task, in GiB")]
    pub task_memory_gb: u64,

    #[arg(long, default_value = MULTIQC_REPORT_FILENAME)]
    pub report_name: String,

    #[arg(long, default_value = "pangolin", help = "Pangolin executable; a bare name is resolved on PATH")]
    pub pangolin_bin: String,

    #[arg(long, default_value = "multiqc", help = "MultiQC executable; a bare name is resolved on PATH")]
    pub multiqc_bin: String,
}
