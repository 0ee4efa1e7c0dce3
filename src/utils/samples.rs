use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::config::defs::PipelineError;
use crate::utils::file::{file_path_manipulator, has_fasta_extension, looks_like_fasta};

/// One named unit of input work: a viral genome assembly to classify.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    pub name: String,
    pub fasta: PathBuf,
}

/// Reads the batch manifest: CSV with a `name,fasta` header.
pub fn read_manifest(path: &Path) -> Result<Vec<Sample>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::InvalidManifest(format!("{}: {}", path.display(), e)))?;

    let mut samples = Vec::new();
    for record in reader.deserialize::<Sample>() {
        let sample =
            record.map_err(|e| PipelineError::InvalidManifest(format!("{}: {}", path.display(), e)))?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(PipelineError::InvalidManifest(format!(
            "no samples listed in {}",
            path.display()
        )));
    }
    Ok(samples)
}

/// Checks manifest invariants (non-empty unique names) and resolves each
/// FASTA path against `cwd`, requiring it to exist and to read as FASTA.
pub fn validate_samples(samples: Vec<Sample>, cwd: &Path) -> Result<Vec<Sample>, PipelineError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut validated = Vec::with_capacity(samples.len());

    for mut sample in samples {
        if sample.name.is_empty() {
            return Err(PipelineError::InvalidManifest(
                "sample with empty name".to_string(),
            ));
        }
        if !seen.insert(sample.name.clone()) {
            return Err(PipelineError::InvalidManifest(format!(
                "duplicate sample name: {}",
                sample.name
            )));
        }

        let resolved = file_path_manipulator(&sample.fasta, Some(cwd), None, None, "");
        if !resolved.exists() {
            return Err(PipelineError::MissingInput(resolved));
        }
        if !has_fasta_extension(&resolved) {
            warn!(
                "{} has no recognized FASTA extension",
                resolved.display()
            );
        }
        let fasta_like = looks_like_fasta(&resolved)
            .map_err(|e| PipelineError::IOError(format!("{}: {}", resolved.display(), e)))?;
        if !fasta_like {
            return Err(PipelineError::InvalidManifest(format!(
                "{} does not look like a FASTA file",
                resolved.display()
            )));
        }

        sample.fasta = resolved;
        validated.push(sample);
    }

    Ok(validated)
}
