use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::defs::{
    FASTA_EXTS, GZIP_EXT, LINEAGE_REPORT_SUFFIX, PANGOLIN_OUTPUT_NAMESPACE, STORAGE_SCHEME,
};

/// Resolves `path` against `base` (when relative) and optionally glues
/// a prefix/suffix onto the file name with `sep`.
///
/// # Arguments
/// * `path` - Path to manipulate.
/// * `base` - Base directory for relative paths.
/// * `prefix` - Optional string prepended to the file name.
/// * `suffix` - Optional string appended to the file name.
/// * `sep` - Separator between file name and prefix/suffix.
///
/// # Returns
/// The manipulated path.
pub fn file_path_manipulator(
    path: &Path,
    base: Option<&Path>,
    prefix: Option<&str>,
    suffix: Option<&str>,
    sep: &str,
) -> PathBuf {
    let resolved = match base {
        Some(base) if !path.is_absolute() => base.join(path),
        _ => path.to_path_buf(),
    };

    if prefix.is_none() && suffix.is_none() {
        return resolved;
    }

    let file_name = resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut new_name = String::new();
    if let Some(prefix) = prefix {
        new_name.push_str(prefix);
        new_name.push_str(sep);
    }
    new_name.push_str(&file_name);
    if let Some(suffix) = suffix {
        new_name.push_str(sep);
        new_name.push_str(suffix);
    }
    resolved.with_file_name(new_name)
}

/// The per-sample report name is a pure function of the sample name, so
/// rerunning a sample overwrites its previous report rather than
/// accumulating new files.
pub fn lineage_report_filename(sample_name: &str) -> String {
    format!("{}{}", sample_name, LINEAGE_REPORT_SUFFIX)
}

/// Durable-storage destination for one per-sample lineage report.
pub fn classification_storage_target(output_filename: &str) -> String {
    format!("{}/{}/{}", STORAGE_SCHEME, PANGOLIN_OUTPUT_NAMESPACE, output_filename)
}

/// Durable-storage destination for the aggregate report.
pub fn report_storage_target(report_filename: &str) -> String {
    format!("{}/{}", STORAGE_SCHEME, report_filename)
}

pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    let n = file.read(&mut buffer)?;
    Ok(n == 2 && buffer == [0x1F, 0x8B]) // Gzip magic bytes
}

/// Cheap content check on a sample input: gzipped files are accepted
/// unsniffed, plain files must open with a FASTA header character.
pub fn looks_like_fasta(path: &Path) -> io::Result<bool> {
    if is_gzipped(path)? {
        return Ok(true);
    }
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 1];
    let n = file.read(&mut buffer)?;
    Ok(n == 1 && buffer[0] == b'>')
}

pub fn has_fasta_extension(path: &Path) -> bool {
    let mut path = path.to_path_buf();
    if path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(GZIP_EXT))
        .unwrap_or(false)
    {
        path = path.with_extension("");
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            FASTA_EXTS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_base() {
        let manipulated = file_path_manipulator(
            Path::new("sub/sample.fasta"),
            Some(Path::new("/work")),
            None,
            None,
            "",
        );
        assert_eq!(manipulated, PathBuf::from("/work/sub/sample.fasta"));
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let manipulated = file_path_manipulator(
            Path::new("/data/sample.fasta"),
            Some(Path::new("/work")),
            None,
            Some("validated"),
            "_",
        );
        assert_eq!(manipulated, PathBuf::from("/data/sample.fasta_validated"));
    }

    #[test]
    fn report_names_derive_from_sample_name() {
        assert_eq!(
            lineage_report_filename("viral_one"),
            "viral_one_lineage_report.csv"
        );
        assert_eq!(
            classification_storage_target("viral_one_lineage_report.csv"),
            "storage:///pangolin_outputs/viral_one_lineage_report.csv"
        );
        assert_eq!(
            report_storage_target("pangolin_multiqc_report.html"),
            "storage:///pangolin_multiqc_report.html"
        );
    }

    #[test]
    fn fasta_extensions_cover_gzipped_variants() {
        assert!(has_fasta_extension(Path::new("a.fasta")));
        assert!(has_fasta_extension(Path::new("a.fa")));
        assert!(has_fasta_extension(Path::new("a.fasta.gz")));
        assert!(!has_fasta_extension(Path::new("a.fastq")));
        assert!(!has_fasta_extension(Path::new("a")));
    }
}
