//! Functions and structs for working with creating command-line arguments

use anyhow::{anyhow, Result};
use log::{info, warn};

use crate::cli::Arguments;
use crate::config::defs::{MULTIQC_TAG, PANGOLIN_TAG, TOOL_VERSIONS};

pub mod pangolin {
    use std::path::Path;

    use anyhow::{anyhow, Result};
    use tokio::process::Command;

    use crate::cli::Arguments;
    use crate::utils::streams::{read_child_output_to_vec, ChildStream};

    /// Runs `<bin> --version` and extracts the version token from
    /// output shaped like `pangolin 4.3.1`.
    pub async fn pangolin_presence_check(bin: &str) -> Result<String> {
        let args: Vec<&str> = vec!["--version"];

        let bin_owned = bin.to_string();
        let mut child = Command::new(bin)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}. Is pangolin installed?", bin_owned, e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        let _ = child.wait().await;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from pangolin --version"))?;
        let version = first_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| anyhow!("Invalid pangolin --version output: {}", first_line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in pangolin --version output: {}", first_line));
        }
        Ok(version)
    }

    pub fn arg_generator(args: &Arguments, fasta_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push(fasta_path.to_string_lossy().to_string());
        args_vec.push("--outfile".to_string());
        args_vec.push(output_path.to_string_lossy().to_string());
        args_vec.push("-t".to_string());
        args_vec.push(args.threads.to_string());
        args_vec
    }
}

pub mod multiqc {
    use std::path::{Path, PathBuf};

    use anyhow::{anyhow, Result};
    use tokio::process::Command;

    use crate::utils::streams::{read_child_output_to_vec, ChildStream};

    /// Runs `<bin> --version` and extracts the version token from
    /// output shaped like `multiqc, version 1.21`.
    pub async fn multiqc_presence_check(bin: &str) -> Result<String> {
        let args: Vec<&str> = vec!["--version"];

        let bin_owned = bin.to_string();
        let mut child = Command::new(bin)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}. Is multiqc installed?", bin_owned, e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        let _ = child.wait().await;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from multiqc --version"))?;
        let version = first_line
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow!("Invalid multiqc --version output: {}", first_line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in multiqc --version output: {}", first_line));
        }
        Ok(version)
    }

    /// Report inputs are appended in caller order; `-n` names the output.
    /// `-f` makes a rerun into the same directory replace the report
    /// instead of writing a suffixed copy next to it.
    pub fn arg_generator(input_paths: &[PathBuf], output_path: &Path) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push("-f".to_string());
        for path in input_paths {
            args_vec.push(path.to_string_lossy().to_string());
        }
        args_vec.push("-n".to_string());
        args_vec.push(output_path.to_string_lossy().to_string());
        args_vec
    }
}

pub async fn check_version(tool: &str, bin: &str) -> Result<String> {
    let version = match tool {
        PANGOLIN_TAG => pangolin::pangolin_presence_check(bin).await,
        MULTIQC_TAG => multiqc::multiqc_presence_check(bin).await,
        _ => return Err(anyhow!("Unknown tool: {}", tool)),
    };
    Ok(version?)
}

/// Preflight for the external tools: confirms both respond to
/// `--version` and warns when an install is older than the minimum
/// the pipeline is exercised against.
pub async fn check_versions(args: &Arguments) -> Result<()> {
    for (tool, bin) in [
        (PANGOLIN_TAG, args.pangolin_bin.as_str()),
        (MULTIQC_TAG, args.multiqc_bin.as_str()),
    ] {
        let version = check_version(tool, bin).await?;
        info!("{} version {}", tool, version);
        if let (Some(found), Some(minimum)) = (major_minor(&version), TOOL_VERSIONS.get(tool)) {
            if found < *minimum {
                warn!(
                    "{} version {} is older than the supported minimum {}",
                    tool, version, minimum
                );
            }
        }
    }
    Ok(())
}

/// Reduces a version string like "4.3.1" or "v1.21" to a comparable
/// major.minor float; patch levels and suffixes are dropped.
fn major_minor(version: &str) -> Option<f32> {
    let mut parts = version.trim().trim_start_matches('v').split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor_digits: String = parts
        .next()
        .unwrap_or("0")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let minor: u32 = if minor_digits.is_empty() {
        0
    } else {
        minor_digits.parse().ok()?
    };
    format!("{}.{}", major, minor).parse().ok()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::cli::Arguments;

    #[test]
    fn pangolin_args_keep_input_outfile_order() {
        let args = Arguments {
            threads: 8,
            ..Default::default()
        };
        let generated = pangolin::arg_generator(
            &args,
            Path::new("/data/viral_one.fasta"),
            Path::new("/out/viral_one_lineage_report.csv"),
        );
        assert_eq!(
            generated,
            vec![
                "/data/viral_one.fasta",
                "--outfile",
                "/out/viral_one_lineage_report.csv",
                "-t",
                "8",
            ]
        );
    }

    #[test]
    fn multiqc_args_keep_input_order() {
        let inputs = vec![
            PathBuf::from("/out/a_lineage_report.csv"),
            PathBuf::from("/out/b_lineage_report.csv"),
        ];
        let generated = multiqc::arg_generator(&inputs, Path::new("/out/report.html"));
        assert_eq!(
            generated,
            vec![
                "-f",
                "/out/a_lineage_report.csv",
                "/out/b_lineage_report.csv",
                "-n",
                "/out/report.html",
            ]
        );
    }

    #[test]
    fn major_minor_handles_patch_and_prefix() {
        assert_eq!(major_minor("4.3.1"), Some(4.3));
        assert_eq!(major_minor("v1.21"), Some(1.21));
        assert_eq!(major_minor("1.21.dev0"), Some(1.21));
        assert_eq!(major_minor("4"), Some(4.0));
        assert_eq!(major_minor("not-a-version"), None);
    }
}
