// src/utils/streams.rs: child process output plumbing

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildStream {
    Stdout,
    Stderr,
}

/// Merges a child's stdout and stderr into one interleaved line stream and
/// consumes it as lines arrive. Each line is handed to `on_line` and buffered,
/// in a single pass, so callers get live progress and the full text for
/// post-exit scanning without reading the streams twice.
///
/// # Arguments
///
/// * `child` - Spawned child with both stdout and stderr piped.
/// * `on_line` - Called once per line, in arrival order.
///
/// # Returns
/// All captured lines. The caller still owns waiting on the child.
pub async fn capture_merged_output<F>(child: &mut Child, mut on_line: F) -> Result<Vec<String>>
where
    F: FnMut(&str),
{
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Child stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("Child stderr was not piped"))?;

    let stdout_lines = LinesStream::new(BufReader::new(stdout).lines());
    let stderr_lines = LinesStream::new(BufReader::new(stderr).lines());
    let mut merged = stdout_lines.merge(stderr_lines);

    let mut captured = Vec::new();
    while let Some(line) = merged.next().await {
        let line = line?;
        on_line(&line);
        captured.push(line);
    }

    Ok(captured)
}

/// Collects one of the child's output streams into a vec of lines.
///
/// # Arguments
///
/// * `child` - Spawned child with the requested stream piped.
/// * `stream` - Which stream to read.
///
/// # Returns
/// Vector of lines.
pub async fn read_child_output_to_vec(
    child: &mut Child,
    stream: ChildStream,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    match stream {
        ChildStream::Stdout => {
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("Child stdout was not piped"))?;
            let mut reader = BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
        ChildStream::Stderr => {
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| anyhow!("Child stderr was not piped"))?;
            let mut reader = BufReader::new(stderr).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
    }
    Ok(lines)
}
