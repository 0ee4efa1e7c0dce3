// src/utils/system.rs: System functions

use std::cmp::min;
use std::time::Duration;

use anyhow::{anyhow, Result};
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::time::sleep;

use crate::config::defs::TaskConfig;

/// Determines the number of physical cores available for classification
/// tasks, plus a snapshot of current CPU load.
///
/// # Returns
///
/// (physical cores, current cpu usage in percent)
pub async fn detect_cores_and_load() -> Result<(usize, f32)> {
    let refresh_kind = RefreshKind::nothing().with_cpu(Default::default());
    let mut system = System::new_with_specifics(refresh_kind);
    system.refresh_cpu_all();
    let physical_cores = System::physical_core_count().unwrap_or_else(num_cpus::get);
    system.refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage());
    sleep(Duration::from_millis(100)).await;
    let cpu_load = system.global_cpu_usage();
    Ok((physical_cores, cpu_load))
}

/// Finds the amount of total and available RAM.
///
/// # Returns
///
/// (total ram, available ram) in bytes
pub fn detect_ram() -> Result<(u64, u64)> {
    let mut system = System::new_all();
    system.refresh_memory();
    let total_ram = system.total_memory();
    let available_ram = if cfg!(target_os = "macos") {
        // macOS reports available memory unreliably; derive it from used
        total_ram.saturating_sub(system.used_memory())
    } else {
        system.available_memory()
    };

    if total_ram == 0 || available_ram == 0 {
        return Err(anyhow!("Failed to detect valid RAM values"));
    }

    Ok((total_ram, available_ram))
}

/// Sizes the sample fan-out from detected resources and the per-task
/// grant: enough tasks to saturate cores without overcommitting RAM.
/// Always admits at least one task.
pub fn compute_max_parallel(max_cores: usize, available_ram: u64, task: &TaskConfig) -> usize {
    let by_cpu = (max_cores / task.cpus.max(1)).max(1);
    let task_ram_bytes = task.memory_gb.max(1) * 1_073_741_824;
    let by_ram = ((available_ram / task_ram_bytes) as usize).max(1);
    min(by_cpu, by_ram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelism_is_bounded_by_the_scarcer_resource() {
        let task = TaskConfig {
            cpus: 4,
            memory_gb: 8,
            retries: 0,
        };
        // 16 cores admit 4 tasks; 16 GiB admits 2
        assert_eq!(compute_max_parallel(16, 16 * 1_073_741_824, &task), 2);
        // 64 GiB admits 8; cores stay the limit
        assert_eq!(compute_max_parallel(16, 64 * 1_073_741_824, &task), 4);
    }

    #[test]
    fn parallelism_never_drops_to_zero() {
        let task = TaskConfig {
            cpus: 64,
            memory_gb: 512,
            retries: 0,
        };
        assert_eq!(compute_max_parallel(2, 1_073_741_824, &task), 1);
    }
}
