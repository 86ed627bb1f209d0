//! Resident-memory sampling
//!
//! Polls the process table while a test run is in flight and reduces the
//! readings to one per-run sample.

use std::collections::HashMap;
use std::time::Duration;
use sysinfo::{Pid, Process, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::models::MemorySample;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// True when the current platform exposes the process table.
pub fn monitoring_supported() -> bool {
    sysinfo::IS_SUPPORTED_SYSTEM
}

/// Background sampler for one child process and its descendants.
///
/// At most one sampler exists per run; the driver joins it after the child
/// exits, so the sample buffer is never read while the task still writes it.
pub struct MemorySampler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<MemorySample>,
}

impl MemorySampler {
    /// Start polling the process tree rooted at `pid` every `interval`.
    pub fn spawn(pid: u32, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut system = System::new();
            let mut readings: Vec<f64> = Vec::new();
            let root = Pid::from_u32(pid);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        system.refresh_processes();
                        match tree_memory_bytes(&system, root) {
                            Some(total) => readings.push(total as f64 / BYTES_PER_MB),
                            None => {
                                debug!("Sampled process {pid} left the process table");
                                break;
                            }
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }

            MemorySample::from_readings(&readings)
        });

        Self { stop, handle }
    }

    /// Signal the sampler to stop and wait for its reduced sample.
    pub async fn finish(self) -> MemorySample {
        let _ = self.stop.send(true);
        match self.handle.await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Memory sampler task failed: {e}");
                MemorySample::ZERO
            }
        }
    }
}

/// Sum resident memory for `root` and every live descendant.
///
/// Returns None once the root has left the process table. Individual
/// processes that vanish between refresh and read are simply not counted.
fn tree_memory_bytes(system: &System, root: Pid) -> Option<u64> {
    let processes = system.processes();
    if !processes.contains_key(&root) {
        return None;
    }

    let mut total = 0u64;
    for (pid, process) in processes {
        if *pid == root || has_ancestor(processes, *pid, root) {
            total += process.memory();
        }
    }
    Some(total)
}

/// Walk parent links looking for `root`. Capped so a corrupt parent chain
/// cannot loop forever.
fn has_ancestor(processes: &HashMap<Pid, Process>, mut pid: Pid, root: Pid) -> bool {
    for _ in 0..64 {
        match processes.get(&pid).and_then(|p| p.parent()) {
            Some(parent) if parent == root => return true,
            Some(parent) => pid = parent,
            None => return false,
        }
    }
    false
}
