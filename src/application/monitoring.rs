use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{LifecycleState, NetworkCounters, RunSummary};
use crate::ports::{ProbeError, ProcessSignaller, ResourceProbe};

use super::health::{BinarySizeItem, MemoryUsageItem, NetworkUsageItem};
use super::lifecycle::{LifecycleError, ProcessController};
use super::report::{Report, ReportError};

const KEY_BINARY_SIZE: u32 = 1;
const KEY_MINIMUM: u32 = 2;
const KEY_MAXIMUM: u32 = 3;
const KEY_AVERAGE: u32 = 4;
const KEY_NETWORK: u32 = 5;

/// Polling and reporting settings of one measurement run
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub poll_interval: Duration,
    /// Stop polling after this many polls; 0 polls until the process exits
    pub max_polls: u32,
    /// Also report the minimum and maximum readings
    pub detailed: bool,
    /// Also report network traffic seen during the run
    pub network: bool,
    pub msg_size: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_polls: 0,
            detailed: false,
            network: false,
            msg_size: 0,
        }
    }
}

/// Everything collected while the target was running
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub polls: u32,
    pub binary_size: u64,
    pub network: Option<NetworkCounters>,
    pub final_state: LifecycleState,
}

/// Measurement run: poll a started process and turn the result into report entries
pub struct AnalysisRun {
    options: RunOptions,
}

impl AnalysisRun {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Poll until the process exits or the poll budget is spent.
    ///
    /// A failed poll is logged and skipped; only a gone process stops the loop.
    pub fn poll_until_exit<P>(&self, controller: &mut ProcessController<P>) -> RunOutcome
    where
        P: ResourceProbe + ProcessSignaller,
    {
        let baseline = controller.network_counters().ok();
        let mut latest_network = baseline;
        let mut summary = RunSummary::new();
        let mut polls = 0;

        loop {
            if self.options.max_polls > 0 && polls >= self.options.max_polls {
                info!(polls, "Poll budget reached");
                break;
            }
            polls += 1;

            match controller.get_resource_sample() {
                Ok(sample) => {
                    debug!(
                        poll = polls,
                        threads = sample.threads,
                        memory = sample.memory_bytes,
                        handles = sample.handles,
                        cpu = %sample.cpu_load,
                        "Sampled"
                    );
                    summary.record(&sample);
                }
                Err(LifecycleError::Probe(ProbeError::ProcessGone(pid))) => {
                    info!(pid, state = %controller.state(), "Target is gone");
                    break;
                }
                Err(e) => {
                    warn!(poll = polls, "Skipping sample: {}", e);
                    if !controller.state().is_live() {
                        break;
                    }
                }
            }

            if self.options.network {
                match controller.network_counters() {
                    Ok(counters) => latest_network = Some(counters),
                    Err(e) => debug!("Network counters unavailable: {}", e),
                }
            }

            thread::sleep(self.options.poll_interval);
        }

        let network = match (baseline, latest_network) {
            (Some(start), Some(end)) => Some(end.since(&start).with_msg_size(self.options.msg_size)),
            _ => None,
        };

        RunOutcome {
            summary,
            polls,
            binary_size: controller.binary_size(),
            network,
            final_state: controller.state(),
        }
    }

    /// Register the run's health items with `report` and record them.
    pub fn report(&self, outcome: &RunOutcome, report: &mut Report) -> Result<usize, ReportError> {
        if outcome.binary_size > 0 {
            report.register_health_item(KEY_BINARY_SIZE, Box::new(BinarySizeItem::new(outcome.binary_size)))?;
        }

        if self.options.detailed {
            if let Some(min) = outcome.summary.minimum() {
                report.register_health_item(KEY_MINIMUM, Box::new(MemoryUsageItem::new("Minimum", min.clone())))?;
            }
            if let Some(max) = outcome.summary.maximum() {
                report.register_health_item(KEY_MAXIMUM, Box::new(MemoryUsageItem::new("Maximum", max.clone())))?;
            }
        }

        match outcome.summary.average() {
            Some(average) => {
                report.register_health_item(KEY_AVERAGE, Box::new(MemoryUsageItem::new("Average", average)))?;
            }
            None => warn!("No samples were collected; memory usage not reported"),
        }

        if self.options.network {
            if let Some(counters) = outcome.network {
                report.register_health_item(
                    KEY_NETWORK,
                    Box::new(NetworkUsageItem::new("Namespace network", counters)),
                )?;
            }
        }

        Ok(report.process_health_run())
    }
}
