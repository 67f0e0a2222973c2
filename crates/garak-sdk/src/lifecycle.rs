//! Drives a submitted scan to a terminal state by polling its status.
//!
//! One status call per iteration, a fixed caller-chosen sleep between calls,
//! and a wall-clock budget. Errors from the status call or from the progress
//! handler end the wait immediately; only a non-terminal status is retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, instrument};

use crate::error::{GarakError, Result};
use crate::models::{Scan, ScanStatusResponse};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// The two scan calls the driver needs. Implemented by [`crate::resources::Scans`].
#[async_trait]
pub trait ScanStatusSource: Send + Sync {
    /// Current status of the scan.
    async fn poll_status(&self, scan_id: &str) -> Result<ScanStatusResponse>;

    /// Full scan record, fetched once the scan has finished.
    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan>;
}

/// Caller-supplied handler invoked after every non-terminal poll.
///
/// Returning an error aborts the wait and the error is handed back unchanged.
pub type ProgressHandler<'a> = dyn FnMut(&ScanStatusResponse) -> Result<()> + Send + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Wall-clock budget for the whole wait, including the first status call.
    pub timeout: Duration,
    /// Fixed delay between polls. Never adjusted by the driver.
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// Poll `scan_id` until it reaches a terminal status, then return the full record.
///
/// A scan already terminal on the first poll returns without sleeping. Before
/// each sleep the driver checks whether `elapsed + poll_interval` would exceed
/// the timeout and, if so, fails with [`GarakError::ScanTimeout`].
#[instrument(skip(source, options, on_progress), fields(timeout = ?options.timeout, poll_interval = ?options.poll_interval))]
pub async fn wait_for_completion<S>(
    source: &S,
    scan_id: &str,
    options: WaitOptions,
    mut on_progress: Option<&mut ProgressHandler<'_>>,
) -> Result<Scan>
where
    S: ScanStatusSource + ?Sized,
{
    let started = Instant::now();
    let mut polls = 0u32;
    loop {
        let status = source.poll_status(scan_id).await?;
        polls += 1;
        if status.status.is_terminal() {
            debug!(polls, status = %status.status, "scan reached terminal status");
            break;
        }
        debug!(
            polls,
            status = %status.status,
            percent = status.progress.progress_percent,
            "scan still in progress"
        );

        if let Some(handler) = on_progress.as_deref_mut() {
            handler(&status)?;
        }

        let elapsed = started.elapsed();
        let next_poll = elapsed.checked_add(options.poll_interval);
        if next_poll.map_or(true, |at| at > options.timeout) {
            let secs = elapsed.as_secs_f64();
            return Err(GarakError::scan_timeout(
                format!(
                    "Scan {scan_id} timed out after {secs:.1} seconds (limit {}s, last status {})",
                    options.timeout.as_secs_f64(),
                    status.status
                ),
                secs,
            ));
        }
        sleep(options.poll_interval).await;
    }
    source.fetch_scan(scan_id).await
}
