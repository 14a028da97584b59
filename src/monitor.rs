//! Endpoint health monitor
//!
//! Probes one URL with `GET` on a fixed interval and keeps a bounded window
//! of samples, newest first. Each probe is abandoned after
//! [`PROBE_TIMEOUT`]. The monitor shares nothing mutable with the batch
//! engine, so both can run at once.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::HttpMethod;
use crate::transmit::{Executor, OutboundRequest, Transport};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    #[default]
    Idle,
    Checking,
    Up,
    Down,
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSample {
    pub at: DateTime<Utc>,
    /// `0` when the probe never got a response
    pub status: u16,
    pub latency_ms: u64,
    pub up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregates over the current window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonitorStats {
    /// Mean latency of successful probes, rounded
    pub avg_latency_ms: u64,
    /// Percentage of probes that were up, rounded
    pub uptime: u8,
    pub success: usize,
    pub fail: usize,
    pub peak_latency_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub status: PingStatus,
    pub samples: VecDeque<ProbeSample>,
}

impl MonitorState {
    pub fn stats(&self) -> MonitorStats {
        stats(self.samples.iter())
    }
}

pub fn stats<'a>(samples: impl Iterator<Item = &'a ProbeSample> + Clone) -> MonitorStats {
    let total = samples.clone().count();
    if total == 0 {
        return MonitorStats::default();
    }
    let up: Vec<u64> = samples.clone().filter(|s| s.up).map(|s| s.latency_ms).collect();
    let avg_latency_ms = if up.is_empty() {
        0
    } else {
        (up.iter().sum::<u64>() as f64 / up.len() as f64).round() as u64
    };
    MonitorStats {
        avg_latency_ms,
        uptime: ((up.len() as f64 / total as f64) * 100.0).round() as u8,
        success: up.len(),
        fail: total - up.len(),
        peak_latency_ms: samples.map(|s| s.latency_ms).max().unwrap_or(0),
    }
}

/// Send one probe. A response with a status below 400 counts as up.
pub async fn probe<T: Transport>(executor: &Executor<T>, url: &str) -> ProbeSample {
    let at = Utc::now();
    let request = OutboundRequest::new(HttpMethod::Get, url);
    match executor.dispatch(request).await {
        Ok((raw, elapsed)) => ProbeSample {
            at,
            status: raw.status,
            latency_ms: elapsed.as_millis() as u64,
            up: raw.status < 400,
            error: None,
        },
        Err(e) => ProbeSample {
            at,
            status: 0,
            latency_ms: 0,
            up: false,
            error: Some(e.to_string()),
        },
    }
}

/// A running monitor; dropping it stops probing
pub struct HealthMonitor {
    token: CancellationToken,
    state: watch::Receiver<MonitorState>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Start probing `url` every `interval`, keeping the last `window` samples.
    ///
    /// The first probe goes out immediately. `limit` stops the monitor after
    /// that many probes.
    pub fn spawn<T: Transport>(
        executor: Executor<T>,
        url: impl Into<String>,
        interval: Duration,
        window: usize,
        limit: Option<usize>,
    ) -> Self {
        let url = url.into();
        let executor = executor.with_timeout(Some(PROBE_TIMEOUT));
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(MonitorState::default());
        let window = window.max(1);

        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut sent = 0usize;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tx.send_modify(|s| s.status = PingStatus::Checking);
                let sample = tokio::select! {
                    _ = task_token.cancelled() => break,
                    sample = probe(&executor, &url) => sample,
                };
                tracing::debug!(url = %url, status = sample.status, latency_ms = sample.latency_ms, up = sample.up, "Probe complete");

                tx.send_modify(|s| {
                    s.status = if sample.up { PingStatus::Up } else { PingStatus::Down };
                    s.samples.push_front(sample);
                    s.samples.truncate(window);
                });

                sent += 1;
                if limit.is_some_and(|l| sent >= l) {
                    break;
                }
            }
            tx.send_if_modified(|s| {
                if s.status == PingStatus::Checking {
                    s.status = PingStatus::Idle;
                    true
                } else {
                    false
                }
            });
        });

        Self {
            token,
            state: rx,
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    pub fn state(&self) -> MonitorState {
        self.state.borrow().clone()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Wait for the probe loop to end, after [`stop`](Self::stop) or a probe limit
    pub async fn join(mut self) -> MonitorState {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Monitor task failed");
            }
        }
        let state = self.state.borrow().clone();
        state
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::{RawResponse, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyTransport {
        calls: AtomicUsize,
    }

    impl Transport for FlakyTransport {
        async fn send(&self, _request: OutboundRequest) -> Result<RawResponse, TransportError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) % 3 {
                0 => Ok(RawResponse::new(200, "ok")),
                1 => Ok(RawResponse::new(503, "down")),
                _ => Err(TransportError::invalid("refused")),
            }
        }
    }

    fn sample(up: bool, latency_ms: u64) -> ProbeSample {
        ProbeSample { at: Utc::now(), status: if up { 200 } else { 0 }, latency_ms, up, error: None }
    }

    #[test]
    fn test_stats() {
        let samples = [sample(true, 10), sample(true, 21), sample(false, 0), sample(true, 30)];
        let s = stats(samples.iter());
        assert_eq!(s.avg_latency_ms, 20);
        assert_eq!(s.uptime, 75);
        assert_eq!(s.success, 3);
        assert_eq!(s.fail, 1);
        assert_eq!(s.peak_latency_ms, 30);
        assert_eq!(stats(std::iter::empty()), MonitorStats::default());
    }

    #[tokio::test]
    async fn test_window_keeps_newest_first() {
        let executor = Executor::new(FlakyTransport { calls: AtomicUsize::new(0) });
        let monitor = HealthMonitor::spawn(executor, "http://x.test/health", Duration::from_millis(5), 2, Some(3));
        let state = monitor.join().await;

        assert_eq!(state.samples.len(), 2);
        assert_eq!(state.samples[0].status, 0);
        assert_eq!(state.samples[0].error.as_deref(), Some("refused"));
        assert_eq!(state.samples[1].status, 503);
        assert!(!state.samples[1].up);
        assert_eq!(state.status, PingStatus::Down);
    }

    #[tokio::test]
    async fn test_stop_ends_loop() {
        let executor = Executor::new(FlakyTransport { calls: AtomicUsize::new(0) });
        let monitor = HealthMonitor::spawn(executor, "http://x.test", Duration::from_secs(3600), 5, None);
        let mut rx = monitor.subscribe();
        rx.wait_for(|s| !s.samples.is_empty()).await.unwrap();
        monitor.stop();
        let state = monitor.join().await;
        assert_eq!(state.samples.len(), 1);
        assert!(state.samples[0].up);
    }
}
