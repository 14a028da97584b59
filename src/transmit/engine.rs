//! Batch transmission engine
//!
//! Drives a generated batch through the executor, one request per item, and
//! publishes an append-only log plus a completion percentage.
//!
//! The engine moves through `Idle -> Running -> Finished`. Every run gets a
//! generation number; a completion only lands if its generation is still the
//! current one and the engine is still running, so results arriving after
//! [`TransmissionEngine::close`] or after a newer run began are dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::batch::{BatchGenerator, BatchItem, BatchMode, FieldPattern, RangeSpec};
use crate::errors::{AxiomError, Result};
use crate::http::HttpMethod;
use crate::models::HeaderEntry;
use crate::variables::{interpolate, Variable};
use super::executor::Executor;
use super::transport::{OutboundRequest, Transport, TransportError};

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionState {
    #[default]
    Idle,
    Running,
    Finished,
}

/// How batch items are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One request at a time, in index order
    #[default]
    Sequential,
    /// Every request in flight at once, joined at the end
    Burst,
}

/// Outcome of one batch item. `status == 0` means the request never completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionResult {
    /// Offset of the item within the batch
    pub index: usize,
    /// Sequence value substituted for `{{n}}`
    pub sequence: i64,
    pub status: u16,
    pub text: String,
    /// Elapsed milliseconds, `0` on transport failure
    pub time: u64,
}

impl TransmissionResult {
    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Everything a renderer needs: state, progress and the log so far
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: TransmissionState,
    /// Completion percentage, `0.0..=100.0`
    pub progress: f64,
    pub total: usize,
    pub log: Vec<TransmissionResult>,
    /// Generation of the run this snapshot belongs to
    pub run: u64,
}

impl EngineSnapshot {
    /// Progress rounded for display
    pub fn percent(&self) -> u8 {
        self.progress.round().clamp(0.0, 100.0) as u8
    }

    pub fn failures(&self) -> usize {
        self.log.iter().filter(|r| r.is_transport_failure()).count()
    }
}

/// Configuration carried into the engine and applied to the next run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOptions {
    pub mode: BatchMode,
    pub strategy: Strategy,
    /// Per-item timeout; none by default
    pub item_timeout: Option<Duration>,
}

/// Where the items of a run come from
#[derive(Debug, Clone, PartialEq)]
pub enum BatchSource {
    /// Generate from patterns over an inclusive range
    Generated {
        patterns: Vec<FieldPattern>,
        range: RangeSpec,
    },
    /// A hand-edited JSON array; `start` is the sequence value of element 0
    Raw { buffer: String, start: i64 },
}

impl BatchSource {
    pub fn generated(patterns: Vec<FieldPattern>, range: RangeSpec) -> Self {
        BatchSource::Generated { patterns, range }
    }

    pub fn raw(buffer: impl Into<String>, start: i64) -> Self {
        BatchSource::Raw {
            buffer: buffer.into(),
            start,
        }
    }

    fn start(&self) -> i64 {
        match self {
            BatchSource::Generated { range, .. } => range.start,
            BatchSource::Raw { start, .. } => *start,
        }
    }
}

/// Target request plus the variable set captured for a run
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionPlan {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<HeaderEntry>,
    pub variables: Vec<Variable>,
    pub source: BatchSource,
}

/// Parse a manual batch buffer. It must be a JSON array of objects.
pub fn parse_raw_batch(buffer: &str) -> Result<Vec<BatchItem>> {
    let value: JsonValue =
        serde_json::from_str(buffer).map_err(|e| AxiomError::MalformedBatch(e.to_string()))?;
    let JsonValue::Array(elements) = value else {
        return Err(AxiomError::MalformedBatch("Input must be a JSON array.".to_string()));
    };
    elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| match element {
            JsonValue::Object(map) => Ok(map),
            other => Err(AxiomError::MalformedBatch(format!(
                "Element {} is not an object: {}",
                i + 1,
                other
            ))),
        })
        .collect()
}

/// Handle on a run started by [`TransmissionEngine::begin`]
#[derive(Debug)]
pub struct RunHandle {
    pub run: u64,
    join: Option<JoinHandle<()>>,
    state: watch::Receiver<EngineSnapshot>,
}

impl RunHandle {
    /// Wait for the run to finish (or be closed) and return the last snapshot
    pub async fn wait(mut self) -> EngineSnapshot {
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::error!(run = self.run, error = %e, "Batch run task failed");
            }
        }
        let snapshot = self.state.borrow().clone();
        snapshot
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.state.clone()
    }
}

#[derive(Debug)]
struct ActiveRun {
    run: u64,
    token: CancellationToken,
}

/// The batch transmission state machine
pub struct TransmissionEngine<T: Transport> {
    executor: Executor<T>,
    options: Mutex<EngineOptions>,
    state: Arc<watch::Sender<EngineSnapshot>>,
    active: Mutex<Option<ActiveRun>>,
}

impl<T: Transport> TransmissionEngine<T> {
    pub fn new(transport: T, options: EngineOptions) -> Self {
        Self::with_executor(Executor::new(transport), options)
    }

    pub fn with_executor(executor: Executor<T>, options: EngineOptions) -> Self {
        let (tx, _rx) = watch::channel(EngineSnapshot::default());
        Self {
            executor,
            options: Mutex::new(options),
            state: Arc::new(tx),
            active: Mutex::new(None),
        }
    }

    pub fn options(&self) -> EngineOptions {
        *lock(&self.options)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> TransmissionState {
        self.state.borrow().state
    }

    /// Observe every change to state, progress and log
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.state.subscribe()
    }

    /// Choose the generation mode for the next run
    pub fn set_mode(&self, mode: BatchMode) -> Result<()> {
        self.ensure_not_running("cannot change mode during a run")?;
        lock(&self.options).mode = mode;
        Ok(())
    }

    /// Choose the transmission strategy for the next run
    pub fn set_strategy(&self, strategy: Strategy) -> Result<()> {
        self.ensure_not_running("cannot change strategy during a run")?;
        lock(&self.options).strategy = strategy;
        Ok(())
    }

    /// Return a finished engine to `Idle`, keeping the last log for display
    pub fn reset(&self) -> Result<()> {
        self.ensure_not_running("cannot reset during a run")?;
        self.state.send_modify(|snap| snap.state = TransmissionState::Idle);
        Ok(())
    }

    /// Start a run using the thread-local random source for chaotic mode
    pub fn begin(&self, plan: TransmissionPlan) -> Result<RunHandle> {
        let items = self.materialize(&plan, &mut rand::rng())?;
        self.launch(plan, items)
    }

    /// Start a run with an injected random source
    pub fn begin_with_rng<R: Rng + ?Sized>(&self, plan: TransmissionPlan, rng: &mut R) -> Result<RunHandle> {
        let items = self.materialize(&plan, rng)?;
        self.launch(plan, items)
    }

    /// Stop observing the current run.
    ///
    /// In-flight requests are abandoned; nothing they report afterwards is
    /// recorded, and the engine returns to `Idle`.
    pub fn close(&self) {
        let active = lock(&self.active).take();
        if let Some(active) = active {
            tracing::info!(run = active.run, "Closing batch run");
            active.token.cancel();
        }
        self.state.send_if_modified(|snap| {
            if snap.state == TransmissionState::Running {
                snap.state = TransmissionState::Idle;
                snap.run += 1;
                true
            } else {
                false
            }
        });
    }

    fn ensure_not_running(&self, what: &str) -> Result<()> {
        if self.state() == TransmissionState::Running {
            return Err(AxiomError::Busy(what.to_string()));
        }
        Ok(())
    }

    fn materialize<R: Rng + ?Sized>(&self, plan: &TransmissionPlan, rng: &mut R) -> Result<Vec<BatchItem>> {
        self.ensure_not_running("a batch is already running")?;
        match &plan.source {
            BatchSource::Generated { patterns, range } => {
                let mode = self.options().mode;
                let range = range.validate()?;
                Ok(BatchGenerator::new(patterns, mode)
                    .with_variables(&plan.variables)
                    .generate(range, rng))
            }
            BatchSource::Raw { buffer, .. } => parse_raw_batch(buffer),
        }
    }

    fn launch(&self, plan: TransmissionPlan, items: Vec<BatchItem>) -> Result<RunHandle> {
        let options = self.options();
        let total = items.len();
        let token = CancellationToken::new();

        // Claim the running state atomically with respect to other callers.
        let mut claimed = None;
        self.state.send_if_modified(|snap| {
            if snap.state == TransmissionState::Running {
                return false;
            }
            snap.run += 1;
            snap.total = total;
            snap.log.clear();
            snap.progress = 0.0;
            snap.state = if total == 0 {
                snap.progress = 100.0;
                TransmissionState::Finished
            } else {
                TransmissionState::Running
            };
            claimed = Some(snap.run);
            true
        });
        let run = claimed.ok_or_else(|| AxiomError::Busy("a batch is already running".to_string()))?;

        tracing::info!(
            run,
            total,
            strategy = ?options.strategy,
            mode = ?options.mode,
            method = %plan.method,
            "Batch run started"
        );

        if total == 0 {
            tracing::info!(run, "Empty batch, nothing to transmit");
            return Ok(RunHandle {
                run,
                join: None,
                state: self.state.subscribe(),
            });
        }

        *lock(&self.active) = Some(ActiveRun {
            run,
            token: token.clone(),
        });

        let start = plan.source.start();
        let template = Arc::new(ItemTemplate {
            method: plan.method,
            url: plan.url,
            headers: plan.headers,
            variables: plan.variables,
        });
        let executor = self.executor.clone().with_timeout(options.item_timeout.or(self.executor.timeout()));
        let recorder = Recorder {
            state: Arc::clone(&self.state),
            run,
            total,
            strategy: options.strategy,
        };

        let join = match options.strategy {
            Strategy::Sequential => tokio::spawn(run_sequential(executor, template, items, start, recorder, token)),
            Strategy::Burst => tokio::spawn(run_burst(executor, template, items, start, recorder, token)),
        };

        Ok(RunHandle {
            run,
            join: Some(join),
            state: self.state.subscribe(),
        })
    }
}

impl<T: Transport> Drop for TransmissionEngine<T> {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.active).take() {
            active.token.cancel();
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Request parts shared by every item of a run
#[derive(Debug)]
struct ItemTemplate {
    method: HttpMethod,
    url: String,
    headers: Vec<HeaderEntry>,
    variables: Vec<Variable>,
}

/// Writes completions into the shared snapshot for one run
#[derive(Clone)]
struct Recorder {
    state: Arc<watch::Sender<EngineSnapshot>>,
    run: u64,
    total: usize,
    strategy: Strategy,
}

impl Recorder {
    /// Append a result; returns false when the run is no longer current
    fn record(&self, result: TransmissionResult) -> bool {
        let run = self.run;
        let total = self.total as f64;
        let strategy = self.strategy;
        self.state.send_if_modified(move |snap| {
            if snap.run != run || snap.state != TransmissionState::Running {
                return false;
            }
            snap.log.push(result);
            let done = snap.log.len() as f64;
            snap.progress = match strategy {
                Strategy::Sequential => (100.0 * done / total).round(),
                // Each completion contributes 100/total; counting avoids float drift.
                Strategy::Burst => (done * 100.0 / total).min(100.0),
            };
            true
        })
    }

    fn finish(&self) -> bool {
        let run = self.run;
        let total = self.total;
        self.state.send_if_modified(move |snap| {
            if snap.run != run || snap.state != TransmissionState::Running || snap.log.len() != total {
                return false;
            }
            snap.state = TransmissionState::Finished;
            true
        })
    }
}

async fn run_sequential<T: Transport>(
    executor: Executor<T>,
    template: Arc<ItemTemplate>,
    items: Vec<BatchItem>,
    start: i64,
    recorder: Recorder,
    token: CancellationToken,
) {
    for (index, item) in items.iter().enumerate() {
        let sequence = start + index as i64;
        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = transmit_item(&executor, &template, index, sequence, item) => result,
        };
        if !recorder.record(result) {
            break;
        }
    }
    if recorder.finish() {
        tracing::info!(run = recorder.run, total = recorder.total, "Batch run finished");
    }
}

async fn run_burst<T: Transport>(
    executor: Executor<T>,
    template: Arc<ItemTemplate>,
    items: Vec<BatchItem>,
    start: i64,
    recorder: Recorder,
    token: CancellationToken,
) {
    let mut handles = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let executor = executor.clone();
        let template = Arc::clone(&template);
        let recorder = recorder.clone();
        let token = token.clone();
        let sequence = start + index as i64;

        handles.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = transmit_item(&executor, &template, index, sequence, &item) => {
                    recorder.record(result);
                }
            }
        }));
    }

    // Join barrier: every task settles before the run can finish.
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Burst task panicked");
        }
    }

    if recorder.finish() {
        tracing::info!(run = recorder.run, total = recorder.total, "Batch run finished");
    }
}

/// Build the outbound request for one item.
///
/// `GET` folds the item into the query string, `DELETE` sends nothing, and
/// every other verb sends the item as a JSON body.
pub(crate) fn build_item_request(
    method: HttpMethod,
    url: &str,
    headers: &[HeaderEntry],
    variables: &[Variable],
    sequence: i64,
    item: &BatchItem,
) -> std::result::Result<OutboundRequest, TransportError> {
    let mut resolved_url = interpolate(url, variables, Some(sequence));
    let mut resolved_headers: Vec<(String, String)> = headers
        .iter()
        .filter(|h| h.is_active())
        .map(|h| {
            (
                interpolate(&h.key, variables, Some(sequence)),
                interpolate(&h.value, variables, Some(sequence)),
            )
        })
        .collect();

    let body = match method {
        HttpMethod::Get => {
            let mut parsed = Url::parse(&resolved_url)
                .map_err(|e| TransportError::invalid(format!("Invalid URL '{}': {}", resolved_url, e)))?;
            {
                let mut pairs = parsed.query_pairs_mut();
                for (key, value) in item {
                    pairs.append_pair(key, &query_value(value));
                }
            }
            resolved_url = parsed.into();
            None
        }
        HttpMethod::Delete => None,
        _ => {
            if !resolved_headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                resolved_headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            Some(serde_json::to_string(item).map_err(|e| TransportError::invalid(e.to_string()))?)
        }
    };

    Ok(OutboundRequest {
        method,
        url: resolved_url,
        headers: resolved_headers,
        body,
    })
}

fn query_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human-readable reference to an item, 1-based
fn item_ref(index: usize) -> String {
    format!("Record {}", index + 1)
}

async fn transmit_item<T: Transport>(
    executor: &Executor<T>,
    template: &ItemTemplate,
    index: usize,
    sequence: i64,
    item: &BatchItem,
) -> TransmissionResult {
    let outcome = match build_item_request(
        template.method,
        &template.url,
        &template.headers,
        &template.variables,
        sequence,
        item,
    ) {
        Ok(request) => {
            tracing::debug!(index, sequence, url = %request.url, "Dispatching batch item");
            executor.dispatch(request).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok((raw, elapsed)) => TransmissionResult {
            index,
            sequence,
            status: raw.status,
            text: format!("{}: {}", item_ref(index), raw.status_text),
            time: elapsed.as_millis() as u64,
        },
        Err(e) => {
            tracing::warn!(index, sequence, error = %e, "Batch item failed");
            TransmissionResult {
                index,
                sequence,
                status: 0,
                text: format!("{}: ERROR — {}", item_ref(index), e),
                time: 0,
            }
        }
    }
}
