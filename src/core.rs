use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value as JsonValue;

use crate::batch::{patterns_from_response, BatchGenerator, FieldPattern};
use crate::cli::args::{BatchArgs, ExportCurlArgs, ImportCurlArgs, MonitorArgs, SendArgs};
use crate::cli::{build_request, process_url, resolve_range, resolve_variables, Args, Command, LogFormat};
use crate::config::Config;
use crate::devexp::{format_curl_pretty, parse_curl, to_curl};
use crate::diagnosis::{describe_error, diagnose};
use crate::errors::{AxiomError, Result};
use crate::http::HttpMethod;
use crate::models::ApiRequest;
use crate::monitor::HealthMonitor;
use crate::output::report;
use crate::range::find_max_id;
use crate::signals;
use crate::status::ExitStatus;
use crate::transmit::{
    parse_raw_batch, BatchSource, EngineOptions, Executor, ReqwestTransport, TransmissionEngine,
    TransmissionPlan, TransmissionState, TransportOptions,
};
use crate::variables::{interpolate, Variable};
use crate::workbench::Workbench;

/// Main entry point for the CLI.
///
/// Handles argument parsing, logging and configuration, then dispatches to
/// the subcommand handler on a multi-threaded runtime.
pub fn run(args: Vec<String>) -> ExitStatus {
    let parsed = match Args::try_parse_from(&args) {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    init_logging(parsed.debug, parsed.log_format.unwrap_or_default());

    let config = match &parsed.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}", e);
            Config::default()
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create tokio runtime: {}", e);
            return ExitStatus::Error;
        }
    };

    let debug = parsed.debug;
    match runtime.block_on(program(parsed, config)) {
        Ok(status) => status,
        Err(e) => handle_error(e, debug),
    }
}

/// Initialize the tracing subscriber on stderr.
///
/// `AXIOM_LOG` takes an `EnvFilter` directive; without it the level is
/// `warn`, or `debug` under `--debug`.
fn init_logging(debug: bool, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("AXIOM_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

pub async fn program(args: Args, config: Config) -> Result<ExitStatus> {
    tracing::debug!(?args, "Parsed arguments");

    let workbench_path: Option<PathBuf> = args.workbench.clone().or_else(|| config.defaults.workbench.clone());
    let mut workbench = match &workbench_path {
        Some(path) => Workbench::load_or_default(path)?,
        None => Workbench::new(),
    }
    .with_history_limit(config.defaults.history_limit);

    let variables = resolve_variables(&args, &mut workbench.environments)?;

    let timeout = match args.timeout {
        Some(arg) => arg.0,
        None => config.defaults.timeout,
    };
    let transport = ReqwestTransport::new(&TransportOptions {
        insecure: args.insecure || config.defaults.insecure,
        ..Default::default()
    })?;
    let executor = Executor::new(transport).with_timeout(timeout);

    let mut dirty = false;
    let status = match args.command {
        Command::Send(send) => run_send(send, &executor, &variables, &mut workbench, &mut dirty).await?,
        Command::Batch(batch) => run_batch(batch, &executor, &variables, &config, &mut workbench, &mut dirty).await?,
        Command::ImportCurl(import) => run_import_curl(import, &executor, &variables, &mut workbench, &mut dirty).await?,
        Command::ExportCurl(export) => run_export_curl(export, &variables)?,
        Command::Monitor(monitor) => run_monitor(monitor, &executor, &variables).await?,
    };

    if dirty {
        if let Some(path) = &workbench_path {
            workbench.export_to(path)?;
        }
    }

    if signals::was_interrupted() {
        return Ok(ExitStatus::Interrupted);
    }

    Ok(status)
}

async fn run_send(
    args: SendArgs,
    executor: &Executor<ReqwestTransport>,
    variables: &[Variable],
    workbench: &mut Workbench,
    dirty: &mut bool,
) -> Result<ExitStatus> {
    let request = build_request(&args.request)?;
    let status = send_and_report(&request, executor, variables, args.include_headers, args.check_status, workbench).await;
    *dirty = true;

    if let Some(name) = args.save {
        workbench.save_to_library(request.with_name(name));
    }

    Ok(status)
}

/// Send one request, print the outcome and record it in history
async fn send_and_report(
    request: &ApiRequest,
    executor: &Executor<ReqwestTransport>,
    variables: &[Variable],
    include_headers: bool,
    check_status: bool,
    workbench: &mut Workbench,
) -> ExitStatus {
    let resolved_url = interpolate(&request.url, variables, None);

    match executor.execute(request, variables).await {
        Ok(response) => {
            println!("{}", report::response_summary(&response));
            if include_headers && !response.headers.is_empty() {
                println!("{}\n", report::response_headers(&response.headers));
            }
            println!("{}", report::response_body(&response.data));

            if let Some(error) = describe_error(&response) {
                eprint!("{}", report::diagnosis(&diagnose(&error, &resolved_url, Some(&response.data))));
            }

            let status = ExitStatus::from_http_status(response.status, check_status);
            workbench.record(request.clone(), Some(response));
            status
        }
        Err(e) => {
            tracing::warn!(url = %resolved_url, error = %e, "Request failed");
            eprint!("{}", report::diagnosis(&diagnose(&e.message, &resolved_url, None)));
            workbench.record(request.clone(), None);
            ExitStatus::Error
        }
    }
}

async fn run_batch(
    args: BatchArgs,
    executor: &Executor<ReqwestTransport>,
    variables: &[Variable],
    config: &Config,
    workbench: &mut Workbench,
    dirty: &mut bool,
) -> Result<ExitStatus> {
    let template = build_request(&args.request)?;
    let method = template.method;

    let sample = load_sample(&args, &template, executor, variables).await?;
    let info = sample.as_ref().and_then(find_max_id);
    if let Some(info) = &info {
        tracing::info!(key = %info.key, max = info.max, "Inferred id range from sample");
    }

    let source = match &args.raw {
        Some(path) => {
            let buffer = std::fs::read_to_string(path)?;
            let start = resolve_range(&args, method, None)?.start;
            BatchSource::raw(buffer, start)
        }
        None => {
            let patterns = resolve_patterns(&args, &template, sample.as_ref())?;
            let range = resolve_range(&args, method, info.as_ref())?;
            BatchSource::generated(patterns, range)
        }
    };

    let options = EngineOptions {
        mode: args.mode.unwrap_or(config.defaults.mode),
        strategy: args.strategy.unwrap_or(config.defaults.strategy),
        item_timeout: None,
    };

    if args.dry_run {
        let items = match &source {
            BatchSource::Generated { patterns, range } => BatchGenerator::new(patterns, options.mode)
                .with_variables(variables)
                .generate(*range, &mut rand::rng()),
            BatchSource::Raw { buffer, .. } => parse_raw_batch(buffer)?,
        };
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(ExitStatus::Success);
    }

    let engine = Arc::new(TransmissionEngine::with_executor(executor.clone(), options));
    let handle = engine.begin(TransmissionPlan {
        method,
        url: template.url.clone(),
        headers: template.headers.clone(),
        variables: variables.to_vec(),
        source,
    })?;

    let snapshot = engine.snapshot();
    let show_lines = !args.json;
    let progress = (!args.no_progress && !args.json && snapshot.total > 0).then(|| {
        let pb = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("{} items, {:?}", snapshot.total, options.strategy));
        pb
    });

    // Ctrl+C closes the run; completions after that are discarded.
    let watcher = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            signals::interrupted().await;
            engine.close();
        })
    };

    let mut rx = handle.subscribe();
    let mut printed = 0;
    loop {
        let snap = rx.borrow_and_update().clone();
        if show_lines {
            for result in snap.log.iter().skip(printed) {
                let line = report::log_line(result);
                match &progress {
                    Some(pb) => pb.suspend(|| println!("{}", line)),
                    None => println!("{}", line),
                }
            }
        }
        printed = snap.log.len();
        if let Some(pb) = &progress {
            pb.set_position(snap.percent() as u64);
        }
        if snap.state != TransmissionState::Running {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    let finished = handle.wait().await;
    watcher.abort();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    workbench.record_batch(template, &finished);
    *dirty = true;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&finished)?);
    } else {
        println!("{}", report::batch_summary(&finished));
    }

    if finished.state != TransmissionState::Finished {
        return Ok(ExitStatus::Interrupted);
    }
    Ok(ExitStatus::from_batch(&finished))
}

/// Sample payload for range and pattern inference, from a file or a live GET
async fn load_sample(
    args: &BatchArgs,
    template: &ApiRequest,
    executor: &Executor<ReqwestTransport>,
    variables: &[Variable],
) -> Result<Option<JsonValue>> {
    if let Some(path) = &args.sample {
        let content = std::fs::read_to_string(path)?;
        return Ok(Some(serde_json::from_str(&content)?));
    }

    let Some(url) = &args.infer_from else {
        return Ok(None);
    };
    let mut probe = ApiRequest::new(HttpMethod::Get, process_url(url)?);
    probe.headers = template.headers.clone();
    let response = executor.execute(&probe, variables).await?;
    if let Some(error) = describe_error(&response) {
        return Err(AxiomError::Argument(format!("Could not infer from {}: {}", url, error)));
    }
    Ok(Some(response.data))
}

/// Explicit `--field` specs, else patterns derived from the sample, else
/// from a JSON object body
fn resolve_patterns(args: &BatchArgs, template: &ApiRequest, sample: Option<&JsonValue>) -> Result<Vec<FieldPattern>> {
    if !args.fields.is_empty() {
        return args
            .fields
            .iter()
            .map(|spec| {
                FieldPattern::parse_spec(spec)
                    .ok_or_else(|| AxiomError::Argument(format!("Invalid field '{}', expected key=pattern[:type]", spec)))
            })
            .collect();
    }

    if let Some(sample) = sample {
        return Ok(patterns_from_response(sample));
    }

    match serde_json::from_str::<JsonValue>(&template.body) {
        Ok(body @ JsonValue::Object(_)) => Ok(patterns_from_response(&body)),
        _ => Err(AxiomError::Argument(
            "No fields to generate: use --field, --sample, --infer-from or a JSON object --body".to_string(),
        )),
    }
}

async fn run_import_curl(
    args: ImportCurlArgs,
    executor: &Executor<ReqwestTransport>,
    variables: &[Variable],
    workbench: &mut Workbench,
    dirty: &mut bool,
) -> Result<ExitStatus> {
    let command = if args.command == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.command
    };

    let mut request = parse_curl(&command)?;
    if let Some(name) = args.save {
        request = request.with_name(name);
        workbench.save_to_library(request.clone());
        *dirty = true;
    }

    if args.send {
        *dirty = true;
        return Ok(send_and_report(&request, executor, variables, false, false, workbench).await);
    }

    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(ExitStatus::Success)
}

fn run_export_curl(args: ExportCurlArgs, variables: &[Variable]) -> Result<ExitStatus> {
    let request = build_request(&args.request)?;
    println!("{}", format_curl_pretty(&to_curl(&request, variables)));
    Ok(ExitStatus::Success)
}

async fn run_monitor(args: MonitorArgs, executor: &Executor<ReqwestTransport>, variables: &[Variable]) -> Result<ExitStatus> {
    let url = process_url(&interpolate(&args.url, variables, None))?;
    eprintln!("{} {} every {}", crate::output::info("Monitoring"), url, humantime::format_duration(args.interval));

    let monitor = HealthMonitor::spawn(executor.clone(), url, args.interval, args.window, args.count);
    let mut rx = monitor.subscribe();
    let mut last = None;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = signals::interrupted() => {
                monitor.stop();
                break;
            }
        }

        let newest = rx.borrow_and_update().samples.front().cloned();
        if let Some(sample) = newest {
            if last.as_ref() != Some(&sample) {
                println!("{}", report::probe_line(&sample));
                last = Some(sample);
            }
        }
    }

    let state = monitor.join().await;
    println!("{}", report::monitor_summary(&state.stats()));
    Ok(ExitStatus::Success)
}

fn handle_error(error: AxiomError, debug: bool) -> ExitStatus {
    if debug {
        eprintln!("Error: {:?}", error);
    } else {
        eprintln!("Error: {}", error);
    }

    // All errors return the same exit code (1) following Unix conventions
    ExitStatus::Error
}
