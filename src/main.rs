mod adapters;
mod application;
mod config;
mod domain;
mod ports;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(windows)]
use adapters::{PdhProbe, WindowsSystemSource};
use adapters::WebhookUploader;
#[cfg(target_os = "linux")]
use adapters::{
    procfs::{ProcfsProbe, ProcfsSystemSource},
    ProcfsAdapter,
};
use application::lifecycle::EndCallback;
use application::{AnalysisRun, ProcessController, Report, ReportMetadata};
use config::{Config, ConfigError};
use ports::{ReportUploader, SystemSource};

#[cfg(target_os = "linux")]
fn platform() -> (ProcfsProbe, ProcfsSystemSource) {
    let adapter = ProcfsAdapter::with_default_paths();
    (adapter.probe(), adapter.system_source())
}

#[cfg(windows)]
fn platform() -> (PdhProbe, WindowsSystemSource) {
    (PdhProbe::new(), WindowsSystemSource)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("procsampler={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting procsampler v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);
    config.validate()?;

    run(&config)
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (probe, system_source) = platform();

    let mut metadata = ReportMetadata::new(config.sdk, config.protocol);
    match system_source.device_info() {
        Ok(device) => metadata = metadata.with_device(device),
        Err(e) => warn!("Device info unavailable: {}", e),
    }
    let mut report = Report::initialize(config.format, metadata).with_health_buckets(config.buckets);

    let on_end: EndCallback = Box::new(|state| info!(%state, "Target finished"));
    let controller = match (config.pid, &config.target) {
        (Some(pid), _) => ProcessController::attach(probe, pid, config.sdk, Some(on_end)),
        (None, Some(target)) => ProcessController::create(probe, target.clone(), config.sdk, Some(on_end)),
        (None, None) => {
            return Err(ConfigError::Invalid("no target to measure".to_string()).into());
        }
    };
    let mut controller = controller.with_options(config.lifecycle_options());

    // A failed start is fatal for the run
    controller.start(&config.args)?;
    info!(pid = ?controller.pid(), target = %controller.target(), sdk = %controller.sdk(), "Measuring");

    let run = AnalysisRun::new(config.run_options());
    let outcome = run.poll_until_exit(&mut controller);

    if let Err(e) = controller.end() {
        error!("Failed to stop target: {}", e);
    }
    if let Err(e) = controller.close() {
        error!("{}", e);
    }

    match run.report(&outcome, &mut report) {
        Ok(recorded) => info!(
            recorded,
            samples = outcome.summary.sample_count(),
            polls = outcome.polls,
            state = %outcome.final_state,
            "Run complete"
        ),
        Err(e) => error!("Failed to record run: {}", e),
    }

    info!(
        format = ?report.format(),
        os = %report.metadata().os_type,
        entries = report.entry_count(),
        "Writing report"
    );
    let uploader = config.upload_url.as_deref().and_then(|url| {
        WebhookUploader::new(url)
            .map_err(|e| warn!("Upload disabled: {}", e))
            .ok()
    });
    let uploader = uploader.as_ref().map(|u| u as &dyn ReportUploader);

    if let Err(e) = report.write(config.output.as_deref(), uploader) {
        error!("{}", e);
        if config.output.is_some() {
            // Keep the measurement rather than losing it with the file
            warn!("Writing report to stdout instead");
            report.write(None, None)?;
        }
    }

    report.deinitialize();
    Ok(())
}
