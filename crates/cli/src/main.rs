use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use camwatch_core::alerting::domain::alert_sink::AlertSink;
use camwatch_core::alerting::infrastructure::email_alert_sink::EmailAlertSink;
use camwatch_core::alerting::infrastructure::fanout_alert_sink::FanoutAlertSink;
use camwatch_core::alerting::infrastructure::log_alert_sink::LogAlertSink;
use camwatch_core::alerting::infrastructure::webhook_alert_sink::WebhookAlertSink;
use camwatch_core::capture::domain::frame_source::FrameSource;
use camwatch_core::capture::infrastructure::http_snapshot_source::HttpSnapshotSource;
use camwatch_core::capture::infrastructure::image_file_source::ImageFileSource;
use camwatch_core::capture::infrastructure::image_file_store::ImageFileStore;
use camwatch_core::capture::infrastructure::routing_frame_source::RoutingFrameSource;
use camwatch_core::config::settings::Settings;
use camwatch_core::config::source_registry::SourceRegistry;
use camwatch_core::monitoring::cycle_report::{AlertOutcome, SourceOutcome, SourceReport};
use camwatch_core::monitoring::infrastructure::jsonl_detection_recorder::JsonlDetectionRecorder;
use camwatch_core::monitoring::infrastructure::monitor_loop::{MonitorEvent, MonitorLoop};
use camwatch_core::monitoring::orchestrator::Orchestrator;
use camwatch_core::monitoring::poll_scheduler::{Collaborators, PollScheduler};
use camwatch_core::recognition::infrastructure::gallery_loader;
use camwatch_core::recognition::infrastructure::template_face_matcher::{
    TemplateFaceMatcher, DEFAULT_MATCH_FLOOR,
};
use camwatch_core::shared::constants::SOURCES_FILE_NAME;
use camwatch_core::shared::source::SourceDescriptor;
use camwatch_core::shared::timestamp::{Clock, SystemClock};

/// Watch cameras for known faces and raise rate-limited alerts.
#[derive(Parser)]
#[command(name = "camwatch")]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the alert confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f64>,

    /// Override the poll interval in seconds.
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every source until stopped.
    Monitor {
        /// Stop after this many seconds (runs until killed otherwise).
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Capture and analyze one source now.
    Analyze { source: String },
    /// Capture one frame from a source and save it.
    Capture { source: String },
    /// Show whether each source is reachable.
    Status,
    /// Manage the camera list.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
}

#[derive(Subcommand)]
enum SourcesAction {
    List,
    /// Register a camera: a device index (0), a URL, or an image path.
    Add { name: String, descriptor: String },
    Remove { name: String },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings_path = match cli.config.clone() {
        Some(path) => path,
        None => Settings::default_path().ok_or("could not determine config directory")?,
    };
    let registry_path = settings_path.with_file_name(SOURCES_FILE_NAME);
    let settings = apply_overrides(Settings::load(&settings_path)?, &cli);
    settings.validate()?;
    let clock = SystemClock::new();

    match cli.command {
        Command::Monitor { duration_secs } => {
            let orchestrator = build_orchestrator(&settings, &registry_path)?;
            run_monitor(orchestrator, &settings, duration_secs.map(Duration::from_secs))
        }
        Command::Analyze { source } => {
            let mut orchestrator = build_orchestrator(&settings, &registry_path)?;
            let report = orchestrator.analyze_source_now(&source, clock.now())?;
            print_report(&report);
            Ok(())
        }
        Command::Capture { source } => {
            let mut orchestrator = build_orchestrator(&settings, &registry_path)?;
            let path = orchestrator.capture_and_save(&source, clock.now())?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Status => {
            let mut orchestrator = build_orchestrator(&settings, &registry_path)?;
            for status in orchestrator.source_statuses(clock.now()) {
                let state = if status.reachable { "online" } else { "offline" };
                println!("{:<20} {:<8} {}", status.name, state, status.descriptor);
            }
            Ok(())
        }
        Command::Sources { action } => run_sources(action, &registry_path, &clock),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err("confidence must be between 0.0 and 1.0".into());
        }
    }
    if cli.poll_interval == Some(0) {
        return Err("poll interval must be at least 1 second".into());
    }
    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(confidence) = cli.confidence {
        settings.confidence_threshold = confidence;
    }
    if let Some(secs) = cli.poll_interval {
        settings.poll_interval_secs = secs;
    }
    settings
}

fn run_sources(
    action: SourcesAction,
    registry_path: &Path,
    clock: &dyn Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = SourceRegistry::load(registry_path)?;
    match action {
        SourcesAction::List => {
            for source in registry.list() {
                println!("{:<20} {}", source.name, source.descriptor);
            }
        }
        SourcesAction::Add { name, descriptor } => {
            let descriptor: SourceDescriptor = descriptor.parse()?;
            let added = registry.add(&name, descriptor, clock.now())?;
            log::info!("Added {} ({})", added.name, added.descriptor);
            registry.save(registry_path)?;
        }
        SourcesAction::Remove { name } => {
            let removed = registry.remove(&name)?;
            log::info!("Removed {}", removed.name);
            registry.save(registry_path)?;
        }
    }
    Ok(())
}

fn run_monitor(
    orchestrator: Orchestrator,
    settings: &Settings,
    duration: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    if orchestrator.sources().is_empty() {
        return Err("no sources configured; add one with `camwatch sources add`".into());
    }

    let monitor = MonitorLoop::spawn(
        orchestrator,
        Box::new(SystemClock::new()),
        settings.tick_interval(),
    );
    let handle = monitor.handle();
    let events = handle.subscribe()?;
    handle.start()?;

    let deadline = duration.map(|d| Instant::now() + d);
    loop {
        let event = match deadline {
            Some(deadline) => {
                let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                    break;
                };
                match events.recv_timeout(left) {
                    Ok(event) => event,
                    Err(_) => break,
                }
            }
            None => match events.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };
        match event {
            MonitorEvent::Cycle(report) => log::info!("{}", report.summary()),
            MonitorEvent::SessionChanged(status) => log::info!("Monitoring {status}"),
        }
    }

    handle.stop()?;
    let orchestrator = monitor.shutdown()?;
    log::info!(
        "Recorded {} detection(s)",
        orchestrator.recent_detections().len()
    );
    Ok(())
}

fn build_orchestrator(
    settings: &Settings,
    registry_path: &Path,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let registry = SourceRegistry::load(registry_path)?;
    let gallery = gallery_loader::load_dir(&settings.gallery_dir)?;
    if gallery.is_empty() {
        log::warn!(
            "No reference faces in {}; every face will be reported as no match",
            settings.gallery_dir.display()
        );
    } else {
        log::info!("Loaded {} reference face(s)", gallery.len());
    }

    let collaborators = Collaborators {
        frame_source: build_frame_source(settings)?,
        matcher: Box::new(TemplateFaceMatcher::new(
            gallery.into_shared(),
            DEFAULT_MATCH_FLOOR,
        )),
        alert_sink: build_alert_sink(settings)?,
    };

    let orchestrator = Orchestrator::new(
        registry,
        PollScheduler::default(),
        collaborators,
        Box::new(ImageFileStore::new(&settings.capture_dir)),
        settings.poll_policy(),
    );

    Ok(match &settings.detection_log {
        Some(path) => orchestrator.with_recorder(Box::new(JsonlDetectionRecorder::open(path)?)),
        None => orchestrator,
    })
}

fn build_frame_source(settings: &Settings) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let http = Box::new(HttpSnapshotSource::new(settings.http_timeout())?);
    let files = Box::new(ImageFileSource::new());
    Ok(Box::new(RoutingFrameSource::new(
        http,
        files,
        build_stream_source(settings)?,
    )))
}

#[cfg(feature = "ffmpeg")]
fn build_stream_source(
    settings: &Settings,
) -> Result<Option<Box<dyn FrameSource>>, Box<dyn std::error::Error>> {
    use camwatch_core::capture::infrastructure::ffmpeg_stream_source::FfmpegStreamSource;
    Ok(Some(Box::new(FfmpegStreamSource::new(settings.http_timeout())?)))
}

#[cfg(not(feature = "ffmpeg"))]
fn build_stream_source(
    _settings: &Settings,
) -> Result<Option<Box<dyn FrameSource>>, Box<dyn std::error::Error>> {
    log::debug!("Built without ffmpeg; device and rtsp sources are unavailable");
    Ok(None)
}

fn build_alert_sink(settings: &Settings) -> Result<Box<dyn AlertSink>, Box<dyn std::error::Error>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if let Some(email) = settings.email_config() {
        log::info!("Emailing alerts to {}", email.recipient);
        sinks.push(Box::new(EmailAlertSink::new(&email)?));
    }
    if let Some(url) = &settings.webhook_url {
        sinks.push(Box::new(WebhookAlertSink::new(
            url.as_str(),
            settings.http_timeout(),
        )?));
    }
    let sink: Box<dyn AlertSink> = match sinks.len() {
        0 => Box::new(LogAlertSink),
        1 => sinks.remove(0),
        _ => Box::new(FanoutAlertSink::new(sinks)),
    };
    Ok(sink)
}

fn print_report(report: &SourceReport) {
    match &report.outcome {
        SourceOutcome::Offline => println!("{}: offline", report.source),
        SourceOutcome::CaptureFailed { reason } => println!(
            "{}: capture failed ({})",
            report.source,
            reason.as_deref().unwrap_or("no frame")
        ),
        SourceOutcome::MatcherFailed { reason } => {
            println!("{}: face matching failed ({reason})", report.source)
        }
        SourceOutcome::Analyzed { detections } if detections.is_empty() => {
            println!("{}: no faces", report.source)
        }
        SourceOutcome::Analyzed { detections } => {
            for outcome in detections {
                println!(
                    "{}: {} {:.1}% [{}]",
                    report.source,
                    outcome.detection.subject,
                    outcome.detection.confidence_percent,
                    describe_alert(&outcome.alert)
                );
            }
        }
    }
}

fn describe_alert(alert: &AlertOutcome) -> String {
    match alert {
        AlertOutcome::NoMatch => "no match".into(),
        AlertOutcome::BelowThreshold => "below threshold".into(),
        AlertOutcome::Sent => "alert sent".into(),
        AlertOutcome::Suppressed => "suppressed".into(),
        AlertOutcome::DeliveryFailed(e) => format!("delivery failed: {e}"),
    }
}
