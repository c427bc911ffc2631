//! Inputlog CLI
//!
//! Each capture subcommand runs one pipeline (keyboard or mouse) until it is
//! interrupted or its log file becomes unwritable.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inputlog::{
    collector::{check_permission, Collector, CollectorConfig, InputSource, HAS_HOOK_BACKEND},
    config::Config,
    core::{
        run_pipeline, ClickStyle, InputHandler, KeyboardNormalizer, LogWriter, MouseNormalizer,
        MouseSettings, PipelineExit, PipelineKind,
    },
    transparency::CaptureStats,
    CAPTURE_NOTICE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "inputlog")]
#[command(version = VERSION)]
#[command(about = "Capture keyboard and mouse events to an append-only JSONL log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase diagnostic verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture key presses and releases
    Keyboard {
        /// Log file to append to (a directory gets a timestamped file)
        output: PathBuf,

        /// fsync after every record
        #[arg(long)]
        sync: bool,
    },

    /// Capture pointer moves, clicks and scrolls
    Mouse {
        /// Log file to append to (a directory gets a timestamped file)
        output: PathBuf,

        /// Minimum milliseconds between two recorded moves
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// How to record button releases (split or combined)
        #[arg(long)]
        click_style: Option<ClickStyle>,

        /// fsync after every record
        #[arg(long)]
        sync: bool,
    },

    /// Show configuration
    Config,

    /// Display the capture notice
    Notice,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Keyboard { output, sync } => cmd_keyboard(&output, sync),
        Commands::Mouse {
            output,
            debounce_ms,
            click_style,
            sync,
        } => cmd_mouse(&output, debounce_ms, click_style, sync),
        Commands::Config => cmd_config(),
        Commands::Notice => {
            println!("{CAPTURE_NOTICE}");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "inputlog=error"
    } else {
        match verbose {
            0 => "inputlog=info",
            1 => "inputlog=debug",
            _ => "inputlog=trace",
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load {:?}: {e}; using defaults", Config::config_path());
        Config::default()
    })
}

/// Resolve the output path and create the log file.
///
/// Permission is checked first so a refused capture leaves no file behind.
fn open_writer(
    kind: PipelineKind,
    output: &Path,
    sync: bool,
    permitted: impl FnOnce() -> bool,
) -> anyhow::Result<LogWriter> {
    if !permitted() {
        eprintln!("Input Monitoring permission not granted.");
        eprintln!();
        eprintln!("To grant permission:");
        eprintln!("1. Open System Settings > Privacy & Security");
        eprintln!("2. Select 'Input Monitoring'");
        eprintln!("3. Add this application to the allowed list");
        eprintln!("4. Restart the application");
        bail!("cannot capture {kind} events without Input Monitoring permission");
    }

    let path = kind.resolve_output(output, Utc::now());
    let writer = LogWriter::initialize(&path)
        .with_context(|| format!("cannot create {kind} log at {}", path.display()))?;
    Ok(writer.with_sync(sync))
}

/// Apply command-line overrides on top of the configured mouse settings.
fn mouse_settings(
    configured: &MouseSettings,
    debounce_ms: Option<u64>,
    click_style: Option<ClickStyle>,
) -> MouseSettings {
    let mut settings = configured.clone();
    if let Some(ms) = debounce_ms {
        settings.debounce = Duration::from_millis(ms);
    }
    if let Some(style) = click_style {
        settings.click_style = style;
    }
    settings
}

fn cmd_keyboard(output: &Path, sync: bool) -> anyhow::Result<()> {
    let config = load_config();
    let writer = open_writer(
        PipelineKind::Keyboard,
        output,
        sync || config.writer.sync,
        check_permission,
    )?;
    let path = writer.path().to_path_buf();

    let keyboard = KeyboardNormalizer::new(writer);
    capture(PipelineKind::Keyboard, CollectorConfig::keyboard(), keyboard, &path)
}

fn cmd_mouse(
    output: &Path,
    debounce_ms: Option<u64>,
    click_style: Option<ClickStyle>,
    sync: bool,
) -> anyhow::Result<()> {
    let config = load_config();
    let settings = mouse_settings(&config.mouse, debounce_ms, click_style);

    let writer = open_writer(
        PipelineKind::Mouse,
        output,
        sync || config.writer.sync,
        check_permission,
    )?;
    let path = writer.path().to_path_buf();

    tracing::info!(
        debounce_ms = settings.debounce.as_millis() as u64,
        click_style = ?settings.click_style,
        "mouse settings"
    );

    let mouse = MouseNormalizer::new(writer, settings);
    capture(PipelineKind::Mouse, CollectorConfig::mouse(), mouse, &path)
}

/// Run one pipeline in the foreground until Ctrl+C, a write failure, or the
/// input source going away.
fn capture<H: InputHandler>(
    kind: PipelineKind,
    collector_config: CollectorConfig,
    mut handler: H,
    path: &Path,
) -> anyhow::Result<()> {
    if !HAS_HOOK_BACKEND {
        tracing::warn!("No input hook backend for this platform; no events will be captured");
    }

    println!("Inputlog v{VERSION}");
    println!("Capturing {kind} events to {}", path.display());
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut collector = Collector::new(collector_config);
    collector
        .start()
        .with_context(|| format!("failed to start {kind} collector"))?;

    tracing::info!(pipeline = %kind, path = %path.display(), "capture started");

    let stats = CaptureStats::new(kind);
    let result = run_pipeline(&mut handler, collector.receiver(), &running, &stats);

    println!();
    println!("Stopping collection...");
    collector.stop();
    tracing::info!(pipeline = %kind, "capture stopped");

    println!();
    println!("{}", stats.summary());

    match result.with_context(|| format!("{kind} capture stopped"))? {
        PipelineExit::Stopped => Ok(()),
        PipelineExit::SourceClosed => bail!("{kind} input source stopped unexpectedly"),
    }
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("cannot load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("inputlog").chain(args.iter().copied()))
    }

    #[test]
    fn test_missing_output_is_usage_error() {
        for pipeline in ["keyboard", "mouse"] {
            let err = parse(&[pipeline]).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_mouse_flags() {
        let cli = parse(&[
            "mouse",
            "out.txt",
            "--click-style",
            "combined",
            "--debounce-ms",
            "1000",
        ])
        .unwrap();

        match cli.command {
            Commands::Mouse {
                output,
                debounce_ms,
                click_style,
                sync,
            } => {
                assert_eq!(output, PathBuf::from("out.txt"));
                assert_eq!(debounce_ms, Some(1000));
                assert_eq!(click_style, Some(ClickStyle::Combined));
                assert!(!sync);
            }
            _ => panic!("expected mouse command"),
        }
    }

    #[test]
    fn test_invalid_click_style() {
        let err = parse(&["mouse", "out.txt", "--click-style", "double"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let configured = MouseSettings {
            debounce: Duration::from_millis(250),
            click_style: ClickStyle::Combined,
        };

        let settings = mouse_settings(&configured, Some(1000), None);
        let writer = LogWriter::initialize(dir.path().join("m.txt")).unwrap();
        let mouse = MouseNormalizer::new(writer, settings);

        assert_eq!(mouse.settings().debounce, Duration::from_secs(1));
        assert_eq!(mouse.settings().click_style, ClickStyle::Combined);

        let settings = mouse_settings(&configured, None, Some(ClickStyle::Split));
        assert_eq!(settings.debounce, Duration::from_millis(250));
        assert_eq!(settings.click_style, ClickStyle::Split);
    }

    #[test]
    fn test_refused_permission_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = open_writer(PipelineKind::Keyboard, dir.path(), false, || false);
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let writer = open_writer(PipelineKind::Keyboard, dir.path(), false, || true).unwrap();
        assert!(writer.path().starts_with(dir.path()));
        assert!(writer.path().exists());
    }
}
