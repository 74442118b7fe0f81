// NiceType CLI
// Watches the keyboard and fixes up punctuation and brackets as you type

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use nicetype_core::event::{EventLoop, KeyboardListener};
use nicetype_core::output::{DryRunSink, InjectionSink, VirtualDevice};
use nicetype_core::{DeviceFilter, InputProcessor, KeyEvent, Settings, SubstitutionEngine};

/// How many rules of each table the self-test prints
const SAMPLE_RULES: usize = 3;

/// Punctuation conversion and bracket auto-completion for any application
#[derive(Parser, Debug)]
#[command(name = "nicetype")]
#[command(version)]
#[command(about = "Punctuation conversion and bracket auto-completion", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/nicetype/settings.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only watch these devices, by name or path (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,

    /// Print the active toggles and rule tables, try them out, and exit
    #[arg(long)]
    self_test: bool,

    /// Write the default settings file and exit
    #[arg(long)]
    write_default_config: bool,

    /// Log actions instead of typing them
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

/// Load settings from `--config` or the default location, then apply
/// command-line overrides.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load_default().context("failed to load default settings")?,
    };
    if !args.devices.is_empty() {
        settings.set_device_filter(args.devices.clone());
    }
    Ok(settings)
}

fn reload_settings(current: &Settings, args: &Args) -> Result<Settings> {
    let mut settings = current.clone();
    settings.reload().context("failed to reload settings")?;
    if !args.devices.is_empty() {
        settings.set_device_filter(args.devices.clone());
    }
    if settings.device_filter() != current.device_filter() {
        log::warn!("device selection changes take effect after a restart");
    }
    Ok(settings)
}

fn list_devices() -> Result<()> {
    let devices = EventLoop::list_devices().context("failed to enumerate input devices")?;
    println!("Found {} input device(s):", devices.len());
    for device in &devices {
        let marker = if device.is_keyboard { "*" } else { " " };
        match &device.path {
            Some(path) => println!(" {} {}: {} ({})", marker, device.index, device.name, path),
            None => println!(" {} {}: {}", marker, device.index, device.name),
        }
    }
    println!("Devices marked * are watched when no device filter is set.");
    Ok(())
}

fn write_default_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Settings::default_path().context("no configuration directory on this system")?,
    };
    if path.exists() {
        bail!("{} already exists, not overwriting", path.display());
    }
    Settings::new()
        .save_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

/// Summary of toggles and rule tables, followed by a dry run of one sample
/// of each kind of rule.
fn self_test_report(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NiceType self-test");
    match settings.source_path() {
        Some(path) => {
            let _ = writeln!(out, "Settings: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "Settings: built-in defaults");
        }
    }
    for (name, value) in settings.features() {
        let _ = writeln!(out, "  {} = {}", name, value);
    }
    let _ = writeln!(out, "  conversion_timeout = {}ms", settings.conversion_timeout().as_millis());

    let punctuation = settings.punctuation_rules();
    let _ = writeln!(out, "\nPunctuation rules: {}", punctuation.len());
    for ([a, b], replacement) in punctuation.iter().take(SAMPLE_RULES) {
        let _ = writeln!(out, "  {}{} -> {}", a, b, replacement);
    }
    if punctuation.len() > SAMPLE_RULES {
        let _ = writeln!(out, "  ... and {} more", punctuation.len() - SAMPLE_RULES);
    }

    let completion = settings.completion_rules();
    let _ = writeln!(out, "\nCompletion pairs: {}", completion.len());
    for (opener, closer) in completion.iter().take(SAMPLE_RULES) {
        let _ = writeln!(out, "  {} -> {}", opener, closer);
    }
    if completion.len() > SAMPLE_RULES {
        let _ = writeln!(out, "  ... and {} more", completion.len() - SAMPLE_RULES);
    }

    let mut quiet = settings.clone();
    quiet.set_echo_settle(Duration::ZERO);
    let mut engine = SubstitutionEngine::new(Arc::new(quiet), DryRunSink::new());
    let _ = writeln!(out, "\nTrial run:");
    let now = Instant::now();
    if let Some(([a, b], _)) = punctuation.iter().next() {
        engine.reset();
        engine.handle(&KeyEvent::character(a, now));
        let action = engine.handle(&KeyEvent::character(b, now));
        let _ = writeln!(out, "  {}{} => {}", a, b, action);
    }
    if let Some((opener, _)) = completion.iter().next() {
        engine.reset();
        let action = engine.handle(&KeyEvent::character(opener, now));
        let _ = writeln!(out, "  {} => {}", opener, action);
    }
    out
}

fn create_sink(settings: &Settings, dry_run: bool) -> Result<Box<dyn InjectionSink + Send>> {
    if dry_run {
        log::info!("dry run: actions are logged, not typed");
        return Ok(Box::new(DryRunSink::new()));
    }
    let mut device = VirtualDevice::new().context("failed to create the virtual keyboard (is /dev/uinput writable?)")?;
    let (pre, post) = settings.key_delays_ms();
    device.set_throttle_delays(pre, post);
    log::debug!("throttle delays: pre={}ms post={}ms", pre, post);
    Ok(Box::new(device))
}

fn run(args: &Args, settings: Settings) -> Result<()> {
    let filter = DeviceFilter::new(settings.device_filter().to_vec());
    let listener = KeyboardListener::new(&filter).context("failed to open keyboard devices")?;
    log::info!(
        "watching {} keyboard(s): {}",
        listener.event_loop().device_count(),
        listener.event_loop().device_names().join(", ")
    );

    let sink = create_sink(&settings, args.dry_run)?;
    let mut current = Arc::new(settings);
    let engine = SubstitutionEngine::new(Arc::clone(&current), sink);
    let mut processor = InputProcessor::new(listener, engine);

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to install signal handlers")?;
    processor.start().context("failed to start the input processor")?;
    log::info!("NiceType is running. Press Ctrl+C to exit.");

    'main: while processor.is_running() {
        for signal in signals.pending() {
            match signal {
                SIGHUP => match reload_settings(&current, args) {
                    Ok(settings) => {
                        log::info!("settings reloaded");
                        current = Arc::new(settings);
                        processor.update_settings(Arc::clone(&current));
                    }
                    Err(e) => log::error!("{:#}", e),
                },
                _ => {
                    log::info!("received signal {}, shutting down", signal);
                    break 'main;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let stopped_by_source = !processor.is_running();
    processor.stop();
    if stopped_by_source {
        bail!("keyboard input ended unexpectedly");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // These do not need a settings file.
    if args.list_devices {
        return list_devices();
    }
    if args.write_default_config {
        return write_default_config(args.config.as_deref());
    }

    let settings = load_settings(&args)?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }
    if args.self_test {
        print!("{}", self_test_report(&settings));
        return Ok(());
    }

    run(&args, settings)
}
