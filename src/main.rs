use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tao::event::Event;
use tao::event_loop::{ControlFlow, EventLoop};
#[cfg(target_os = "macos")]
use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};

use tarca::capture::{CaptureReport, CaptureWorker, Capturer, XcapGrabber};
use tarca::config::{Config, Credentials};
use tarca::cooldown::Cooldown;
use tarca::display::TrackedCursor;
use tarca::hotkey::HotkeyManager;
use tarca::indicator::{self, AnswerState, StatusIndicator, StatusSink};
use tarca::inference::backend_for;
use tarca::mouse::{self, SystemCursor};
use tarca::pipeline::{AnswerPipeline, PipelineOptions, PipelineOutcome};
use tarca::processed::ProcessedSet;
use tarca::shutdown::ShutdownSignal;
use tarca::tray::{TrayApp, TrayMenuEvent};
use tarca::trigger::CaptureTrigger;
use tarca::watcher::CaptureWatcher;

#[derive(Parser)]
#[command(name = "tarca")]
#[command(about = "Capture the screen under the cursor and show the answer letters in the tray", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one existing image through the answer pipeline and print the answer
    Analyze {
        /// Image to analyze (png, jpg or jpeg)
        image: PathBuf,
    },
    /// Write the tray icon for an answer to a PNG file
    RenderIcon {
        /// Answer letters to draw
        text: String,
        /// Draw the ninja dot grid instead of letters
        #[arg(long)]
        ninja: bool,
        /// Draw the processing state that follows this answer
        #[arg(long)]
        processing: bool,
        /// Output file
        #[arg(short, long, default_value = "tarca-icon.png")]
        output: PathBuf,
    },
    /// Print the settings file location
    ConfigPath,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Analyze { image }) => analyze_command(&image),
        Some(Commands::RenderIcon { text, ninja, processing, output }) => {
            render_icon_command(&text, ninja, processing, &output)
        }
        Some(Commands::ConfigPath) => {
            Config::load_or_create()?;
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
        None => run_app(),
    }
}

/// Settings file, then `.env`/environment overrides, then the credential.
fn load_settings() -> Result<(Config, Credentials)> {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("⚠️  Failed to load .env: {}", e),
    }

    let mut config = Config::load_or_create()?;
    config.apply_env(|key| std::env::var(key).ok());
    info!("Configuration loaded successfully");

    let credentials = Credentials::from_env().map_err(|e| {
        error!("✗ {}", e);
        e
    })?;

    Ok((config, credentials))
}

fn pipeline_options(config: &Config) -> PipelineOptions {
    PipelineOptions {
        prompt: config.model.prompt().to_string(),
        delete_after_processing: config.capture.delete_after_processing,
    }
}

/// Status sink for one-shot runs without a tray.
struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn show_processing(&self) {
        info!("Analyzing...");
    }

    fn show_answer(&self, text: &str) {
        info!("✅ Answer: {}", text);
    }

    fn reset(&self) {
        warn!("No answer");
    }
}

fn analyze_command(image: &Path) -> Result<()> {
    let (config, credentials) = load_settings()?;

    let processed = Arc::new(ProcessedSet::new());
    processed.try_claim(image);

    let mut options = pipeline_options(&config);
    options.delete_after_processing = false;

    let pipeline = AnswerPipeline::new(
        backend_for(&credentials, &config.model),
        Arc::new(ConsoleStatus),
        processed,
        options,
    );

    match pipeline.process(image) {
        PipelineOutcome::Delivered(answer) => {
            println!("{}", answer);
            Ok(())
        }
        PipelineOutcome::Abandoned(e) => Err(anyhow::Error::new(e).context("Analysis abandoned")),
    }
}

fn render_icon_command(text: &str, ninja: bool, processing: bool, output: &Path) -> Result<()> {
    let mut state = AnswerState::new(ninja);
    if !state.show_answer(text) {
        anyhow::bail!("Nothing to draw: answer text is blank");
    }
    if processing {
        state.show_processing();
    }

    let rendering = state.render();
    rendering
        .face
        .render()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Icon written to {} (tooltip: \"{}\")", output.display(), rendering.tooltip);
    Ok(())
}

fn log_capture_report(report: CaptureReport) {
    match report.result {
        Ok(path) => info!("💾 Capture saved to: {}", path.display()),
        Err(e) => error!("❌ {:?} capture failed: {}", report.source, e),
    }
}

fn run_app() -> Result<()> {
    info!("TARCA - System Tray Application");

    let (config, credentials) = load_settings()?;

    let folder = config.capture.folder.clone();
    fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create capture folder {}", folder.display()))?;
    info!("Captures will be saved to '{}'", folder.display());

    let shutdown = ShutdownSignal::new();
    shutdown.install_ctrlc_handler()?;

    // Pipeline side: watcher thread → Gemini → indicator channel
    let (indicator_handle, indicator_commands) = indicator::channel_pair();
    let processed = Arc::new(ProcessedSet::new());
    let pipeline = AnswerPipeline::new(
        backend_for(&credentials, &config.model),
        Arc::new(indicator_handle),
        processed.clone(),
        pipeline_options(&config),
    );
    let watch_handle = CaptureWatcher::new(
        &folder,
        config.capture.stability_delay(),
        processed,
        pipeline,
    )
    .start()?;

    // Capture side: hotkey/mouse → cooldown → capture worker → folder
    let cursor = Arc::new(TrackedCursor::new());
    let cooldown = Arc::new(Cooldown::new(config.capture.cooldown()));
    let capturer = Capturer::new(
        Arc::new(XcapGrabber),
        Arc::new(SystemCursor::new(cursor.clone())),
        cooldown.clone(),
        &folder,
    );
    let (capture_worker, capture_reports) =
        CaptureWorker::spawn(capturer, config.capture.queue_capacity)?;
    let trigger = Arc::new(CaptureTrigger::new(
        cooldown,
        Arc::new(capture_worker),
        config.capture.mouse_button,
    ));
    mouse::spawn_listener(trigger.clone(), cursor)?;

    let mut event_loop = EventLoop::new();

    // Set app to be menu-bar only (no Dock icon) - MUST be before run()
    #[cfg(target_os = "macos")]
    event_loop.set_activation_policy(ActivationPolicy::Accessory);

    let tray_app = TrayApp::new()?;
    let mut indicator = StatusIndicator::new(tray_app, config.indicator.ninja_mode, shutdown.clone());
    info!("System tray initialized");

    let hotkey_manager = HotkeyManager::new(&config.capture.hotkey)?;
    let mut watch_handle = Some(watch_handle);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(16));

        if let Event::LoopDestroyed = event {
            info!("Starting shutdown sequence...");
            if let Some(handle) = watch_handle.take() {
                handle.stop();
            }
            info!("Application stopped cleanly.");
            return;
        }

        while let Some(hotkey_event) = hotkey_manager.poll_event() {
            trigger.on_hotkey(hotkey_event);
        }

        while let Ok(report) = capture_reports.try_recv() {
            log_capture_report(report);
        }

        while let Ok(command) = indicator_commands.try_recv() {
            indicator.apply(command);
        }

        while let Some(menu_event) = indicator.surface().poll_event() {
            match menu_event {
                TrayMenuEvent::ToggleNinja => indicator.toggle_obfuscation_mode(),
                TrayMenuEvent::Exit => indicator.request_exit(),
            }
        }

        if shutdown.is_triggered() {
            *control_flow = ControlFlow::Exit;
        }
    });
}
