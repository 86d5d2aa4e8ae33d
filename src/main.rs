//! Application entry point: Batch Voice Converter.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime shared by API calls and the batch worker.
//! 4. Collect input files from the command line.
//! 5. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::path::PathBuf;

use batch_voice_converter::{app::BatchConverterApp, config::AppConfig};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("ElevenLabs Batch Voice Converter")
        .with_inner_size([w, h])
        .with_min_inner_size([640.0, 480.0])
        .with_drag_and_drop(true);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Batch Voice Converter starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (voice/credit fetches + the batch worker's block_on)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Files passed on the command line
    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    // 5. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let app = BatchConverterApp::new(config, rt.handle().clone(), files);

    eframe::run_native(
        "ElevenLabs Batch Voice Converter",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
