//! Batch converter window: egui/eframe application.
//!
//! # Architecture
//!
//! [`BatchConverterApp`] is the top-level [`eframe::App`].  It owns the UI
//! state and two receiving ends that it drains every frame:
//!
//! * `api_rx`: voices and credits fetched on the tokio runtime after
//!   *Connect*.
//! * the active [`BatchWorker`]: [`BatchEvent`]s from the batch thread.
//!
//! Nothing in `update()` blocks: network calls run on the runtime and the
//! batch loop runs on its own thread.
//!
//! # Panels
//!
//! | Panel | Contents |
//! |-------|----------|
//! | Connection | API key, Connect, credits |
//! | Settings | voice, model, format, bit depth, sliders, flags |
//! | Files | list from CLI args, drag-and-drop and the file picker |
//! | Batch | Start / Cancel, output folder, progress bar, ✓/✗ results, summary |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::api::{CreditsInfo, ElevenLabsClient, Voice, VoiceApi};
use crate::config::{AppConfig, VoiceSliders};
use crate::conversion::{
    is_supported_input, ConversionParams, ConversionResult, OutputFormat, SttsModel, WavBitDepth,
    KNOWN_OUTPUT_FORMATS, SUPPORTED_INPUT_EXTENSIONS,
};
use crate::pipeline::{BatchEvent, BatchJob, BatchState, BatchSummary, BatchWorker};

const OK_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ERR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 110, 80);
const DIM_COLOR: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

// ---------------------------------------------------------------------------
// ApiMessage
// ---------------------------------------------------------------------------

/// Reference data delivered from the runtime to the UI thread.
#[derive(Debug)]
pub enum ApiMessage {
    Voices(Vec<Voice>),
    Credits(Option<CreditsInfo>),
}

// ---------------------------------------------------------------------------
// BatchConverterApp
// ---------------------------------------------------------------------------

/// eframe application: the batch converter window.
pub struct BatchConverterApp {
    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
    runtime: tokio::runtime::Handle,

    // ── Connection ───────────────────────────────────────────────────────
    api_key_input: String,
    show_key: bool,
    api: Option<Arc<dyn VoiceApi>>,
    api_tx: mpsc::UnboundedSender<ApiMessage>,
    api_rx: mpsc::UnboundedReceiver<ApiMessage>,
    voices: Vec<Voice>,
    credits: Option<CreditsInfo>,
    loading_voices: bool,

    // ── Parameters ───────────────────────────────────────────────────────
    /// Sliders of the selected voice; stored back per voice on start/exit.
    sliders: VoiceSliders,

    // ── Files ────────────────────────────────────────────────────────────
    files: Vec<PathBuf>,
    selected_file: Option<usize>,

    // ── Batch ────────────────────────────────────────────────────────────
    worker: Option<BatchWorker>,
    batch_state: BatchState,
    progress: (usize, usize),
    results: Vec<ConversionResult>,
    summary: Option<BatchSummary>,

    status: String,
}

impl BatchConverterApp {
    /// Create the app.
    ///
    /// * `config` : loaded application configuration.
    /// * `runtime`: handle of the shared tokio runtime.
    /// * `files`  : initial file list (usually command-line arguments).
    pub fn new(
        config: AppConfig,
        runtime: tokio::runtime::Handle,
        files: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let (api_tx, api_rx) = mpsc::unbounded_channel();
        let sliders = config
            .conversion
            .voice_id
            .as_deref()
            .map(|id| config.conversion.sliders_for(id))
            .unwrap_or_default();

        let mut app = Self {
            api_key_input: config.api.resolved_api_key().unwrap_or_default(),
            config,
            runtime,
            show_key: false,
            api: None,
            api_tx,
            api_rx,
            voices: Vec::new(),
            credits: None,
            loading_voices: false,
            sliders,
            files: Vec::new(),
            selected_file: None,
            worker: None,
            batch_state: BatchState::Pending,
            progress: (0, 0),
            results: Vec::new(),
            summary: None,
            status: "Enter your ElevenLabs API key and press Connect".into(),
        };

        let added = app.add_files(files);
        if added > 0 {
            app.status = format!("{added} file(s) ready");
        }
        if app.config.ui.auto_connect && !app.api_key_input.trim().is_empty() {
            app.connect();
        }
        app
    }

    // ── Connection ───────────────────────────────────────────────────────

    /// Build a client from the key field and fetch voices and credits.
    fn connect(&mut self) {
        let timeout = Duration::from_secs(self.config.api.timeout_secs);
        let client = match ElevenLabsClient::with_options(
            &self.config.api.base_url,
            self.api_key_input.as_str(),
            timeout,
        ) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Cannot connect: {e}");
                self.status = format!("Cannot connect: {e}");
                return;
            }
        };

        let api: Arc<dyn VoiceApi> = Arc::new(client);
        self.api = Some(Arc::clone(&api));
        self.refresh_voices();
    }

    fn refresh_voices(&mut self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        self.loading_voices = true;
        self.status = "Loading voices...".into();

        let tx = self.api_tx.clone();
        self.runtime.spawn(async move {
            let voices = api.list_voices().await;
            let _ = tx.send(ApiMessage::Voices(voices));
            let credits = api.get_credits().await;
            let _ = tx.send(ApiMessage::Credits(credits));
        });
    }

    fn refresh_credits(&self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let tx = self.api_tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(ApiMessage::Credits(api.get_credits().await));
        });
    }

    /// Drain all pending API messages (non-blocking).
    fn poll_api(&mut self) {
        while let Ok(message) = self.api_rx.try_recv() {
            match message {
                ApiMessage::Voices(voices) => {
                    self.loading_voices = false;
                    self.status = if voices.is_empty() {
                        "No voices found. Check your API key and connection.".into()
                    } else {
                        format!("Loaded {} voices", voices.len())
                    };
                    self.voices = voices;
                    self.keep_valid_voice();
                }
                ApiMessage::Credits(credits) => self.credits = credits,
            }
        }
    }

    /// Keep the remembered voice if the account still has it, otherwise
    /// fall back to the first one.
    fn keep_valid_voice(&mut self) {
        let current = self.config.conversion.voice_id.clone();
        let still_there = current
            .as_deref()
            .is_some_and(|id| self.voices.iter().any(|v| v.id == id));
        if !still_there {
            let first = self.voices.first().map(|v| v.id.clone());
            self.select_voice(first);
        }
    }

    fn select_voice(&mut self, voice_id: Option<String>) {
        if let Some(old) = self.config.conversion.voice_id.clone() {
            self.config.conversion.remember_sliders(&old, self.sliders);
        }
        self.sliders = voice_id
            .as_deref()
            .map(|id| self.config.conversion.sliders_for(id))
            .unwrap_or_default();
        self.config.conversion.voice_id = voice_id;
    }

    // ── Files ────────────────────────────────────────────────────────────

    /// Append supported files not already listed.  Returns how many were
    /// added.
    pub fn add_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        let mut added = 0;
        for path in paths {
            if !is_supported_input(&path) {
                log::warn!("Skipping unsupported file: {}", path.display());
                continue;
            }
            if self.files.contains(&path) {
                continue;
            }
            self.files.push(path);
            added += 1;
        }
        added
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Native multi-file picker limited to supported audio extensions.
    fn pick_files(&mut self) {
        let Some(picked) = rfd::FileDialog::new()
            .set_title("Select audio files")
            .add_filter("Audio files", SUPPORTED_INPUT_EXTENSIONS)
            .pick_files()
        else {
            return;
        };
        let offered = picked.len();
        let added = self.add_files(picked);
        self.status = format!("Added {added} of {offered} selected file(s)");
    }

    fn poll_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() || self.is_running() {
            return;
        }
        let offered = dropped.len();
        let added = self.add_files(dropped);
        self.status = format!("Added {added} of {offered} dropped file(s)");
    }

    // ── Batch ────────────────────────────────────────────────────────────

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Parameters for a new batch, or a message saying what is missing.
    fn build_params(&self) -> Result<ConversionParams, String> {
        let voice_id = self
            .config
            .conversion
            .voice_id
            .clone()
            .ok_or_else(|| "Please select a voice for conversion".to_string())?;
        let format: OutputFormat = self
            .config
            .conversion
            .output_format
            .parse()
            .map_err(|e| format!("{e}"))?;

        let mut params = ConversionParams::new(voice_id, self.config.conversion.model, format)
            .with_sliders(self.sliders);
        params.remove_background_noise = self.config.conversion.remove_background_noise;
        params.wav_bit_depth = self.config.conversion.wav_bit_depth;
        Ok(params)
    }

    fn start_batch(&mut self) {
        if self.is_running() {
            return;
        }
        let Some(api) = self.api.clone() else {
            self.status = "Connect to the API first".into();
            return;
        };
        if self.files.is_empty() {
            self.status = "Please add files to convert".into();
            return;
        }
        let params = match self.build_params() {
            Ok(p) => p,
            Err(msg) => {
                self.status = msg;
                return;
            }
        };

        self.remember_current_sliders();
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save config: {e}");
        }

        let job = BatchJob::new(self.files.iter().cloned(), &params)
            .with_output_dir(self.config.conversion.output_dir.clone());

        match BatchWorker::spawn(job, api, self.runtime.clone()) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.batch_state = BatchState::Running;
                self.progress = (0, self.files.len());
                self.results.clear();
                self.summary = None;
                self.status = "Converting...".into();
            }
            Err(e) => {
                log::error!("{e}");
                self.status = e.to_string();
            }
        }
    }

    fn cancel_batch(&mut self) {
        if let Some(worker) = &self.worker {
            worker.cancel();
            self.status = "Cancelling...".into();
        }
    }

    /// Drain all pending batch events (non-blocking).
    ///
    /// A worker that exited without sending `Finished` is joined here so the
    /// window does not stay in the running state.
    fn poll_batch(&mut self) {
        let mut events = Vec::new();
        let mut exited = false;
        if let Some(worker) = self.worker.as_mut() {
            // Checked before draining: every event of an exited worker is
            // already queued.
            exited = worker.is_finished();
            while let Some(event) = worker.try_next_event() {
                events.push(event);
            }
        }
        for event in events {
            self.handle_event(event);
        }
        if exited {
            self.reap_dead_worker();
        }
    }

    fn reap_dead_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let reason = match worker.join() {
            Err(e) => e.to_string(),
            Ok(_) => "batch worker stopped without a summary".to_string(),
        };
        log::error!("Batch aborted: {reason}");

        let succeeded = self.results.iter().filter(|r| r.success()).count();
        let summary = BatchSummary {
            total: self.progress.1,
            succeeded,
            failed: self.results.len() - succeeded,
            cancelled: true,
        };
        self.batch_state = BatchState::Aborted;
        self.status = format!(
            "Conversion aborted: {reason}. {}/{} files succeeded.",
            summary.succeeded,
            summary.processed()
        );
        self.summary = Some(summary);
        self.refresh_credits();
    }

    /// Fold one worker event into the UI state.
    pub fn handle_event(&mut self, event: BatchEvent) {
        self.batch_state = self.batch_state.advance(&event);
        match event {
            BatchEvent::Progress { current, total } => {
                self.progress = (current, total);
                if current < total {
                    self.status = format!("Converting file {} of {total}", current + 1);
                }
            }
            BatchEvent::FileResult(result) => self.results.push(result),
            BatchEvent::Finished(summary) => {
                self.status = format!(
                    "Conversion {}. {}/{} files succeeded.",
                    if summary.cancelled { "cancelled" } else { "complete" },
                    summary.succeeded,
                    summary.processed()
                );
                self.summary = Some(summary);
                if let Some(worker) = self.worker.take() {
                    if let Err(e) = worker.join() {
                        log::error!("{e}");
                    }
                }
                self.refresh_credits();
            }
        }
    }

    /// Create the output folder if needed and return it.
    fn ensure_output_folder(&self) -> std::io::Result<PathBuf> {
        let dir = &self.config.conversion.output_dir;
        std::fs::create_dir_all(dir)?;
        Ok(dir.clone())
    }

    fn open_output_folder(&mut self) {
        let result = self.ensure_output_folder().and_then(|dir| open::that(&dir));
        if let Err(e) = result {
            log::error!(
                "Cannot open output folder {}: {e}",
                self.config.conversion.output_dir.display()
            );
            self.status = format!("Cannot open output folder: {e}");
        }
    }

    fn remember_current_sliders(&mut self) {
        if let Some(id) = self.config.conversion.voice_id.clone() {
            self.config.conversion.remember_sliders(&id, self.sliders);
        }
    }

    // ── Panel renderers ──────────────────────────────────────────────────

    fn draw_connection(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("API key:");
            ui.add(
                egui::TextEdit::singleline(&mut self.api_key_input)
                    .password(!self.show_key)
                    .desired_width(320.0),
            );
            ui.checkbox(&mut self.show_key, "Show");
            let can_connect = !self.is_running() && !self.loading_voices;
            if ui
                .add_enabled(can_connect, egui::Button::new("Connect"))
                .clicked()
            {
                self.connect();
            }
        });

        if let Some(credits) = &self.credits {
            let mut line = format!(
                "Credits: {} / {} characters left ({} tier)",
                credits.characters_remaining(),
                credits.characters_limit(),
                credits.tier()
            );
            if let Some(reset) = credits.reset_at() {
                line.push_str(&format!(", resets {}", reset.format("%Y-%m-%d")));
            }
            ui.colored_label(DIM_COLOR, line);
        }
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.is_running();
        ui.add_enabled_ui(enabled, |ui| {
            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Voice:");
                    self.draw_voice_combo(ui);
                    ui.end_row();

                    ui.label("Model:");
                    let model = &mut self.config.conversion.model;
                    egui::ComboBox::from_id_salt("model")
                        .selected_text(model.display_name())
                        .show_ui(ui, |ui| {
                            for m in SttsModel::ALL {
                                ui.selectable_value(&mut *model, m, m.display_name())
                                    .on_hover_text(m.description());
                            }
                        });
                    ui.end_row();

                    ui.label("Output format:");
                    let format = &mut self.config.conversion.output_format;
                    egui::ComboBox::from_id_salt("format")
                        .selected_text(format.as_str())
                        .show_ui(ui, |ui| {
                            for f in KNOWN_OUTPUT_FORMATS {
                                ui.selectable_value(&mut *format, f.to_string(), *f);
                            }
                        });
                    ui.end_row();

                    let is_wav = self
                        .config
                        .conversion
                        .output_format
                        .parse::<OutputFormat>()
                        .is_ok_and(|f| f.is_wav());
                    ui.label("WAV bit depth:");
                    ui.add_enabled_ui(is_wav, |ui| {
                        let depth = &mut self.config.conversion.wav_bit_depth;
                        egui::ComboBox::from_id_salt("bit_depth")
                            .selected_text(format!("{}-bit", depth.bits()))
                            .show_ui(ui, |ui| {
                                for d in WavBitDepth::ALL {
                                    ui.selectable_value(&mut *depth, d, format!("{}-bit", d.bits()));
                                }
                            });
                    });
                    ui.end_row();
                });

            ui.add_space(4.0);
            ui.add(egui::Slider::new(&mut self.sliders.stability, 0.0..=1.0).text("Stability"));
            ui.add(
                egui::Slider::new(&mut self.sliders.similarity_boost, 0.0..=1.0)
                    .text("Similarity boost"),
            );
            ui.add(egui::Slider::new(&mut self.sliders.style, 0.0..=1.0).text("Style"));
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.sliders.speaker_boost, "Speaker boost");
                ui.checkbox(
                    &mut self.config.conversion.remove_background_noise,
                    "Remove background noise",
                );
            });
        });
    }

    fn draw_voice_combo(&mut self, ui: &mut egui::Ui) {
        let selected = self.config.conversion.voice_id.clone();
        let label = selected
            .as_deref()
            .and_then(|id| self.voices.iter().find(|v| v.id == id))
            .map(|v| v.name.clone())
            .unwrap_or_else(|| {
                if self.loading_voices {
                    "Loading...".into()
                } else {
                    "(none)".into()
                }
            });

        let mut choice = selected.clone();
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("voice")
                .selected_text(label)
                .width(240.0)
                .show_ui(ui, |ui| {
                    for v in &self.voices {
                        ui.selectable_value(&mut choice, Some(v.id.clone()), v.name.as_str())
                            .on_hover_text(v.description.as_str());
                    }
                });
            if ui
                .add_enabled(self.api.is_some(), egui::Button::new("Refresh"))
                .clicked()
            {
                self.refresh_voices();
            }
        });

        if choice != selected {
            self.select_voice(choice);
        }
    }

    fn draw_files(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(format!("Files ({})", self.files.len()));
            ui.colored_label(DIM_COLOR, "or drop audio files onto the window");
        });

        egui::ScrollArea::vertical()
            .id_salt("files")
            .max_height(140.0)
            .show(ui, |ui| {
                for (i, path) in self.files.iter().enumerate() {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    if ui
                        .selectable_label(self.selected_file == Some(i), name)
                        .on_hover_text(path.display().to_string())
                        .clicked()
                    {
                        self.selected_file = Some(i);
                    }
                }
            });

        ui.add_enabled_ui(!self.is_running(), |ui| {
            ui.horizontal(|ui| {
                if ui.button("Add files…").clicked() {
                    self.pick_files();
                }
                if ui
                    .add_enabled(self.selected_file.is_some(), egui::Button::new("Remove"))
                    .clicked()
                {
                    if let Some(i) = self.selected_file.take() {
                        if i < self.files.len() {
                            self.files.remove(i);
                        }
                    }
                }
                if ui.button("Clear").clicked() {
                    self.files.clear();
                    self.selected_file = None;
                }
            });
        });
    }

    fn draw_batch(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let can_start = !self.is_running() && self.api.is_some() && !self.files.is_empty();
            if ui
                .add_enabled(can_start, egui::Button::new("Start conversion"))
                .clicked()
            {
                self.start_batch();
            }
            if ui
                .add_enabled(self.is_running(), egui::Button::new("Cancel"))
                .clicked()
            {
                self.cancel_batch();
            }
            if ui.button("Open output folder").clicked() {
                self.open_output_folder();
            }
            ui.label(format!(
                "Output: {}",
                self.config.conversion.output_dir.display()
            ));
        });

        let (current, total) = self.progress;
        let fraction = if total == 0 {
            0.0
        } else {
            current as f32 / total as f32
        };
        ui.add(egui::ProgressBar::new(fraction).show_percentage());

        egui::ScrollArea::vertical()
            .id_salt("results")
            .max_height(160.0)
            .show(ui, |ui| {
                for r in &self.results {
                    let name = r
                        .source_file_path()
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if r.success() {
                        let mut line = format!("✓ {name}");
                        if let Some(cost) = r.usage_info().get("character-cost") {
                            line.push_str(&format!("  ({cost} characters)"));
                        }
                        ui.colored_label(OK_COLOR, line);
                    } else {
                        let reason = r.error().unwrap_or("failed");
                        ui.colored_label(ERR_COLOR, format!("✗ {name}  ({reason})"));
                    }
                }
            });

        if let Some(s) = &self.summary {
            ui.label(format!(
                "Successfully converted: {}   Failed: {}   Skipped: {}",
                s.succeeded,
                s.failed,
                s.skipped()
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for BatchConverterApp {
    /// Called every frame by eframe.  Polls channels, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_api();
        self.poll_batch();
        self.poll_dropped_files(ctx);

        // --- Keep polling while background work is in flight --------------
        if self.is_running() || self.loading_voices {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(DIM_COLOR, self.batch_state.label());
                ui.separator();
                ui.label(self.status.as_str());
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_connection(ui);
            ui.separator();
            self.draw_settings(ui);
            ui.separator();
            self.draw_files(ui);
            ui.separator();
            self.draw_batch(ui);
        });
    }

    /// Persist the last-used parameters on exit (best-effort).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(worker) = &self.worker {
            worker.cancel();
        }
        self.remember_current_sliders();
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save config on exit: {e}");
        }
        log::info!("Batch converter closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockVoiceApi;

    fn app(rt: &tokio::runtime::Runtime) -> BatchConverterApp {
        let mut config = AppConfig::default();
        config.ui.auto_connect = false;
        config.api.api_key = Some("xi-test".into());
        BatchConverterApp::new(config, rt.handle().clone(), Vec::new())
    }

    #[test]
    fn add_files_skips_unsupported_and_duplicates() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        let added = app.add_files(
            ["a.wav", "b.txt", "a.wav", "c.MP3"]
                .into_iter()
                .map(PathBuf::from),
        );

        assert_eq!(added, 2);
        assert_eq!(app.files(), &[PathBuf::from("a.wav"), PathBuf::from("c.MP3")]);
    }

    #[test]
    fn output_folder_is_created_before_opening() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("converted").join("today");
        app.config.conversion.output_dir = out.clone();

        assert_eq!(app.ensure_output_folder().unwrap(), out);
        assert!(out.is_dir());
        // Already there: still fine.
        assert!(app.ensure_output_folder().is_ok());
    }

    #[test]
    fn start_requires_a_voice() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let app = app(&rt);
        assert!(app.build_params().is_err());
    }

    #[test]
    fn params_carry_sliders_and_flags() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);
        app.config.conversion.voice_id = Some("v1".into());
        app.config.conversion.output_format = "pcm_24000".into();
        app.config.conversion.remove_background_noise = true;
        app.sliders.stability = 0.9;

        let params = app.build_params().unwrap();
        assert_eq!(params.voice_id, "v1");
        assert_eq!(params.stability, Some(0.9));
        assert!(params.remove_background_noise);
        assert!(params.output_format.is_wav());
    }

    #[test]
    fn switching_voice_restores_its_sliders() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);
        app.select_voice(Some("a".into()));
        app.sliders.style = 0.7;

        app.select_voice(Some("b".into()));
        assert_eq!(app.sliders, VoiceSliders::default());

        app.select_voice(Some("a".into()));
        assert_eq!(app.sliders.style, 0.7);
    }

    #[test]
    fn worker_panic_ends_the_batch() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let mut app = app(&rt);
        let dir = tempfile::tempdir().unwrap();
        let params = ConversionParams::new("v1", SttsModel::English, "mp3_44100_128".parse().unwrap());
        let job = BatchJob::new(["a.wav", "b.wav"], &params).with_output_dir(dir.path());
        let api = MockVoiceApi::ok(&b"x"[..]).on_convert(|_| panic!("service client blew up"));

        app.worker = Some(BatchWorker::spawn(job, Arc::new(api), rt.handle().clone()).unwrap());
        app.batch_state = BatchState::Running;
        app.progress = (0, 2);
        while !app.worker.as_ref().is_some_and(BatchWorker::is_finished) {
            std::thread::sleep(Duration::from_millis(5));
        }

        app.poll_batch();

        assert!(!app.is_running());
        assert_eq!(app.batch_state, BatchState::Aborted);
        assert!(app.status.contains("panicked"));
        let summary = app.summary.expect("summary after abort");
        assert_eq!(summary.processed(), 0);
        assert_eq!(summary.skipped(), 2);
    }

    #[test]
    fn events_update_progress_results_and_summary() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        app.handle_event(BatchEvent::Progress { current: 0, total: 2 });
        assert_eq!(app.batch_state, BatchState::Converting { index: 0 });

        app.handle_event(BatchEvent::FileResult(ConversionResult::failed(
            "a.wav",
            "no audio returned",
        )));
        app.handle_event(BatchEvent::Progress { current: 2, total: 2 });
        app.handle_event(BatchEvent::Finished(BatchSummary {
            total: 2,
            succeeded: 0,
            failed: 1,
            cancelled: true,
        }));

        assert_eq!(app.results.len(), 1);
        assert_eq!(app.progress, (2, 2));
        assert_eq!(app.batch_state, BatchState::Cancelled);
        assert!(app.status.contains("cancelled"));
        assert!(app.summary.is_some());
    }
}
