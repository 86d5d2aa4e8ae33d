//! Batch runner: converts a fixed list of files one after another.
//!
//! [`BatchRunner`] holds the [`VoiceApi`] and the event sender and drives a
//! [`BatchJob`] to completion.  [`BatchWorker`] puts that loop on its own
//! OS thread so the UI never waits on the network.
//!
//! # Per-file flow
//!
//! ```text
//! for (i, request) in job:
//!   cancelled? ──yes──▶ break
//!   emit Progress { i, n }                         [Converting { i }]
//!   create output dir → api.convert_speech_to_speech
//!     ├─ audio  → write file → (wav) spawn_blocking(correct_bit_depth)
//!     │            └─▶ emit FileResult(success)
//!     └─ none / io error ──▶ emit FileResult(failure)
//! emit Progress { n, n }, Finished(summary)        [Completed | Cancelled]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::VoiceApi;
use crate::audio::correct_bit_depth;
use crate::conversion::{output_path_for, ConversionParams, ConversionRequest, ConversionResult};

use super::state::{BatchEvent, BatchState, BatchSummary, CancelToken};

/// Output directory used when a job does not set one.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

const WORKER_THREAD_NAME: &str = "batch-worker";

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors starting or joining the batch worker.
///
/// Per-file problems never show up here; they become failed
/// [`ConversionResult`]s.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start batch worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("batch worker thread panicked")]
    WorkerPanicked,
}

// ---------------------------------------------------------------------------
// BatchJob
// ---------------------------------------------------------------------------

/// Files to convert with one shared set of parameters.
///
/// The request list is built once in [`BatchJob::new`] and cannot be
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct BatchJob {
    requests: Vec<ConversionRequest>,
    output_dir: PathBuf,
    cancel: CancelToken,
}

impl BatchJob {
    pub fn new<I, P>(files: I, params: &ConversionParams) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            requests: files
                .into_iter()
                .map(|f| ConversionRequest::new(f, params))
                .collect(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn requests(&self) -> &[ConversionRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Handle that stops the job at the next file boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Output paths claimed by more than one source file.
    fn colliding_outputs(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for r in &self.requests {
            let out = output_path_for(r.source_file_path(), &self.output_dir, r.output_format());
            if !seen.insert(out.clone()) && !dupes.contains(&out) {
                dupes.push(out);
            }
        }
        dupes
    }
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs a [`BatchJob`] sequentially, reporting through a channel.
pub struct BatchRunner {
    api: Arc<dyn VoiceApi>,
    events: mpsc::UnboundedSender<BatchEvent>,
    state: BatchState,
}

impl BatchRunner {
    pub fn new(api: Arc<dyn VoiceApi>, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        Self {
            api,
            events,
            state: BatchState::Pending,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Convert every file of `job` in order, stopping early if its cancel
    /// token is set.  Returns the same summary sent in
    /// [`BatchEvent::Finished`].
    pub async fn run(&mut self, job: &BatchJob) -> BatchSummary {
        let total = job.len();
        let cancel = job.cancel_token();
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };

        for out in job.colliding_outputs() {
            log::warn!(
                "pipeline: several inputs map to {}, later files overwrite earlier ones",
                out.display()
            );
        }

        self.state = BatchState::Running;
        log::info!(
            "pipeline: starting batch of {total} file(s) into {}",
            job.output_dir().display()
        );

        for (index, request) in job.requests().iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("pipeline: cancelled before file {} of {total}", index + 1);
                summary.cancelled = true;
                break;
            }

            self.emit(BatchEvent::Progress {
                current: index,
                total,
            });

            let result = self.convert_one(request, job.output_dir()).await;
            if result.success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            self.emit(BatchEvent::FileResult(result));
        }

        self.emit(BatchEvent::Progress {
            current: total,
            total,
        });
        self.emit(BatchEvent::Finished(summary));

        log::info!(
            "pipeline: batch finished, {}/{} succeeded{}",
            summary.succeeded,
            summary.processed(),
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        summary
    }

    async fn convert_one(&self, request: &ConversionRequest, output_dir: &Path) -> ConversionResult {
        let source = request.source_file_path();
        let output_path = output_path_for(source, output_dir, request.output_format());

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            log::error!(
                "pipeline: cannot create output directory {}: {e}",
                output_dir.display()
            );
            return ConversionResult::failed(source, format!("cannot create output directory: {e}"));
        }

        let conversion = self.api.convert_speech_to_speech(request).await;
        let Some(audio) = conversion.audio else {
            return ConversionResult::failed(source, "no audio returned");
        };

        if let Err(e) = tokio::fs::write(&output_path, &audio).await {
            log::error!("pipeline: cannot write {}: {e}", output_path.display());
            return ConversionResult::failed(source, format!("cannot write output: {e}"));
        }

        if request.output_format().is_wav() {
            self.fix_wav(&output_path, request).await;
        }

        log::info!(
            "pipeline: {} → {}",
            source.display(),
            output_path.display()
        );
        ConversionResult::succeeded(source, output_path, conversion.usage)
    }

    /// Rewrite a WAV output at the requested bit depth.  Failures are
    /// logged and leave the file as received.
    async fn fix_wav(&self, path: &Path, request: &ConversionRequest) {
        let sample_rate = request.output_format().sample_rate().unwrap_or(44_100);
        let depth = request.wav_bit_depth();
        let target = path.to_path_buf();

        let outcome =
            tokio::task::spawn_blocking(move || correct_bit_depth(&target, sample_rate, depth))
                .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!(
                    "pipeline: bit-depth correction failed for {}: {e}",
                    path.display()
                );
            }
            Err(e) => {
                log::warn!("pipeline: bit-depth correction task panicked: {e}");
            }
        }
    }

    fn emit(&mut self, event: BatchEvent) {
        self.state = self.state.advance(&event);
        if self.events.send(event).is_err() {
            log::debug!("pipeline: event receiver dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// BatchWorker
// ---------------------------------------------------------------------------

/// A [`BatchRunner`] on a dedicated `batch-worker` thread.
///
/// The thread drives the async loop with [`tokio::runtime::Handle::block_on`]
/// on the application's runtime.  The UI polls
/// [`try_next_event`](Self::try_next_event) once per frame.
pub struct BatchWorker {
    cancel: CancelToken,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    thread: JoinHandle<BatchSummary>,
}

impl BatchWorker {
    /// Start `job` on a new thread.
    pub fn spawn(
        job: BatchJob,
        api: Arc<dyn VoiceApi>,
        handle: tokio::runtime::Handle,
    ) -> Result<Self, PipelineError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = job.cancel_token();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let mut runner = BatchRunner::new(api, tx);
                handle.block_on(runner.run(&job))
            })
            .map_err(PipelineError::Spawn)?;

        Ok(Self {
            cancel,
            events: rx,
            thread,
        })
    }

    /// Stop before the next file.  The file in flight still completes and
    /// is reported.
    pub fn cancel(&self) {
        log::info!("pipeline: cancel requested");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next pending event, if any.  Never blocks.
    pub fn try_next_event(&mut self) -> Option<BatchEvent> {
        self.events.try_recv().ok()
    }

    /// `true` once the worker thread has exited.  Events may still be
    /// queued.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the thread and return its summary.
    pub fn join(self) -> Result<BatchSummary, PipelineError> {
        self.thread.join().map_err(|_| PipelineError::WorkerPanicked)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
