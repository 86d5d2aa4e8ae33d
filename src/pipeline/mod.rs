//! Batch conversion pipeline.
//!
//! Turns a list of source files into converted outputs, one file at a
//! time, and reports progress to the UI over a channel.
//!
//! # Architecture
//!
//! ```text
//! UI thread                              batch-worker thread
//! ─────────                              ───────────────────
//! BatchJob::new(files, params)
//! BatchWorker::spawn(job, api, handle) ─▶ Handle::block_on(BatchRunner::run)
//!                                              │
//!        try_next_event() ◀── UnboundedSender<BatchEvent> ──┘
//! BatchWorker::cancel() ───▶ CancelToken (checked per file)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batch_voice_converter::api::{ElevenLabsClient, VoiceApi};
//! use batch_voice_converter::conversion::{ConversionParams, SttsModel};
//! use batch_voice_converter::pipeline::{BatchEvent, BatchJob, BatchWorker};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let api: Arc<dyn VoiceApi> = Arc::new(ElevenLabsClient::new("xi-…").unwrap());
//! let params = ConversionParams::new(
//!     "21m00Tcm4TlvDq8ikWAM",
//!     SttsModel::Multilingual,
//!     "mp3_44100_128".parse().unwrap(),
//! );
//!
//! let job = BatchJob::new(["take1.wav", "take2.wav"], &params);
//! let mut worker = BatchWorker::spawn(job, api, rt.handle().clone()).unwrap();
//!
//! loop {
//!     match worker.try_next_event() {
//!         Some(BatchEvent::Finished(summary)) => {
//!             println!("{}/{} converted", summary.succeeded, summary.total);
//!             break;
//!         }
//!         Some(other) => println!("{other:?}"),
//!         None => std::thread::sleep(std::time::Duration::from_millis(50)),
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{BatchJob, BatchRunner, BatchWorker, PipelineError, DEFAULT_OUTPUT_DIR};
pub use state::{BatchEvent, BatchState, BatchSummary, CancelToken};
