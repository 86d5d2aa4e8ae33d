//! Batch speech-to-speech converter for the ElevenLabs API.
//!
//! * [`api`]: REST client behind the [`api::VoiceApi`] trait.
//! * [`conversion`]: per-file requests, results and output formats.
//! * [`pipeline`]: sequential batch runner on a worker thread.
//! * [`audio`]: WAV bit-depth correction.
//! * [`config`]: `settings.toml` persistence.
//! * [`app`]: the egui window.

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod conversion;
pub mod pipeline;
