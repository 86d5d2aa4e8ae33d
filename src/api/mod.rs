//! ElevenLabs API client.
//!
//! This module provides:
//! * [`VoiceApi`]: async trait the batch pipeline talks to.
//! * [`ElevenLabsClient`]: REST implementation (voices, quota, speech-to-speech).
//! * [`Voice`] / [`CreditsInfo`]: reference data returned by the service.
//! * [`ApiError`]: error variants for the internal request helpers.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use batch_voice_converter::api::{ElevenLabsClient, VoiceApi};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ElevenLabsClient::new("xi-…").expect("API key");
//!
//!     for voice in client.list_voices().await {
//!         println!("{} ({})", voice.name, voice.id);
//!     }
//!     if let Some(credits) = client.get_credits().await {
//!         println!("{} characters left", credits.characters_remaining());
//!     }
//! }
//! ```

pub mod client;
pub mod types;

pub use client::{ApiError, Conversion, ElevenLabsClient, VoiceApi, DEFAULT_BASE_URL};
pub use types::{CreditsInfo, Voice};

#[cfg(test)]
pub use client::MockVoiceApi;
