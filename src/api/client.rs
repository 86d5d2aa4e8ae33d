//! Core `VoiceApi` trait and the `ElevenLabsClient` implementation.
//!
//! The three public operations fail soft: transport errors, non-2xx
//! statuses and unreadable source files are logged and turned into an
//! empty value instead of an error, so a single bad file or a dropped
//! connection never escapes into the batch loop.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::api::types::{CreditsInfo, SubscriptionResponse, Voice, VoicesResponse};
use crate::config::ApiConfig;
use crate::conversion::{ConversionRequest, UsageInfo};

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Response headers copied into [`UsageInfo`] when present.
const USAGE_HEADERS: &[&str] = &["character-cost", "request-id", "history-item-id"];

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable API key was supplied.
    #[error("an ElevenLabs API key is required")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed as the expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The source file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Audio returned by one speech-to-speech call.
///
/// `audio` is `None` whenever the call failed; `usage` is then empty.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub audio: Option<Bytes>,
    pub usage: UsageInfo,
}

impl Conversion {
    pub fn failed() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// VoiceApi trait
// ---------------------------------------------------------------------------

/// Gateway to the remote voice service.
///
/// Implementors must be `Send + Sync` so they can be shared with the batch
/// worker behind an `Arc<dyn VoiceApi>`.  None of the methods return an
/// error; failures are logged and reported as empty values.
#[async_trait]
pub trait VoiceApi: Send + Sync {
    /// All voices available to the account; empty on any failure.
    async fn list_voices(&self) -> Vec<Voice>;

    /// Current quota snapshot; `None` on any failure.
    async fn get_credits(&self) -> Option<CreditsInfo>;

    /// Convert one file.  `audio` is `None` on any failure.
    async fn convert_speech_to_speech(&self, request: &ConversionRequest) -> Conversion;
}

// ---------------------------------------------------------------------------
// ElevenLabsClient
// ---------------------------------------------------------------------------

/// Talks to the ElevenLabs REST API.
///
/// Holds nothing but the HTTP client and the credential; every request
/// carries the `xi-api-key` header.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsClient {
    /// Client for the public API with the default timeout.
    ///
    /// # Errors
    ///
    /// [`ApiError::MissingApiKey`] when `api_key` is empty or blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        let defaults = ApiConfig::default();
        Self::with_options(
            DEFAULT_BASE_URL,
            api_key,
            Duration::from_secs(defaults.timeout_secs),
        )
    }

    /// Build from [`ApiConfig`], taking the key from the config or the
    /// environment.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let key = config.resolved_api_key().ok_or(ApiError::MissingApiKey)?;
        Self::with_options(
            &config.base_url,
            key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_options(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ApiError> {
        let resp = self
            .client
            .get(self.url("voices"))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let body: VoicesResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(body.voices.into_iter().map(Voice::from).collect())
    }

    async fn fetch_credits(&self) -> Result<CreditsInfo, ApiError> {
        let resp = self
            .client
            .get(self.url("user/subscription"))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let body: SubscriptionResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(CreditsInfo::from(body))
    }

    async fn try_convert(&self, request: &ConversionRequest) -> Result<Conversion, ApiError> {
        let path = request.source_file_path();

        // Read up front so the file handle is closed before the upload.
        let data = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".into());

        let form = Form::new()
            .part("audio", Part::bytes(data).file_name(file_name))
            .text("model_id", request.model().id())
            .text("voice_settings", voice_settings_json(request).to_string())
            .text(
                "remove_background_noise",
                request.remove_background_noise().to_string(),
            );

        log::info!("Converting file: {}", path.display());

        let resp = self
            .client
            .post(self.url(&format!("speech-to-speech/{}", request.voice_id())))
            .query(&[("output_format", request.output_format().as_str())])
            .header(XI_API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "audio/mpeg")
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let usage: UsageInfo = USAGE_HEADERS
            .iter()
            .filter_map(|name| {
                resp.headers()
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let audio = resp.bytes().await?;
        if audio.is_empty() {
            log::warn!("Empty audio body for {}", path.display());
            return Ok(Conversion {
                audio: None,
                usage,
            });
        }

        Ok(Conversion {
            audio: Some(audio),
            usage,
        })
    }
}

#[async_trait]
impl VoiceApi for ElevenLabsClient {
    async fn list_voices(&self) -> Vec<Voice> {
        match self.fetch_voices().await {
            Ok(voices) => voices,
            Err(e) => {
                log::error!("Error fetching voices: {e}");
                Vec::new()
            }
        }
    }

    async fn get_credits(&self) -> Option<CreditsInfo> {
        match self.fetch_credits().await {
            Ok(credits) => Some(credits),
            Err(e) => {
                log::error!("Error fetching credits: {e}");
                None
            }
        }
    }

    async fn convert_speech_to_speech(&self, request: &ConversionRequest) -> Conversion {
        match self.try_convert(request).await {
            Ok(conversion) => conversion,
            Err(ApiError::Status { status, body }) => {
                log::error!(
                    "Error converting {}: HTTP {status}",
                    request.source_file_path().display()
                );
                if !body.is_empty() {
                    log::error!("Error details: {body}");
                }
                Conversion::failed()
            }
            Err(e) => {
                log::error!(
                    "Error converting {}: {e}",
                    request.source_file_path().display()
                );
                Conversion::failed()
            }
        }
    }
}

/// Pass 2xx responses through; turn anything else into
/// [`ApiError::Status`] carrying the body text.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// The `voice_settings` form field.  Sliders are only included when set.
fn voice_settings_json(request: &ConversionRequest) -> serde_json::Value {
    let mut settings = serde_json::Map::new();
    if let Some(v) = request.stability() {
        settings.insert("stability".into(), serde_json::json!(v));
    }
    if let Some(v) = request.similarity_boost() {
        settings.insert("similarity_boost".into(), serde_json::json!(v));
    }
    if let Some(v) = request.style() {
        settings.insert("style".into(), serde_json::json!(v));
    }
    settings.insert(
        "use_speaker_boost".into(),
        serde_json::Value::Bool(request.speaker_boost()),
    );
    serde_json::Value::Object(settings)
}

// ---------------------------------------------------------------------------
// MockVoiceApi  (test-only)
// ---------------------------------------------------------------------------

/// A test double that converts every file to a fixed payload, except the
/// ones registered with [`MockVoiceApi::failing_on`].
#[cfg(test)]
pub struct MockVoiceApi {
    payload: Bytes,
    failing: Vec<PathBuf>,
    calls: std::sync::Mutex<Vec<PathBuf>>,
    on_convert: Option<Box<dyn Fn(usize) + Send + Sync>>,
}

#[cfg(test)]
impl MockVoiceApi {
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            failing: Vec::new(),
            calls: std::sync::Mutex::new(Vec::new()),
            on_convert: None,
        }
    }

    /// Return no audio for `path`.
    pub fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.push(path.into());
        self
    }

    /// Run `hook` with the zero-based call index after each conversion.
    pub fn on_convert(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_convert = Some(Box::new(hook));
        self
    }

    /// Source paths passed to `convert_speech_to_speech`, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl VoiceApi for MockVoiceApi {
    async fn list_voices(&self) -> Vec<Voice> {
        vec![Voice {
            id: "mock-voice".into(),
            name: "Mock".into(),
            description: String::new(),
        }]
    }

    async fn get_credits(&self) -> Option<CreditsInfo> {
        Some(CreditsInfo::new(100, 1_000, "free", None))
    }

    async fn convert_speech_to_speech(&self, request: &ConversionRequest) -> Conversion {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.source_file_path().to_path_buf());
            calls.len() - 1
        };

        let result = if self.failing.iter().any(|p| p == request.source_file_path()) {
            Conversion::failed()
        } else {
            let mut usage = UsageInfo::new();
            usage.insert("character-cost".into(), "42".into());
            Conversion {
                audio: Some(self.payload.clone()),
                usage,
            }
        };

        if let Some(hook) = &self.on_convert {
            hook(index);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionParams, SttsModel};

    fn request(path: &str) -> ConversionRequest {
        let params = ConversionParams::new(
            "voice-1",
            SttsModel::Multilingual,
            "mp3_44100_128".parse().unwrap(),
        );
        ConversionRequest::new(path, &params)
    }

    /// A client pointed at a closed local port: every request fails fast.
    fn unreachable_client() -> ElevenLabsClient {
        ElevenLabsClient::with_options("http://127.0.0.1:9", "xi-test", Duration::from_secs(2))
            .unwrap()
    }

    /// Answer exactly one HTTP request with `response`.  The join handle
    /// yields the raw request as received.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&raw).into_owned()
        });
        (base_url, server)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&raw[..split]).to_ascii_lowercase();
        let body = &raw[split + 4..];
        let content_length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        match content_length {
            Some(len) => body.len() >= len,
            None if head.contains("transfer-encoding: chunked") => body.ends_with(b"0\r\n\r\n"),
            None => true,
        }
    }

    fn stub_client(base_url: &str) -> ElevenLabsClient {
        ElevenLabsClient::with_options(base_url, "k123", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn convert_uploads_multipart_and_collects_usage() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.wav");
        std::fs::write(&source, b"RIFFfake").unwrap();

        let mut params = ConversionParams::new("vid", SttsModel::English, "pcm_32000".parse().unwrap());
        params.stability = Some(0.25);
        params.remove_background_noise = true;
        let req = ConversionRequest::new(&source, &params);

        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: audio/mpeg\r\ncharacter-cost: 7\r\n\
             content-length: 5\r\nconnection: close\r\n\r\nAUDIO",
        )
        .await;
        let conversion = stub_client(&base_url).convert_speech_to_speech(&req).await;
        let raw = server.await.unwrap();
        let lower = raw.to_ascii_lowercase();

        assert!(raw.starts_with("POST /v1/speech-to-speech/vid?output_format=pcm_32000 HTTP/1.1"));
        assert!(lower.contains("xi-api-key: k123"));
        assert!(lower.contains("accept: audio/mpeg"));
        assert!(raw.contains(r#"name="audio"; filename="clip.wav""#));
        assert!(raw.contains("RIFFfake"));
        assert!(raw.contains(r#"name="model_id""#));
        assert!(raw.contains("eleven_english_sts_v2"));
        assert!(raw.contains(r#"name="voice_settings""#));
        assert!(raw.contains(r#""stability":0.25"#));
        assert!(raw.contains(r#"name="remove_background_noise""#));

        assert_eq!(conversion.audio.as_deref(), Some(&b"AUDIO"[..]));
        assert_eq!(conversion.usage.get("character-cost").map(String::as_str), Some("7"));
        assert_eq!(conversion.usage.len(), 1);
    }

    #[tokio::test]
    async fn error_status_yields_no_audio_and_no_usage() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.wav");
        std::fs::write(&source, b"RIFFfake").unwrap();

        let (base_url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncharacter-cost: 7\r\n\
             content-length: 12\r\nconnection: close\r\n\r\nserver error",
        )
        .await;
        let conversion = stub_client(&base_url)
            .convert_speech_to_speech(&request(source.to_str().unwrap()))
            .await;
        server.await.unwrap();

        assert!(conversion.audio.is_none());
        assert!(conversion.usage.is_empty());
    }

    #[tokio::test]
    async fn status_error_carries_body() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 15\r\n\
             connection: close\r\n\r\ninvalid_api_key",
        )
        .await;
        let err = stub_client(&base_url).fetch_voices().await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(
            err,
            ApiError::Status { status: 401, ref body } if body == "invalid_api_key"
        ));
    }

    #[tokio::test]
    async fn list_voices_sends_key_and_parses_body() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 46\r\n\
             connection: close\r\n\r\n{\"voices\":[{\"voice_id\":\"v1\",\"name\":\"Rachel\"}]}",
        )
        .await;
        let voices = stub_client(&base_url).list_voices().await;
        let raw = server.await.unwrap();

        assert!(raw.starts_with("GET /v1/voices HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("xi-api-key: k123"));
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].id, "v1");
        assert_eq!(voices[0].name, "Rachel");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            ElevenLabsClient::new(""),
            Err(ApiError::MissingApiKey)
        ));
        assert!(matches!(
            ElevenLabsClient::new("   "),
            Err(ApiError::MissingApiKey)
        ));
    }

    #[test]
    fn from_config_uses_stored_key_and_base_url() {
        let config = ApiConfig {
            base_url: "http://localhost:8080/".into(),
            api_key: Some("xi-test".into()),
            timeout_secs: 5,
        };
        let client = ElevenLabsClient::from_config(&config).unwrap();
        assert_eq!(client.url("voices"), "http://localhost:8080/v1/voices");
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn VoiceApi> = Box::new(ElevenLabsClient::new("xi-test").unwrap());
        drop(client);
    }

    #[test]
    fn voice_settings_only_include_present_sliders() {
        let mut params = ConversionParams::new(
            "voice-1",
            SttsModel::Multilingual,
            "mp3_44100_128".parse().unwrap(),
        );
        params.stability = Some(0.5);
        params.speaker_boost = true;
        let req = ConversionRequest::new("a.wav", &params);

        let json = voice_settings_json(&req);
        assert_eq!(json["stability"], serde_json::json!(0.5));
        assert_eq!(json["use_speaker_boost"], serde_json::json!(true));
        assert!(json.get("similarity_boost").is_none());
        assert!(json.get("style").is_none());
    }

    #[tokio::test]
    async fn list_voices_fails_soft() {
        let voices = unreachable_client().list_voices().await;
        assert!(voices.is_empty());
    }

    #[tokio::test]
    async fn get_credits_fails_soft() {
        assert!(unreachable_client().get_credits().await.is_none());
    }

    #[tokio::test]
    async fn missing_source_file_yields_no_audio() {
        let conversion = unreachable_client()
            .convert_speech_to_speech(&request("/definitely/not/here.wav"))
            .await;
        assert!(conversion.audio.is_none());
        assert!(conversion.usage.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_yields_no_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let conversion = unreachable_client()
            .convert_speech_to_speech(&request(path.to_str().unwrap()))
            .await;
        assert!(conversion.audio.is_none());
    }

    #[test]
    fn status_error_displays_body() {
        let err = ApiError::Status {
            status: 401,
            body: "invalid_api_key".into(),
        };
        assert_eq!(err.to_string(), "HTTP 401: invalid_api_key");
    }
}
