//! Configuration module for the batch voice converter.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the API,
//! conversion defaults and the window, `AppPaths` for the platform config
//! directory, and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    ApiConfig, AppConfig, ConversionConfig, UiConfig, VoiceSliders, API_KEY_ENV,
};
