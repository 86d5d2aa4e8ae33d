//! Where `settings.toml` lives.
//!
//! Only the platform config dir is resolved here.  Converted audio goes to
//! `conversion.output_dir` from the settings (relative paths are taken from
//! the working directory, as on the command line), and the app keeps no
//! cache or downloaded data, so there is no data dir.
//!
//!   Windows: %APPDATA%\batch-voice-converter\settings.toml
//!   macOS:   ~/Library/Application Support/batch-voice-converter/settings.toml
//!   Linux:   ~/.config/batch-voice-converter/settings.toml

use std::path::{Path, PathBuf};

const APP_NAME: &str = "batch-voice-converter";
const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Paths under the platform config dir, or under `./batch-voice-converter`
    /// when the platform has none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(base)
    }

    /// Paths with `base` standing in for the platform config dir.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let config_dir = base.as_ref().join(APP_NAME);
        let settings_file = config_dir.join(SETTINGS_FILE_NAME);
        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_sits_in_app_dir() {
        let paths = AppPaths::under("/cfg");
        assert_eq!(paths.config_dir, PathBuf::from("/cfg/batch-voice-converter"));
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/cfg/batch-voice-converter/settings.toml")
        );
    }

    #[test]
    fn platform_paths_end_in_settings_toml() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with(APP_NAME));
        assert!(paths.settings_file.starts_with(&paths.config_dir));
    }
}
