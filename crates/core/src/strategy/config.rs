//! Configuration for the built-in strategies.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Paths to the external tools the default registry wraps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Path to the LibreOffice binary.
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,

    /// Path to pandoc.
    #[serde(default = "default_pandoc_path")]
    pub pandoc_path: PathBuf,

    /// Path to calibre's ebook-convert.
    #[serde(default = "default_ebook_convert_path")]
    pub ebook_convert_path: PathBuf,

    /// Path to ImageMagick.
    #[serde(default = "default_magick_path")]
    pub magick_path: PathBuf,

    /// Path to rsvg-convert.
    #[serde(default = "default_rsvg_convert_path")]
    pub rsvg_convert_path: PathBuf,

    /// Path to ffmpeg.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Whether to append the in-process text extractor to TXT/HTML chains.
    #[serde(default = "default_text_fallback")]
    pub text_fallback: bool,
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

fn default_pandoc_path() -> PathBuf {
    PathBuf::from("pandoc")
}

fn default_ebook_convert_path() -> PathBuf {
    PathBuf::from("ebook-convert")
}

fn default_magick_path() -> PathBuf {
    PathBuf::from("magick")
}

fn default_rsvg_convert_path() -> PathBuf {
    PathBuf::from("rsvg-convert")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_text_fallback() -> bool {
    true
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            soffice_path: default_soffice_path(),
            pandoc_path: default_pandoc_path(),
            ebook_convert_path: default_ebook_convert_path(),
            magick_path: default_magick_path(),
            rsvg_convert_path: default_rsvg_convert_path(),
            ffmpeg_path: default_ffmpeg_path(),
            text_fallback: default_text_fallback(),
        }
    }
}

impl StrategyConfig {
    /// Disables the in-process text fallback.
    pub fn without_text_fallback(mut self) -> Self {
        self.text_fallback = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.soffice_path, PathBuf::from("soffice"));
        assert!(config.text_fallback);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            text_fallback = false
        "#;
        let config: StrategyConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.pandoc_path, PathBuf::from("pandoc"));
        assert!(!config.text_fallback);
    }
}
