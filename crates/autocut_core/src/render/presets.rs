//! Output presets.
//!
//! A preset names the encode parameters for a target platform. The set
//! matches what the command surface exposes; anything finer-grained goes
//! through the settings file.

use serde::{Deserialize, Serialize};

/// Encode parameters handed to the media engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        OutputPreset::Douyin.encode_settings()
    }
}

/// Named output preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPreset {
    /// Douyin vertical short video.
    #[default]
    Douyin,
    /// YouTube Shorts.
    YoutubeShorts,
    /// WeChat Channels vertical video.
    WeixinVertical,
}

impl OutputPreset {
    /// All presets the command surface accepts.
    pub fn all() -> &'static [OutputPreset] {
        &[
            OutputPreset::Douyin,
            OutputPreset::YoutubeShorts,
            OutputPreset::WeixinVertical,
        ]
    }

    /// Command-line name of this preset.
    pub fn name(&self) -> &'static str {
        match self {
            OutputPreset::Douyin => "douyin",
            OutputPreset::YoutubeShorts => "youtube-shorts",
            OutputPreset::WeixinVertical => "weixin-vertical",
        }
    }

    /// Encode parameters for this preset.
    pub fn encode_settings(&self) -> EncodeSettings {
        match self {
            OutputPreset::Douyin => EncodeSettings {
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                video_bitrate: "4M".to_string(),
                audio_bitrate: "128k".to_string(),
            },
            OutputPreset::YoutubeShorts => EncodeSettings {
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                video_bitrate: "6M".to_string(),
                audio_bitrate: "192k".to_string(),
            },
            OutputPreset::WeixinVertical => EncodeSettings {
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                video_bitrate: "3M".to_string(),
                audio_bitrate: "128k".to_string(),
            },
        }
    }
}

impl std::str::FromStr for OutputPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Accept both dash and underscore spellings.
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "douyin" => Ok(OutputPreset::Douyin),
            "youtube-shorts" => Ok(OutputPreset::YoutubeShorts),
            "weixin-vertical" => Ok(OutputPreset::WeixinVertical),
            other => Err(format!(
                "unknown preset '{}' (expected one of: douyin, youtube-shorts, weixin-vertical)",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
