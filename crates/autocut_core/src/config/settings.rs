//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Content analysis settings.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Render settings.
    #[serde(default)]
    pub render: RenderSettings,
}

/// Path configuration for output, work, and log directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory name for derived analysis artifacts (relative to the clip
    /// directory).
    #[serde(default = "default_analysis_folder")]
    pub analysis_folder: String,

    /// Root folder for render intermediates (relative to the clip directory).
    #[serde(default = "default_work_root")]
    pub work_root: String,

    /// Folder for run log files (relative to the clip directory).
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Extra directories searched for named style profiles.
    #[serde(default)]
    pub style_dirs: Vec<String>,
}

fn default_analysis_folder() -> String {
    ".autocut-analysis".to_string()
}

fn default_work_root() -> String {
    ".autocut-temp".to_string()
}

fn default_logs_folder() -> String {
    ".autocut-logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            analysis_folder: default_analysis_folder(),
            work_root: default_work_root(),
            logs_folder: default_logs_folder(),
            style_dirs: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool-output lines to keep for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Show timestamps on run-log lines.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
        }
    }
}

/// Content analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// External analyzer command. Invoked once per clip with the clip path
    /// appended; must print a JSON analysis document on stdout.
    #[serde(default = "default_analyzer_command")]
    pub analyzer_command: String,

    /// Maximum concurrent analysis requests (external rate-limit bound).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempt budget per clip before degrading to a warning.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts, in seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
}

fn default_analyzer_command() -> String {
    "autocut-analyze".to_string()
}

fn default_max_concurrent() -> u32 {
    2
}

fn default_request_timeout() -> u64 {
    180
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    5
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            analyzer_command: default_analyzer_command(),
            max_concurrent: default_max_concurrent(),
            request_timeout_secs: default_request_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
        }
    }
}

/// Render configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Path to the ffmpeg executable (empty = find in PATH).
    #[serde(default)]
    pub ffmpeg_path: String,

    /// Path to the ffprobe executable (empty = find in PATH).
    #[serde(default)]
    pub ffprobe_path: String,

    /// Keep per-segment intermediates after a successful render.
    #[serde(default)]
    pub keep_intermediates: bool,

    /// Tolerance when verifying the rendered duration against the plan,
    /// in milliseconds (container/codec rounding).
    #[serde(default = "default_duration_tolerance")]
    pub duration_tolerance_ms: u64,
}

fn default_duration_tolerance() -> u64 {
    150
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: String::new(),
            ffprobe_path: String::new(),
            keep_intermediates: false,
            duration_tolerance_ms: default_duration_tolerance(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Analysis,
    Render,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Render => "render",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("analyzer_command"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.analysis_folder, settings.paths.analysis_folder);
        assert_eq!(parsed.analysis.max_attempts, settings.analysis.max_attempts);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[analysis]\nmax_concurrent = 4";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.analysis.max_concurrent, 4);
        // Defaults applied for missing
        assert_eq!(parsed.analysis.max_attempts, 3);
        assert_eq!(parsed.logging.compact, true);
        assert_eq!(parsed.render.duration_tolerance_ms, 150);
    }
}
