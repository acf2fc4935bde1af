//! Configuration: application settings and style resolution.

mod manager;
mod settings;
mod style;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, LoggingSettings, PathSettings, RenderSettings, Settings,
};
pub use style::{
    load_profile, resolve, ClipDurationRange, SpeedRampField, SpeedRampRange, StyleConstraints,
    StyleError, StyleOverrides, StyleProfile, DEFAULT_CLIP_AVG_SECS, DEFAULT_CLIP_MAX_SECS,
    DEFAULT_CLIP_MIN_SECS, DEFAULT_MIN_QUALITY, DEFAULT_PLATFORM_MAX_SECS, DEFAULT_SPEED_MAX,
    DEFAULT_SPEED_MIN,
};
