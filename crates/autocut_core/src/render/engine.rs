//! Media engine capability.
//!
//! The executor treats the encode engine as a black box that supports three
//! composable primitives: trim, speed-remap, and concatenate. The trait is
//! injectable so render logic can be exercised with deterministic fakes.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::presets::EncodeSettings;

/// One constant-rate span inside a speed-remap request.
///
/// A request with a single span is a constant-rate remap; multiple spans
/// form a factor curve (variable-rate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSpan {
    pub start_ms: u64,
    pub end_ms: u64,
    pub factor: f64,
}

impl SpeedSpan {
    /// Source-side length of the span.
    pub fn source_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Output length after the remap.
    pub fn output_ms(&self) -> u64 {
        if self.factor <= 0.0 {
            return self.source_ms();
        }
        (self.source_ms() as f64 / self.factor).round() as u64
    }

    /// Multiplier for presentation timestamps (inverse of the speed).
    pub fn pts_factor(&self) -> f64 {
        1.0 / self.factor
    }
}

/// Trim a span out of a source file.
#[derive(Debug)]
pub struct TrimRequest<'a> {
    pub source: &'a Path,
    pub start_ms: u64,
    pub end_ms: u64,
    pub output: &'a Path,
    pub encode: &'a EncodeSettings,
}

/// Re-time one or more spans of a source file.
#[derive(Debug)]
pub struct SpeedRemapRequest<'a> {
    pub source: &'a Path,
    pub spans: &'a [SpeedSpan],
    pub output: &'a Path,
    pub encode: &'a EncodeSettings,
}

/// Concatenate rendered intermediates, in order, into one file.
#[derive(Debug)]
pub struct ConcatRequest<'a> {
    pub inputs: &'a [PathBuf],
    pub output: &'a Path,
    pub encode: &'a EncodeSettings,
}

/// Errors reported by a media engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Media tool '{0}' is not available")]
    ToolMissing(String),

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid engine request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The external audio/video encode engine.
pub trait MediaEngine: Send + Sync {
    /// Cut `[start_ms, end_ms)` out of the source into `output`.
    fn trim(&self, request: &TrimRequest<'_>) -> EngineResult<()>;

    /// Cut and re-time the given spans of the source into `output`.
    fn speed_remap(&self, request: &SpeedRemapRequest<'_>) -> EngineResult<()>;

    /// Concatenate the inputs, in order, into `output`.
    fn concatenate(&self, request: &ConcatRequest<'_>) -> EngineResult<()>;

    /// Measure the duration of a media file in milliseconds.
    fn probe_duration_ms(&self, path: &Path) -> EngineResult<u64>;
}
