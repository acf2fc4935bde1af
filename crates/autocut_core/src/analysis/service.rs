//! Content analysis capability.
//!
//! The understanding itself lives in an external service; this module only
//! defines the capability trait the pipeline depends on, plus the default
//! implementation that shells out to a configured analyzer command. Tests
//! inject deterministic fakes instead.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::models::Clip;

/// A single analysis request.
pub struct AnalysisRequest<'a> {
    pub clip: &'a Clip,
    /// Optional style description forwarded to the service.
    pub style_hint: Option<&'a str>,
}

/// Errors from the analysis service boundary.
///
/// Service errors and malformed responses are retryable up to the adapter's
/// attempt budget; after that they degrade to a per-clip warning.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis of '{clip_id}' failed: {message}")]
    Service { clip_id: String, message: String },

    #[error("Analysis response for '{clip_id}' is unparsable: {detail}")]
    Malformed { clip_id: String, detail: String },

    #[error("Analysis of '{clip_id}' timed out after {secs}s")]
    Timeout { clip_id: String, secs: u64 },
}

/// Result type for analysis operations.
pub type AnalysisServiceResult<T> = Result<T, AnalysisError>;

/// Capability trait for the external content-understanding service.
///
/// One method per external primitive, so plan-building logic can be tested
/// with deterministic fakes and no live service.
pub trait ContentAnalyzer: Send + Sync {
    /// Analyze one clip, returning the service's raw JSON document.
    fn analyze(&self, request: &AnalysisRequest<'_>) -> AnalysisServiceResult<Value>;
}

/// Analyzer that invokes an external command per clip.
///
/// The command is run as `<command> [--style <hint>] <clip-path>` and must
/// print a JSON analysis document on stdout. The response shape is
/// normalized by the adapter, so heterogeneous analyzers can be plugged in
/// without code changes.
pub struct CommandAnalyzer {
    command: String,
    timeout: Duration,
}

impl CommandAnalyzer {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn wait_with_timeout(
        &self,
        mut child: std::process::Child,
        clip_id: &str,
    ) -> AnalysisServiceResult<(i32, String, String)> {
        let deadline = Instant::now() + self.timeout;

        // Drain the pipes on their own threads so a large response cannot
        // fill the pipe buffer and stall the child.
        let stdout_reader = child.stdout.take().map(|mut out| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = out.read_to_string(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf);
                buf
            })
        });

        let collect = |reader: Option<std::thread::JoinHandle<String>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default()
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let stdout = collect(stdout_reader);
                    let stderr = collect(stderr_reader);
                    return Ok((status.code().unwrap_or(-1), stdout, stderr));
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        drop((collect(stdout_reader), collect(stderr_reader)));
                        return Err(AnalysisError::Timeout {
                            clip_id: clip_id.to_string(),
                            secs: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(AnalysisError::Service {
                        clip_id: clip_id.to_string(),
                        message: format!("wait failed: {}", e),
                    });
                }
            }
        }
    }
}

impl ContentAnalyzer for CommandAnalyzer {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> AnalysisServiceResult<Value> {
        let clip_id = request.clip.id.clone();

        let mut command = Command::new(&self.command);
        if let Some(hint) = request.style_hint {
            command.args(["--style", hint]);
        }
        command.arg(&request.clip.path);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        tracing::debug!(
            "Analyzing '{}' via `{} {}`",
            clip_id,
            self.command,
            request.clip.path.display()
        );

        let child = command.spawn().map_err(|e| AnalysisError::Service {
            clip_id: clip_id.clone(),
            message: format!("failed to run '{}': {}", self.command, e),
        })?;

        let (exit_code, stdout, stderr) = self.wait_with_timeout(child, &clip_id)?;

        if exit_code != 0 {
            return Err(AnalysisError::Service {
                clip_id,
                message: format!(
                    "'{}' exited with code {}: {}",
                    self.command,
                    exit_code,
                    stderr.trim()
                ),
            });
        }

        // Some analyzers wrap the JSON in a markdown code fence; strip it.
        let body = strip_code_fence(&stdout);

        serde_json::from_str(body).map_err(|e| AnalysisError::Malformed {
            clip_id,
            detail: e.to_string(),
        })
    }
}

/// Strip a surrounding markdown code fence from a response body.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
