//! FFmpeg-backed media engine.
//!
//! Builds and runs ffmpeg command lines for the three engine primitives.
//! Speed remaps use a split/trim/setpts filter graph on the video side and
//! an atrim/atempo graph on the audio side; atempo only accepts factors in
//! 0.5..=2.0, so factors outside that range are chained.

use std::fs;
use std::path::Path;
use std::process::Command;

use super::engine::{
    ConcatRequest, EngineError, EngineResult, MediaEngine, SpeedRemapRequest, SpeedSpan,
    TrimRequest,
};

/// Media engine driving ffmpeg/ffprobe subprocesses.
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Use specific executables instead of the ones on PATH.
    pub fn with_executables(
        mut self,
        ffmpeg: impl Into<String>,
        ffprobe: impl Into<String>,
    ) -> Self {
        let ffmpeg = ffmpeg.into();
        let ffprobe = ffprobe.into();
        if !ffmpeg.is_empty() {
            self.ffmpeg = ffmpeg;
        }
        if !ffprobe.is_empty() {
            self.ffprobe = ffprobe;
        }
        self
    }

    /// Check that ffmpeg can be executed at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, tool: &str, args: &[String]) -> EngineResult<()> {
        tracing::debug!("$ {} {}", tool, args.join(" "));

        let output = Command::new(tool)
            .args(args)
            .output()
            .map_err(|_| EngineError::ToolMissing(tool.to_string()))?;

        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                tool: tool.to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for FfmpegEngine {
    fn trim(&self, request: &TrimRequest<'_>) -> EngineResult<()> {
        if request.start_ms >= request.end_ms {
            return Err(EngineError::InvalidRequest(format!(
                "inverted trim span {}..{}",
                request.start_ms, request.end_ms
            )));
        }

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            request.source.to_string_lossy().to_string(),
            "-ss".to_string(),
            ms_to_timestamp(request.start_ms),
            "-to".to_string(),
            ms_to_timestamp(request.end_ms),
            "-c:v".to_string(),
            request.encode.video_codec.clone(),
            "-c:a".to_string(),
            request.encode.audio_codec.clone(),
            "-b:v".to_string(),
            request.encode.video_bitrate.clone(),
            "-b:a".to_string(),
            request.encode.audio_bitrate.clone(),
            request.output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg, &args)
    }

    fn speed_remap(&self, request: &SpeedRemapRequest<'_>) -> EngineResult<()> {
        if request.spans.is_empty() {
            return Err(EngineError::InvalidRequest(
                "speed remap with no spans".to_string(),
            ));
        }

        let video_filter = build_video_speed_filter(request.spans);
        let audio_filter = build_audio_speed_filter(request.spans);
        let full_filter = format!("{};{}", video_filter, audio_filter);

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            request.source.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            full_filter,
            "-map".to_string(),
            "[vout]".to_string(),
            "-map".to_string(),
            "[aout]".to_string(),
            "-c:v".to_string(),
            request.encode.video_codec.clone(),
            "-c:a".to_string(),
            request.encode.audio_codec.clone(),
            "-b:v".to_string(),
            request.encode.video_bitrate.clone(),
            "-b:a".to_string(),
            request.encode.audio_bitrate.clone(),
            request.output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg, &args)
    }

    fn concatenate(&self, request: &ConcatRequest<'_>) -> EngineResult<()> {
        if request.inputs.is_empty() {
            return Err(EngineError::InvalidRequest(
                "concatenate with no inputs".to_string(),
            ));
        }

        // ffmpeg's concat demuxer reads inputs from a list file. Forward
        // slashes work on every platform ffmpeg supports.
        let list_path = request.output.with_extension("files.txt");
        let mut list_content = String::new();
        for input in request.inputs {
            list_content.push_str(&format!(
                "file '{}'\n",
                input.to_string_lossy().replace('\\', "/")
            ));
        }
        fs::write(&list_path, &list_content)
            .map_err(|e| EngineError::io("writing concat list", e))?;

        let base_args = |codec_args: Vec<String>| {
            let mut args = vec![
                "-y".to_string(),
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                list_path.to_string_lossy().to_string(),
            ];
            args.extend(codec_args);
            args.push(request.output.to_string_lossy().to_string());
            args
        };

        // Stream copy first; identical intermediates usually allow it.
        let copy_args = base_args(vec!["-c".to_string(), "copy".to_string()]);
        let copy_result = self.run(&self.ffmpeg, &copy_args);

        let result = match copy_result {
            Ok(()) => Ok(()),
            Err(EngineError::CommandFailed { .. }) => {
                tracing::debug!("Stream copy failed; re-encoding concatenation");
                let encode_args = base_args(vec![
                    "-c:v".to_string(),
                    request.encode.video_codec.clone(),
                    "-c:a".to_string(),
                    request.encode.audio_codec.clone(),
                    "-b:v".to_string(),
                    request.encode.video_bitrate.clone(),
                    "-b:a".to_string(),
                    request.encode.audio_bitrate.clone(),
                ]);
                self.run(&self.ffmpeg, &encode_args)
            }
            Err(e) => Err(e),
        };

        let _ = fs::remove_file(&list_path);
        result
    }

    fn probe_duration_ms(&self, path: &Path) -> EngineResult<u64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|_| EngineError::ToolMissing(self.ffprobe.clone()))?;

        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                tool: self.ffprobe.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::InvalidRequest(format!("unparsable probe output: {}", e)))?;

        json.get("format")
            .and_then(|f| f.get("duration"))
            .and_then(|d| d.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .map(|secs| (secs * 1000.0).round() as u64)
            .ok_or_else(|| {
                EngineError::InvalidRequest(format!(
                    "no duration reported for {}",
                    path.display()
                ))
            })
    }
}

/// Milliseconds to an ffmpeg timestamp: `HH:MM:SS.mmm`.
pub fn ms_to_timestamp(ms: u64) -> String {
    let total_secs = ms as f64 / 1000.0;
    let hours = (total_secs / 3600.0) as u64;
    let minutes = ((total_secs % 3600.0) / 60.0) as u64;
    let seconds = total_secs % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, minutes, seconds)
}

/// Per-span split/trim/setpts graph concatenated back together.
pub fn build_video_speed_filter(spans: &[SpeedSpan]) -> String {
    let n = spans.len();
    let mut filters = Vec::new();

    let split_outputs: String = (0..n).map(|i| format!("[v{}]", i)).collect();
    filters.push(format!("[0:v]split={}{}", n, split_outputs));

    let mut segment_outputs = String::new();
    for (i, span) in spans.iter().enumerate() {
        filters.push(format!(
            "[v{}]trim=start={:.3}:end={:.3},setpts={:.4}*(PTS-STARTPTS)[seg{}]",
            i,
            span.start_ms as f64 / 1000.0,
            span.end_ms as f64 / 1000.0,
            span.pts_factor(),
            i
        ));
        segment_outputs.push_str(&format!("[seg{}]", i));
    }

    filters.push(format!("{}concat=n={}:v=1:a=0[vout]", segment_outputs, n));
    filters.join(";")
}

/// Audio counterpart: asplit/atrim/atempo, concatenated.
pub fn build_audio_speed_filter(spans: &[SpeedSpan]) -> String {
    let n = spans.len();
    let mut filters = Vec::new();

    let split_outputs: String = (0..n).map(|i| format!("[a{}]", i)).collect();
    filters.push(format!("[0:a]asplit={}{}", n, split_outputs));

    let mut segment_outputs = String::new();
    for (i, span) in spans.iter().enumerate() {
        filters.push(format!(
            "[a{}]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS,{}[aseg{}]",
            i,
            span.start_ms as f64 / 1000.0,
            span.end_ms as f64 / 1000.0,
            atempo_chain(span.factor),
            i
        ));
        segment_outputs.push_str(&format!("[aseg{}]", i));
    }

    filters.push(format!("{}concat=n={}:v=0:a=1[aout]", segment_outputs, n));
    filters.join(";")
}

/// Chain atempo filters to express factors outside its 0.5..=2.0 range.
pub fn atempo_chain(speed: f64) -> String {
    if speed < 0.5 {
        let mut chain = Vec::new();
        let mut remaining = speed;
        while remaining < 0.5 {
            chain.push("atempo=0.5".to_string());
            remaining *= 2.0;
        }
        chain.push(format!("atempo={:.4}", remaining));
        chain.join(",")
    } else if speed > 2.0 {
        let mut chain = Vec::new();
        let mut remaining = speed;
        while remaining > 2.0 {
            chain.push("atempo=2.0".to_string());
            remaining /= 2.0;
        }
        chain.push(format!("atempo={:.4}", remaining));
        chain.join(",")
    } else {
        format!("atempo={:.4}", speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_timestamps() {
        assert_eq!(ms_to_timestamp(0), "00:00:00.000");
        assert_eq!(ms_to_timestamp(1_500), "00:00:01.500");
        assert_eq!(ms_to_timestamp(61_250), "00:01:01.250");
        assert_eq!(ms_to_timestamp(3_600_000), "01:00:00.000");
    }

    #[test]
    fn atempo_chains_out_of_range_factors() {
        assert_eq!(atempo_chain(1.5), "atempo=1.5000");
        assert_eq!(atempo_chain(4.0), "atempo=2.0,atempo=2.0000");
        assert_eq!(atempo_chain(0.25), "atempo=0.5,atempo=0.5000");
    }

    #[test]
    fn video_filter_covers_all_spans() {
        let spans = [
            SpeedSpan {
                start_ms: 1_200,
                end_ms: 3_500,
                factor: 1.2,
            },
            SpeedSpan {
                start_ms: 3_500,
                end_ms: 5_500,
                factor: 0.7,
            },
        ];

        let filter = build_video_speed_filter(&spans);
        assert!(filter.starts_with("[0:v]split=2[v0][v1]"));
        assert!(filter.contains("trim=start=1.200:end=3.500"));
        assert!(filter.contains("trim=start=3.500:end=5.500"));
        assert!(filter.ends_with("concat=n=2:v=1:a=0[vout]"));
    }

    #[test]
    fn audio_filter_mirrors_video_graph() {
        let spans = [SpeedSpan {
            start_ms: 0,
            end_ms: 2_000,
            factor: 1.0,
        }];

        let filter = build_audio_speed_filter(&spans);
        assert!(filter.contains("asplit=1[a0]"));
        assert!(filter.contains("atempo=1.0000"));
        assert!(filter.ends_with("concat=n=1:v=0:a=1[aout]"));
    }
}
