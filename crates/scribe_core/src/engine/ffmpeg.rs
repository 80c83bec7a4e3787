//! FFmpeg-backed media engine.
//!
//! Wraps the `ffmpeg` and `ffprobe` binaries for audio extraction,
//! video rendering, segment splitting and speech enhancement. All
//! outputs are written to caller-supplied paths; the store layer is
//! responsible for moving results into stage folders.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{EngineSettings, EnhanceSettings};
use crate::engine::types::{run_command, EngineError, EngineResult, MediaEngine};
use crate::models::parse_segment_stem;

/// Sample rate for extracted speech audio (16kHz mono suits
/// transcription models).
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Synthesized picture track for audio-only sources.
const VIDEO_CANVAS: &str = "color=c=black:s=1280x720:r=10";

/// Media engine backed by the ffmpeg command line tools.
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg_path.clone(),
            ffprobe: settings.ffprobe_path.clone(),
        }
    }

    /// Base ffmpeg invocation. Quiet, overwrites outputs; callers
    /// only hand it fresh paths inside the work folder.
    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y");
        cmd
    }
}

impl MediaEngine for FfmpegEngine {
    fn extract_audio(&self, input: &Path, output: &Path) -> EngineResult<()> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let mut cmd = self.base_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-vn") // No video
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg(TRANSCRIPTION_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1") // Mono
            .arg(output);

        run_command(cmd, "ffmpeg")?;
        verify_output(output)?;

        tracing::info!(
            "Extracted audio from {} to {}",
            input.display(),
            output.display()
        );

        Ok(())
    }

    fn render_video(&self, input: &Path, output: &Path) -> EngineResult<()> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let mut cmd = self.base_command();
        cmd.arg("-f")
            .arg("lavfi")
            .arg("-i")
            .arg(VIDEO_CANVAS)
            .arg("-i")
            .arg(input)
            .arg("-shortest") // End with the audio track
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("veryfast")
            .arg("-tune")
            .arg("stillimage")
            .arg("-g")
            .arg("30") // Keyframe every 3s; stream-copied splits cut there
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg("192k")
            .arg(output);

        run_command(cmd, "ffmpeg")?;
        verify_output(output)?;

        tracing::info!(
            "Rendered {} into video {}",
            input.display(),
            output.display()
        );

        Ok(())
    }

    fn split(
        &self,
        input: &Path,
        out_dir: &Path,
        logical_name: &str,
        chunk_seconds: u64,
    ) -> EngineResult<Vec<PathBuf>> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let extension = input
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EngineError::ParseError {
                tool: "ffmpeg".to_string(),
                message: format!("split input has no extension: {}", input.display()),
            })?
            .to_string();

        if let Ok(duration) = self.duration_secs(input) {
            tracing::debug!(
                "Splitting {} ({:.1}s) into {}s chunks",
                input.display(),
                duration,
                chunk_seconds
            );
        }

        let pattern = out_dir.join(format!("{}_part%03d.{}", logical_name, extension));

        let mut cmd = self.base_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(chunk_seconds.to_string())
            .arg("-reset_timestamps")
            .arg("1")
            .arg("-map")
            .arg("0")
            .arg("-c")
            .arg("copy")
            .arg(&pattern);

        run_command(cmd, "ffmpeg")?;

        let segments = collect_segments(out_dir, logical_name, &extension)?;
        if segments.is_empty() {
            return Err(EngineError::OutputMissing(out_dir.to_path_buf()));
        }

        tracing::info!(
            "Split {} into {} segment(s)",
            input.display(),
            segments.len()
        );

        Ok(segments)
    }

    fn enhance(
        &self,
        input: &Path,
        output: &Path,
        settings: &EnhanceSettings,
    ) -> EngineResult<()> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let mut cmd = self.base_command();
        cmd.arg("-i")
            .arg(input)
            .arg("-af")
            .arg(enhance_filter(settings))
            .arg(output);

        run_command(cmd, "ffmpeg")?;
        verify_output(output)?;

        tracing::info!(
            "Enhanced {} to {}",
            input.display(),
            output.display()
        );

        Ok(())
    }

    fn duration_secs(&self, input: &Path) -> EngineResult<f64> {
        if !input.exists() {
            return Err(EngineError::FileNotFound(input.to_path_buf()));
        }

        let mut cmd = Command::new(&self.ffprobe);
        cmd.arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(input);

        let output = run_command(cmd, "ffprobe")?;

        let duration_str = String::from_utf8_lossy(&output.stdout);
        duration_str
            .trim()
            .parse::<f64>()
            .map_err(|e| EngineError::ParseError {
                tool: "ffprobe".to_string(),
                message: format!("bad duration {:?}: {}", duration_str.trim(), e),
            })
    }
}

/// Speech enhancement filter chain built from the configured band
/// limits, compressor and make-up gain.
fn enhance_filter(settings: &EnhanceSettings) -> String {
    format!(
        "highpass=f={},lowpass=f={},acompressor=threshold={}dB:ratio={},volume={}dB",
        settings.lowcut_hz,
        settings.highcut_hz,
        settings.compress_threshold_db,
        settings.compress_ratio,
        settings.gain_db
    )
}

/// Gather the segment files ffmpeg produced for `logical_name`,
/// ordered by segment index. Files for other logical names in the
/// same directory are left alone.
fn collect_segments(
    dir: &Path,
    logical_name: &str,
    extension: &str,
) -> EngineResult<Vec<PathBuf>> {
    let mut found: Vec<(usize, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches_ext {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some((source, index)) = parse_segment_stem(stem) {
            if source == logical_name {
                found.push((index, path));
            }
        }
    }

    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// An output the tool claims to have written must exist and be
/// non-empty.
fn verify_output(path: &Path) -> EngineResult<()> {
    let ok = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !ok {
        return Err(EngineError::OutputMissing(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::segment_file_name;
    use tempfile::TempDir;

    #[test]
    fn enhance_filter_uses_configured_values() {
        let settings = EnhanceSettings::default();
        assert_eq!(
            enhance_filter(&settings),
            "highpass=f=100,lowpass=f=6000,acompressor=threshold=-30dB:ratio=4,volume=8dB"
        );
    }

    #[test]
    fn collect_segments_orders_by_index() {
        let dir = TempDir::new().unwrap();
        for index in [2usize, 0, 1] {
            let name = segment_file_name("meeting", index, "wav");
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(dir.path().join(segment_file_name("other", 0, "wav")), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let segments = collect_segments(dir.path(), "meeting", "wav").unwrap();
        let names: Vec<String> = segments
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "meeting_part000.wav",
                "meeting_part001.wav",
                "meeting_part002.wav"
            ]
        );
    }

    #[test]
    fn collect_segments_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(segment_file_name("talk", 0, "mp4")), b"x").unwrap();

        let segments = collect_segments(dir.path(), "talk", "wav").unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn missing_input_is_reported_without_spawning() {
        let engine = FfmpegEngine::new(&EngineSettings::default());
        let dir = TempDir::new().unwrap();

        let err = engine
            .extract_audio(&dir.path().join("absent.mp4"), &dir.path().join("out.wav"))
            .unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));

        let err = engine
            .split(&dir.path().join("absent.wav"), dir.path(), "absent", 60)
            .unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }

    #[test]
    fn engine_is_object_safe() {
        let engine = FfmpegEngine::new(&EngineSettings::default());
        let _: &dyn MediaEngine = &engine;
    }
}
