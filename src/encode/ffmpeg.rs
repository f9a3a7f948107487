use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{EncoderSink, SamplePair, SequenceGuard, SinkConfig};
use crate::encode::wav::WavByteWriter;
use crate::foundation::core::Fps;
use crate::foundation::error::{HoldframeError, HoldframeResult};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output files if they already exist.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }

    /// Path of the sidecar WAV written next to the video (`<stem>.wav`).
    pub fn audio_path(&self) -> PathBuf {
        self.out_path.with_extension("wav")
    }
}

/// Sink that spawns the system `ffmpeg`, streams BGRA frames to its stdin and writes audio
/// to a sidecar WAV file.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    audio: Option<WavByteWriter>,

    cfg: Option<SinkConfig>,
    guard: SequenceGuard,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("running", &self.child.is_some())
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl FfmpegSink {
    /// Create a new sink; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            audio: None,
            cfg: None,
            guard: SequenceGuard::default(),
        }
    }
}

impl EncoderSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> HoldframeResult<()> {
        if !cfg.size.width.is_multiple_of(2) || !cfg.size.height.is_multiple_of(2) {
            return Err(HoldframeError::encode_open(format!(
                "frame size {} must be even (required for yuv420p mp4 output)",
                cfg.size
            )));
        }
        ensure_parent_dir(&self.opts.out_path)
            .map_err(|e| HoldframeError::encode_open(e.to_string()))?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(HoldframeError::encode_open(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(HoldframeError::encode_open(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        self.guard.start()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "bgra",
            "-s",
            &format!("{}x{}", cfg.size.width, cfg.size.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args([
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);

        let audio = match cfg.audio {
            Some(format) => {
                let path = self.opts.audio_path();
                Some(
                    WavByteWriter::create(&path, format)
                        .map_err(|e| HoldframeError::encode_open(e.to_string()))?,
                )
            }
            None => None,
        };

        let mut child = cmd.spawn().map_err(|e| {
            HoldframeError::encode_open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HoldframeError::encode_open("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| HoldframeError::encode_open("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::info!(
            out = %self.opts.out_path.display(),
            size = %cfg.size,
            audio = cfg.audio.is_some(),
            "ffmpeg sink started"
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.audio = audio;
        self.cfg = Some(cfg);
        Ok(())
    }

    fn write_sample(&mut self, pair: &SamplePair) -> HoldframeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| HoldframeError::encode_write("ffmpeg sink not started"))?;
        if let Some(v) = &pair.video
            && v.frame.size() != cfg.size
        {
            return Err(HoldframeError::encode_write(format!(
                "frame size mismatch: got {}, expected {}",
                v.frame.size(),
                cfg.size
            )));
        }
        self.guard.admit(pair)?;

        if let Some(v) = &pair.video {
            let Some(stdin) = self.stdin.as_mut() else {
                return Err(HoldframeError::encode_write("sink is already finalized"));
            };
            stdin.write_all(v.frame.as_bytes()).map_err(|e| {
                HoldframeError::encode_write(format!("failed to write frame to ffmpeg stdin: {e}"))
            })?;
        }
        if let Some(a) = &pair.audio {
            match self.audio.as_mut() {
                Some(wav) => wav.write_bytes(&a.data)?,
                None => tracing::trace!(seq = a.seq, "audio sample ignored, no audio track"),
            }
        }
        Ok(())
    }

    fn end(&mut self) -> HoldframeResult<()> {
        self.guard.finish()?;
        drop(self.stdin.take());
        let audio_result = self.audio.take().map(WavByteWriter::finalize);

        let mut child = self
            .child
            .take()
            .ok_or_else(|| HoldframeError::encode_write("ffmpeg sink not started"))?;
        let status = child.wait().map_err(|e| {
            HoldframeError::encode_write(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| HoldframeError::encode_write("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| {
                    HoldframeError::encode_write(format!("ffmpeg stderr read failed: {e}"))
                })?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(HoldframeError::encode_write(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if let Some(res) = audio_result {
            let samples = res?;
            tracing::info!(samples, path = %self.opts.audio_path().display(), "audio track written");
        }

        self.cfg = None;
        Ok(())
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> HoldframeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
