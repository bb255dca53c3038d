//! # Frame Sinks
//!
//! Destinations for captured frames, and the worker thread that feeds
//! them off the simulation loop.
//!
//! ## Purpose
//! Captured frames arrive on the tick cadence; encoding them is slow
//! and bursty. [`SinkWorker`] owns the sink on a dedicated thread
//! behind a bounded queue, so a stalled encoder costs dropped frames
//! instead of a stalled simulation.
//!
//! ## Sinks
//! [`FfmpegFrameSink`] pipes raw RGBA frames into an `ffmpeg` child
//! process encoding H.264. The executable is located by probing a
//! per-platform candidate list with `-version`. Any [`FrameSink`]
//! implementation can stand in, which keeps the worker testable
//! without a video encoder installed.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::sim::error::SinkError;

/// Frames queued ahead of the sink before new ones are dropped.
const FRAME_QUEUE_DEPTH: usize = 8;

/// How long a freshly spawned encoder is watched for an early exit.
const STARTUP_WATCH: Duration = Duration::from_millis(100);

/// Poll interval while watching a starting encoder.
const STARTUP_POLL: Duration = Duration::from_millis(10);

/// A consumer of finished frames.
///
/// Frame size and rate are fixed when the sink is constructed; each
/// call delivers one tightly packed RGBA frame.
pub trait FrameSink: Send {
    /// Consumes one frame. An error permanently stops the worker.
    fn commit_frame(&mut self, pixels: &[u8]) -> Result<(), SinkError>;
}

/// Everything a video sink needs to know up front.
#[derive(Debug, Clone)]
pub struct RecordingSettings {

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Playback rate in frames per second.
    pub frame_rate: u32,

    /// Path of the encoded video file. Overwritten if present.
    pub destination: PathBuf,
}

/// Pipes raw frames into an `ffmpeg` child process.
///
/// Dropping the sink closes the pipe and waits for the encoder to
/// finalize the file.
pub struct FfmpegFrameSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_reader: Option<JoinHandle<()>>,
    frame_bytes: usize,
}

impl FfmpegFrameSink {
    /// Locates an encoder and starts it for the given settings.
    ///
    /// The destination's parent directory is created if missing, and the
    /// fresh process is watched briefly so an encoder that dies on its
    /// arguments fails here instead of on the first frame.
    ///
    /// ## Errors
    /// * [`SinkError::EncoderNotFound`] — no candidate executable
    ///   answered the version probe.
    /// * [`SinkError::Io`] — the destination directory could not be
    ///   created.
    /// * [`SinkError::SpawnFailed`] — the encoder process could not be
    ///   started or exposed no stdin pipe.
    /// * [`SinkError::EncoderExited`] — the encoder quit during startup.
    pub fn open(settings: &RecordingSettings) -> Result<Self, SinkError> {
        let encoder = locate_encoder().ok_or(SinkError::EncoderNotFound)?;
        if let Some(parent) = settings.destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let size = format!("{}x{}", settings.width, settings.height);
        let rate = settings.frame_rate.to_string();
        let mut child = Command::new(&encoder)
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-vcodec",
                "rawvideo",
                "-pixel_format",
                "rgba",
                "-video_size",
                &size,
                "-framerate",
                &rate,
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&settings.destination)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SinkError::SpawnFailed { detail: e.to_string() })?;

        let stdin = child.stdin.take().ok_or_else(|| SinkError::SpawnFailed {
            detail: "encoder exposed no stdin pipe".to_string(),
        })?;
        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    debug!("ffmpeg: {line}");
                }
            })
        });

        // An encoder given a bad invocation exits within its first moments
        // instead of blocking on stdin. Catch that here, while construction
        // can still fail, rather than on the first committed frame.
        let deadline = Instant::now() + STARTUP_WATCH;
        while Instant::now() < deadline {
            thread::sleep(STARTUP_POLL);
            if let Ok(Some(status)) = child.try_wait() {
                return Err(SinkError::EncoderExited { code: status.code() });
            }
        }

        info!(
            encoder = %encoder.display(),
            destination = %settings.destination.display(),
            rate = settings.frame_rate,
            "video encoder started"
        );
        Ok(FfmpegFrameSink {
            child,
            stdin: Some(stdin),
            stderr_reader,
            frame_bytes: (settings.width * settings.height * 4) as usize,
        })
    }
}

impl FrameSink for FfmpegFrameSink {
    fn commit_frame(&mut self, pixels: &[u8]) -> Result<(), SinkError> {
        debug_assert_eq!(pixels.len(), self.frame_bytes, "frame size mismatch.");
        if let Some(status) = self.child.try_wait()? {
            return Err(SinkError::EncoderExited { code: status.code() });
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SinkError::EncoderExited { code: None });
        };
        stdin.write_all(pixels)?;
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        // The pipe must close before wait, or the encoder never sees EOF.
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.flush();
            drop(stdin);
        }
        match self.child.wait() {
            Ok(status) => info!(status = %status, "video encoder finished"),
            Err(e) => warn!(error = %e, "failed to wait for video encoder"),
        }
        if let Some(reader) = self.stderr_reader.take() {
            let _ = reader.join();
        }
    }
}

/// Owns a [`FrameSink`] on a dedicated thread behind a bounded queue.
pub struct SinkWorker {
    frames: Option<SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
    dropped: u64,
}

impl SinkWorker {
    /// Moves `sink` onto its own thread and starts consuming frames.
    ///
    /// ## Errors
    /// [`SinkError::Io`] when the worker thread cannot be spawned.
    pub fn spawn(mut sink: Box<dyn FrameSink>) -> Result<Self, SinkError> {
        let (frames, queue) = sync_channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name("fieldsim-sink".into())
            .spawn(move || {
                for frame in queue {
                    if let Err(e) = sink.commit_frame(&frame) {
                        error!(error = %e, "frame sink failed, discarding remaining frames");
                        break;
                    }
                }
                // The sink drops here, closing and finalizing the encoder.
            })?;
        Ok(SinkWorker {
            frames: Some(frames),
            worker: Some(worker),
            dropped: 0,
        })
    }

    /// Queues one frame for the sink, dropping it when the queue is
    /// full or the worker has stopped.
    pub fn submit(&mut self, pixels: &[u8]) {
        let Some(frames) = self.frames.as_ref() else {
            return;
        };
        match frames.try_send(pixels.to_vec()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "sink queue full, frame dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("frame sink worker stopped, frame dropped");
                self.frames = None;
            }
        }
    }

    /// Stops accepting frames, waits for queued ones to be consumed,
    /// and shuts the sink down. Idempotent.
    pub fn close(&mut self) {
        drop(self.frames.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("frame sink worker panicked");
            }
        }
    }

    /// Number of frames dropped because the queue was full.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        self.close();
    }
}

fn locate_encoder() -> Option<PathBuf> {
    for candidate in candidates() {
        let probe = Command::new(&candidate)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if matches!(probe, Ok(status) if status.success()) {
            return Some(candidate);
        }
    }
    None
}

fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("ffmpeg")];
    if cfg!(target_os = "windows") {
        paths.push(PathBuf::from("ffmpeg.exe"));
        paths.push(PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe"));
    } else {
        paths.push(PathBuf::from("/usr/local/bin/ffmpeg"));
        paths.push(PathBuf::from("/opt/homebrew/bin/ffmpeg"));
        paths.push(PathBuf::from("/usr/bin/ffmpeg"));
    }
    paths
}
