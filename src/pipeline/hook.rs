use anyhow::{Context, Result};

use crate::config::MonoframeConfig;
use crate::video::{FfmpegSink, FfmpegSource, FrameSink, FrameSource, MemorySink, MemorySource};

/// Carries frames from the encoder to the decoder in a [`roundtrip`](super::roundtrip).
///
/// `open_sink` supplies where the encoder writes; once encoding has finished
/// the sink, `after_encode` turns it into the source the decoder reads. This
/// is the place to re-mux a video, copy it through remote storage, or damage
/// frames on purpose.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use monoframe::{MemorySink, MemorySource, MonoframeConfig, PipelineHook};
///
/// /// Replays frames in reverse order.
/// struct Reverse;
///
/// impl PipelineHook for Reverse {
///     type Sink = MemorySink;
///     type Source = MemorySource;
///
///     fn open_sink(&self, _cfg: &MonoframeConfig) -> Result<MemorySink> {
///         Ok(MemorySink::new())
///     }
///
///     fn after_encode(&self, sink: MemorySink, _cfg: &MonoframeConfig) -> Result<MemorySource> {
///         Ok(MemorySource::new(sink.into_frames().into_iter().rev()))
///     }
/// }
/// ```
pub trait PipelineHook {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn open_sink(&self, cfg: &MonoframeConfig) -> Result<Self::Sink>;

    /// Called with the finished sink. Return the source the decoder should read.
    fn after_encode(&self, sink: Self::Sink, cfg: &MonoframeConfig) -> Result<Self::Source>;
}

/// Keeps frames in memory and replays them unchanged.
pub struct MemoryHook;

impl PipelineHook for MemoryHook {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn open_sink(&self, _cfg: &MonoframeConfig) -> Result<MemorySink> {
        Ok(MemorySink::new())
    }

    fn after_encode(&self, sink: MemorySink, _cfg: &MonoframeConfig) -> Result<MemorySource> {
        Ok(MemorySource::new(sink.into_frames()))
    }
}

/// Writes a video file through ffmpeg and reads the same file back.
pub struct VideoFileHook {
    pub path: String,
}

impl VideoFileHook {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl PipelineHook for VideoFileHook {
    type Sink = FfmpegSink;
    type Source = FfmpegSource;

    fn open_sink(&self, cfg: &MonoframeConfig) -> Result<FfmpegSink> {
        FfmpegSink::spawn(&self.path, cfg)
            .context("failed to spawn ffmpeg process — is ffmpeg installed?")
    }

    fn after_encode(&self, sink: FfmpegSink, cfg: &MonoframeConfig) -> Result<FfmpegSource> {
        drop(sink);
        FfmpegSource::spawn(&self.path, cfg)
            .context("failed to spawn ffmpeg for decoding — is ffmpeg installed?")
    }
}
