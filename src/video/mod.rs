//! Frame transport between the codec and a video pipeline.
//!
//! The codec only sees ordered [`GrayImage`] frames. [`FrameSink`] consumes
//! them on encode and [`FrameSource`] produces them on decode; the `ffmpeg`
//! adapters and the in-memory fakes both implement these traits.

pub mod decoder;
pub mod encoder;
pub mod memory;

use image::GrayImage;
use thiserror::Error;

pub use decoder::FfmpegSource;
pub use encoder::FfmpegSink;
pub use memory::{MemorySink, MemorySource};

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("failed to encode frame {index} as PNG: {source}")]
    Encoding {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("frame pipe I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg exited with status: {0}")]
    ProcessFailed(std::process::ExitStatus),
    #[error("frame sink already finished")]
    Finished,
}

/// Ordered consumer of encoded frames.
pub trait FrameSink {
    /// Accept the next frame. Frames arrive in strictly increasing index order.
    fn push_frame(&mut self, frame: &GrayImage) -> Result<(), VideoError>;

    /// Signal end of stream and wait for the consumer to complete.
    fn finish(&mut self) -> Result<(), VideoError>;
}

/// Ordered producer of frames read back from a video.
pub trait FrameSource {
    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError>;
}
