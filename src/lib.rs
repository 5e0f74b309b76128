pub mod archive;
pub mod bits;
pub mod config;
pub mod payload;
pub mod pipeline;
pub mod raster;
pub mod timestamps;
pub mod video;

pub use bits::{BitError, BitString, ChecksumMismatch};
pub use config::{CheckMode, FrameGeometry, MonoframeConfig};
pub use payload::{FileMetadata, PayloadError};
pub use pipeline::decode::{decode_file, decode_path, restore_output, DecodedPayload, FrameStreamDecoder};
pub use pipeline::encode::{encode_file, encode_path, FrameStreamEncoder};
pub use pipeline::hook::{MemoryHook, PipelineHook, VideoFileHook};
pub use pipeline::{roundtrip, RoundtripResult};
pub use video::{FrameSink, FrameSource, MemorySink, MemorySource};
