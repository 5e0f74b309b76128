pub mod decode;
pub mod encode;
pub mod hook;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::config::MonoframeConfig;
use decode::FrameStreamDecoder;
use encode::FrameStreamEncoder;
use hook::PipelineHook;

/// Result of a full encode → hook → decode roundtrip.
pub struct RoundtripResult {
    /// Frames emitted by the encoder.
    pub frames: usize,
    /// SHA-256 hex digest of the original input file.
    pub original_hash: String,
    /// SHA-256 hex digest of the restored file.
    pub decoded_hash: String,
    /// `true` if the hashes match (lossless round-trip).
    pub matched: bool,
}

/// Run a full encode → hook → decode roundtrip on a single file.
///
/// Steps:
/// 1. SHA-256 hashes `input`.
/// 2. Encodes `input` into the sink from `hook.open_sink`.
/// 3. Calls `hook.after_encode` to get the frame source.
/// 4. Decodes the source, restoring next to `output`.
/// 5. SHA-256 hashes the restored file and compares with the original.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use monoframe::{roundtrip, MonoframeConfig, VideoFileHook};
///
/// let result = roundtrip(
///     Path::new("input.txt"),
///     Path::new("restored/input.txt"),
///     &MonoframeConfig::default(),
///     &VideoFileHook::new("encoded.mkv"),
/// ).unwrap();
///
/// assert!(result.matched, "round-trip failed: {} != {}", result.original_hash, result.decoded_hash);
/// ```
pub fn roundtrip<H: PipelineHook>(
    input: &Path,
    output: &Path,
    cfg: &MonoframeConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let original_hash = sha256_file(input)?;

    let encoder = FrameStreamEncoder::new(cfg)?;
    let mut sink = hook.open_sink(cfg)?;
    let frames = encode::encode_path(&encoder, input, &mut sink)?;

    let mut source = hook.after_encode(sink, cfg)?;
    let decoder = FrameStreamDecoder::new(cfg)?;
    let restored = decode::decode_path(&decoder, &mut source, output)?;

    let decoded_hash = sha256_file(&restored)?;
    let matched = original_hash == decoded_hash;

    Ok(RoundtripResult {
        frames,
        original_hash,
        decoded_hash,
        matched,
    })
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
