use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::GrayImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

use crate::archive;
use crate::bits::{self, BitString};
use crate::config::{CheckMode, FrameGeometry, MonoframeConfig};
use crate::payload::{self, FileMetadata};
use crate::raster::{self, RasterError};
use crate::timestamps;
use crate::video::{FfmpegSource, FrameSource};

/// Metadata header and archive bytes recovered from a frame stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub metadata: FileMetadata,
    /// Archive bytes, followed by any whole zero bytes from the last frame's padding.
    pub archive: Vec<u8>,
}

/// Turns an ordered stream of block frames back into payload bytes.
///
/// Frames are consumed in the order the source delivers them; there is no
/// reordering or resynchronization.
pub struct FrameStreamDecoder {
    geometry: FrameGeometry,
    error_correction_bits: u8,
    check_mode: CheckMode,
    progress: ProgressBar,
}

impl FrameStreamDecoder {
    pub fn new(cfg: &MonoframeConfig) -> Result<Self> {
        let geometry = cfg.geometry().context("invalid decoder configuration")?;
        Ok(Self {
            geometry,
            error_correction_bits: cfg.error_correction_bits,
            check_mode: cfg.check_mode,
            progress: ProgressBar::hidden(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Read every frame from `source` and concatenate their bits in source order.
    pub fn decode_bits<R: FrameSource + ?Sized>(&self, source: &mut R) -> Result<BitString> {
        let mut bits = BitString::new();
        let mut frame_count = 0usize;

        // Read frames in batches (I/O must be sequential) and extract bits from
        // each batch in parallel, keeping memory bounded to `threads * frame_size`.
        let batch_size = rayon::current_num_threads().max(1);
        let mut batch: Vec<GrayImage> = Vec::with_capacity(batch_size);

        loop {
            let next = source
                .next_frame()
                .with_context(|| format!("failed to read frame {}", frame_count))?;
            let done = match next {
                Some(frame) => {
                    batch.push(frame);
                    frame_count += 1;
                    false
                }
                None => true,
            };

            if batch.len() >= batch_size || (done && !batch.is_empty()) {
                self.extract_batch(&batch, &mut bits)?;
                self.progress.inc(batch.len() as u64);
                batch.clear();
            }
            if done {
                break;
            }
        }

        self.progress.finish_with_message("frames read");
        info!("read {} frames, {} bits", frame_count, bits.len());
        Ok(bits)
    }

    fn extract_batch(&self, batch: &[GrayImage], bits: &mut BitString) -> Result<()> {
        let bits_per_frame = self.geometry.bits_per_frame();
        let extracted: Vec<BitString> = batch
            .par_iter()
            .map(|frame| {
                let mut frame_bits = BitString::with_capacity(bits_per_frame);
                raster::extract_bits(frame, &self.geometry, &mut frame_bits)?;
                Ok(frame_bits)
            })
            .collect::<Result<_, RasterError>>()?;

        for frame_bits in &extracted {
            bits.extend_from(frame_bits);
        }
        Ok(())
    }

    /// Decode frames into payload bytes, verifying check fields in strict mode.
    pub fn decode_payload<R: FrameSource + ?Sized>(&self, source: &mut R) -> Result<Vec<u8>> {
        let bits = self.decode_bits(source)?;
        let payload = bits::deframe_bits(&bits, self.error_correction_bits, self.check_mode)?;
        debug!("recovered {} payload bytes", payload.len());
        Ok(payload)
    }

    /// Decode frames and split the payload into metadata and archive bytes.
    pub fn decode<R: FrameSource + ?Sized>(&self, source: &mut R) -> Result<DecodedPayload> {
        let payload = self.decode_payload(source)?;
        let (metadata, archive) = payload::deframe_payload(&payload)?;
        Ok(DecodedPayload {
            metadata,
            archive: archive.to_vec(),
        })
    }
}

/// Unpack a decoded archive next to `output_path` and restore its timestamps.
///
/// The archive is extracted into the parent directory of `output_path`. When
/// it holds a single entry, that entry receives the recorded timestamps;
/// otherwise `output_path` itself must exist. Returns the restored path.
pub fn restore_output(decoded: &DecodedPayload, output_path: &Path) -> Result<PathBuf> {
    let output_folder = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let entries = archive::unpack(&decoded.archive, output_folder)
        .context("failed to extract recovered archive")?;

    let restored = if let [entry] = entries.as_slice() {
        output_folder.join(entry)
    } else if output_path.exists() {
        output_path.to_path_buf()
    } else {
        anyhow::bail!("no file found in {}", output_folder.display());
    };

    timestamps::set_times(&restored, &decoded.metadata)
        .with_context(|| format!("failed to restore timestamps on {}", restored.display()))?;
    Ok(restored)
}

/// Decode every frame of `source` and restore the carried file or directory.
pub fn decode_path<R: FrameSource + ?Sized>(
    decoder: &FrameStreamDecoder,
    source: &mut R,
    output_path: &Path,
) -> Result<PathBuf> {
    let decoded = decoder.decode(source)?;
    restore_output(&decoded, output_path)
}

/// Full decode pipeline: ffmpeg -> frames -> payload -> [unzip, timestamps].
///
/// See [`restore_output`] for where the result lands.
pub fn decode_file(input_path: &str, output_path: &Path, cfg: &MonoframeConfig) -> Result<PathBuf> {
    cfg.validate().context("invalid configuration")?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("[{elapsed_precise}] {spinner} {pos} frames")?,
    );

    let decoder = FrameStreamDecoder::new(cfg)?.with_progress(progress);
    let mut source = FfmpegSource::spawn(input_path, cfg)
        .context("failed to spawn ffmpeg for decoding — is ffmpeg installed?")?;
    let restored = decode_path(&decoder, &mut source, output_path)?;

    info!("decode complete! output: {}", restored.display());
    Ok(restored)
}
