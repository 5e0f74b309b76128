use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::archive;
use crate::bits;
use crate::config::{self, FrameGeometry, MonoframeConfig};
use crate::payload::{self, FileMetadata};
use crate::raster;
use crate::timestamps;
use crate::video::{FfmpegSink, FrameSink};

/// Turns a payload into an ordered stream of block frames.
pub struct FrameStreamEncoder {
    geometry: FrameGeometry,
    error_correction_bits: u8,
    progress: ProgressBar,
}

impl FrameStreamEncoder {
    pub fn new(cfg: &MonoframeConfig) -> Result<Self> {
        let geometry = cfg.geometry().context("invalid encoder configuration")?;
        Ok(Self {
            geometry,
            error_correction_bits: cfg.error_correction_bits,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report frame emission on `progress`; its length is set when encoding starts.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Frames needed to carry `payload_len` bytes.
    pub fn frame_count(&self, payload_len: usize) -> usize {
        config::frame_count(
            payload_len,
            self.error_correction_bits,
            self.geometry.bits_per_frame(),
        )
    }

    /// Frame `metadata` and `archive` into a payload and encode it.
    pub fn encode<S: FrameSink + ?Sized>(
        &self,
        metadata: &FileMetadata,
        archive: &[u8],
        sink: &mut S,
    ) -> Result<usize> {
        let payload = payload::frame_payload(metadata, archive)?;
        self.encode_payload(&payload, sink)
    }

    /// Encode raw payload bytes into frames and hand them to `sink` in index
    /// order, then finish the sink. Returns the number of frames written.
    pub fn encode_payload<S: FrameSink + ?Sized>(&self, payload: &[u8], sink: &mut S) -> Result<usize> {
        let bits = bits::frame_bits(payload, self.error_correction_bits);
        let num_frames = bits.len().div_ceil(self.geometry.bits_per_frame());
        info!(
            "encoding {} payload bytes ({} bits) into {} frames ({}x{}, {}px blocks)",
            payload.len(),
            bits.len(),
            num_frames,
            self.geometry.width,
            self.geometry.height,
            self.geometry.block_size
        );
        self.progress.set_length(num_frames as u64);

        // Render frames in parallel batches, then write each batch to the sink in order.
        // Batch size matches the rayon thread pool so we keep all cores busy without
        // holding more than `threads * frame_size` bytes of rendered pixel data at once.
        let batch_size = rayon::current_num_threads().max(1);
        let mut frame_idx = 0;
        while frame_idx < num_frames {
            let batch_end = (frame_idx + batch_size).min(num_frames);
            let frames: Vec<GrayImage> = (frame_idx..batch_end)
                .into_par_iter()
                .map(|idx| raster::render_frame(idx, &bits, &self.geometry))
                .collect();

            for frame in &frames {
                sink.push_frame(frame)
                    .with_context(|| format!("failed to emit frame {}", frame_idx))?;
                frame_idx += 1;
                self.progress.inc(1);
            }
        }

        sink.finish().context("failed to finish frame sink")?;
        self.progress.finish_with_message("frames complete");
        Ok(num_frames)
    }
}

/// Archive `input_path` with its timestamps and encode it into `sink`.
/// Returns the number of frames written.
pub fn encode_path<S: FrameSink + ?Sized>(
    encoder: &FrameStreamEncoder,
    input_path: &Path,
    sink: &mut S,
) -> Result<usize> {
    let metadata = timestamps::get_times(input_path)
        .with_context(|| format!("failed to read timestamps of {}", input_path.display()))?;

    info!("archiving input: {}", input_path.display());
    let archive = archive::pack(input_path).context("failed to archive input")?;

    encoder.encode(&metadata, &archive, sink)
}

/// Full encode pipeline: path -> [timestamps, zip] -> payload -> frames -> ffmpeg.
pub fn encode_file(input_path: &Path, output_path: &str, cfg: &MonoframeConfig) -> Result<()> {
    cfg.validate().context("invalid configuration")?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta})")?
            .progress_chars("##-"),
    );

    let encoder = FrameStreamEncoder::new(cfg)?.with_progress(progress);
    let mut sink = FfmpegSink::spawn(output_path, cfg)
        .context("failed to spawn ffmpeg process — is ffmpeg installed?")?;
    let frames = encode_path(&encoder, input_path, &mut sink)?;

    info!("encode complete! {} frames written to {}", frames, output_path);
    Ok(())
}
