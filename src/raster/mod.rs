use image::GrayImage;
use thiserror::Error;

use crate::bits::BitString;
use crate::config::{FrameGeometry, BIT_THRESHOLD, BLACK, WHITE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("frame is {got_width}x{got_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
}

/// Render frame `frame_index` of `bits` as a black/white block image.
///
/// The frame carries bits `[i * bpf, (i + 1) * bpf)`; bits past the end of the
/// stream are rendered as 0. Each pixel row inside a block row is identical, so
/// one row is built per block row and copied down.
pub fn render_frame(frame_index: usize, bits: &BitString, geometry: &FrameGeometry) -> GrayImage {
    let width = geometry.width as usize;
    let block = geometry.block_size as usize;
    let bits_per_frame = geometry.bits_per_frame();
    let first_bit = frame_index * bits_per_frame;

    let mut pixels = vec![BLACK; geometry.frame_size()];
    let mut row = vec![BLACK; width];

    for by in 0..geometry.blocks_y {
        row.fill(BLACK);
        for bx in 0..geometry.blocks_x {
            let bit_index = first_bit + by * geometry.blocks_x + bx;
            if bits.get(bit_index) == Some(true) {
                row[bx * block..(bx + 1) * block].fill(WHITE);
            }
        }

        let band_start = by * block * width;
        for line in pixels[band_start..band_start + block * width].chunks_exact_mut(width) {
            line.copy_from_slice(&row);
        }
    }

    GrayImage::from_raw(geometry.width, geometry.height, pixels)
        .expect("pixel buffer sized from frame geometry")
}

/// Threshold each block of `frame` and append the bits to `out` in row-major block order.
pub fn extract_bits(
    frame: &GrayImage,
    geometry: &FrameGeometry,
    out: &mut BitString,
) -> Result<(), RasterError> {
    if frame.width() != geometry.width || frame.height() != geometry.height {
        return Err(RasterError::DimensionMismatch {
            width: geometry.width,
            height: geometry.height,
            got_width: frame.width(),
            got_height: frame.height(),
        });
    }

    let width = geometry.width as usize;
    let block = geometry.block_size as usize;
    // mean > 127 without leaving integer arithmetic
    let threshold = BIT_THRESHOLD as u64 * (block * block) as u64;
    let pixels = frame.as_raw();
    let mut sums = vec![0u64; geometry.blocks_x];

    for by in 0..geometry.blocks_y {
        sums.fill(0);
        let band_start = by * block * width;
        for line in pixels[band_start..band_start + block * width].chunks_exact(width) {
            for (sum, run) in sums.iter_mut().zip(line.chunks_exact(block)) {
                *sum += run.iter().map(|&p| p as u64).sum::<u64>();
            }
        }

        for &sum in &sums {
            out.push(sum > threshold);
        }
    }

    Ok(())
}
