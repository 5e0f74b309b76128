use thiserror::Error;

// Video parameters
pub const DEFAULT_FRAME_WIDTH: u32 = 1920;
pub const DEFAULT_FRAME_HEIGHT: u32 = 1080;
pub const DEFAULT_BLOCK_SIZE: u32 = 10;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_VIDEO_BITRATE: &str = "2M";

// Bit stream parameters
pub const DATA_BITS: usize = 8;
pub const DEFAULT_ERROR_CORRECTION_BITS: u8 = 8;
pub const MAX_ERROR_CORRECTION_BITS: u8 = 8;

/// Separator between the metadata JSON and the archive bytes.
pub const PAYLOAD_SEPARATOR: u8 = b'\n';

/// Pixel intensities for a 0 bit and a 1 bit.
pub const BLACK: u8 = 0;
pub const WHITE: u8 = 255;

/// A block decodes as 1 when its mean intensity is strictly above this.
pub const BIT_THRESHOLD: u32 = 127;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame dimensions and block size must be non-zero ({width}x{height}, block {block_size})")]
    ZeroDimension {
        width: u32,
        height: u32,
        block_size: u32,
    },
    #[error("frame {width}x{height} is not a whole number of {block_size}px blocks")]
    NotBlockAligned {
        width: u32,
        height: u32,
        block_size: u32,
    },
    #[error("error correction width {0} exceeds {MAX_ERROR_CORRECTION_BITS} bits")]
    CheckWidth(u8),
}

/// Whether the decoder verifies the per-byte check field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Check bits are skipped without inspection.
    #[default]
    Lenient,
    /// Every byte's check field is compared against its popcount.
    Strict,
}

/// Runtime configuration for an encode/decode operation.
///
/// The spatial parameters and `error_correction_bits` are not stored in the
/// video, so a decode run must use the same values as the encode run.
#[derive(Debug, Clone)]
pub struct MonoframeConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub block_size: u32,
    pub fps: u32,
    pub error_correction_bits: u8,
    pub check_mode: CheckMode,
    pub video_codec: String,
    pub video_bitrate: Option<String>,
}

impl Default for MonoframeConfig {
    fn default() -> Self {
        Self {
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            block_size: DEFAULT_BLOCK_SIZE,
            fps: DEFAULT_FPS,
            error_correction_bits: DEFAULT_ERROR_CORRECTION_BITS,
            check_mode: CheckMode::Lenient,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            video_bitrate: Some(DEFAULT_VIDEO_BITRATE.to_string()),
        }
    }
}

impl MonoframeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry().map(|_| ())
    }

    /// Validated block geometry for this configuration.
    pub fn geometry(&self) -> Result<FrameGeometry, ConfigError> {
        if self.error_correction_bits > MAX_ERROR_CORRECTION_BITS {
            return Err(ConfigError::CheckWidth(self.error_correction_bits));
        }
        FrameGeometry::new(self.frame_width, self.frame_height, self.block_size)
    }

    /// Encoded width of one payload byte in the bit stream.
    pub fn bits_per_byte(&self) -> usize {
        bits_per_byte(self.error_correction_bits)
    }
}

/// Block layout of a single frame, built through [`FrameGeometry::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub block_size: u32,
    pub blocks_x: usize,
    pub blocks_y: usize,
}

impl FrameGeometry {
    /// Block layout for a `width` x `height` frame. Both sides must be
    /// non-zero multiples of a non-zero `block_size`.
    pub fn new(width: u32, height: u32, block_size: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 || block_size == 0 {
            return Err(ConfigError::ZeroDimension {
                width,
                height,
                block_size,
            });
        }
        if width % block_size != 0 || height % block_size != 0 {
            return Err(ConfigError::NotBlockAligned {
                width,
                height,
                block_size,
            });
        }
        Ok(Self {
            width,
            height,
            block_size,
            blocks_x: (width / block_size) as usize,
            blocks_y: (height / block_size) as usize,
        })
    }

    /// Number of blocks, i.e. stream bits carried by one frame.
    pub fn bits_per_frame(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

pub fn bits_per_byte(error_correction_bits: u8) -> usize {
    DATA_BITS + error_correction_bits as usize
}

/// Number of frames needed for `payload_len` bytes.
pub fn frame_count(payload_len: usize, error_correction_bits: u8, bits_per_frame: usize) -> usize {
    let total_bits = payload_len * bits_per_byte(error_correction_bits);
    total_bits.div_ceil(bits_per_frame)
}
