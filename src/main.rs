use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use monoframe::config::{
    DEFAULT_BLOCK_SIZE, DEFAULT_ERROR_CORRECTION_BITS, DEFAULT_FPS, DEFAULT_FRAME_HEIGHT,
    DEFAULT_FRAME_WIDTH, DEFAULT_VIDEO_BITRATE, DEFAULT_VIDEO_CODEC,
};
use monoframe::pipeline;
use monoframe::{CheckMode, MonoframeConfig};

/// monoframe — store files and directories as black/white block video.
#[derive(Parser)]
#[command(name = "monoframe", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file or directory into a video
    Encode {
        /// Input file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path (e.g. out.mov)
        #[arg(short, long)]
        output: String,

        /// Frame width (default: 1920)
        #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (default: 1080)
        #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
        height: u32,

        /// Block edge in pixels (default: 10)
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,

        /// Frames per second (default: 30)
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Check bits stored after every byte (default: 8)
        #[arg(long, default_value_t = DEFAULT_ERROR_CORRECTION_BITS)]
        error_correction_bits: u8,

        /// ffmpeg video codec
        #[arg(long, default_value = DEFAULT_VIDEO_CODEC)]
        codec: String,

        /// ffmpeg target bitrate; pass an empty string to let the codec choose
        #[arg(long, default_value = DEFAULT_VIDEO_BITRATE)]
        bitrate: String,
    },

    /// Decode a video back into the original file
    Decode {
        /// Input video path
        #[arg(short, long)]
        input: String,

        /// Output file path; the archive is extracted into its directory
        #[arg(short, long)]
        output: PathBuf,

        /// Frame width (must match encoding)
        #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (must match encoding)
        #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
        height: u32,

        /// Block edge in pixels (must match encoding)
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,

        /// Check bits per byte (must match encoding)
        #[arg(long, default_value_t = DEFAULT_ERROR_CORRECTION_BITS)]
        error_correction_bits: u8,

        /// Verify every byte's check bits and fail on mismatch
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            width,
            height,
            block_size,
            fps,
            error_correction_bits,
            codec,
            bitrate,
        } => {
            let cfg = MonoframeConfig {
                frame_width: width,
                frame_height: height,
                block_size,
                fps,
                error_correction_bits,
                video_codec: codec,
                video_bitrate: Some(bitrate).filter(|b| !b.is_empty()),
                ..Default::default()
            };

            pipeline::encode::encode_file(&input, &output, &cfg)?;
        }

        Commands::Decode {
            input,
            output,
            width,
            height,
            block_size,
            error_correction_bits,
            strict,
        } => {
            let cfg = MonoframeConfig {
                frame_width: width,
                frame_height: height,
                block_size,
                error_correction_bits,
                check_mode: if strict {
                    CheckMode::Strict
                } else {
                    CheckMode::Lenient
                },
                ..Default::default()
            };

            let restored = pipeline::decode::decode_file(&input, &output, &cfg)?;
            println!("{}", restored.display());
        }
    }

    Ok(())
}
