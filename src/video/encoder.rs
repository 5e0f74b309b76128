use std::io::{Cursor, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use image::{GrayImage, ImageFormat};
use log::{debug, info, warn};

use crate::config::MonoframeConfig;
use crate::video::{FrameSink, VideoError};

/// Streams PNG frames into an `ffmpeg` process that writes the video file.
///
/// Dropping an unfinished sink kills the child so no process outlives a
/// failed encode; the partial output file is left for the caller.
pub struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output_path: String,
    frames_written: usize,
    png_buf: Vec<u8>,
}

impl FfmpegSink {
    pub fn spawn(output_path: &str, cfg: &MonoframeConfig) -> Result<Self, VideoError> {
        let fps = cfg.fps.to_string();
        let mut args: Vec<&str> = vec![
            "-y",
            "-f",
            "image2pipe",
            "-framerate",
            fps.as_str(),
            "-i",
            "-",
            "-c:v",
            cfg.video_codec.as_str(),
        ];
        if let Some(bitrate) = cfg.video_bitrate.as_deref() {
            args.extend(["-b:v", bitrate]);
        }
        args.push(output_path);

        info!(
            "spawning ffmpeg: {}x{} @ {} fps, codec {} -> {}",
            cfg.frame_width, cfg.frame_height, cfg.fps, cfg.video_codec, output_path
        );

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take();

        Ok(Self {
            child: Some(child),
            stdin,
            output_path: output_path.to_string(),
            frames_written: 0,
            png_buf: Vec::new(),
        })
    }
}

impl FrameSink for FfmpegSink {
    fn push_frame(&mut self, frame: &GrayImage) -> Result<(), VideoError> {
        let stdin = self.stdin.as_mut().ok_or(VideoError::Finished)?;

        self.png_buf.clear();
        frame
            .write_to(&mut Cursor::new(&mut self.png_buf), ImageFormat::Png)
            .map_err(|source| VideoError::Encoding {
                index: self.frames_written,
                source,
            })?;
        stdin.write_all(&self.png_buf)?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        // closing stdin is ffmpeg's end-of-stream
        drop(self.stdin.take());
        let mut child = self.child.take().ok_or(VideoError::Finished)?;
        let status = child.wait()?;
        if !status.success() {
            return Err(VideoError::ProcessFailed(status));
        }

        info!(
            "video encoding complete: {} ({} frames)",
            self.output_path, self.frames_written
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            warn!("ffmpeg sink dropped before finish, killing encoder");
            if let Err(e) = child.kill() {
                debug!("failed to kill ffmpeg: {}", e);
            }
            let _ = child.wait();
        }
    }
}
