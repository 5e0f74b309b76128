use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::GrayImage;
use log::{debug, info, warn};

use crate::config::MonoframeConfig;
use crate::video::{FrameSource, VideoError};

/// Reads raw 8-bit grayscale frames from an `ffmpeg` process decoding a video file.
pub struct FfmpegSource {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl FfmpegSource {
    pub fn spawn(input_path: &str, cfg: &MonoframeConfig) -> Result<Self, VideoError> {
        info!("decoding video: {}", input_path);

        let mut child = Command::new("ffmpeg")
            .args([
                "-i",
                input_path,
                "-f",
                "rawvideo",
                "-pix_fmt",
                "gray",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child.stdout.take();

        Ok(Self {
            child: Some(child),
            stdout,
            width: cfg.frame_width,
            height: cfg.frame_height,
            frames_read: 0,
        })
    }

    /// Close the pipe and reap the child, checking its exit status.
    fn close(&mut self) -> Result<(), VideoError> {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(VideoError::ProcessFailed(status));
            }
            info!("decoded {} frames", self.frames_read);
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut frame_buf = vec![0u8; self.width as usize * self.height as usize];
        let filled = read_exact_or_eof(stdout, &mut frame_buf)?;
        if filled < frame_buf.len() {
            if filled > 0 {
                warn!(
                    "discarding short trailing frame ({} of {} bytes)",
                    filled,
                    frame_buf.len()
                );
            }
            self.close()?;
            return Ok(None);
        }

        self.frames_read += 1;
        Ok(GrayImage::from_raw(self.width, self.height, frame_buf))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!("failed to kill ffmpeg: {}", e);
            }
            let _ = child.wait();
        }
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_read_full_frame_in_pieces() {
        let data: Vec<u8> = (0..10).collect();
        let mut reader = Trickle { data: &data, step: 3 };
        let mut buf = [0u8; 10];
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 10);
        assert_eq!(buf.to_vec(), data);
    }

    #[test]
    fn test_read_reports_short_tail() {
        let data = [1u8; 4];
        let mut reader = Trickle { data: &data, step: 2 };
        let mut buf = [0u8; 10];
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 0);
    }
}
