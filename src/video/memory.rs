use std::collections::VecDeque;

use image::GrayImage;

use crate::video::{FrameSink, FrameSource, VideoError};

/// Collects frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<GrayImage>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_frames(self) -> Vec<GrayImage> {
        self.frames
    }
}

impl FrameSink for MemorySink {
    fn push_frame(&mut self, frame: &GrayImage) -> Result<(), VideoError> {
        if self.finished {
            return Err(VideoError::Finished);
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        self.finished = true;
        Ok(())
    }
}

/// Replays a fixed list of frames in order.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<GrayImage>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = GrayImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, VideoError> {
        Ok(self.frames.pop_front())
    }
}
