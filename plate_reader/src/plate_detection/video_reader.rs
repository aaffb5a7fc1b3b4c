use crate::error::Result;

use log::debug;
use opencv::core::Size;
use opencv::prelude::{Mat, MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriterTrait};
use opencv::videoio::{
    VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
    CAP_PROP_POS_FRAMES,
};

/// Sequential frame access over a video file, counting frames from 0.
pub struct VideoReader {
    capture: VideoCapture,
    next_frame: u64,
}

impl VideoReader {
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self {
            capture: VideoCapture::from_file(path, CAP_ANY)?,
            next_frame: 0,
        })
    }

    pub fn fps(&self) -> Result<f64> {
        Ok(self.capture.get(CAP_PROP_FPS)?)
    }

    pub fn frame_size(&self) -> Result<Size> {
        let width = self.capture.get(CAP_PROP_FRAME_WIDTH)? as i32;
        let height = self.capture.get(CAP_PROP_FRAME_HEIGHT)? as i32;
        Ok(Size::new(width, height))
    }

    /// Number of the frame the next [`VideoReader::read_frame`] returns.
    pub fn position(&self) -> u64 {
        self.next_frame
    }

    pub fn seek(&mut self, frame: u64) -> Result<()> {
        self.capture.set(CAP_PROP_POS_FRAMES, frame as f64)?;
        self.next_frame = frame;
        Ok(())
    }

    /// The next frame, or `None` at the end of the video.
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut image = Mat::default();
        let grabbed = self.capture.read(&mut image)?;
        if !grabbed || image.empty() {
            debug!("End of video after {} frames", self.next_frame);
            return Ok(None);
        }
        self.next_frame += 1;
        Ok(Some(image))
    }

    /// Frame number `frame`, reading forward when it is ahead and seeking
    /// otherwise.
    pub fn frame_at(&mut self, frame: u64) -> Result<Option<Mat>> {
        if frame < self.next_frame {
            self.seek(frame)?;
        }
        while self.next_frame < frame {
            if self.read_frame()?.is_none() {
                return Ok(None);
            }
        }
        self.read_frame()
    }
}

/// MP4 writer matching the input's frame rate and size.
pub fn open_writer(path: &str, fps: f64, size: Size) -> Result<VideoWriter> {
    Ok(VideoWriter::new(
        path,
        VideoWriter::fourcc('m', 'p', '4', 'v')?,
        fps,
        size,
        true,
    )?)
}

pub fn write_frame(writer: &mut VideoWriter, frame: &Mat) -> Result<()> {
    writer.write(frame)?;
    Ok(())
}
