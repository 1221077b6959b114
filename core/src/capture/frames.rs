use crate::detection::Frame;
use crate::prelude::{PipelineError, PipelineResult};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Ordered frames of one segment. Dropping the stream releases every
/// resource held for decoding.
pub type Frames = Box<dyn Iterator<Item = PipelineResult<Frame>>>;

/// Turns a video file into a frame stream.
pub trait FrameDecoder {
    fn open(&mut self, video: &Path) -> PipelineResult<Frames>;
}

/// Extracts frames with `ffmpeg` into a scoped temporary directory.
pub struct FfmpegDecoder {
    program: String,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn open(&mut self, video: &Path) -> PipelineResult<Frames> {
        if !video.is_file() {
            return Err(PipelineError::EmptySegment(format!(
                "cannot open {}",
                video.display()
            )));
        }

        let workdir = tempfile::Builder::new()
            .prefix("aviguard-frames")
            .tempdir()
            .map_err(|err| PipelineError::EmptySegment(format!("frame workdir: {}", err)))?;

        let output = Command::new(&self.program)
            .args(["-nostdin", "-loglevel", "error", "-i"])
            .arg(video)
            .arg(workdir.path().join("%06d.png"))
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                PipelineError::EmptySegment(format!("spawning {}: {}", self.program, err))
            })?;
        if !output.status.success() {
            return Err(PipelineError::EmptySegment(format!(
                "decoding {} failed with {}: {}",
                video.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let frames = ExtractedFrames::scan(workdir)?;
        debug!("{} frame(s) extracted from {}", frames.len(), video.display());
        Ok(Box::new(frames))
    }
}

/// Frames already extracted into a directory, named so that lexical order
/// is playback order.
pub struct ExtractedFrames {
    paths: std::vec::IntoIter<PathBuf>,
    _workdir: TempDir,
}

impl ExtractedFrames {
    pub fn scan(workdir: TempDir) -> PipelineResult<Self> {
        let entries = fs::read_dir(workdir.path())
            .map_err(|err| PipelineError::EmptySegment(format!("listing frames: {}", err)))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "png"))
            .collect();
        paths.sort();
        Ok(Self {
            paths: paths.into_iter(),
            _workdir: workdir,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.len() == 0
    }
}

impl Iterator for ExtractedFrames {
    type Item = PipelineResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(
            image::open(&path)
                .map(|decoded| Frame {
                    image: decoded.to_rgb8(),
                    source: Some(path.clone()),
                })
                .map_err(|err| {
                    PipelineError::EmptySegment(format!("decoding {}: {}", path.display(), err))
                }),
        )
    }
}
