use crate::prelude::{PipelineError, PipelineResult};
use std::fs::{self, File};
use std::io::{self, Seek};
use std::path::Path;

pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";
pub const DEFAULT_VIDEO_TYPE: &str = "video/mp4";

/// Best-effort content type from the file extension.
pub fn content_type_for<'a>(path: &Path, fallback: &'a str) -> &'a str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("h264") => "video/h264",
        _ => fallback,
    }
}

/// One open evidence file plus the part headers derived from its path.
#[derive(Debug)]
pub struct EvidencePart {
    file: File,
    pub file_name: String,
    pub content_type: String,
    pub len: u64,
}

impl EvidencePart {
    /// Fails with `MissingEvidence` unless `path` is a non-empty regular file.
    pub fn open(path: &Path, fallback_type: &str) -> PipelineResult<Self> {
        let metadata = fs::metadata(path).map_err(|err| {
            PipelineError::MissingEvidence(format!("{}: {}", path.display(), err))
        })?;
        if !metadata.is_file() {
            return Err(PipelineError::MissingEvidence(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(PipelineError::MissingEvidence(format!(
                "{} is empty",
                path.display()
            )));
        }
        let file = File::open(path).map_err(|err| {
            PipelineError::MissingEvidence(format!("{}: {}", path.display(), err))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "evidence".to_string());

        Ok(Self {
            file,
            file_name,
            content_type: content_type_for(path, fallback_type).to_string(),
            len: metadata.len(),
        })
    }

    /// Handle sharing this part's read position.
    pub fn reader(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.file.rewind()
    }
}

/// The two files of one upload, opened once per upload call and closed when
/// dropped.
#[derive(Debug)]
pub struct EvidenceFiles {
    pub media: EvidencePart,
    pub video: EvidencePart,
}

impl EvidenceFiles {
    pub fn open(media: &Path, video: &Path) -> PipelineResult<Self> {
        let media = EvidencePart::open(media, DEFAULT_IMAGE_TYPE)?;
        let video = EvidencePart::open(video, DEFAULT_VIDEO_TYPE)?;
        Ok(Self { media, video })
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.media.rewind()?;
        self.video.rewind()
    }
}
