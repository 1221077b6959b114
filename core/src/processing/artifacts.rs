use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Receives the annotated JPEG of every processed frame.
pub trait ArtifactSink {
    fn enabled(&self) -> bool {
        true
    }

    fn persist(&mut self, frame_index: usize, jpeg: &[u8]) -> io::Result<()>;
}

/// Discards artifacts; used when the audit trail is switched off.
pub struct NoArtifacts;

impl ArtifactSink for NoArtifacts {
    fn enabled(&self) -> bool {
        false
    }

    fn persist(&mut self, _frame_index: usize, _jpeg: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

pub fn frame_file_name(frame_index: usize) -> String {
    format!("frame_{:04}.jpg", frame_index)
}

/// Writes `frame_<index>.jpg` files into one directory.
pub struct FrameDirectory {
    dir: PathBuf,
}

impl FrameDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, frame_index: usize) -> PathBuf {
        self.dir.join(frame_file_name(frame_index))
    }

    pub fn write(&self, frame_index: usize, jpeg: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(frame_index);
        fs::write(&path, jpeg)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}

impl ArtifactSink for FrameDirectory {
    fn persist(&mut self, frame_index: usize, jpeg: &[u8]) -> io::Result<()> {
        self.write(frame_index, jpeg).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_0000.jpg");
        assert_eq!(frame_file_name(112), "frame_0112.jpg");
        assert_eq!(frame_file_name(12345), "frame_12345.jpg");
    }

    #[test]
    fn frame_directory_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FrameDirectory::new(dir.path());
        sink.persist(7, b"jpeg").unwrap();
        assert_eq!(fs::read(dir.path().join("frame_0007.jpg")).unwrap(), b"jpeg");
    }
}
