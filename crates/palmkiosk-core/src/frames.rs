use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{AppError, AppResult};

/// Supplies encoded frames on demand. `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> AppResult<Option<Vec<u8>>>;
}

/// Replays the `*.png` files of a directory in file-name order.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl DirectoryFrameSource {
    pub fn open(dir: &Path) -> AppResult<Self> {
        let entries = fs::read_dir(dir).map_err(|source| AppError::FrameRead {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AppError::FrameRead {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if is_png && path.is_file() {
                frames.push(path);
            }
        }
        frames.sort();
        debug!(dir = %dir.display(), frames = frames.len(), "opened frame directory");

        Ok(Self {
            dir: dir.to_path_buf(),
            pending: frames.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> AppResult<Option<Vec<u8>>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        read_image_file(&path).map(Some)
    }
}

impl FrameSource for VecDeque<Vec<u8>> {
    fn next_frame(&mut self) -> AppResult<Option<Vec<u8>>> {
        Ok(self.pop_front())
    }
}

/// Reads a probe or frame from disk; an unreadable file is a capture failure.
pub fn read_image_file(path: &Path) -> AppResult<Vec<u8>> {
    fs::read(path).map_err(|err| {
        AppError::CaptureFailure(format!("cannot read image {}: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_source_yields_png_files_in_name_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.png"), b"second").unwrap();
        fs::write(tmp.path().join("a.PNG"), b"first").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"skip").unwrap();
        fs::create_dir(tmp.path().join("c.png")).unwrap();

        let mut source = DirectoryFrameSource::open(tmp.path()).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_frame().unwrap().unwrap(), b"first");
        assert_eq!(source.next_frame().unwrap().unwrap(), b"second");
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn missing_directory_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = DirectoryFrameSource::open(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, AppError::FrameRead { .. }));
    }

    #[test]
    fn unreadable_probe_is_a_capture_failure() {
        let tmp = TempDir::new().unwrap();
        let err = read_image_file(&tmp.path().join("probe.png")).unwrap_err();
        assert!(matches!(err, AppError::CaptureFailure(_)));
    }
}
