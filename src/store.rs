//! Numbered frame files on disk.
//!
//! Every rendered frame can be written to a working directory as
//! `000.jpg`, `001.jpg`, …, one file per angle-index. The store is write-only
//! as far as the pipeline is concerned: assembly always works from the
//! in-memory frames, never from a directory listing, so file-system
//! enumeration order cannot reorder the animation.
//!
//! ```text
//! frames/
//! ├── 000.jpg
//! ├── 001.jpg
//! ├── ...
//! └── 359.jpg
//! ```

use crate::types::Frame;
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Minimum digit count in frame file names.
const MIN_INDEX_WIDTH: usize = 3;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write frame {angle_index} to {path}: {source}")]
    Write {
        angle_index: u32,
        path: PathBuf,
        source: image::ImageError,
    },
}

/// File format of persisted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    #[serde(alias = "jpeg")]
    Jpg,
    Png,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

/// Number of digits needed so lexical order matches angle order.
pub fn index_width(total: u32) -> usize {
    let largest = total.saturating_sub(1);
    largest.to_string().len().max(MIN_INDEX_WIDTH)
}

/// A directory holding one file per rendered frame.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
    format: FrameFormat,
    width: usize,
}

impl FrameStore {
    /// Create (if needed) a store for a sweep of `total` angles.
    pub fn create(
        dir: impl Into<PathBuf>,
        format: FrameFormat,
        total: u32,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format,
            width: index_width(total),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_path(&self, angle_index: u32) -> PathBuf {
        self.dir.join(format!(
            "{:0width$}.{}",
            angle_index,
            self.format.extension(),
            width = self.width
        ))
    }

    /// Write one frame to its numbered file.
    ///
    /// Safe to call from several threads at once; each angle-index owns its
    /// own file.
    pub fn persist_frame(&self, frame: &Frame) -> Result<PathBuf, StoreError> {
        let path = self.frame_path(frame.angle_index);
        self.write_image(&frame.image, &path)
            .map_err(|source| StoreError::Write {
                angle_index: frame.angle_index,
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Write every frame in parallel. Paths come back in the input order.
    pub fn persist(&self, frames: &[Frame]) -> Result<Vec<PathBuf>, StoreError> {
        frames
            .par_iter()
            .map(|frame| self.persist_frame(frame))
            .collect()
    }

    fn write_image(&self, image: &DynamicImage, path: &Path) -> image::ImageResult<()> {
        match self.format {
            // JPEG has no alpha channel
            FrameFormat::Jpg if image.color().has_alpha() => DynamicImage::ImageRgb8(image.to_rgb8())
                .save_with_format(path, self.format.image_format()),
            _ => image.save_with_format(path, self.format.image_format()),
        }
    }

    /// Remove everything inside the directory, leaving the directory itself.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{frames_with_size, gradient_rgba};
    use tempfile::TempDir;

    #[test]
    fn index_width_has_minimum_of_three() {
        assert_eq!(index_width(1), 3);
        assert_eq!(index_width(360), 3);
        assert_eq!(index_width(1000), 3);
        assert_eq!(index_width(1001), 4);
        assert_eq!(index_width(0), 3);
    }

    #[test]
    fn frame_paths_are_zero_padded() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Jpg, 360).unwrap();
        assert_eq!(store.frame_path(7), tmp.path().join("007.jpg"));
        assert_eq!(store.frame_path(359), tmp.path().join("359.jpg"));

        let wide = FrameStore::create(tmp.path(), FrameFormat::Png, 2000).unwrap();
        assert_eq!(wide.frame_path(42), tmp.path().join("0042.png"));
    }

    #[test]
    fn create_makes_missing_directories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/frames");
        FrameStore::create(&dir, FrameFormat::Jpg, 10).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn persist_writes_one_file_per_frame() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Png, 16).unwrap();
        let frames = frames_with_size([0, 5, 11], 8, 6);

        let paths = store.persist(&frames).unwrap();
        assert_eq!(paths, vec![
            tmp.path().join("000.png"),
            tmp.path().join("005.png"),
            tmp.path().join("011.png"),
        ]);
        for path in &paths {
            let img = image::open(path).unwrap();
            assert_eq!((img.width(), img.height()), (8, 6));
        }
    }

    #[test]
    fn persist_frame_writes_numbered_file() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Jpg, 360).unwrap();
        let frames = frames_with_size([42], 6, 4);

        let path = store.persist_frame(&frames[0]).unwrap();
        assert_eq!(path, tmp.path().join("042.jpg"));
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (6, 4));
    }

    #[test]
    fn write_failure_names_the_frame() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Png, 8).unwrap();
        // A directory where the file should go makes the write fail
        std::fs::create_dir(tmp.path().join("003.png")).unwrap();

        let err = store.persist_frame(&frames_with_size([3], 2, 2)[0]).unwrap_err();
        assert!(matches!(err, StoreError::Write { angle_index: 3, .. }));
    }

    #[test]
    fn jpeg_frames_drop_alpha() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Jpg, 4).unwrap();
        let mut frames = frames_with_size([1], 8, 8);
        frames[0].image = DynamicImage::ImageRgba8(gradient_rgba(8, 8));

        let paths = store.persist(&frames).unwrap();
        let img = image::open(&paths[0]).unwrap();
        assert!(!img.color().has_alpha());
    }

    #[test]
    fn clear_removes_files_and_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::create(tmp.path(), FrameFormat::Png, 4).unwrap();
        store.persist(&frames_with_size([0, 1], 4, 4)).unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/file.txt"), "x").unwrap();

        assert_eq!(store.clear().unwrap(), 3);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert!(tmp.path().is_dir());
    }

    #[test]
    fn frame_format_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: FrameFormat,
        }
        let w: Wrapper = toml::from_str("format = \"png\"").unwrap();
        assert_eq!(w.format, FrameFormat::Png);
        let w: Wrapper = toml::from_str("format = \"jpeg\"").unwrap();
        assert_eq!(w.format, FrameFormat::Jpg);
    }
}
