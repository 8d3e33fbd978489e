use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, SourceInfo};

/// Adapts a directory of image files to the [`FrameSource`] interface.
///
/// Files are streamed in lexicographic order; with `looping` enabled the
/// sequence restarts at the end, which makes a finite directory behave
/// like a live camera for long-running sessions. Reported dimensions come
/// from the first image; later frames may differ and carry their own.
pub struct ImageSequenceSource {
    dir: PathBuf,
    looping: bool,
    paths: Vec<PathBuf>,
    position: usize,
    frame_index: usize,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path, looping: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            looping,
            paths: Vec::new(),
            position: 0,
            frame_index: 0,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn decode(path: &Path) -> Result<(Vec<u8>, u32, u32), Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("cannot decode {}: {e}", path.display()))?
        .to_rgb8();
    let (w, h) = (img.width(), img.height());
    Ok((img.into_raw(), w, h))
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| format!("cannot open source directory {}: {e}", self.dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(format!("no image frames found in {}", self.dir.display()).into());
        }

        let (_, width, height) = decode(&paths[0])?;
        self.paths = paths;
        self.position = 0;
        self.frame_index = 0;
        Ok(SourceInfo { width, height })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.paths.is_empty() {
            return Err("source not opened".into());
        }
        if self.position >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = self.paths[self.position].clone();
        self.position += 1;
        let index = self.frame_index;
        self.frame_index += 1;

        let (data, width, height) = decode(&path)?;
        Ok(Some(Frame::new(data, width, height, 3, index)))
    }

    fn close(&mut self) {
        self.paths.clear();
        self.position = 0;
    }
}
