//! PNG export of rendered frames

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::render::RasterSurface;

/// Errors that can occur during export
#[derive(Debug)]
pub enum ExportError {
    /// Zero width or height
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel buffer length does not match the dimensions
    BufferMismatch { expected: usize, actual: usize },
    /// Output directory could not be created
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    /// PNG encoding or file write failed
    Encode {
        path: PathBuf,
        error: image::ImageError,
    },
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {}x{}", width, height)
            }
            ExportError::BufferMismatch { expected, actual } => {
                write!(f, "Pixel buffer has {} bytes, expected {}", actual, expected)
            }
            ExportError::Io { path, error } => {
                write!(f, "Failed to prepare '{}': {}", path.display(), error)
            }
            ExportError::Encode { path, error } => {
                write!(f, "Failed to write '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io { error, .. } => Some(error),
            ExportError::Encode { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Write raw RGBA pixels (row-major, 4 bytes per pixel) to a PNG file.
pub fn export_frame<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<(), ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(ExportError::BufferMismatch {
            expected,
            actual: data.len(),
        });
    }

    let image = RgbaImage::from_raw(width, height, data.to_vec()).ok_or(
        ExportError::BufferMismatch {
            expected,
            actual: data.len(),
        },
    )?;
    save_image(path.as_ref(), &image)
}

/// Write a raster surface to a PNG file.
pub fn export_surface<P: AsRef<Path>>(path: P, surface: &RasterSurface) -> Result<(), ExportError> {
    let image = surface.image();
    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        });
    }
    save_image(path.as_ref(), image)
}

fn save_image(path: &Path, image: &RgbaImage) -> Result<(), ExportError> {
    image.save(path).map_err(|error| ExportError::Encode {
        path: path.to_path_buf(),
        error,
    })
}

/// Numbered PNG frames (`frame_00000.png`, `frame_00001.png`, ...) in one
/// directory. The directory is created on the first write.
#[derive(Debug)]
pub struct FrameSequence {
    dir: PathBuf,
    next_index: u32,
    created: bool,
}

impl FrameSequence {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            next_index: 0,
            created: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far.
    pub fn len(&self) -> u32 {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn path_for(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", index))
    }

    /// Write the next frame and return its path.
    pub fn push(&mut self, surface: &RasterSurface) -> Result<PathBuf, ExportError> {
        if !self.created {
            fs::create_dir_all(&self.dir).map_err(|error| ExportError::Io {
                path: self.dir.clone(),
                error,
            })?;
            self.created = true;
        }

        let path = self.path_for(self.next_index);
        export_surface(&path, surface)?;
        self.next_index += 1;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Surface;
    use crate::theme::Color;

    #[test]
    fn test_export_frame() {
        let data: Vec<u8> = [0u8, 128, 255, 255].iter().cycle().take(3 * 2 * 4).copied().collect();
        let path = std::env::temp_dir().join("bubble_pop_export_frame.png");
        export_frame(&path, 3, 2, &data).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(2, 1).0, [0, 128, 255, 255]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = export_frame(std::env::temp_dir().join("unused.png"), 0, 100, &[]);
        assert!(matches!(result, Err(ExportError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_wrong_data_length() {
        let result = export_frame(std::env::temp_dir().join("unused.png"), 10, 10, &[0u8; 100]);
        assert!(matches!(
            result,
            Err(ExportError::BufferMismatch {
                expected: 400,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_frame_sequence_numbering() {
        let dir = std::env::temp_dir().join("bubble_pop_frame_sequence");
        let _ = fs::remove_dir_all(&dir);

        let mut surface = RasterSurface::new(4, 4);
        surface.clear(Color::WHITE);
        let mut frames = FrameSequence::new(&dir);
        assert!(frames.is_empty());

        let first = frames.push(&surface).unwrap();
        let second = frames.push(&surface).unwrap();
        assert!(first.ends_with("frame_00000.png"));
        assert!(second.ends_with("frame_00001.png"));
        assert!(second.is_file());
        assert_eq!(frames.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
