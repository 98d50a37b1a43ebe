//! Shaded output: one fixed-size RGBA image per mesh in the batch.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image {height}x{width} needs {expected} pixels, got {got}")]
    PixelCount {
        height: usize,
        width: usize,
        expected: usize,
        got: usize,
    },
    #[error("Image {index} is {got:?}, but the batch is {expected:?} (height, width)")]
    SizeMismatch {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
}

/// Row-major RGBA image, channels in `[0.0, 1.0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    height: usize,
    width: usize,
    pixels: Vec<[f32; 4]>,
}

impl Image {
    /// Transparent black.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            pixels: vec![[0.0; 4]; height * width],
        }
    }

    /// Wrap row-major RGBA pixels; fails unless there are `height * width`.
    pub fn from_pixels(height: usize, width: usize, pixels: Vec<[f32; 4]>) -> Result<Self, ImageError> {
        let expected = height * width;
        if pixels.len() != expected {
            return Err(ImageError::PixelCount {
                height,
                width,
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self { height, width, pixels })
    }

    /// `(height, width)`.
    pub fn size(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Pixel at row `y`, column `x`.
    pub fn get(&self, y: usize, x: usize) -> Option<[f32; 4]> {
        if y >= self.height || x >= self.width {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Returns `false` when `(y, x)` is outside the image.
    pub fn set(&mut self, y: usize, x: usize, color: [f32; 4]) -> bool {
        if y >= self.height || x >= self.width {
            return false;
        }
        self.pixels[y * self.width + x] = color;
        true
    }

    /// Row-major RGBA pixels.
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Pixels as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageBatch {
    images: Vec<Image>,
}

impl ImageBatch {
    /// All images must share one size.
    pub fn new(images: Vec<Image>) -> Result<Self, ImageError> {
        if let Some(first) = images.first() {
            let expected = first.size();
            if let Some((index, image)) = images
                .iter()
                .enumerate()
                .find(|(_, image)| image.size() != expected)
            {
                return Err(ImageError::SizeMismatch {
                    index,
                    expected,
                    got: image.size(),
                });
            }
        }
        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `(height, width)` shared by every image; `None` for an empty batch.
    pub fn image_size(&self) -> Option<(usize, usize)> {
        self.images.first().map(Image::size)
    }

    /// Image for batch element `index`.
    pub fn get(&self, index: usize) -> Option<&Image> {
        self.images.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Image> {
        self.images.iter()
    }

    /// Consume the batch, returning its images.
    pub fn into_images(self) -> Vec<Image> {
        self.images
    }
}

// ===================================================================
// Tests
// ===================================================================
