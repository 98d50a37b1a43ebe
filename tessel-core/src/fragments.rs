//! Rasterizer output: per-pixel, per-face fragment data for one batch.
//!
//! All per-slot arrays are flat, row-major over `(N, H, W, K)`:
//! batch image, pixel row, pixel column, and the K closest faces at that
//! pixel (nearest first).  A `FragmentBuffer` is built once per render
//! call through [`FragmentBuilder`] and is read-only afterwards.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::settings::RasterSettings;

/// Canonical "no face" value in `pix_to_face`.  Any negative id is
/// treated as empty.
pub const NO_FACE: i64 = -1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FragmentError {
    #[error("{field} has {got} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Raster settings disagree with buffer shape: {0}")]
    SettingsMismatch(String),
    #[error("Slot ({n}, {y}, {x}, {k}) is outside buffer shape {shape:?}")]
    SlotOutOfBounds {
        n: usize,
        y: usize,
        x: usize,
        k: usize,
        shape: FragmentShape,
    },
}

// ───────────────────────────────────────────────────────────────────
// Barycentric coordinates
// ───────────────────────────────────────────────────────────────────

/// Three barycentric weights of a pixel with respect to a face.
///
/// Weights always sum to 1; with blur enabled individual weights may
/// leave `[0, 1]`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BaryCoords(pub [f32; 3]);

impl BaryCoords {
    pub const CENTROID: Self = Self([1.0 / 3.0; 3]);

    /// Weights for the face's first, second and third vertex.
    pub fn new(w0: f32, w1: f32, w2: f32) -> Self {
        Self([w0, w1, w2])
    }

    /// Sum of the three weights; `1` for hard rasterization.
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Every weight lies in `[-eps, 1 + eps]`.
    pub fn is_within_unit(&self, eps: f32) -> bool {
        self.0.iter().all(|&w| (-eps..=1.0 + eps).contains(&w))
    }
}

// ───────────────────────────────────────────────────────────────────
// Shape
// ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentShape {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub faces_per_pixel: usize,
}

impl FragmentShape {
    /// Shape of a batch of `batch` images, each `height` x `width` with `faces_per_pixel` slots.
    pub fn new(batch: usize, height: usize, width: usize, faces_per_pixel: usize) -> Self {
        Self {
            batch,
            height,
            width,
            faces_per_pixel,
        }
    }

    /// Shape for `batch` images rendered with `settings`.
    pub fn for_settings(batch: usize, settings: &RasterSettings) -> Self {
        let (height, width) = settings.image_size;
        Self::new(batch, height as usize, width as usize, settings.faces_per_pixel as usize)
    }

    /// Total number of slots.
    pub fn len(&self) -> usize {
        self.batch * self.slots_per_image()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `height * width`.
    pub fn pixels_per_image(&self) -> usize {
        self.height * self.width
    }

    /// `height * width * faces_per_pixel`.
    pub fn slots_per_image(&self) -> usize {
        self.pixels_per_image() * self.faces_per_pixel
    }

    /// Flat slot index of `(n, y, x, k)`, or `None` if outside the buffer.
    pub fn index(&self, n: usize, y: usize, x: usize, k: usize) -> Option<usize> {
        if n >= self.batch || y >= self.height || x >= self.width || k >= self.faces_per_pixel {
            return None;
        }
        Some(((n * self.height + y) * self.width + x) * self.faces_per_pixel + k)
    }

    /// Inverse of [`Self::index`]: `(n, y, x, k)`.
    pub fn unravel(&self, slot: usize) -> (usize, usize, usize, usize) {
        let k = slot % self.faces_per_pixel;
        let pixel = slot / self.faces_per_pixel;
        let x = pixel % self.width;
        let row = pixel / self.width;
        (row / self.height, row % self.height, x, k)
    }
}

// ───────────────────────────────────────────────────────────────────
// FragmentBuffer
// ───────────────────────────────────────────────────────────────────

/// One fragment slot, as written by a rasterizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub face: i64,
    pub bary: BaryCoords,
    pub zbuf: f32,
    pub dist: f32,
}

impl Fragment {
    pub const EMPTY: Self = Self {
        face: NO_FACE,
        bary: BaryCoords([-1.0; 3]),
        zbuf: -1.0,
        dist: -1.0,
    };

    /// A covered slot.  A `face` beyond `i64::MAX` saturates, so it reads
    /// as out of range downstream instead of as an empty slot.
    pub fn new(face: usize, bary: BaryCoords, zbuf: f32) -> Self {
        Self {
            face: i64::try_from(face).unwrap_or(i64::MAX),
            bary,
            zbuf,
            dist: 0.0,
        }
    }

    /// Set the signed distance to the face edge.
    pub fn with_dist(mut self, dist: f32) -> Self {
        self.dist = dist;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentBuffer {
    shape: FragmentShape,
    pix_to_face: Vec<i64>,
    bary_coords: Vec<BaryCoords>,
    zbuf: Vec<f32>,
    dists: Vec<f32>,
    settings: RasterSettings,
}

impl FragmentBuffer {
    /// Assemble from raw arrays; every array must hold `shape.len()`
    /// entries and `settings` must describe `shape`.
    pub fn new(
        shape: FragmentShape,
        pix_to_face: Vec<i64>,
        bary_coords: Vec<BaryCoords>,
        zbuf: Vec<f32>,
        dists: Vec<f32>,
        settings: RasterSettings,
    ) -> Result<Self, FragmentError> {
        let expected = shape.len();
        for (field, got) in [
            ("pix_to_face", pix_to_face.len()),
            ("bary_coords", bary_coords.len()),
            ("zbuf", zbuf.len()),
            ("dists", dists.len()),
        ] {
            if got != expected {
                return Err(FragmentError::LengthMismatch { field, expected, got });
            }
        }

        let (height, width) = settings.image_size;
        if (height as usize, width as usize) != (shape.height, shape.width) {
            return Err(FragmentError::SettingsMismatch(format!(
                "image_size {height}x{width} vs buffer {}x{}",
                shape.height, shape.width
            )));
        }
        if settings.faces_per_pixel as usize != shape.faces_per_pixel {
            return Err(FragmentError::SettingsMismatch(format!(
                "faces_per_pixel {} vs buffer K={}",
                settings.faces_per_pixel, shape.faces_per_pixel
            )));
        }

        Ok(Self {
            shape,
            pix_to_face,
            bary_coords,
            zbuf,
            dists,
            settings,
        })
    }

    /// Shape `(N, H, W, K)` of every per-slot array.
    pub fn shape(&self) -> FragmentShape {
        self.shape
    }

    /// Packed face id per slot; negative where the slot is empty.
    pub fn pix_to_face(&self) -> &[i64] {
        &self.pix_to_face
    }

    /// Barycentric weights per slot.
    pub fn bary_coords(&self) -> &[BaryCoords] {
        &self.bary_coords
    }

    /// Depth per slot; `-1` where empty.
    pub fn zbuf(&self) -> &[f32] {
        &self.zbuf
    }

    /// Signed distance to the face edge per slot.
    pub fn dists(&self) -> &[f32] {
        &self.dists
    }

    /// The settings the rasterizer ran with, including the clip flag.
    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    /// Everything stored at one slot.
    pub fn fragment(&self, n: usize, y: usize, x: usize, k: usize) -> Option<Fragment> {
        let i = self.shape.index(n, y, x, k)?;
        Some(Fragment {
            face: self.pix_to_face[i],
            bary: self.bary_coords[i],
            zbuf: self.zbuf[i],
            dist: self.dists[i],
        })
    }

    /// Packed face id at a slot, `None` for empty slots.
    pub fn face_at(&self, n: usize, y: usize, x: usize, k: usize) -> Option<usize> {
        let i = self.shape.index(n, y, x, k)?;
        usize::try_from(self.pix_to_face[i]).ok()
    }

    /// Depth of the nearest face per pixel, `(N, H, W)`; `-1` where the
    /// pixel is empty.
    pub fn depth_map(&self) -> Vec<f32> {
        self.zbuf
            .chunks_exact(self.shape.faces_per_pixel.max(1))
            .zip(self.pix_to_face.chunks_exact(self.shape.faces_per_pixel.max(1)))
            .map(|(z, faces)| if faces[0] >= 0 { z[0] } else { -1.0 })
            .collect()
    }

    /// Number of slots that hold a face.
    pub fn covered_slots(&self) -> usize {
        self.pix_to_face.iter().filter(|&&f| f >= 0).count()
    }

    /// Depth buffer as raw bytes.
    pub fn zbuf_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.zbuf)
    }

    /// Barycentric weights as raw bytes.
    pub fn bary_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bary_coords)
    }
}

// ───────────────────────────────────────────────────────────────────
// Builder
// ───────────────────────────────────────────────────────────────────

/// Mutable staging area for rasterizers; every slot starts empty.
pub struct FragmentBuilder {
    shape: FragmentShape,
    pix_to_face: Vec<i64>,
    bary_coords: Vec<BaryCoords>,
    zbuf: Vec<f32>,
    dists: Vec<f32>,
    settings: RasterSettings,
}

impl FragmentBuilder {
    /// Start a buffer of `batch` images with every slot empty, sized from `settings`.
    pub fn new(batch: usize, settings: RasterSettings) -> Self {
        let shape = FragmentShape::for_settings(batch, &settings);
        let len = shape.len();
        let empty = Fragment::EMPTY;

        Self {
            shape,
            pix_to_face: vec![empty.face; len],
            bary_coords: vec![empty.bary; len],
            zbuf: vec![empty.zbuf; len],
            dists: vec![empty.dist; len],
            settings,
        }
    }

    /// Shape of the buffer being built.
    pub fn shape(&self) -> FragmentShape {
        self.shape
    }

    /// Overwrite slot `(n, y, x, k)`.
    pub fn set(
        &mut self,
        n: usize,
        y: usize,
        x: usize,
        k: usize,
        fragment: Fragment,
    ) -> Result<&mut Self, FragmentError> {
        let i = self.shape.index(n, y, x, k).ok_or(FragmentError::SlotOutOfBounds {
            n,
            y,
            x,
            k,
            shape: self.shape,
        })?;

        self.pix_to_face[i] = fragment.face;
        self.bary_coords[i] = fragment.bary;
        self.zbuf[i] = fragment.zbuf;
        self.dists[i] = fragment.dist;
        Ok(self)
    }

    /// Finish, validating the arrays against the settings.
    pub fn build(self) -> Result<FragmentBuffer, FragmentError> {
        FragmentBuffer::new(
            self.shape,
            self.pix_to_face,
            self.bary_coords,
            self.zbuf,
            self.dists,
            self.settings,
        )
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(h: u32, w: u32, k: u32) -> RasterSettings {
        RasterSettings::default()
            .with_image_size(h, w)
            .with_faces_per_pixel(k)
    }

    #[test]
    fn test_bary_coords_size() {
        assert_eq!(std::mem::size_of::<BaryCoords>(), 12);
    }

    #[test]
    fn test_bary_within_unit() {
        assert!(BaryCoords::CENTROID.is_within_unit(0.0));
        assert!(BaryCoords::new(1.0, 0.0, 0.0).is_within_unit(0.0));
        assert!(BaryCoords::new(1.0 + 1e-7, -1e-7, 0.0).is_within_unit(1e-5));
        assert!(!BaryCoords::new(1.2, -0.3, 0.1).is_within_unit(1e-5));
    }

    #[test]
    fn test_shape_index_roundtrip_corners() {
        let shape = FragmentShape::new(2, 3, 4, 2);
        assert_eq!(shape.len(), 48);
        assert_eq!(shape.index(0, 0, 0, 0), Some(0));
        assert_eq!(shape.index(1, 2, 3, 1), Some(47));
        assert_eq!(shape.unravel(47), (1, 2, 3, 1));
        assert_eq!(shape.unravel(shape.index(1, 0, 2, 1).unwrap()), (1, 0, 2, 1));
        assert_eq!(shape.index(2, 0, 0, 0), None);
        assert_eq!(shape.index(0, 0, 0, 2), None);
    }

    #[test]
    fn test_builder_starts_empty() {
        let buffer = FragmentBuilder::new(2, settings(4, 4, 1)).build().unwrap();
        assert_eq!(buffer.covered_slots(), 0);
        assert!(buffer.pix_to_face().iter().all(|&f| f == NO_FACE));
        assert_eq!(buffer.face_at(1, 3, 3, 0), None);
    }

    #[test]
    fn test_builder_set_and_read_back() {
        let mut builder = FragmentBuilder::new(1, settings(2, 2, 2));
        builder
            .set(0, 1, 0, 0, Fragment::new(5, BaryCoords::CENTROID, 0.25))
            .unwrap()
            .set(0, 1, 0, 1, Fragment::new(7, BaryCoords::new(1.0, 0.0, 0.0), 0.75).with_dist(0.1))
            .unwrap();
        let buffer = builder.build().unwrap();

        assert_eq!(buffer.face_at(0, 1, 0, 0), Some(5));
        assert_eq!(buffer.face_at(0, 1, 0, 1), Some(7));
        let second = buffer.fragment(0, 1, 0, 1).unwrap();
        assert!((second.dist - 0.1).abs() < f32::EPSILON);
        assert_eq!(buffer.covered_slots(), 2);
    }

    #[test]
    fn test_fragment_new_saturates_face_id() {
        assert_eq!(Fragment::new(7, BaryCoords::CENTROID, 0.5).face, 7);

        let huge = Fragment::new(usize::MAX, BaryCoords::CENTROID, 0.5);
        assert_eq!(huge.face, i64::MAX);

        let mut builder = FragmentBuilder::new(1, settings(1, 1, 1));
        builder.set(0, 0, 0, 0, huge).unwrap();
        let buffer = builder.build().unwrap();
        assert_eq!(buffer.covered_slots(), 1);
        assert_eq!(buffer.face_at(0, 0, 0, 0), Some(i64::MAX as usize));
    }

    #[test]
    fn test_builder_rejects_out_of_bounds() {
        let mut builder = FragmentBuilder::new(1, settings(2, 2, 1));
        let err = builder
            .set(0, 2, 0, 0, Fragment::new(0, BaryCoords::CENTROID, 0.0))
            .err();
        assert!(matches!(err, Some(FragmentError::SlotOutOfBounds { y: 2, .. })));
    }

    #[test]
    fn test_depth_map_uses_nearest_face() {
        let mut builder = FragmentBuilder::new(1, settings(1, 2, 2));
        builder
            .set(0, 0, 0, 0, Fragment::new(0, BaryCoords::CENTROID, 0.5))
            .unwrap()
            .set(0, 0, 0, 1, Fragment::new(1, BaryCoords::CENTROID, 0.9))
            .unwrap();
        let buffer = builder.build().unwrap();

        assert_eq!(buffer.depth_map(), vec![0.5, -1.0]);
    }

    #[test]
    fn test_new_checks_lengths_and_settings() {
        let shape = FragmentShape::new(1, 1, 2, 1);
        let err = FragmentBuffer::new(
            shape,
            vec![NO_FACE; 2],
            vec![BaryCoords::default(); 1],
            vec![0.0; 2],
            vec![0.0; 2],
            settings(1, 2, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FragmentError::LengthMismatch { field: "bary_coords", expected: 2, got: 1 }
        );

        let err = FragmentBuffer::new(
            shape,
            vec![NO_FACE; 2],
            vec![BaryCoords::default(); 2],
            vec![0.0; 2],
            vec![0.0; 2],
            settings(1, 2, 3),
        )
        .unwrap_err();
        assert!(matches!(err, FragmentError::SettingsMismatch(_)));
    }

    #[test]
    fn test_byte_views() {
        let buffer = FragmentBuilder::new(1, settings(2, 3, 1)).build().unwrap();
        assert_eq!(buffer.zbuf_bytes().len(), 6 * 4);
        assert_eq!(buffer.bary_bytes().len(), 6 * 12);
    }
}
