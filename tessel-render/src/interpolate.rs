//! Per-pixel interpolation of per-face vertex attributes.
//!
//! For every fragment slot covered by face `f` with barycentric weights
//! `(w0, w1, w2)` the output is
//!
//! ```text
//!  value = w0 * A[f][0] + w1 * A[f][1] + w2 * A[f][2]
//! ```
//!
//! Empty slots produce the zero vector.
//!
//! ## Clipping
//!
//! Blurred rasterization can report weights outside `[0, 1]` for pixels
//! just past a face's edge.  Interpolating with those weights extrapolates
//! beyond the face's vertex values (UVs outside the face's texture region,
//! depths in front of or behind the face).  The clip policy decides what
//! happens:
//!
//! | `clip_barycentric_coords` | behaviour                                         |
//! |---------------------------|---------------------------------------------------|
//! | `Some(true)`              | clamp to `[0, 1]`, renormalize, then interpolate  |
//! | `Some(false)`             | interpolate with the raw weights                  |
//! | `None`                    | out-of-range weights → `UnclippedBarycentrics`    |
//!
//! Slots are independent of each other: no ordering, no shared
//! accumulator.

use thiserror::Error;

use tessel_core::{BaryCoords, ClipPolicy, FragmentBuffer, FragmentShape, PerFaceAttribute};

/// Tolerance for deciding that a weight has left `[0, 1]`.  Hard
/// rasterization can land a hair outside from rounding alone.
pub const BARY_EPSILON: f32 = 1e-5;

/// Lower bound on the clamped weight sum when renormalizing.
pub const RENORM_MIN_SUM: f32 = 1e-5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolateError {
    #[error(
        "Face {face} at batch {batch}, pixel ({y}, {x}), slot {k} is outside the \
         {num_faces} per-face attributes (mesh batch and fragments do not match)"
    )]
    FaceOutOfRange {
        batch: usize,
        y: usize,
        x: usize,
        k: usize,
        face: i64,
        num_faces: usize,
    },
    #[error(
        "Barycentric weights {weights:?} at batch {batch}, pixel ({y}, {x}), slot {k} \
         fall outside [0, 1] but clip_barycentric_coords was never set"
    )]
    UnclippedBarycentrics {
        batch: usize,
        y: usize,
        x: usize,
        k: usize,
        weights: [f32; 3],
    },
}

impl InterpolateError {
    /// Batch image the offending slot belongs to.
    pub fn batch_index(&self) -> usize {
        match self {
            Self::FaceOutOfRange { batch, .. } | Self::UnclippedBarycentrics { batch, .. } => *batch,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Output
// ───────────────────────────────────────────────────────────────────

/// Interpolated values laid out like the fragment slots, `(N, H, W, K)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeMap<const D: usize> {
    shape: FragmentShape,
    values: Vec<[f32; D]>,
}

/// Per-pixel UV coordinates.
pub type PixelUvMap = AttributeMap<2>;

impl<const D: usize> AttributeMap<D> {
    /// Shape `(N, H, W, K)` of the map.
    pub fn shape(&self) -> FragmentShape {
        self.shape
    }

    /// Interpolated value at slot `(n, y, x, k)`.
    pub fn get(&self, n: usize, y: usize, x: usize, k: usize) -> Option<[f32; D]> {
        self.shape.index(n, y, x, k).map(|i| self.values[i])
    }

    /// Values in slot order.
    pub fn values(&self) -> &[[f32; D]] {
        &self.values
    }

    /// Consume the map, returning its values.
    pub fn into_values(self) -> Vec<[f32; D]> {
        self.values
    }
}

// ───────────────────────────────────────────────────────────────────
// Weights
// ───────────────────────────────────────────────────────────────────

/// Clamp each weight into `[0, 1]` and renormalize to sum to 1.
///
/// Idempotent: weights already inside the simplex come back unchanged
/// (up to rounding).
pub fn clip_barycentric_coords(bary: BaryCoords) -> BaryCoords {
    let clamped = bary.0.map(|w| w.clamp(0.0, 1.0));
    let sum = (clamped[0] + clamped[1] + clamped[2]).max(RENORM_MIN_SUM);
    BaryCoords(clamped.map(|w| w / sum))
}

/// `w0 * v0 + w1 * v1 + w2 * v2`, component-wise.
pub fn weighted_sum<const D: usize>(bary: BaryCoords, verts: &[[f32; D]; 3]) -> [f32; D] {
    let [w0, w1, w2] = bary.0;
    std::array::from_fn(|d| w0 * verts[0][d] + w1 * verts[1][d] + w2 * verts[2][d])
}

// ───────────────────────────────────────────────────────────────────
// Interpolation
// ───────────────────────────────────────────────────────────────────

/// Interpolate `attributes` at every fragment slot, using the clip flag
/// the fragments were rasterized with.
pub fn interpolate_face_attributes<const D: usize>(
    fragments: &FragmentBuffer,
    attributes: &PerFaceAttribute<D>,
) -> Result<AttributeMap<D>, InterpolateError> {
    interpolate_with_policy(fragments, attributes, fragments.settings().clip_policy())
}

/// Same as [`interpolate_face_attributes`] with an explicit policy.
pub fn interpolate_with_policy<const D: usize>(
    fragments: &FragmentBuffer,
    attributes: &PerFaceAttribute<D>,
    policy: ClipPolicy,
) -> Result<AttributeMap<D>, InterpolateError> {
    let shape = fragments.shape();

    let values = fragments
        .pix_to_face()
        .iter()
        .zip(fragments.bary_coords())
        .enumerate()
        .map(|(slot, (&face, &bary))| interpolate_slot(shape, slot, face, bary, attributes, policy))
        .collect::<Result<Vec<_>, _>>()?;

    log::trace!(
        "Interpolated {}-D attribute over {} slots ({:?})",
        D,
        values.len(),
        policy
    );

    Ok(AttributeMap { shape, values })
}

fn interpolate_slot<const D: usize>(
    shape: FragmentShape,
    slot: usize,
    face: i64,
    bary: BaryCoords,
    attributes: &PerFaceAttribute<D>,
    policy: ClipPolicy,
) -> Result<[f32; D], InterpolateError> {
    if face < 0 {
        return Ok([0.0; D]);
    }

    let verts = usize::try_from(face)
        .ok()
        .and_then(|f| attributes.get(f))
        .ok_or_else(|| {
            let (batch, y, x, k) = shape.unravel(slot);
            InterpolateError::FaceOutOfRange {
                batch,
                y,
                x,
                k,
                face,
                num_faces: attributes.len(),
            }
        })?;

    let weights = match policy {
        ClipPolicy::Clip => clip_barycentric_coords(bary),
        ClipPolicy::Raw => bary,
        ClipPolicy::Unset => {
            if !bary.is_within_unit(BARY_EPSILON) {
                let (batch, y, x, k) = shape.unravel(slot);
                return Err(InterpolateError::UnclippedBarycentrics {
                    batch,
                    y,
                    x,
                    k,
                    weights: bary.0,
                });
            }
            bary
        }
    };

    Ok(weighted_sum(weights, verts))
}

// ===================================================================
// Tests
// ===================================================================
