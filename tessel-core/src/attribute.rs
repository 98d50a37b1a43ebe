//! Per-face vertex attributes packed across a whole mesh batch.

/// One `[value; 3]` triple per face, in packed face order.
///
/// Index `f` lines up with the packed face id `f` that a rasterizer
/// writes into `FragmentBuffer::pix_to_face`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerFaceAttribute<const D: usize> {
    faces: Vec<[[f32; D]; 3]>,
}

impl<const D: usize> PerFaceAttribute<D> {
    /// Wrap per-face values already in packed face order.
    pub fn new(faces: Vec<[[f32; D]; 3]>) -> Self {
        Self { faces }
    }

    /// Empty attribute with room for `num_faces` faces.
    pub fn with_capacity(num_faces: usize) -> Self {
        Self {
            faces: Vec::with_capacity(num_faces),
        }
    }

    /// Append the next packed face's three vertex values.
    pub fn push(&mut self, face: [[f32; D]; 3]) {
        self.faces.push(face);
    }

    /// Values at the three corners of packed face `face`.
    pub fn get(&self, face: usize) -> Option<&[[f32; D]; 3]> {
        self.faces.get(face)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// All faces in packed order.
    pub fn as_slice(&self) -> &[[[f32; D]; 3]] {
        &self.faces
    }
}

impl<const D: usize> FromIterator<[[f32; D]; 3]> for PerFaceAttribute<D> {
    fn from_iter<I: IntoIterator<Item = [[f32; D]; 3]>>(iter: I) -> Self {
        Self {
            faces: iter.into_iter().collect(),
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
