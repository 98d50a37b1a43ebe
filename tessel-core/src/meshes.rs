//! Heterogeneous mesh batches and their UV textures.
//!
//! Only the attributes the render core reads are modelled here: vertex
//! positions, triangle faces, and optional UV textures (UV vertices plus
//! per-face UV indices).  Every index stored in a face is *local* to its
//! own mesh and validated on construction.

use thiserror::Error;

use crate::layout::{BatchLayout, LayoutError, Packed, Padded};

/// Pad value for padded face-index layouts.
pub const FACE_PAD: [u32; 3] = [u32::MAX; 3];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Batch size mismatch: {what} has {got} meshes, expected {expected}")]
    BatchSizeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Mesh {mesh}: face {face} references {attribute} {index}, but the mesh has {len}")]
    IndexOutOfRange {
        attribute: &'static str,
        mesh: usize,
        face: usize,
        index: u32,
        len: usize,
    },
    #[error("Mesh {mesh}: {uv_faces} UV faces for {faces} geometry faces")]
    FaceCountMismatch {
        mesh: usize,
        faces: usize,
        uv_faces: usize,
    },
    #[error("Mesh batch has no UV textures")]
    MissingTextures,
    #[error("Mesh {mesh}: packed vertex index does not fit in u32")]
    PackedIndexOverflow { mesh: usize },
}

/// Check that every index of every face points inside its own mesh's
/// `values`.
fn check_face_indices<T: Copy>(
    attribute: &'static str,
    values: &BatchLayout<T>,
    faces: &BatchLayout<[u32; 3]>,
) -> Result<(), MeshError> {
    if values.num_meshes() != faces.num_meshes() {
        return Err(MeshError::BatchSizeMismatch {
            what: attribute,
            expected: faces.num_meshes(),
            got: values.num_meshes(),
        });
    }

    for (mesh, (&len, mesh_faces)) in values.lens().iter().zip(faces.iter_meshes()).enumerate() {
        for (face, indices) in mesh_faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= len) {
                return Err(MeshError::IndexOutOfRange {
                    attribute,
                    mesh,
                    face,
                    index,
                    len,
                });
            }
        }
    }

    Ok(())
}

/// Shift each mesh's faces by the number of vertices in the meshes before
/// it.
fn shift_faces<'a>(
    per_mesh: impl Iterator<Item = (&'a [[u32; 3]], usize)>,
    capacity: usize,
) -> Result<Vec<[u32; 3]>, MeshError> {
    let mut offset = 0u32;
    let mut out = Vec::with_capacity(capacity);
    for (mesh, (faces, num_verts)) in per_mesh.enumerate() {
        for face in faces {
            let mut shifted = [0u32; 3];
            for (dst, &i) in shifted.iter_mut().zip(face) {
                *dst = i
                    .checked_add(offset)
                    .ok_or(MeshError::PackedIndexOverflow { mesh })?;
            }
            out.push(shifted);
        }
        offset = u32::try_from(num_verts)
            .ok()
            .and_then(|n| offset.checked_add(n))
            .ok_or(MeshError::PackedIndexOverflow { mesh })?;
    }
    Ok(out)
}

// ───────────────────────────────────────────────────────────────────
// TexturesUv
// ───────────────────────────────────────────────────────────────────

/// UV coordinates for a batch: per-mesh UV vertices and per-face UV
/// vertex indices.  UV face `j` of mesh `i` is aligned with geometry
/// face `j` of mesh `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct TexturesUv {
    verts_uvs: BatchLayout<[f32; 2]>,
    faces_uvs: BatchLayout<[u32; 3]>,
}

impl TexturesUv {
    /// Validates that every UV face index points into its own mesh's UV vertices.
    pub fn new(
        verts_uvs: BatchLayout<[f32; 2]>,
        faces_uvs: BatchLayout<[u32; 3]>,
    ) -> Result<Self, MeshError> {
        check_face_indices("UV vertex", &verts_uvs, &faces_uvs)?;
        Ok(Self { verts_uvs, faces_uvs })
    }

    /// Build from per-mesh lists, stored packed.
    pub fn from_lists(
        verts_uvs: &[Vec<[f32; 2]>],
        faces_uvs: &[Vec<[u32; 3]>],
    ) -> Result<Self, MeshError> {
        Self::new(BatchLayout::from_list(verts_uvs), BatchLayout::from_list(faces_uvs))
    }

    /// Number of meshes.
    pub fn num_meshes(&self) -> usize {
        self.faces_uvs.num_meshes()
    }

    /// UV vertices, in whichever layout they were given.
    pub fn verts_uvs(&self) -> &BatchLayout<[f32; 2]> {
        &self.verts_uvs
    }

    /// UV face indices, local to each mesh.
    pub fn faces_uvs(&self) -> &BatchLayout<[u32; 3]> {
        &self.faces_uvs
    }

    /// UV vertices in padded form, pad `[0.0, 0.0]`.
    pub fn verts_uvs_padded(&self) -> Padded<[f32; 2]> {
        self.verts_uvs.to_padded([0.0; 2])
    }

    /// UV face indices in padded form, pad [`FACE_PAD`].
    pub fn faces_uvs_padded(&self) -> Padded<[u32; 3]> {
        self.faces_uvs.to_padded(FACE_PAD)
    }

    /// UV vertices of each mesh.
    pub fn verts_uvs_list(&self) -> Vec<&[[f32; 2]]> {
        self.verts_uvs.iter_meshes().collect()
    }

    /// UV face indices of each mesh.
    pub fn faces_uvs_list(&self) -> Vec<&[[u32; 3]]> {
        self.faces_uvs.iter_meshes().collect()
    }
}

// ───────────────────────────────────────────────────────────────────
// Meshes
// ───────────────────────────────────────────────────────────────────

/// An ordered batch of triangle meshes with independent vertex and face
/// counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Meshes {
    verts: BatchLayout<[f32; 3]>,
    faces: BatchLayout<[u32; 3]>,
    faces_packed: Packed<[u32; 3]>,
    textures: Option<TexturesUv>,
}

impl Meshes {
    /// Validates that every face index points into its own mesh's vertices.
    pub fn new(
        verts: BatchLayout<[f32; 3]>,
        faces: BatchLayout<[u32; 3]>,
    ) -> Result<Self, MeshError> {
        check_face_indices("vertex", &verts, &faces)?;
        let faces_packed = faces.to_packed();

        log::trace!(
            "Built mesh batch: {} meshes, {} faces",
            faces.num_meshes(),
            faces_packed.len()
        );

        Ok(Self {
            verts,
            faces,
            faces_packed,
            textures: None,
        })
    }

    /// Build from per-mesh lists, stored packed.
    pub fn from_lists(
        verts: &[Vec<[f32; 3]>],
        faces: &[Vec<[u32; 3]>],
    ) -> Result<Self, MeshError> {
        Self::new(BatchLayout::from_list(verts), BatchLayout::from_list(faces))
    }

    /// Attach UV textures.  UV faces must line up one-to-one with the
    /// geometry faces of each mesh.
    pub fn with_textures(mut self, textures: TexturesUv) -> Result<Self, MeshError> {
        if textures.num_meshes() != self.len() {
            return Err(MeshError::BatchSizeMismatch {
                what: "textures",
                expected: self.len(),
                got: textures.num_meshes(),
            });
        }

        let uv_lens = textures.faces_uvs().lens();
        for (mesh, (&faces, &uv_faces)) in self.faces.lens().iter().zip(uv_lens).enumerate() {
            if faces != uv_faces {
                return Err(MeshError::FaceCountMismatch { mesh, faces, uv_faces });
            }
        }

        self.textures = Some(textures);
        Ok(self)
    }

    /// Number of meshes.
    pub fn len(&self) -> usize {
        self.faces.num_meshes()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vertex positions.
    pub fn verts(&self) -> &BatchLayout<[f32; 3]> {
        &self.verts
    }

    /// Face vertex indices, local to each mesh.
    pub fn faces(&self) -> &BatchLayout<[u32; 3]> {
        &self.faces
    }

    /// UV textures, if attached.
    pub fn textures(&self) -> Option<&TexturesUv> {
        self.textures.as_ref()
    }

    /// Vertex count of each mesh.
    pub fn num_verts_per_mesh(&self) -> &[usize] {
        self.verts.lens()
    }

    /// Face count of each mesh.
    pub fn num_faces_per_mesh(&self) -> &[usize] {
        self.faces.lens()
    }

    /// Face count across the whole batch.
    pub fn num_faces_total(&self) -> usize {
        self.faces_packed.len()
    }

    /// Packed face id of each mesh's first face.
    pub fn mesh_to_face_first_idx(&self) -> &[usize] {
        self.faces_packed.first_idx()
    }

    /// Which mesh a packed face id belongs to.
    pub fn mesh_for_face(&self, face: usize) -> Option<usize> {
        self.faces_packed.mesh_of(face)
    }

    /// All faces concatenated, with vertex indices shifted into the packed
    /// vertex sequence.  Fails when the batch holds more vertices than a
    /// `u32` index can address.
    pub fn faces_packed_global(&self) -> Result<Vec<[u32; 3]>, MeshError> {
        let per_mesh = self
            .faces
            .iter_meshes()
            .zip(self.verts.lens().iter().copied());
        shift_faces(per_mesh, self.num_faces_total())
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        (
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
    }

    fn quad() -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        (
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn batch() -> Meshes {
        let (v0, f0) = tri();
        let (v1, f1) = quad();
        Meshes::from_lists(&[v0, v1], &[f0, f1]).unwrap()
    }

    #[test]
    fn test_heterogeneous_counts() {
        let meshes = batch();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes.num_verts_per_mesh(), &[3, 4]);
        assert_eq!(meshes.num_faces_per_mesh(), &[1, 2]);
        assert_eq!(meshes.num_faces_total(), 3);
        assert_eq!(meshes.mesh_to_face_first_idx(), &[0, 1]);
    }

    #[test]
    fn test_mesh_for_face() {
        let meshes = batch();
        assert_eq!(meshes.mesh_for_face(0), Some(0));
        assert_eq!(meshes.mesh_for_face(1), Some(1));
        assert_eq!(meshes.mesh_for_face(2), Some(1));
        assert_eq!(meshes.mesh_for_face(3), None);
    }

    #[test]
    fn test_faces_packed_global_offsets() {
        let meshes = batch();
        assert_eq!(
            meshes.faces_packed_global(),
            Ok(vec![[0, 1, 2], [3, 4, 5], [3, 5, 6]])
        );
    }

    #[test]
    fn test_shift_faces_overflow() {
        let tri: &[[u32; 3]] = &[[0, 1, 2]];

        // Offset reaches u32::MAX exactly, then mesh 1's index 1 overflows.
        let err = shift_faces([(tri, u32::MAX as usize), (tri, 3)].into_iter(), 2).unwrap_err();
        assert_eq!(err, MeshError::PackedIndexOverflow { mesh: 1 });

        let err = shift_faces([(tri, u32::MAX as usize + 1), (tri, 3)].into_iter(), 2).unwrap_err();
        assert_eq!(err, MeshError::PackedIndexOverflow { mesh: 0 });

        let shifted = shift_faces([(tri, (u32::MAX - 3) as usize), (tri, 3)].into_iter(), 2).unwrap();
        assert_eq!(shifted[1], [u32::MAX - 3, u32::MAX - 2, u32::MAX - 1]);
    }

    #[test]
    fn test_rejects_vertex_index_out_of_range() {
        let (v0, _) = tri();
        let err = Meshes::from_lists(&[v0], &[vec![[0, 1, 3]]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                attribute: "vertex",
                mesh: 0,
                face: 0,
                index: 3,
                len: 3,
            }
        );
    }

    #[test]
    fn test_uv_indices_are_local_to_each_mesh() {
        // Mesh 1 has 4 UV vertices; index 3 is valid for it but would be
        // out of range for mesh 0.
        let verts_uvs = vec![
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        ];
        let ok = TexturesUv::from_lists(&verts_uvs, &[vec![[0, 1, 2]], vec![[0, 2, 3]]]);
        assert!(ok.is_ok());

        let err = TexturesUv::from_lists(&verts_uvs, &[vec![[0, 1, 3]], vec![[0, 2, 3]]]);
        assert!(matches!(
            err,
            Err(MeshError::IndexOutOfRange { mesh: 0, index: 3, .. })
        ));
    }

    #[test]
    fn test_with_textures_checks_face_counts() {
        let verts_uvs = vec![vec![[0.0, 0.0]; 3], vec![[0.0, 0.0]; 4]];
        let textures =
            TexturesUv::from_lists(&verts_uvs, &[vec![[0, 1, 2]], vec![[0, 1, 2]]]).unwrap();

        let err = batch().with_textures(textures).unwrap_err();
        assert_eq!(
            err,
            MeshError::FaceCountMismatch { mesh: 1, faces: 2, uv_faces: 1 }
        );
    }

    #[test]
    fn test_with_textures_checks_batch_size() {
        let textures = TexturesUv::from_lists(&[vec![[0.0, 0.0]; 3]], &[vec![[0, 1, 2]]]).unwrap();
        let err = batch().with_textures(textures).unwrap_err();
        assert!(matches!(
            err,
            MeshError::BatchSizeMismatch { what: "textures", expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_padded_uv_accessors() {
        let verts_uvs = vec![vec![[0.0, 0.0]; 3], vec![[0.5, 0.5]; 4]];
        let faces_uvs = vec![vec![[0, 1, 2]], vec![[0, 1, 2], [0, 2, 3]]];
        let textures = TexturesUv::from_lists(&verts_uvs, &faces_uvs).unwrap();

        let padded = textures.faces_uvs_padded();
        assert_eq!(padded.max_len(), 2);
        assert_eq!(padded.slot(0), Some(&[[0, 1, 2], FACE_PAD][..]));

        let uvs = textures.verts_uvs_padded();
        assert_eq!(uvs.max_len(), 4);
        assert_eq!(uvs.mesh(0).map(<[_]>::len), Some(3));
        assert_eq!(textures.verts_uvs_list()[1].len(), 4);
    }
}
