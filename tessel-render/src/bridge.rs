//! Mesh batch → per-face attribute bridge: gathers per-vertex values into
//! the packed `[value; 3]`-per-face layout the interpolator consumes.
//!
//! Face indices are local to their own mesh, so each mesh's values are
//! gathered through its own faces first and only then concatenated:
//!
//! ```text
//!  mesh 0: uvs0[faces_uvs0]  ──┐
//!  mesh 1: uvs1[faces_uvs1]  ──┼──► concat ──► PerFaceAttribute (packed face order)
//!  mesh 2: uvs2[faces_uvs2]  ──┘
//! ```
//!
//! Concatenating the values first and indexing afterwards would read mesh
//! 0's values for every mesh, since every mesh's numbering starts at 0.

use tessel_core::{BatchLayout, MeshError, Meshes, PerFaceAttribute, TexturesUv};

/// Gather `values[face]` per mesh, then concatenate in batch order.
pub fn pack_face_vertex_attribute<const D: usize>(
    attribute: &'static str,
    values: &BatchLayout<[f32; D]>,
    faces: &BatchLayout<[u32; 3]>,
) -> Result<PerFaceAttribute<D>, MeshError> {
    if values.num_meshes() != faces.num_meshes() {
        return Err(MeshError::BatchSizeMismatch {
            what: attribute,
            expected: faces.num_meshes(),
            got: values.num_meshes(),
        });
    }

    let mut packed = PerFaceAttribute::with_capacity(faces.total_len());
    for (mesh, (mesh_values, mesh_faces)) in values.iter_meshes().zip(faces.iter_meshes()).enumerate() {
        for (face, indices) in mesh_faces.iter().enumerate() {
            let gather = |index: u32| {
                mesh_values
                    .get(index as usize)
                    .copied()
                    .ok_or(MeshError::IndexOutOfRange {
                        attribute,
                        mesh,
                        face,
                        index,
                        len: mesh_values.len(),
                    })
            };
            packed.push([gather(indices[0])?, gather(indices[1])?, gather(indices[2])?]);
        }
    }

    Ok(packed)
}

/// Per-face UV triples for the whole batch, aligned with packed face ids.
pub fn pack_faces_verts_uvs(textures: &TexturesUv) -> Result<PerFaceAttribute<2>, MeshError> {
    pack_face_vertex_attribute("UV vertex", textures.verts_uvs(), textures.faces_uvs())
}

/// Per-face vertex positions, e.g. for interpolating surface positions.
pub fn pack_faces_verts(meshes: &Meshes) -> Result<PerFaceAttribute<3>, MeshError> {
    pack_face_vertex_attribute("vertex", meshes.verts(), meshes.faces())
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{Padded, FACE_PAD};

    /// Mesh 0: 3 faces over 5 UVs at x = 0.x; mesh 1: 5 faces over 7 UVs
    /// at x = 1.x.  The x component encodes (mesh, uv index).
    fn two_meshes() -> (Vec<Vec<[f32; 2]>>, Vec<Vec<[u32; 3]>>) {
        let verts_uvs = vec![
            (0..5).map(|i| [i as f32 / 10.0, 0.0]).collect(),
            (0..7).map(|i| [1.0 + i as f32 / 10.0, 1.0]).collect(),
        ];
        let faces_uvs = vec![
            vec![[0, 1, 2], [1, 2, 3], [2, 3, 4]],
            vec![[0, 1, 2], [1, 2, 3], [2, 3, 4], [3, 4, 5], [4, 5, 6]],
        ];
        (verts_uvs, faces_uvs)
    }

    #[test]
    fn test_packs_per_mesh_before_concatenation() {
        let (verts_uvs, faces_uvs) = two_meshes();
        let textures = TexturesUv::from_lists(&verts_uvs, &faces_uvs).unwrap();

        let packed = pack_faces_verts_uvs(&textures).unwrap();
        assert_eq!(packed.len(), 8);

        // Entry 3 is mesh 1's face 0, reading mesh 1's own UVs.
        assert_eq!(packed.get(3), Some(&[[1.0, 1.0], [1.1, 1.0], [1.2, 1.0]]));
        // Entry 2 is mesh 0's last face.
        assert_eq!(packed.get(2), Some(&[[0.2, 0.0], [0.3, 0.0], [0.4, 0.0]]));
        // Last entry reaches index 6, which only exists in mesh 1.
        assert_eq!(packed.get(7).map(|f| f[2]), Some([1.6, 1.0]));
    }

    #[test]
    fn test_padded_and_packed_inputs_agree() {
        let (verts_uvs, faces_uvs) = two_meshes();
        let packed_input = TexturesUv::from_lists(&verts_uvs, &faces_uvs).unwrap();
        let padded_input = TexturesUv::new(
            Padded::from_list(&verts_uvs, [0.0; 2]).into(),
            Padded::from_list(&faces_uvs, FACE_PAD).into(),
        )
        .unwrap();

        assert_eq!(
            pack_faces_verts_uvs(&packed_input).unwrap(),
            pack_faces_verts_uvs(&padded_input).unwrap()
        );
    }

    #[test]
    fn test_index_out_of_range_reports_mesh_and_face() {
        let values = BatchLayout::from_list(&[vec![[0.0; 2]; 3]]);
        let faces = BatchLayout::from_list(&[vec![[0, 1, 2], [2, 1, 9]]]);

        let err = pack_face_vertex_attribute("UV vertex", &values, &faces).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                attribute: "UV vertex",
                mesh: 0,
                face: 1,
                index: 9,
                len: 3,
            }
        );
    }

    #[test]
    fn test_batch_size_mismatch() {
        let values = BatchLayout::from_list(&[vec![[0.0; 2]; 3]]);
        let faces: BatchLayout<[u32; 3]> = BatchLayout::from_list(&[vec![], vec![]]);

        let err = pack_face_vertex_attribute("UV vertex", &values, &faces).unwrap_err();
        assert!(matches!(err, MeshError::BatchSizeMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_pack_vertex_positions() {
        let meshes = Meshes::from_lists(
            &[
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                vec![[5.0, 5.0, 5.0], [6.0, 5.0, 5.0], [5.0, 6.0, 5.0]],
            ],
            &[vec![[0, 1, 2]], vec![[2, 1, 0]]],
        )
        .unwrap();

        let packed = pack_faces_verts(&meshes).unwrap();
        assert_eq!(packed.len(), 2);
        assert_eq!(packed.get(1).map(|f| f[0]), Some([5.0, 6.0, 5.0]));
    }
}
