//! Heterogeneous batch storage: padded and packed per-mesh layouts.
//!
//! A batch of meshes with different vertex/face counts is stored one of
//! two ways:
//!
//! ```text
//!  Padded (num_meshes × max_len)         Packed (sum of lens)
//!  ┌───┬───┬───┬───┬───┐                ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!  │ a │ a │ a │ · │ · │  mesh 0        │ a │ a │ a │ b │ b │ b │ b │ b │
//!  ├───┼───┼───┼───┼───┤                └───┴───┴───┴───┴───┴───┴───┴───┘
//!  │ b │ b │ b │ b │ b │  mesh 1          first_idx = [0, 3]
//!  └───┴───┴───┴───┴───┘
//!          · = pad value
//! ```
//!
//! Conversions keep each mesh's entries in order and never move an entry
//! across a mesh boundary, so per-mesh local indices (vertex indices,
//! UV indices) mean the same thing in both layouts.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Padded data has {got} entries, expected {num_meshes} × {max_len}")]
    PaddedShape {
        num_meshes: usize,
        max_len: usize,
        got: usize,
    },
    #[error("Mesh {mesh} has length {len}, larger than the padded slot size {max_len}")]
    SlotOverflow {
        mesh: usize,
        len: usize,
        max_len: usize,
    },
    #[error("Packed data has {got} entries, but mesh lengths sum to {expected}")]
    PackedLength { expected: usize, got: usize },
}

// ───────────────────────────────────────────────────────────────────
// Padded
// ───────────────────────────────────────────────────────────────────

/// Fixed-size slot per mesh; entries past a mesh's length hold `pad`.
#[derive(Clone, Debug, PartialEq)]
pub struct Padded<T> {
    data: Vec<T>,
    lens: Vec<usize>,
    max_len: usize,
    pad: T,
}

impl<T: Copy> Padded<T> {
    /// Build from raw `(num_meshes × max_len)` row-major data.
    pub fn new(data: Vec<T>, lens: Vec<usize>, max_len: usize, pad: T) -> Result<Self, LayoutError> {
        if data.len() != lens.len() * max_len {
            return Err(LayoutError::PaddedShape {
                num_meshes: lens.len(),
                max_len,
                got: data.len(),
            });
        }
        if let Some((mesh, &len)) = lens.iter().enumerate().find(|&(_, &len)| len > max_len) {
            return Err(LayoutError::SlotOverflow { mesh, len, max_len });
        }

        Ok(Self { data, lens, max_len, pad })
    }

    /// Pad a list of per-mesh sequences to the longest one.
    pub fn from_list(list: &[Vec<T>], pad: T) -> Self {
        let max_len = list.iter().map(Vec::len).max().unwrap_or(0);
        let mut data = Vec::with_capacity(list.len() * max_len);
        for items in list {
            data.extend_from_slice(items);
            data.extend(std::iter::repeat(pad).take(max_len - items.len()));
        }

        Self {
            data,
            lens: list.iter().map(Vec::len).collect(),
            max_len,
            pad,
        }
    }

    /// Number of meshes (rows).
    pub fn num_meshes(&self) -> usize {
        self.lens.len()
    }

    /// Row width, the length of the longest mesh.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Valid length of each row.
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    /// Value filling the unused tail of each row.
    pub fn pad(&self) -> T {
        self.pad
    }

    /// Raw row-major storage, pad entries included.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The whole slot for `mesh`, including trailing pad entries.
    pub fn slot(&self, mesh: usize) -> Option<&[T]> {
        if mesh >= self.num_meshes() {
            return None;
        }
        let start = mesh * self.max_len;
        Some(&self.data[start..start + self.max_len])
    }

    /// Only the valid entries of `mesh`.
    pub fn mesh(&self, mesh: usize) -> Option<&[T]> {
        let len = *self.lens.get(mesh)?;
        self.slot(mesh).map(|slot| &slot[..len])
    }

    /// Drop the padding and concatenate the rows.
    pub fn to_packed(&self) -> Packed<T> {
        let mut data = Vec::with_capacity(self.lens.iter().sum());
        for mesh in 0..self.num_meshes() {
            if let Some(items) = self.mesh(mesh) {
                data.extend_from_slice(items);
            }
        }
        Packed::from_parts(data, self.lens.clone())
    }
}

// ───────────────────────────────────────────────────────────────────
// Packed
// ───────────────────────────────────────────────────────────────────

/// All meshes concatenated; `first_idx[i]` is where mesh `i` begins.
#[derive(Clone, Debug, PartialEq)]
pub struct Packed<T> {
    data: Vec<T>,
    lens: Vec<usize>,
    first_idx: Vec<usize>,
}

impl<T: Copy> Packed<T> {
    /// Concatenated `data` split by `lens`; fails unless the lengths add up.
    pub fn new(data: Vec<T>, lens: Vec<usize>) -> Result<Self, LayoutError> {
        let expected: usize = lens.iter().sum();
        if expected != data.len() {
            return Err(LayoutError::PackedLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self::from_parts(data, lens))
    }

    /// Concatenate a list of per-mesh sequences.
    pub fn from_list(list: &[Vec<T>]) -> Self {
        let data = list.iter().flatten().copied().collect();
        Self::from_parts(data, list.iter().map(Vec::len).collect())
    }

    fn from_parts(data: Vec<T>, lens: Vec<usize>) -> Self {
        let first_idx = lens
            .iter()
            .scan(0, |offset, &len| {
                let first = *offset;
                *offset += len;
                Some(first)
            })
            .collect();

        Self { data, lens, first_idx }
    }

    /// Number of meshes.
    pub fn num_meshes(&self) -> usize {
        self.lens.len()
    }

    /// Length of each mesh's segment.
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    /// Offset of each mesh's first element in `data`.
    pub fn first_idx(&self) -> &[usize] {
        &self.first_idx
    }

    /// All elements, meshes back to back.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Total element count across meshes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Segment of mesh `mesh`.
    pub fn mesh(&self, mesh: usize) -> Option<&[T]> {
        let first = *self.first_idx.get(mesh)?;
        Some(&self.data[first..first + self.lens[mesh]])
    }

    /// Which mesh owns the packed entry at `idx`.
    pub fn mesh_of(&self, idx: usize) -> Option<usize> {
        if idx >= self.data.len() {
            return None;
        }
        // Empty meshes share their successor's first index; the last mesh
        // starting at or before `idx` is the non-empty owner.
        Some(self.first_idx.partition_point(|&first| first <= idx) - 1)
    }

    /// Rows as wide as the longest mesh, tails filled with `pad`.
    pub fn to_padded(&self, pad: T) -> Padded<T> {
        let max_len = self.lens.iter().copied().max().unwrap_or(0);
        let mut data = Vec::with_capacity(self.num_meshes() * max_len);
        for mesh in 0..self.num_meshes() {
            if let Some(items) = self.mesh(mesh) {
                data.extend_from_slice(items);
                data.extend(std::iter::repeat(pad).take(max_len - items.len()));
            }
        }

        Padded {
            data,
            lens: self.lens.clone(),
            max_len,
            pad,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// BatchLayout
// ───────────────────────────────────────────────────────────────────

/// A per-mesh attribute in either layout.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchLayout<T> {
    Padded(Padded<T>),
    Packed(Packed<T>),
}

impl<T: Copy> BatchLayout<T> {
    /// Packed layout is the default for list input.
    pub fn from_list(list: &[Vec<T>]) -> Self {
        Self::Packed(Packed::from_list(list))
    }

    /// Number of meshes, whichever layout.
    pub fn num_meshes(&self) -> usize {
        match self {
            Self::Padded(p) => p.num_meshes(),
            Self::Packed(p) => p.num_meshes(),
        }
    }

    /// Valid length of each mesh.
    pub fn lens(&self) -> &[usize] {
        match self {
            Self::Padded(p) => p.lens(),
            Self::Packed(p) => p.lens(),
        }
    }

    /// Sum of `lens()`.
    pub fn total_len(&self) -> usize {
        self.lens().iter().sum()
    }

    /// Valid elements of mesh `mesh`, padding excluded.
    pub fn mesh(&self, mesh: usize) -> Option<&[T]> {
        match self {
            Self::Padded(p) => p.mesh(mesh),
            Self::Packed(p) => p.mesh(mesh),
        }
    }

    /// Iterate the valid entries of every mesh, in batch order.
    pub fn iter_meshes(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.num_meshes()).filter_map(move |mesh| self.mesh(mesh))
    }

    /// One owned vector per mesh.
    pub fn to_list(&self) -> Vec<Vec<T>> {
        self.iter_meshes().map(<[T]>::to_vec).collect()
    }

    /// Same data in packed layout.
    pub fn to_packed(&self) -> Packed<T> {
        match self {
            Self::Padded(p) => p.to_packed(),
            Self::Packed(p) => p.clone(),
        }
    }

    /// `pad` is only used when converting from the packed layout.
    pub fn to_padded(&self, pad: T) -> Padded<T> {
        match self {
            Self::Padded(p) => p.clone(),
            Self::Packed(p) => p.to_padded(pad),
        }
    }
}

impl<T> From<Padded<T>> for BatchLayout<T> {
    fn from(value: Padded<T>) -> Self {
        Self::Padded(value)
    }
}

impl<T> From<Packed<T>> for BatchLayout<T> {
    fn from(value: Packed<T>) -> Self {
        Self::Packed(value)
    }
}

// ===================================================================
// Tests
// ===================================================================
