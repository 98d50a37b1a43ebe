//! # tessel-render
//!
//! Rendering pipeline for batches of heterogeneous meshes.
//!
//! ## Architecture
//!
//! ```text
//!  Meshes (tessel-core)
//!       │
//!       ▼
//!  Rasterizer::rasterize()          ◀─── pluggable stage
//!       │
//!       ▼
//!  FragmentBuffer ─────────────┐
//!       │                      │
//!       ▼                      ▼
//!  Shader::shade()         bridge::pack_faces_verts_uvs()
//!       │                      │
//!       ▼                      ▼
//!  ImageBatch              interpolate_face_attributes()
//!                              │
//!                              ▼
//!                          PixelUvMap
//! ```
//!
//! ## Crate modules
//!
//! - [`stages`] — `Rasterizer` / `Shader` traits
//! - [`target`] — compute targets and explicit retargeting
//! - [`bridge`] — mesh batch → packed per-face attributes
//! - [`interpolate`] — barycentric interpolation and clipping
//! - [`renderer`] — `MeshRenderer`, the orchestrator

pub mod bridge;
pub mod interpolate;
pub mod renderer;
pub mod stages;
pub mod target;

// Re-exports for convenience
pub use bridge::{pack_face_vertex_attribute, pack_faces_verts, pack_faces_verts_uvs};
pub use interpolate::{
    clip_barycentric_coords, interpolate_face_attributes, interpolate_with_policy, AttributeMap,
    InterpolateError, PixelUvMap,
};
pub use renderer::{MeshRenderer, RenderError, Stage};
pub use stages::{Rasterizer, Shader, StageError};
pub use target::{ComputeTarget, Retarget};
