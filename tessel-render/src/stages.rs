//! The two pluggable pipeline stages.
//!
//! ```text
//!  Meshes ──► Rasterizer::rasterize ──► FragmentBuffer ──► Shader::shade ──► ImageBatch
//! ```
//!
//! Any type implementing these traits can be dropped into a
//! [`MeshRenderer`](crate::renderer::MeshRenderer).  Both stages must also
//! implement [`Retarget`], since the renderer forwards target changes to
//! them explicitly.

use tessel_core::{FragmentBuffer, ImageBatch, Meshes, RenderOptions};

use crate::target::Retarget;

/// Error type returned by stage implementations.  The renderer keeps it
/// intact as the `source` of its own error.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub trait Rasterizer: Retarget {
    /// Produce fragments for every mesh in `meshes`.
    ///
    /// The returned buffer must have one image per mesh, and its
    /// `settings()` must carry the settings actually used (including
    /// `clip_barycentric_coords`) so the flag reaches interpolation.
    fn rasterize(
        &self,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<FragmentBuffer, StageError>;
}

pub trait Shader: Retarget {
    /// Turn fragments into one image per mesh, sized like the fragments.
    fn shade(
        &self,
        fragments: &FragmentBuffer,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<ImageBatch, StageError>;
}

impl<T: Rasterizer + ?Sized> Rasterizer for Box<T> {
    fn rasterize(
        &self,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<FragmentBuffer, StageError> {
        (**self).rasterize(meshes, options)
    }
}

impl<T: Shader + ?Sized> Shader for Box<T> {
    fn shade(
        &self,
        fragments: &FragmentBuffer,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<ImageBatch, StageError> {
        (**self).shade(fragments, meshes, options)
    }
}
