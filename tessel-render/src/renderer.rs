//! High-level renderer that ties a rasterizer and a shader together into
//! single `render()` / `extract_texture_map()` calls.

use std::any::type_name;
use std::fmt;

use thiserror::Error;

use tessel_core::{
    ConfigError, FragmentBuffer, ImageBatch, MeshError, Meshes, RasterSettings, RenderOptions,
};

use crate::bridge::pack_faces_verts_uvs;
use crate::interpolate::{interpolate_face_attributes, InterpolateError, PixelUvMap};
use crate::stages::{Rasterizer, Shader, StageError};
use crate::target::ComputeTarget;

/// Pipeline stage an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Shade,
    Pack,
    Interpolate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rasterize => "rasterize",
            Self::Shade => "shade",
            Self::Pack => "pack",
            Self::Interpolate => "interpolate",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Rasterization failed: {source}")]
    Rasterize {
        #[source]
        source: StageError,
    },
    #[error("Shading failed: {source}")]
    Shade {
        #[source]
        source: StageError,
    },
    #[error("Failed to pack per-face UVs: {0}")]
    Pack(#[from] MeshError),
    #[error("Interpolation failed: {0}")]
    Interpolate(#[from] InterpolateError),
    #[error("{stage} stage broke its contract: {reason}")]
    Capability { stage: Stage, reason: String },
    #[error("Invalid raster settings: {0}")]
    Config(#[from] ConfigError),
}

impl RenderError {
    /// `None` for configuration errors raised before any stage ran.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Rasterize { .. } => Some(Stage::Rasterize),
            Self::Shade { .. } => Some(Stage::Shade),
            Self::Pack(_) => Some(Stage::Pack),
            Self::Interpolate(_) => Some(Stage::Interpolate),
            Self::Capability { stage, .. } => Some(*stage),
            Self::Config(_) => None,
        }
    }

    /// Batch image the failure was traced to, when known.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::Interpolate(e) => Some(e.batch_index()),
            Self::Pack(MeshError::IndexOutOfRange { mesh, .. }) => Some(*mesh),
            _ => None,
        }
    }
}

/// Renders a batch of heterogeneous meshes by rasterizing and then
/// shading.
///
/// # Blur and clipping
///
/// With `blur_radius > 0` some pixels get barycentric weights outside
/// `[0, 1]`.  To keep interpolated UVs and depths within the face they
/// belong to, set `clip_barycentric_coords = Some(true)` in the raster
/// settings.  Leaving it unset makes texture-map extraction fail on such
/// pixels instead of extrapolating silently.
///
/// # Usage
///
/// ```ignore
/// let renderer = MeshRenderer::new(rasterizer, shader);
/// let images = renderer.render(&meshes, &RenderOptions::default())?;
/// let (images, fragments) = renderer.render_with_fragments(&meshes, &options)?;
/// let depth = fragments.depth_map();
/// ```
pub struct MeshRenderer<R, S> {
    rasterizer: R,
    shader: S,
    target: ComputeTarget,
}

impl<R: Rasterizer, S: Shader> MeshRenderer<R, S> {
    /// Combine `rasterizer` and `shader`.  Both start on the CPU.
    pub fn new(rasterizer: R, shader: S) -> Self {
        log::debug!(
            "Creating mesh renderer (rasterizer: {}, shader: {})",
            type_name::<R>(),
            type_name::<S>()
        );

        Self {
            rasterizer,
            shader,
            target: ComputeTarget::default(),
        }
    }

    /// Rasterize, then shade.  The shader's images are returned unchanged.
    pub fn render(&self, meshes: &Meshes, options: &RenderOptions) -> Result<ImageBatch, RenderError> {
        self.render_with_fragments(meshes, options)
            .map(|(images, _)| images)
    }

    /// Like [`Self::render`], also handing back the fragments so callers
    /// can read depth etc. without rasterizing again.
    pub fn render_with_fragments(
        &self,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<(ImageBatch, FragmentBuffer), RenderError> {
        let fragments = self.rasterize(meshes, options)?;
        let images = self.shade(&fragments, meshes, options)?;
        Ok((images, fragments))
    }

    /// Per-pixel UV coordinates of the visible surface.  The shader is not
    /// involved.
    pub fn extract_texture_map(
        &self,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<PixelUvMap, RenderError> {
        let fragments = self.rasterize(meshes, options)?;

        let textures = meshes.textures().ok_or(MeshError::MissingTextures)?;
        let faces_verts_uvs = pack_faces_verts_uvs(textures)?;

        if fragments.settings().needs_clip_decision() {
            log::warn!(
                "Extracting texture map from blurred fragments (blur_radius = {}) \
                 with clip_barycentric_coords unset",
                fragments.settings().blur_radius
            );
        }

        let pixel_uvs = interpolate_face_attributes(&fragments, &faces_verts_uvs)?;
        log::trace!("Interpolated UVs for {} meshes", meshes.len());
        Ok(pixel_uvs)
    }

    /// Move both stages to `target`.  Each stage is told explicitly, since
    /// only it knows what it owns.
    pub fn retarget(&mut self, target: ComputeTarget) {
        log::info!("Retargeting mesh renderer: {} -> {}", self.target, target);
        self.rasterizer.retarget(&target);
        self.shader.retarget(&target);
        self.target = target;
    }

    /// Where the stages were last moved.
    pub fn target(&self) -> &ComputeTarget {
        &self.target
    }

    /// The rasterizer stage.
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// The shader stage.
    pub fn shader(&self) -> &S {
        &self.shader
    }

    /// Mutable access for reconfiguring a stage between calls.
    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    /// Mutable access to the shader.
    pub fn shader_mut(&mut self) -> &mut S {
        &mut self.shader
    }

    /// Take the stages back.
    pub fn into_parts(self) -> (R, S) {
        (self.rasterizer, self.shader)
    }

    fn rasterize(&self, meshes: &Meshes, options: &RenderOptions) -> Result<FragmentBuffer, RenderError> {
        if let Some(settings) = &options.raster_settings {
            settings.validate()?;
        }

        log::debug!("Rasterizing {} meshes", meshes.len());
        let fragments = self
            .rasterizer
            .rasterize(meshes, options)
            .map_err(|source| RenderError::Rasterize { source })?;

        let shape = fragments.shape();
        if shape.batch != meshes.len() {
            return Err(RenderError::Capability {
                stage: Stage::Rasterize,
                reason: format!(
                    "returned {} fragment images for {} meshes",
                    shape.batch,
                    meshes.len()
                ),
            });
        }

        if let Some(requested) = &options.raster_settings {
            if let Some(reason) = settings_mismatch(requested, fragments.settings()) {
                return Err(RenderError::Capability {
                    stage: Stage::Rasterize,
                    reason,
                });
            }
        }

        log::trace!("Rasterized fragments: {shape:?}");
        Ok(fragments)
    }

    fn shade(
        &self,
        fragments: &FragmentBuffer,
        meshes: &Meshes,
        options: &RenderOptions,
    ) -> Result<ImageBatch, RenderError> {
        let images = self
            .shader
            .shade(fragments, meshes, options)
            .map_err(|source| RenderError::Shade { source })?;

        if images.len() != meshes.len() {
            return Err(RenderError::Capability {
                stage: Stage::Shade,
                reason: format!("returned {} images for {} meshes", images.len(), meshes.len()),
            });
        }

        let shape = fragments.shape();
        if let Some(size) = images.image_size() {
            if size != (shape.height, shape.width) {
                return Err(RenderError::Capability {
                    stage: Stage::Shade,
                    reason: format!(
                        "returned {}x{} images for {}x{} fragments",
                        size.0, size.1, shape.height, shape.width
                    ),
                });
            }
        }

        log::trace!("Shaded {} images", images.len());
        Ok(images)
    }
}

/// Describes the first setting a rasterizer dropped from a per-call
/// override.  Interpolation reads the clip flag from the fragments, so an
/// ignored override would otherwise go unnoticed.
fn settings_mismatch(requested: &RasterSettings, got: &RasterSettings) -> Option<String> {
    if got.clip_barycentric_coords != requested.clip_barycentric_coords {
        return Some(format!(
            "ignored clip_barycentric_coords = {:?} (fragments carry {:?})",
            requested.clip_barycentric_coords, got.clip_barycentric_coords
        ));
    }
    if got.image_size != requested.image_size {
        return Some(format!(
            "ignored image_size = {:?} (fragments carry {:?})",
            requested.image_size, got.image_size
        ));
    }
    if got.faces_per_pixel != requested.faces_per_pixel {
        return Some(format!(
            "ignored faces_per_pixel = {} (fragments carry {})",
            requested.faces_per_pixel, got.faces_per_pixel
        ));
    }
    if got.blur_radius != requested.blur_radius {
        return Some(format!(
            "ignored blur_radius = {} (fragments carry {})",
            requested.blur_radius, got.blur_radius
        ));
    }
    None
}

// ===================================================================
// Tests
// ===================================================================
