//! # tessel-core
//!
//! Data model for the tessel mesh renderer.  No rendering happens here;
//! this crate only describes what flows between the pipeline stages.
//!
//! ## Crate modules
//!
//! - [`layout`] — padded / packed storage for heterogeneous batches
//! - [`meshes`] — mesh batches and UV textures
//! - [`attribute`] — per-face vertex attributes in packed face order
//! - [`fragments`] — rasterizer output (`FragmentBuffer`)
//! - [`image`] — shader output (`ImageBatch`)
//! - [`settings`] — raster settings and per-call options

pub mod attribute;
pub mod fragments;
pub mod image;
pub mod layout;
pub mod meshes;
pub mod settings;

// Re-exports for convenience
pub use attribute::PerFaceAttribute;
pub use fragments::{
    BaryCoords, Fragment, FragmentBuffer, FragmentBuilder, FragmentError, FragmentShape, NO_FACE,
};
pub use image::{Image, ImageBatch, ImageError};
pub use layout::{BatchLayout, LayoutError, Packed, Padded};
pub use meshes::{MeshError, Meshes, TexturesUv, FACE_PAD};
pub use settings::{ClipPolicy, ConfigError, RasterSettings, RenderOptions};
