//! Rasterization settings and per-call render options.
//!
//! `RasterSettings` is plain serde data so it can be loaded from JSON
//! alongside the rest of an application's configuration:
//!
//! ```json
//! {
//!   "image_size": [512, 512],
//!   "blur_radius": 0.0001,
//!   "faces_per_pixel": 4,
//!   "clip_barycentric_coords": true
//! }
//! ```
//!
//! Missing fields fall back to [`RasterSettings::default`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Blur radius must be finite and >= 0, got {0}")]
    InvalidBlurRadius(f32),
    #[error("faces_per_pixel must be >= 1")]
    InvalidFacesPerPixel,
    #[error("Image size must be non-zero, got {height}x{width}")]
    EmptyImage { height: u32, width: u32 },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the interpolator treats barycentric weights outside `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipPolicy {
    /// Clamp into `[0, 1]` and renormalize before interpolating.
    Clip,
    /// Use weights as-is; soft edges may extrapolate past the face.
    Raw,
    /// The flag was never set; out-of-range weights are an error.
    Unset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Output image size as `(height, width)` in pixels.
    pub image_size: (u32, u32),
    /// Soft-coverage blur radius.  Zero means hard rasterization.
    pub blur_radius: f32,
    /// Number of closest faces kept per pixel (K).
    pub faces_per_pixel: u32,
    /// `None` means "not explicitly set".  Never inferred from
    /// `blur_radius`.
    pub clip_barycentric_coords: Option<bool>,
    /// Passed through to rasterizers; the core does not read it.
    pub perspective_correct: bool,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            image_size: (256, 256),
            blur_radius: 0.0,
            faces_per_pixel: 1,
            clip_barycentric_coords: None,
            perspective_correct: false,
        }
    }
}

impl RasterSettings {
    /// Output size as `(height, width)`.
    pub fn with_image_size(mut self, height: u32, width: u32) -> Self {
        self.image_size = (height, width);
        self
    }

    /// Soft-rasterization blur; `0` is hard rasterization.
    pub fn with_blur_radius(mut self, blur_radius: f32) -> Self {
        self.blur_radius = blur_radius;
        self
    }

    /// Number of nearest faces kept per pixel (`K`).
    pub fn with_faces_per_pixel(mut self, faces_per_pixel: u32) -> Self {
        self.faces_per_pixel = faces_per_pixel;
        self
    }

    /// Clamp and renormalize barycentric weights before interpolating.
    pub fn with_clip_barycentric_coords(mut self, clip: bool) -> Self {
        self.clip_barycentric_coords = Some(clip);
        self
    }

    /// Request perspective-correct barycentrics from the rasterizer.
    pub fn with_perspective_correct(mut self, perspective_correct: bool) -> Self {
        self.perspective_correct = perspective_correct;
        self
    }

    /// Reject negative blur, zero `K` and empty images.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.blur_radius.is_finite() || self.blur_radius < 0.0 {
            return Err(ConfigError::InvalidBlurRadius(self.blur_radius));
        }
        if self.faces_per_pixel == 0 {
            return Err(ConfigError::InvalidFacesPerPixel);
        }
        let (height, width) = self.image_size;
        if height == 0 || width == 0 {
            return Err(ConfigError::EmptyImage { height, width });
        }
        Ok(())
    }

    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// How interpolation treats weights outside `[0, 1]`.
    pub fn clip_policy(&self) -> ClipPolicy {
        match self.clip_barycentric_coords {
            Some(true) => ClipPolicy::Clip,
            Some(false) => ClipPolicy::Raw,
            None => ClipPolicy::Unset,
        }
    }

    /// Blur is on but nobody said what to do with the resulting weights.
    pub fn needs_clip_decision(&self) -> bool {
        self.blur_radius > 0.0 && self.clip_barycentric_coords.is_none()
    }
}

/// Per-call options handed to both the rasterizer and the shader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    /// Replaces the rasterizer's own settings for this call only.
    pub raster_settings: Option<RasterSettings>,
}

impl RenderOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the rasterizer's settings for this call.
    pub fn with_raster_settings(mut self, settings: RasterSettings) -> Self {
        self.raster_settings = Some(settings);
        self
    }

    /// The override if present, otherwise `defaults`.
    pub fn resolve<'a>(&'a self, defaults: &'a RasterSettings) -> &'a RasterSettings {
        self.raster_settings.as_ref().unwrap_or(defaults)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RasterSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.clip_policy(), ClipPolicy::Unset);
        assert!(!settings.needs_clip_decision());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let negative = RasterSettings::default().with_blur_radius(-0.1);
        assert!(matches!(negative.validate(), Err(ConfigError::InvalidBlurRadius(_))));

        let nan = RasterSettings::default().with_blur_radius(f32::NAN);
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidBlurRadius(_))));

        let k0 = RasterSettings::default().with_faces_per_pixel(0);
        assert!(matches!(k0.validate(), Err(ConfigError::InvalidFacesPerPixel)));

        let empty = RasterSettings::default().with_image_size(0, 64);
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::EmptyImage { height: 0, width: 64 })
        ));
    }

    #[test]
    fn test_clip_policy_follows_flag_only() {
        let blurred = RasterSettings::default().with_blur_radius(1e-4);
        assert_eq!(blurred.clip_policy(), ClipPolicy::Unset);
        assert!(blurred.needs_clip_decision());

        let clip = blurred.clone().with_clip_barycentric_coords(true);
        assert_eq!(clip.clip_policy(), ClipPolicy::Clip);
        assert!(!clip.needs_clip_decision());

        let raw = blurred.with_clip_barycentric_coords(false);
        assert_eq!(raw.clip_policy(), ClipPolicy::Raw);
    }

    #[test]
    fn test_from_json_partial() {
        let settings = RasterSettings::from_json(
            r#"{ "image_size": [64, 32], "blur_radius": 0.001, "clip_barycentric_coords": true }"#,
        )
        .unwrap();

        assert_eq!(settings.image_size, (64, 32));
        assert_eq!(settings.faces_per_pixel, 1);
        assert_eq!(settings.clip_policy(), ClipPolicy::Clip);
    }

    #[test]
    fn test_from_json_validates() {
        let err = RasterSettings::from_json(r#"{ "faces_per_pixel": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFacesPerPixel));

        let err = RasterSettings::from_json("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_to_json_keeps_unset_flag() {
        let json = RasterSettings::default().to_json().unwrap();
        assert!(json.contains("\"clip_barycentric_coords\": null"));
        assert_eq!(RasterSettings::from_json(&json).unwrap(), RasterSettings::default());
    }

    #[test]
    fn test_render_options_resolve() {
        let defaults = RasterSettings::default();
        assert_eq!(RenderOptions::new().resolve(&defaults), &defaults);

        let custom = RasterSettings::default().with_faces_per_pixel(4);
        let options = RenderOptions::new().with_raster_settings(custom.clone());
        assert_eq!(options.resolve(&defaults), &custom);
    }
}
