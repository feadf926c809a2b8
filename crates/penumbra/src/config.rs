//! Renderer configuration

use crate::{Error, Result};

/// Upper bound on kernel samples accepted by the occlusion pass
pub const MAX_KERNEL_SIZE: u32 = 256;
/// Upper bound on lights composed per frame
pub const MAX_LIGHTS: usize = 32;

/// Albedo written by the geometry pass in plain (untextured) mode
pub const PLAIN_ALBEDO: f32 = 0.95;
/// Specular intensity written in plain mode
pub const PLAIN_SPECULAR: f32 = 0.5;

/// Occlusion estimator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionSettings {
    /// Number of hemisphere kernel samples
    pub kernel_size: u32,
    /// Edge length of the square noise tile; also the blur extent
    pub noise_tile_size: u32,
    /// View-space sampling radius
    pub radius: f32,
    /// Depth bias against self-occlusion
    pub bias: f32,
    /// Contrast exponent applied to the ambient factor
    pub power: f32,
    /// Scale of the occluder albedo bounced by the directional estimator
    pub bounce_strength: f32,
    /// Seed for kernel and noise generation
    pub seed: u64,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            kernel_size: 32,
            noise_tile_size: 4,
            radius: 0.5,
            bias: 0.025,
            power: 1.0,
            bounce_strength: 1.0,
            seed: 0x5eed,
        }
    }
}

/// Lighting composer parameters shared by every light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingSettings {
    pub linear: f32,
    pub quadratic: f32,
    /// Ambient term as a fraction of albedo
    pub ambient: f32,
    /// Blinn-Phong specular exponent
    pub shininess: f32,
    /// Scale applied to the unit marker cube drawn at each light
    pub marker_scale: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            linear: crate::light::ATTENUATION_LINEAR,
            quadratic: crate::light::ATTENUATION_QUADRATIC,
            ambient: 0.3,
            shininess: 8.0,
            marker_scale: 0.05,
        }
    }
}

/// Main renderer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub surface_format: wgpu::TextureFormat,
    pub occlusion: OcclusionSettings,
    pub lighting: LightingSettings,
}

impl RendererConfig {
    pub fn new(width: u32, height: u32, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            surface_format,
            ..Default::default()
        }
    }

    pub fn with_occlusion(mut self, occlusion: OcclusionSettings) -> Self {
        self.occlusion = occlusion;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingSettings) -> Self {
        self.lighting = lighting;
        self
    }

    /// Reject configurations that would produce invalid GPU resources
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        let occ = &self.occlusion;
        if occ.kernel_size == 0 || occ.kernel_size > MAX_KERNEL_SIZE {
            return Err(Error::Config(format!(
                "kernel size {} outside 1..={}",
                occ.kernel_size, MAX_KERNEL_SIZE
            )));
        }
        if occ.noise_tile_size == 0 {
            return Err(Error::Config("noise tile size must be non-zero".into()));
        }
        if !(occ.radius > 0.0) || occ.bias < 0.0 || !(occ.power > 0.0) {
            return Err(Error::Config(format!(
                "invalid occlusion parameters: radius {}, bias {}, power {}",
                occ.radius, occ.bias, occ.power
            )));
        }
        if self.surface_format.is_depth_stencil_format() {
            return Err(Error::Config(format!(
                "surface format {:?} is not a color format",
                self.surface_format
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            occlusion: OcclusionSettings::default(),
            lighting: LightingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = RendererConfig::default();
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.occlusion.kernel_size, 32);
        assert_eq!(config.occlusion.noise_tile_size, 4);
        assert_eq!(config.lighting.linear, 0.7);
        assert_eq!(config.lighting.quadratic, 1.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let config = RendererConfig::new(0, 600, wgpu::TextureFormat::Rgba8Unorm);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn oversized_kernel_is_rejected() {
        let config = RendererConfig::default().with_occlusion(OcclusionSettings {
            kernel_size: MAX_KERNEL_SIZE + 1,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn depth_surface_format_is_rejected() {
        let config = RendererConfig::new(64, 64, wgpu::TextureFormat::Depth32Float);
        assert!(config.validate().is_err());
    }
}
