//! Command line options

use clap::Parser;
use penumbra::config::OcclusionSettings;
use penumbra::light::{DEFAULT_LIGHT_COUNT, DEFAULT_LIGHT_SEED};
use penumbra::RendererConfig;
use std::path::PathBuf;

/// Deferred renderer demo with switchable SSAO / SSDO
#[derive(Parser, Debug, Clone)]
#[command(name = "penumbra-demo", version)]
pub struct Args {
    /// Wavefront OBJ model; a procedural scene is used when omitted
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Directory holding right, left, top, bottom, front and back skybox faces
    #[arg(long)]
    pub skybox: Option<PathBuf>,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Hemisphere samples per pixel
    #[arg(long, default_value_t = 32)]
    pub kernel_size: u32,

    /// Noise tile edge length, also the blur extent
    #[arg(long, default_value_t = 4)]
    pub noise_size: u32,

    /// Number of point lights
    #[arg(long, default_value_t = DEFAULT_LIGHT_COUNT)]
    pub lights: usize,

    /// Seed for the light set
    #[arg(long, default_value_t = DEFAULT_LIGHT_SEED)]
    pub seed: u64,

    /// Occlusion sampling radius in view space
    #[arg(long, default_value_t = 0.5)]
    pub radius: f32,

    /// Depth bias against self-occlusion
    #[arg(long, default_value_t = 0.025)]
    pub bias: f32,

    /// Contrast exponent of the ambient factor
    #[arg(long, default_value_t = 1.0)]
    pub power: f32,
}

impl Args {
    pub fn renderer_config(&self, width: u32, height: u32, surface_format: wgpu::TextureFormat) -> RendererConfig {
        RendererConfig::new(width, height, surface_format).with_occlusion(OcclusionSettings {
            kernel_size: self.kernel_size,
            noise_tile_size: self.noise_size,
            radius: self.radius,
            bias: self.bias,
            power: self.power,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_renderer_defaults() {
        let args = Args::try_parse_from(["penumbra-demo"]).unwrap();
        assert_eq!((args.width, args.height), (800, 800));
        assert_eq!(args.lights, 8);
        assert_eq!(args.seed, 114514);
        let config = args.renderer_config(800, 800, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.occlusion, OcclusionSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn occlusion_flags_reach_the_config() {
        let args = Args::try_parse_from([
            "penumbra-demo",
            "--kernel-size", "64",
            "--noise-size", "8",
            "--radius", "1.5",
            "--model", "scene.obj",
        ])
        .unwrap();
        let config = args.renderer_config(640, 480, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(config.occlusion.kernel_size, 64);
        assert_eq!(config.occlusion.noise_tile_size, 8);
        assert_eq!(config.occlusion.radius, 1.5);
        assert_eq!(args.model, Some(PathBuf::from("scene.obj")));
    }
}
