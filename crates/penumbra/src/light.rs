//! Point lights and their GPU representation

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Linear attenuation coefficient shared by every light
pub const ATTENUATION_LINEAR: f32 = 0.7;
/// Quadratic attenuation coefficient shared by every light
pub const ATTENUATION_QUADRATIC: f32 = 1.8;

/// Seed of the demo light set
pub const DEFAULT_LIGHT_SEED: u64 = 114514;
pub const DEFAULT_LIGHT_COUNT: usize = 8;

/// Immutable point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub position: Vec3,
    pub color: Vec3,
}

impl LightSource {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

/// `1 / (1 + linear * d + quadratic * d^2)`
pub fn attenuation(distance: f32, linear: f32, quadratic: f32) -> f32 {
    1.0 / (1.0 + linear * distance + quadratic * distance * distance)
}

/// Reproducible light set scattered around the origin.
///
/// x and y lie in [-2, 2), z in [-4, 4) and every color channel in [0.5, 1.0),
/// all on a 1/100 grid.
pub fn generate_lights(count: usize, seed: u64) -> Vec<LightSource> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut unit = move || rng.gen_range(0..100u32) as f32 / 100.0;

    (0..count)
        .map(|_| {
            let x = unit() * 4.0 - 2.0;
            let y = unit() * 4.0 - 2.0;
            let z = unit() * 8.0 - 4.0;
            let r = unit() / 2.0 + 0.5;
            let g = unit() / 2.0 + 0.5;
            let b = unit() / 2.0 + 0.5;
            LightSource::new(Vec3::new(x, y, z), Vec3::new(r, g, b))
        })
        .collect()
}

/// Light as read by lighting.wgsl (32 bytes). Position is in view space.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl GpuLight {
    pub fn from_light(light: &LightSource, view: &Mat4) -> Self {
        let p = view.transform_point3(light.position);
        Self {
            position: [p.x, p.y, p.z, 1.0],
            color: [light.color.x, light.color.y, light.color.z, 1.0],
        }
    }
}

/// Per-instance data of a light marker cube (32 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerInstance {
    /// World position in xyz, uniform scale in w
    pub offset_scale: [f32; 4],
    pub color: [f32; 4],
}

impl MarkerInstance {
    pub fn from_light(light: &LightSource, scale: f32) -> Self {
        let p = light.position;
        let c = light.color;
        Self {
            offset_scale: [p.x, p.y, p.z, scale],
            color: [c.x, c.y, c.z, 1.0],
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 32,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 0,
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: 4,
            },
        ],
    };
}
