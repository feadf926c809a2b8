//! Hemisphere sample kernel and tangent-space noise tile

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ordered hemisphere offsets, oriented along +Z in tangent space.
///
/// Samples are pulled toward the origin so that nearby geometry
/// weighs more than distant geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionKernel {
    samples: Vec<Vec3>,
}

impl OcclusionKernel {
    pub fn generate(size: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = (0..size)
            .map(|i| {
                let dir = loop {
                    let v = Vec3::new(
                        rng.gen::<f32>() * 2.0 - 1.0,
                        rng.gen::<f32>() * 2.0 - 1.0,
                        rng.gen::<f32>(),
                    );
                    if let Some(n) = v.try_normalize() {
                        break n;
                    }
                };
                dir * rng.gen::<f32>() * Self::scale(i, size)
            })
            .collect();
        Self { samples }
    }

    /// Kernel from explicit tangent-space offsets
    pub fn from_samples(samples: Vec<Vec3>) -> Self {
        Self { samples }
    }

    /// Length bias for sample `index`: lerp(0.1, 1.0, t^2) with t = index / size
    pub fn scale(index: u32, size: u32) -> f32 {
        let t = index as f32 / size as f32;
        0.1 + (1.0 - 0.1) * t * t
    }

    pub fn samples(&self) -> &[Vec3] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// vec4-padded layout of the storage buffer read by the occlusion shader
    pub fn to_gpu(&self) -> Vec<[f32; 4]> {
        self.samples.iter().map(|s| [s.x, s.y, s.z, 0.0]).collect()
    }
}

/// Square tile of random rotation vectors in the tangent plane (z = 0)
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTile {
    size: u32,
    vectors: Vec<Vec3>,
}

impl NoiseTile {
    pub fn generate(size: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let vectors = (0..size * size)
            .map(|_| {
                Vec3::new(
                    rng.gen::<f32>() * 2.0 - 1.0,
                    rng.gen::<f32>() * 2.0 - 1.0,
                    0.0,
                )
            })
            .collect();
        Self { size, vectors }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }

    /// Rotation vector for a screen pixel; the tile repeats across the screen
    pub fn at(&self, x: u32, y: u32) -> Vec3 {
        let (tx, ty) = (x % self.size, y % self.size);
        self.vectors[(ty * self.size + tx) as usize]
    }

    /// Texel data for an `Rgba32Float` texture
    pub fn to_texels(&self) -> Vec<[f32; 4]> {
        self.vectors.iter().map(|v| [v.x, v.y, v.z, 0.0]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_has_requested_size() {
        for size in [1, 8, 32, 64] {
            assert_eq!(OcclusionKernel::generate(size, 7).len(), size as usize);
        }
    }

    #[test]
    fn kernel_samples_lie_in_unit_hemisphere() {
        let kernel = OcclusionKernel::generate(32, 42);
        for s in kernel.samples() {
            assert!(s.z >= 0.0, "sample below tangent plane: {:?}", s);
            assert!(s.length() <= 1.0 + 1e-6, "sample outside unit sphere: {:?}", s);
        }
    }

    #[test]
    fn kernel_scale_is_monotonic() {
        for size in [4, 16, 32, 128] {
            for i in 0..size - 1 {
                assert!(OcclusionKernel::scale(i, size) <= OcclusionKernel::scale(i + 1, size));
            }
            assert!((OcclusionKernel::scale(0, size) - 0.1).abs() < 1e-6);
            assert!(OcclusionKernel::scale(size - 1, size) <= 1.0);
        }
    }

    #[test]
    fn kernel_sample_length_bounded_by_scale() {
        let kernel = OcclusionKernel::generate(32, 3);
        for (i, s) in kernel.samples().iter().enumerate() {
            assert!(s.length() <= OcclusionKernel::scale(i as u32, 32) + 1e-6);
        }
    }

    #[test]
    fn kernel_is_deterministic_per_seed() {
        assert_eq!(OcclusionKernel::generate(32, 9), OcclusionKernel::generate(32, 9));
        assert_ne!(OcclusionKernel::generate(32, 9), OcclusionKernel::generate(32, 10));
    }

    #[test]
    fn noise_tile_is_planar_and_wraps() {
        let tile = NoiseTile::generate(4, 1);
        assert_eq!(tile.vectors().len(), 16);
        for v in tile.vectors() {
            assert_eq!(v.z, 0.0);
            assert!(v.x.abs() <= 1.0 && v.y.abs() <= 1.0);
        }
        assert_eq!(tile.at(1, 2), tile.at(5, 6));
        assert_eq!(tile.at(0, 0), tile.at(400, 800));
    }
}
