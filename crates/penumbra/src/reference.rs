//! CPU evaluation of the occlusion, blur and lighting passes.
//!
//! Mirrors the WGSL in `shaders/passes/` texel for texel (textureLoad
//! addressing, pixel-center positions, the same projection and bias rules)
//! so the estimators can be checked without a GPU.

use crate::config::{LightingSettings, OcclusionSettings};
use crate::kernel::{NoiseTile, OcclusionKernel};
use crate::light::{attenuation, LightSource};
use crate::variant::OcclusionStrategy;
use glam::{Mat3, Mat4, Vec3, Vec4Swizzles};

/// One G-buffer texel. All vectors are in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySample {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub specular: f32,
}

/// G-buffer contents; `None` marks a texel no geometry was rasterized into
#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    width: u32,
    height: u32,
    texels: Vec<Option<GeometrySample>>,
}

impl GeometryBuffer {
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Option<GeometrySample>,
    ) -> Self {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self { width, height, texels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&GeometrySample> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels[(y * self.width + x) as usize].as_ref()
    }
}

/// rgb occlusion / indirect-light buffer
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionBuffer {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
}

impl OcclusionBuffer {
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Vec3) -> Self {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self { width, height, texels }
    }

    pub fn filled(width: u32, height: u32, value: Vec3) -> Self {
        Self::from_fn(width, height, |_, _| value)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.texels[(y * self.width + x) as usize]
    }
}

/// Radiance seen along a world-space direction (the skybox)
pub trait Environment {
    fn radiance(&self, direction: Vec3) -> Vec3;
}

/// Environment of a single color
#[derive(Debug, Clone, Copy)]
pub struct UniformEnvironment(pub Vec3);

impl Environment for UniformEnvironment {
    fn radiance(&self, _direction: Vec3) -> Vec3 {
        self.0
    }
}

/// Raw accumulation for one pixel of the ambient estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientEstimate {
    /// Range-weighted count of occluded samples
    pub occluded: f32,
    /// Samples that projected inside the screen
    pub valid: u32,
}

/// Orthonormal basis with `normal` as its third column.
///
/// Gram-Schmidt on the noise vector; a noise vector parallel to the normal
/// falls back to a helper axis.
pub fn tangent_basis(normal: Vec3, noise: Vec3) -> Mat3 {
    let mut tangent = noise - normal * noise.dot(normal);
    if tangent.length_squared() < 1e-6 {
        let helper = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        tangent = helper - normal * helper.dot(normal);
    }
    let tangent = tangent.normalize();
    let bitangent = normal.cross(tangent);
    Mat3::from_cols(tangent, bitangent, normal)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Screen-space occlusion estimator over a CPU G-buffer
pub struct OcclusionEstimator<'a> {
    kernel: &'a OcclusionKernel,
    noise: &'a NoiseTile,
    projection: Mat4,
    inv_view: Mat4,
    settings: OcclusionSettings,
}

impl<'a> OcclusionEstimator<'a> {
    pub fn new(
        kernel: &'a OcclusionKernel,
        noise: &'a NoiseTile,
        projection: Mat4,
        inv_view: Mat4,
        settings: OcclusionSettings,
    ) -> Self {
        Self {
            kernel,
            noise,
            projection,
            inv_view,
            settings,
        }
    }

    /// Texel a view-space point projects to, or `None` off screen
    pub fn project(&self, point: Vec3, width: u32, height: u32) -> Option<(u32, u32)> {
        let clip = self.projection * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xy() / clip.w;
        let u = ndc.x * 0.5 + 0.5;
        let v = 0.5 - ndc.y * 0.5;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        Some(((u * width as f32) as u32, (v * height as f32) as u32))
    }

    /// Hemisphere samples around the pixel, in view space, paired with
    /// their unscaled tangent-space offsets rotated into view space
    fn samples(&self, frag: &GeometrySample, x: u32, y: u32) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let tbn = tangent_basis(frag.normal, self.noise.at(x, y));
        let origin = frag.position;
        let radius = self.settings.radius;
        self.kernel.samples().iter().map(move |k| {
            let offset = tbn * *k;
            (origin + offset * radius, offset)
        })
    }

    fn is_occluded(&self, frag: &GeometrySample, sample_pos: Vec3, stored: &GeometrySample) -> Option<f32> {
        let radius = self.settings.radius;
        let range_check = smoothstep(0.0, 1.0, radius / (frag.position.z - stored.position.z).abs().max(1e-4));
        (stored.position.z >= sample_pos.z + self.settings.bias).then_some(range_check)
    }

    pub fn ambient_estimate(&self, gbuffer: &GeometryBuffer, x: u32, y: u32) -> AmbientEstimate {
        let mut estimate = AmbientEstimate { occluded: 0.0, valid: 0 };
        let Some(frag) = gbuffer.get(x, y) else {
            return estimate;
        };
        for (sample_pos, _) in self.samples(frag, x, y) {
            let Some((sx, sy)) = self.project(sample_pos, gbuffer.width, gbuffer.height) else {
                continue;
            };
            estimate.valid += 1;
            // Background never occludes.
            let Some(stored) = gbuffer.get(sx, sy) else {
                continue;
            };
            if let Some(weight) = self.is_occluded(frag, sample_pos, stored) {
                estimate.occluded += weight;
            }
        }
        estimate
    }

    /// Ambient factor in [0, 1]; 1 when no in-screen sample exists
    pub fn ambient(&self, gbuffer: &GeometryBuffer, x: u32, y: u32) -> f32 {
        let estimate = self.ambient_estimate(gbuffer, x, y);
        if estimate.valid == 0 {
            return 1.0;
        }
        (1.0 - estimate.occluded / estimate.valid as f32).powf(self.settings.power)
    }

    /// Approximate one-bounce indirect light along the kernel directions
    pub fn directional(&self, gbuffer: &GeometryBuffer, env: &dyn Environment, x: u32, y: u32) -> Vec3 {
        let Some(frag) = gbuffer.get(x, y) else {
            return Vec3::ONE;
        };
        let mut sum = Vec3::ZERO;
        let mut valid = 0u32;
        for (sample_pos, offset) in self.samples(frag, x, y) {
            let Some((sx, sy)) = self.project(sample_pos, gbuffer.width, gbuffer.height) else {
                continue;
            };
            valid += 1;
            let dir = offset.try_normalize().unwrap_or(frag.normal);
            let sky = env.radiance(self.inv_view.transform_vector3(dir));
            let contribution = match gbuffer.get(sx, sy) {
                Some(stored) => match self.is_occluded(frag, sample_pos, stored) {
                    Some(weight) => sky.lerp(stored.albedo * self.settings.bounce_strength, weight),
                    None => sky,
                },
                None => sky,
            };
            sum += contribution;
        }
        if valid == 0 {
            return Vec3::ONE;
        }
        sum / valid as f32
    }

    /// Occlusion term the lighting pass multiplies by
    pub fn evaluate(
        &self,
        strategy: OcclusionStrategy,
        gbuffer: &GeometryBuffer,
        env: &dyn Environment,
        x: u32,
        y: u32,
    ) -> Vec3 {
        match strategy {
            OcclusionStrategy::None => Vec3::ONE,
            OcclusionStrategy::Ambient => Vec3::splat(self.ambient(gbuffer, x, y)),
            OcclusionStrategy::Directional => self.directional(gbuffer, env, x, y),
            OcclusionStrategy::Combined => {
                self.directional(gbuffer, env, x, y) * self.ambient(gbuffer, x, y)
            }
        }
    }

    pub fn compute(
        &self,
        strategy: OcclusionStrategy,
        gbuffer: &GeometryBuffer,
        env: &dyn Environment,
    ) -> OcclusionBuffer {
        OcclusionBuffer::from_fn(gbuffer.width, gbuffer.height, |x, y| {
            self.evaluate(strategy, gbuffer, env, x, y)
        })
    }
}

/// `extent` x `extent` box filter with clamp-to-edge addressing
pub fn box_blur(input: &OcclusionBuffer, extent: u32) -> OcclusionBuffer {
    let half = (extent / 2) as i64;
    let (w, h) = (input.width as i64, input.height as i64);
    let count = (extent * extent) as f32;
    OcclusionBuffer::from_fn(input.width, input.height, |x, y| {
        let mut sum = Vec3::ZERO;
        for dy in -half..extent as i64 - half {
            for dx in -half..extent as i64 - half {
                let sx = (x as i64 + dx).clamp(0, w - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, h - 1) as u32;
                sum += input.get(sx, sy);
            }
        }
        sum / count
    })
}

/// Lit color of one G-buffer texel. `lights` must already be in view space.
pub fn shade(
    sample: &GeometrySample,
    occlusion: Vec3,
    lights: &[LightSource],
    settings: &LightingSettings,
) -> Vec3 {
    let normal = sample.normal.normalize();
    let view_dir = (-sample.position).normalize();
    let mut lighting = sample.albedo * settings.ambient;
    for light in lights {
        let to_light = light.position - sample.position;
        let distance = to_light.length();
        let light_dir = to_light / distance;
        let diffuse = normal.dot(light_dir).max(0.0) * sample.albedo * light.color;
        let halfway = (light_dir + view_dir).normalize();
        let spec = normal.dot(halfway).max(0.0).powf(settings.shininess);
        let specular = light.color * spec * sample.specular;
        lighting += (diffuse + specular) * attenuation(distance, settings.linear, settings.quadratic);
    }
    lighting * occlusion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::config::{PLAIN_ALBEDO, PLAIN_SPECULAR};

    const SIZE: u32 = 64;

    fn camera() -> Camera {
        Camera::look_at(Vec3::ZERO, Vec3::NEG_Z, 45.0)
    }

    /// View-space ray through the center of texel (x, y)
    fn pixel_ray(projection: Mat4, x: u32, y: u32, size: u32) -> Vec3 {
        let u = (x as f32 + 0.5) / size as f32;
        let v = (y as f32 + 0.5) / size as f32;
        let ndc = glam::Vec4::new(u * 2.0 - 1.0, 1.0 - v * 2.0, 1.0, 1.0);
        let p = projection.inverse() * ndc;
        (p.xyz() / p.w).normalize()
    }

    fn plain_sample(position: Vec3) -> GeometrySample {
        GeometrySample {
            position,
            normal: Vec3::Z,
            albedo: Vec3::splat(PLAIN_ALBEDO),
            specular: PLAIN_SPECULAR,
        }
    }

    /// Screen-filling plane at `z = -depth` facing the camera
    fn plane(depth: f32) -> GeometryBuffer {
        let projection = camera().projection(1.0);
        GeometryBuffer::from_fn(SIZE, SIZE, |x, y| {
            let ray = pixel_ray(projection, x, y, SIZE);
            Some(plain_sample(ray * (depth / -ray.z)))
        })
    }

    /// Plane at depth 5 with a raised slab at `z = -5 + step` left of x = -0.5
    fn stepped(step: f32) -> GeometryBuffer {
        let projection = camera().projection(1.0);
        let near = 5.0 - step;
        GeometryBuffer::from_fn(SIZE, SIZE, |x, y| {
            let ray = pixel_ray(projection, x, y, SIZE);
            let on_slab = ray * (near / -ray.z);
            if on_slab.x < -0.5 {
                Some(plain_sample(on_slab))
            } else {
                Some(plain_sample(ray * (5.0 / -ray.z)))
            }
        })
    }

    fn with_estimator<R>(settings: OcclusionSettings, f: impl FnOnce(&OcclusionEstimator) -> R) -> R {
        let kernel = OcclusionKernel::generate(settings.kernel_size, settings.seed);
        let noise = NoiseTile::generate(settings.noise_tile_size, settings.seed + 1);
        let cam = camera();
        let estimator = OcclusionEstimator::new(
            &kernel,
            &noise,
            cam.projection(1.0),
            cam.view.inverse(),
            settings,
        );
        f(&estimator)
    }

    #[test]
    fn tangent_basis_is_orthonormal() {
        let basis = tangent_basis(Vec3::Z, Vec3::new(0.3, -0.8, 0.0));
        assert!((basis.x_axis.length() - 1.0).abs() < 1e-5);
        assert!((basis.y_axis.length() - 1.0).abs() < 1e-5);
        assert!(basis.x_axis.dot(Vec3::Z).abs() < 1e-5);
        assert_eq!(basis.z_axis, Vec3::Z);
    }

    #[test]
    fn tangent_basis_handles_parallel_noise() {
        let basis = tangent_basis(Vec3::X, Vec3::new(0.5, 0.0, 0.0));
        assert!(basis.x_axis.is_finite());
        assert!(basis.x_axis.dot(Vec3::X).abs() < 1e-5);
        assert!((basis.x_axis.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn open_plane_is_unoccluded() {
        let gbuffer = plane(5.0);
        with_estimator(OcclusionSettings::default(), |est| {
            for (x, y) in [(32, 32), (10, 50), (63, 0), (5, 17)] {
                assert_eq!(est.ambient(&gbuffer, x, y), 1.0, "pixel ({x}, {y})");
            }
        });
    }

    #[test]
    fn off_screen_samples_leave_the_denominator() {
        let gbuffer = plane(5.0);
        let settings = OcclusionSettings {
            radius: 3.0,
            ..Default::default()
        };
        with_estimator(settings, |est| {
            let estimate = est.ambient_estimate(&gbuffer, 0, 0);
            assert!(estimate.valid < settings.kernel_size);
            assert_eq!(estimate.occluded, 0.0);
            assert_eq!(est.ambient(&gbuffer, 0, 0), 1.0);
        });
    }

    #[test]
    fn pixel_with_every_sample_off_screen_stays_unoccluded() {
        let gbuffer = plane(5.0);
        let kernel = OcclusionKernel::from_samples(vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ]);
        let noise = NoiseTile::generate(4, 3);
        let cam = camera();
        let settings = OcclusionSettings {
            radius: 500.0,
            ..Default::default()
        };
        let est = OcclusionEstimator::new(&kernel, &noise, cam.projection(1.0), cam.view.inverse(), settings);
        let estimate = est.ambient_estimate(&gbuffer, 32, 32);
        assert_eq!(estimate.valid, 0);
        assert_eq!(est.ambient(&gbuffer, 32, 32), 1.0);
        let env = UniformEnvironment(Vec3::splat(0.2));
        assert_eq!(est.directional(&gbuffer, &env, 32, 32), Vec3::ONE);
    }

    #[test]
    fn step_occluder_darkens_the_seam_only() {
        let gbuffer = stepped(1.0);
        let settings = OcclusionSettings {
            radius: 2.0,
            ..Default::default()
        };
        let cy = SIZE / 2;
        let seam = (0..SIZE)
            .find(|&x| gbuffer.get(x, cy).map_or(false, |s| (s.position.z + 5.0).abs() < 1e-4))
            .expect("far plane visible");
        let far = (SIZE as f32 * 0.9) as u32;
        with_estimator(settings, |est| {
            let at_seam = est.ambient(&gbuffer, seam, cy);
            let far_away = est.ambient(&gbuffer, far, cy);
            assert!(at_seam < 0.8, "seam factor {at_seam}");
            assert_eq!(far_away, 1.0);
        });
    }

    /// A 0.01 coplanar offset is below the 0.025 depth bias, so the step is
    /// treated as one surface; only steps larger than the bias darken the seam.
    #[test]
    fn centimetre_step_is_absorbed_by_depth_bias() {
        let gbuffer = stepped(0.01);
        let cy = SIZE / 2;
        with_estimator(OcclusionSettings::default(), |est| {
            for x in 0..SIZE {
                assert_eq!(est.ambient(&gbuffer, x, cy), 1.0, "column {x}");
            }
        });
    }

    #[test]
    fn background_pixels_are_unoccluded() {
        let gbuffer = GeometryBuffer::from_fn(8, 8, |_, _| None);
        with_estimator(OcclusionSettings::default(), |est| {
            let env = UniformEnvironment(Vec3::ZERO);
            assert_eq!(est.evaluate(OcclusionStrategy::Combined, &gbuffer, &env, 3, 3), Vec3::ONE);
        });
    }

    #[test]
    fn directional_on_open_plane_sees_the_sky() {
        let gbuffer = plane(5.0);
        let sky = Vec3::new(0.4, 0.6, 0.9);
        let env = UniformEnvironment(sky);
        with_estimator(OcclusionSettings::default(), |est| {
            let got = est.directional(&gbuffer, &env, 32, 32);
            assert!((got - sky).length() < 1e-5, "{got:?}");
        });
    }

    #[test]
    fn directional_bounces_occluder_albedo() {
        let gbuffer = stepped(1.0);
        let settings = OcclusionSettings {
            radius: 2.0,
            ..Default::default()
        };
        let env = UniformEnvironment(Vec3::ONE);
        let cy = SIZE / 2;
        let seam = (0..SIZE)
            .find(|&x| gbuffer.get(x, cy).map_or(false, |s| (s.position.z + 5.0).abs() < 1e-4))
            .expect("far plane visible");
        with_estimator(settings, |est| {
            let got = est.directional(&gbuffer, &env, seam, cy);
            // Occluded directions pick up the darker slab albedo instead of the white sky.
            assert!(got.x < 1.0 && got.x >= PLAIN_ALBEDO - 1e-5, "{got:?}");
        });
    }

    #[test]
    fn plain_strategy_never_darkens() {
        let gbuffer = stepped(1.0);
        let env = UniformEnvironment(Vec3::ZERO);
        with_estimator(OcclusionSettings::default(), |est| {
            let buffer = est.compute(OcclusionStrategy::None, &gbuffer, &env);
            for y in 0..SIZE {
                for x in 0..SIZE {
                    assert_eq!(buffer.get(x, y), Vec3::ONE);
                }
            }
        });
    }

    #[test]
    fn blur_preserves_constant_buffers() {
        let input = OcclusionBuffer::filled(16, 12, Vec3::splat(0.37));
        let output = box_blur(&input, 4);
        for y in 0..12 {
            for x in 0..16 {
                assert!((output.get(x, y) - Vec3::splat(0.37)).length() < 1e-6);
            }
        }
    }

    #[test]
    fn blur_removes_the_tile_pattern() {
        let tile = NoiseTile::generate(4, 11);
        let input = OcclusionBuffer::from_fn(32, 32, |x, y| Vec3::splat(tile.at(x, y).x * 0.5 + 0.5));
        let mean = tile.vectors().iter().map(|v| v.x * 0.5 + 0.5).sum::<f32>() / 16.0;
        let output = box_blur(&input, 4);
        for y in 2..30 {
            for x in 2..30 {
                assert!((output.get(x, y).x - mean).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn single_light_falls_off_with_attenuation() {
        // Light at (0, 0, 5) over a quad at the origin, camera at (0, 0, 10).
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 45.0);
        let settings = LightingSettings::default();
        let light = LightSource::new(cam.view.transform_point3(Vec3::new(0.0, 0.0, 5.0)), Vec3::ONE);
        let at = |x: f32| {
            let sample = plain_sample(cam.view.transform_point3(Vec3::new(x, 0.0, 0.0)));
            shade(&sample, Vec3::ONE, &[light], &settings)
        };

        let center = at(0.0);
        let expected = PLAIN_ALBEDO * settings.ambient
            + attenuation(5.0, settings.linear, settings.quadratic) * (PLAIN_ALBEDO + PLAIN_SPECULAR);
        assert!((center.x - expected).abs() < 1e-5, "{} vs {}", center.x, expected);
        assert_eq!(center.x, center.y);
        assert_eq!(center.y, center.z);

        let mut last = center.x;
        for i in 1..10 {
            let v = at(i as f32 * 0.5).x;
            assert!(v < last);
            last = v;
        }
    }

    #[test]
    fn lighting_sum_is_order_independent() {
        let settings = LightingSettings::default();
        let sample = plain_sample(Vec3::new(0.2, -0.1, -4.0));
        let lights = crate::light::generate_lights(8, 5);
        let mut reversed = lights.clone();
        reversed.reverse();
        let a = shade(&sample, Vec3::ONE, &lights, &settings);
        let b = shade(&sample, Vec3::ONE, &reversed, &settings);
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn occlusion_scales_lighting() {
        let settings = LightingSettings::default();
        let sample = plain_sample(Vec3::new(0.0, 0.0, -4.0));
        let lights = [LightSource::new(Vec3::new(0.0, 0.0, -2.0), Vec3::ONE)];
        let full = shade(&sample, Vec3::ONE, &lights, &settings);
        let half = shade(&sample, Vec3::splat(0.5), &lights, &settings);
        assert!((full * 0.5 - half).length() < 1e-6);
    }
}
