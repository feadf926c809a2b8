//! Resource management system

mod bindgroup;
pub mod targets;

pub use bindgroup::BindGroupLayouts;
pub use targets::{validate_attachments, AttachmentSpec, FrameTargets, GBuffer, RenderTarget};

use crate::{Error, Result};
use std::sync::Arc;
use wgpu;

/// Run `f` inside a validation error scope and return its value together
/// with the first validation error it raised
pub fn capture_validation<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let error = pollster::block_on(device.pop_error_scope());
    (value, error)
}

/// Texture plus its default view
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

/// Central resource manager for the renderer
pub struct ResourceManager {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    /// Standard bind group layouts shared by all pipelines
    pub bind_group_layouts: BindGroupLayouts,

    material_sampler: wgpu::Sampler,
    environment_sampler: wgpu::Sampler,
}

impl ResourceManager {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let bind_group_layouts = BindGroupLayouts::new(&device);

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            device,
            queue,
            bind_group_layouts,
            material_sampler,
            environment_sampler,
        }
    }

    /// Reject texture sizes the device cannot create. Creating them would
    /// raise an uncaptured validation error instead of a `Result`.
    pub fn check_texture_size(&self, label: &str, width: u32, height: u32) -> Result<()> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(Error::Resource(format!(
                "texture '{}' is {}x{}, supported sizes are 1..={} per side",
                label, width, height, max
            )));
        }
        Ok(())
    }

    /// Upload tightly packed RGBA8 pixels as a 2D texture
    pub fn texture_from_rgba8(
        &self,
        label: &str,
        data: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<GpuTexture> {
        self.check_texture_size(label, width, height)?;
        let expected = 4 * width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::Resource(format!(
                "texture '{}' has {} bytes, expected {}",
                label, data.len(), expected
            )));
        }

        let (texture, error) = capture_validation(&self.device, || {
            self.upload_rgba8(label, data, width, height, format)
        });
        if let Some(err) = error {
            return Err(Error::Resource(format!("texture '{}': {}", label, err)));
        }
        Ok(texture)
    }

    fn upload_rgba8(
        &self,
        label: &str,
        data: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> GpuTexture {
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture, mip_level: 0,
                origin: wgpu::Origin3d::ZERO, aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0, bytes_per_row: Some(4 * width), rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("Uploaded texture '{}' ({}x{})", label, width, height);
        GpuTexture { texture, view, size: (width, height) }
    }

    /// Upload `Rgba32Float` texels; used for the occlusion noise tile
    pub fn texture_from_rgba32f(&self, label: &str, texels: &[[f32; 4]], width: u32, height: u32) -> GpuTexture {
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture, mip_level: 0,
                origin: wgpu::Origin3d::ZERO, aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(texels),
            wgpu::ImageDataLayout {
                offset: 0, bytes_per_row: Some(16 * width), rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture { texture, view, size: (width, height) }
    }

    /// 1x1 texture of a single color
    pub fn solid_texture(&self, label: &str, rgba: [u8; 4], format: wgpu::TextureFormat) -> GpuTexture {
        self.upload_rgba8(label, &rgba, 1, 1, format)
    }

    /// Cube texture from six square RGBA8 faces ordered +X, -X, +Y, -Y, +Z, -Z
    pub fn cubemap_from_faces(&self, label: &str, size: u32, faces: &[Vec<u8>; 6]) -> Result<GpuTexture> {
        self.check_texture_size(label, size, size)?;
        let expected = (size * size * 4) as usize;
        if let Some(face) = faces.iter().position(|f| f.len() != expected) {
            return Err(Error::Resource(format!(
                "cubemap '{}' face {} has {} bytes, expected {}",
                label, face, faces[face].len(), expected
            )));
        }

        let (created, error) = capture_validation(&self.device, || {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: 6 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            for (layer, data) in faces.iter().enumerate() {
                self.queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &texture, mip_level: 0,
                        origin: wgpu::Origin3d { x: 0, y: 0, z: layer as u32 },
                        aspect: wgpu::TextureAspect::All,
                    },
                    data,
                    wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(4 * size), rows_per_image: Some(size) },
                    wgpu::Extent3d { width: size, height: size, depth_or_array_layers: 1 },
                );
            }
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::Cube),
                array_layer_count: Some(6),
                ..Default::default()
            });
            (texture, view)
        });
        if let Some(err) = error {
            return Err(Error::Resource(format!("cubemap '{}': {}", label, err)));
        }
        let (texture, view) = created;
        log::debug!("Uploaded cubemap '{}' ({}x{})", label, size, size);
        Ok(GpuTexture { texture, view, size: (size, size) })
    }

    /// Material bind group from diffuse and specular views
    pub fn create_material(
        &self,
        label: &str,
        albedo: &wgpu::TextureView,
        specular: &wgpu::TextureView,
    ) -> Arc<wgpu::BindGroup> {
        Arc::new(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layouts.material,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(albedo) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(specular) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.material_sampler) },
            ],
        }))
    }

    /// White diffuse, mid-grey specular
    pub fn default_material(&self) -> Arc<wgpu::BindGroup> {
        let albedo = self.solid_texture("Default Albedo", [255, 255, 255, 255], wgpu::TextureFormat::Rgba8UnormSrgb);
        let specular = self.solid_texture("Default Specular", [128, 128, 128, 255], wgpu::TextureFormat::Rgba8Unorm);
        self.create_material("Default Material", &albedo.view, &specular.view)
    }

    pub fn create_environment_bind_group(&self, cubemap: &wgpu::TextureView) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment Bind Group"),
            layout: &self.bind_group_layouts.environment,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(cubemap) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.environment_sampler) },
            ],
        })
    }

    /// Get the device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
