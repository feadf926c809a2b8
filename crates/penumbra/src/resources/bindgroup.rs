//! Bind group layouts shared by every pipeline
//!
//! Each pass binds a subset of these groups, always in the same slots:
//!
//! - Group 0: Camera - per-frame, shared by all passes
//! - Group 1: Material (geometry) / G-buffer (full-screen passes) / environment (skybox)
//! - Group 2: Occlusion kernel inputs, or the occlusion buffer read by lighting
//!   (blur binds its input alone at group 0, the depth transplant its
//!   G-buffer depth)
//! - Group 3: Environment cubemap (occlusion) or lights (lighting)

use std::sync::Arc;
use wgpu;

#[derive(Clone)]
pub struct BindGroupLayouts {
    pub camera: Arc<wgpu::BindGroupLayout>,
    pub material: Arc<wgpu::BindGroupLayout>,
    pub gbuffer: Arc<wgpu::BindGroupLayout>,
    pub occlusion_inputs: Arc<wgpu::BindGroupLayout>,
    pub single_texture: Arc<wgpu::BindGroupLayout>,
    pub depth_texture: Arc<wgpu::BindGroupLayout>,
    pub environment: Arc<wgpu::BindGroupLayout>,
    pub lighting: Arc<wgpu::BindGroupLayout>,
}

fn unfiltered_texture(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn filtered_texture(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn filtering_sampler(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn buffer(binding: u32, ty: wgpu::BufferBindingType, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: Arc::new(Self::create_camera_layout(device)),
            material: Arc::new(Self::create_material_layout(device)),
            gbuffer: Arc::new(Self::create_gbuffer_layout(device)),
            occlusion_inputs: Arc::new(Self::create_occlusion_inputs_layout(device)),
            single_texture: Arc::new(Self::create_single_texture_layout(device)),
            depth_texture: Arc::new(Self::create_depth_texture_layout(device)),
            environment: Arc::new(Self::create_environment_layout(device)),
            lighting: Arc::new(Self::create_lighting_layout(device)),
        }
    }

    /// Camera uniform, read by vertex and fragment stages
    fn create_camera_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[buffer(
                0,
                wgpu::BufferBindingType::Uniform,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        })
    }

    /// Diffuse and specular maps plus their sampler
    fn create_material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                filtered_texture(0, wgpu::TextureViewDimension::D2),
                filtered_texture(1, wgpu::TextureViewDimension::D2),
                filtering_sampler(2),
            ],
        })
    }

    /// Position, normal and albedo attachments, fetched with textureLoad
    fn create_gbuffer_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("G-Buffer Bind Group Layout"),
            entries: &[unfiltered_texture(0), unfiltered_texture(1), unfiltered_texture(2)],
        })
    }

    /// Kernel storage buffer, noise tile and estimator parameters
    fn create_occlusion_inputs_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Occlusion Inputs Bind Group Layout"),
            entries: &[
                buffer(
                    0,
                    wgpu::BufferBindingType::Storage { read_only: true },
                    wgpu::ShaderStages::FRAGMENT,
                ),
                unfiltered_texture(1),
                buffer(2, wgpu::BufferBindingType::Uniform, wgpu::ShaderStages::FRAGMENT),
            ],
        })
    }

    /// A single occlusion buffer
    fn create_single_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Occlusion Buffer Bind Group Layout"),
            entries: &[unfiltered_texture(0)],
        })
    }

    /// G-buffer depth, fetched with textureLoad
    fn create_depth_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Texture Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        })
    }

    /// Skybox cubemap and sampler
    fn create_environment_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Environment Bind Group Layout"),
            entries: &[
                filtered_texture(0, wgpu::TextureViewDimension::Cube),
                filtering_sampler(1),
            ],
        })
    }

    /// Light storage buffer and composer parameters
    fn create_lighting_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Bind Group Layout"),
            entries: &[
                buffer(
                    0,
                    wgpu::BufferBindingType::Storage { read_only: true },
                    wgpu::ShaderStages::FRAGMENT,
                ),
                buffer(1, wgpu::BufferBindingType::Uniform, wgpu::ShaderStages::FRAGMENT),
            ],
        })
    }
}
