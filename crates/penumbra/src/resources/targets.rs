//! Resolution-dependent render targets
//!
//! Everything here is rebuilt as a unit on resize.

use super::{capture_validation, BindGroupLayouts};
use crate::{Error, Result};

pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Max color attachments guaranteed by the default limits
const MAX_COLOR_ATTACHMENTS: usize = 8;

/// Shape of one attachment, checked before any texture is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentSpec {
    pub label: &'static str,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

/// Completeness check for an attachment set that is rendered in one pass
pub fn validate_attachments(colors: &[AttachmentSpec], depth: Option<&AttachmentSpec>) -> Result<()> {
    let Some(first) = colors.first().or(depth) else {
        return Err(Error::Resource("attachment set is empty".into()));
    };
    if colors.len() > MAX_COLOR_ATTACHMENTS {
        return Err(Error::Resource(format!(
            "{} color attachments exceed the limit of {}",
            colors.len(), MAX_COLOR_ATTACHMENTS
        )));
    }
    for spec in colors.iter().chain(depth) {
        if spec.width == 0 || spec.height == 0 {
            return Err(Error::Resource(format!("attachment '{}' has zero size", spec.label)));
        }
        if (spec.width, spec.height) != (first.width, first.height) {
            return Err(Error::Resource(format!(
                "attachment '{}' is {}x{} but '{}' is {}x{}",
                spec.label, spec.width, spec.height, first.label, first.width, first.height
            )));
        }
    }
    if let Some(spec) = colors.iter().find(|c| c.format.is_depth_stencil_format()) {
        return Err(Error::Resource(format!(
            "color attachment '{}' uses depth format {:?}",
            spec.label, spec.format
        )));
    }
    if let Some(spec) = depth {
        if !spec.format.has_depth_aspect() {
            return Err(Error::Resource(format!(
                "depth attachment '{}' uses non-depth format {:?}",
                spec.label, spec.format
            )));
        }
    }
    Ok(())
}

/// A texture used as a render attachment
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub spec: AttachmentSpec,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, spec: AttachmentSpec, usage: wgpu::TextureUsages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(spec.label),
            size: wgpu::Extent3d { width: spec.width, height: spec.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: spec.format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, spec }
    }
}

/// Geometry-pass attachments; written together in one draw
pub struct GBuffer {
    pub position: RenderTarget,
    pub normal: RenderTarget,
    pub albedo: RenderTarget,
    pub depth: RenderTarget,
}

impl GBuffer {
    pub fn color_specs(width: u32, height: u32) -> [AttachmentSpec; 3] {
        [
            AttachmentSpec { label: "G-Buffer Position", format: POSITION_FORMAT, width, height },
            AttachmentSpec { label: "G-Buffer Normal", format: NORMAL_FORMAT, width, height },
            AttachmentSpec { label: "G-Buffer Albedo", format: ALBEDO_FORMAT, width, height },
        ]
    }

    pub fn depth_spec(width: u32, height: u32) -> AttachmentSpec {
        AttachmentSpec { label: "G-Buffer Depth", format: DEPTH_FORMAT, width, height }
    }

    pub fn color_views(&self) -> [&wgpu::TextureView; 3] {
        [&self.position.view, &self.normal.view, &self.albedo.view]
    }
}

/// Every size-dependent target plus the bind groups that read them
pub struct FrameTargets {
    pub gbuffer: GBuffer,
    pub occlusion_raw: RenderTarget,
    pub occlusion: RenderTarget,
    /// Depth the overlay tests against; filled from the G-buffer depth
    pub display_depth: RenderTarget,

    pub gbuffer_bind_group: wgpu::BindGroup,
    pub occlusion_raw_bind_group: wgpu::BindGroup,
    pub occlusion_bind_group: wgpu::BindGroup,
    pub gbuffer_depth_bind_group: wgpu::BindGroup,

    width: u32,
    height: u32,
}

impl FrameTargets {
    /// Validate and create all targets. Fails atomically: either every
    /// attachment is complete or nothing is returned.
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, width: u32, height: u32) -> Result<Self> {
        let color_specs = GBuffer::color_specs(width, height);
        let depth_spec = GBuffer::depth_spec(width, height);
        validate_attachments(&color_specs, Some(&depth_spec))?;

        let occlusion_raw_spec = AttachmentSpec { label: "Occlusion Raw", format: OCCLUSION_FORMAT, width, height };
        let occlusion_spec = AttachmentSpec { label: "Occlusion Blurred", format: OCCLUSION_FORMAT, width, height };
        let display_depth_spec = AttachmentSpec { label: "Display Depth", format: DEPTH_FORMAT, width, height };
        validate_attachments(&[occlusion_raw_spec], None)?;
        validate_attachments(&[occlusion_spec], None)?;
        validate_attachments(&[], Some(&display_depth_spec))?;

        log::debug!("Creating frame targets at {}x{}", width, height);

        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (targets, error) = capture_validation(device, || {
            let [position, normal, albedo] = color_specs;
            let gbuffer = GBuffer {
                position: RenderTarget::new(device, position, sampled),
                normal: RenderTarget::new(device, normal, sampled),
                albedo: RenderTarget::new(device, albedo, sampled),
                depth: RenderTarget::new(
                    device,
                    depth_spec,
                    wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC,
                ),
            };
            let occlusion_raw = RenderTarget::new(device, occlusion_raw_spec, sampled);
            let occlusion = RenderTarget::new(device, occlusion_spec, sampled);
            let display_depth = RenderTarget::new(
                device,
                display_depth_spec,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            );

            let gbuffer_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("G-Buffer Bind Group"),
                layout: &layouts.gbuffer,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&gbuffer.position.view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view) },
                    wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&gbuffer.albedo.view) },
                ],
            });
            let single = |label: &str, target: &RenderTarget| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout: &layouts.single_texture,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&target.view),
                    }],
                })
            };
            let occlusion_raw_bind_group = single("Occlusion Raw Bind Group", &occlusion_raw);
            let occlusion_bind_group = single("Occlusion Bind Group", &occlusion);
            let gbuffer_depth_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("G-Buffer Depth Bind Group"),
                layout: &layouts.depth_texture,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.depth.view),
                }],
            });

            Self {
                gbuffer,
                occlusion_raw,
                occlusion,
                display_depth,
                gbuffer_bind_group,
                occlusion_raw_bind_group,
                occlusion_bind_group,
                gbuffer_depth_bind_group,
                width,
                height,
            }
        });

        if let Some(err) = error {
            return Err(Error::Resource(format!("frame targets at {}x{}: {}", width, height, err)));
        }
        Ok(targets)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
