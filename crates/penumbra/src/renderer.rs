//! Main renderer implementation

use crate::assets;
use crate::camera::{Camera, CameraUniform};
use crate::config::{RendererConfig, MAX_LIGHTS};
use crate::graph::{GraphContext, RenderGraph};
use crate::kernel::{NoiseTile, OcclusionKernel};
use crate::light::{GpuLight, LightSource, MarkerInstance};
use crate::mesh::{GpuMesh, Model};
use crate::passes::{BlurPass, DepthTransplantPass, GeometryPass, LightingPass, OcclusionPass, OverlayPass};
use crate::pipeline::PipelineCache;
use crate::resources::{FrameTargets, GpuTexture, ResourceManager};
use crate::variant::PipelineVariant;
use crate::{Error, Result};
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Estimator parameters – must match WGSL OcclusionParams (16 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct OcclusionParams {
    radius: f32,
    bias: f32,
    power: f32,
    bounce_strength: f32,
}

/// Composer parameters – must match WGSL LightingParams (32 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LightingParams {
    light_count: u32,
    linear: f32,
    quadratic: f32,
    ambient: f32,
    shininess: f32,
    _pad: [f32; 3],
}

/// Everything one frame needs from the driver. Nothing here is mutated.
pub struct FrameInputs<'a> {
    pub model: &'a Model,
    pub camera: &'a Camera,
    pub lights: &'a [LightSource],
    /// Viewport; must equal the renderer's current resolution
    pub width: u32,
    pub height: u32,
    /// Flat albedo instead of material textures
    pub plain_model: bool,
}

/// Deferred renderer with switchable occlusion variants
pub struct Renderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    resources: ResourceManager,
    graph: RenderGraph,
    pipelines: PipelineCache,
    config: RendererConfig,

    targets: FrameTargets,

    kernel: OcclusionKernel,
    noise: NoiseTile,

    // Uniform buffers
    camera_buffer: wgpu::Buffer,
    lighting_params_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    // Shared with OverlayPass
    marker_buffer: Arc<wgpu::Buffer>,

    // Bind groups
    camera_bind_group: wgpu::BindGroup,
    occlusion_inputs_bind_group: wgpu::BindGroup,
    environment_bind_group: wgpu::BindGroup,
    lighting_bind_group: wgpu::BindGroup,

    environment: GpuTexture,

    // Frame state
    frame_count: u64,
}

impl Renderer {
    /// Create a renderer. Every target, shader and pipeline is built here;
    /// on failure nothing is returned.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, config: RendererConfig) -> Result<Self> {
        log::info!("Creating Penumbra renderer");
        log::info!("  Surface format: {:?}", config.surface_format);
        log::info!("  Resolution: {}x{}", config.width, config.height);
        config.validate()?;

        let resources = ResourceManager::new(device.clone(), queue.clone());
        let layouts = resources.bind_group_layouts.clone();
        let mut pipelines = PipelineCache::new(device.clone(), config.surface_format);

        // ── Camera ───────────────────────────────────────────────────────────
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() }],
        });

        // ── Occlusion inputs ─────────────────────────────────────────────────
        let occ = config.occlusion;
        let kernel = OcclusionKernel::generate(occ.kernel_size, occ.seed);
        let noise = NoiseTile::generate(occ.noise_tile_size, occ.seed.wrapping_add(1));
        log::debug!("Occlusion kernel: {} samples, {}x{} noise tile", kernel.len(), noise.size(), noise.size());

        let kernel_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Occlusion Kernel"),
            contents: bytemuck::cast_slice(&kernel.to_gpu()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let noise_texture = resources.texture_from_rgba32f("Occlusion Noise", &noise.to_texels(), noise.size(), noise.size());
        let occlusion_params = OcclusionParams {
            radius: occ.radius,
            bias: occ.bias,
            power: occ.power,
            bounce_strength: occ.bounce_strength,
        };
        let occlusion_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Occlusion Params"),
            contents: bytemuck::bytes_of(&occlusion_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let occlusion_inputs_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Occlusion Inputs Bind Group"),
            layout: &layouts.occlusion_inputs,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: kernel_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&noise_texture.view) },
                wgpu::BindGroupEntry { binding: 2, resource: occlusion_params_buffer.as_entire_binding() },
            ],
        });

        // ── Environment (gradient until a skybox is set) ─────────────────────
        let environment = assets::gradient_skybox(&resources)?;
        let environment_bind_group = resources.create_environment_bind_group(&environment.view);

        // ── Lights ───────────────────────────────────────────────────────────
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Buffer"),
            size: (MAX_LIGHTS * std::mem::size_of::<GpuLight>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lighting Params"),
            size: std::mem::size_of::<LightingParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Bind Group"),
            layout: &layouts.lighting,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: light_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lighting_params_buffer.as_entire_binding() },
            ],
        });
        let marker_buffer = Arc::new(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Marker Instances"),
            size: (MAX_LIGHTS * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        // ── Targets and passes ───────────────────────────────────────────────
        let targets = FrameTargets::new(&device, &layouts, config.width, config.height)?;

        let mut graph = RenderGraph::new();
        graph.add_pass(GeometryPass::new(&mut pipelines, &layouts)?);
        graph.add_pass(OcclusionPass::new(&mut pipelines, &layouts, &config.occlusion)?);
        graph.add_pass(BlurPass::new(&mut pipelines, &layouts, occ.noise_tile_size)?);
        graph.add_pass(LightingPass::new(&mut pipelines, &layouts, config.surface_format)?);
        graph.add_pass(DepthTransplantPass::new(&mut pipelines, &layouts)?);
        graph.add_pass(OverlayPass::new(
            &mut pipelines,
            &layouts,
            config.surface_format,
            GpuMesh::cube(&device, [0.0; 3], 1.0),
            marker_buffer.clone(),
        )?);
        graph.build()?;

        log::info!("Penumbra renderer initialized ({} pipelines)", pipelines.len());

        Ok(Self {
            device,
            queue,
            resources,
            graph,
            pipelines,
            config,
            targets,
            kernel,
            noise,
            camera_buffer,
            lighting_params_buffer,
            light_buffer,
            marker_buffer,
            camera_bind_group,
            occlusion_inputs_bind_group,
            environment_bind_group,
            lighting_bind_group,
            environment,
            frame_count: 0,
        })
    }

    /// Render one frame of `variant` into `target`
    pub fn render(&mut self, variant: PipelineVariant, inputs: &FrameInputs, target: &wgpu::TextureView) -> Result<()> {
        let (width, height) = self.targets.size();
        if (inputs.width, inputs.height) != (width, height) {
            return Err(Error::Resource(format!(
                "viewport {}x{} does not match render targets {}x{}",
                inputs.width, inputs.height, width, height
            )));
        }
        log::trace!("Rendering frame {} ({})", self.frame_count, variant.label());

        let lights = if inputs.lights.len() > MAX_LIGHTS {
            log::warn!("{} lights submitted, composing the first {}", inputs.lights.len(), MAX_LIGHTS);
            &inputs.lights[..MAX_LIGHTS]
        } else {
            inputs.lights
        };

        let camera = CameraUniform::new(inputs.camera, inputs.model.transform, width, height);
        self.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));

        // Lights are composed in view space
        let gpu_lights: Vec<GpuLight> = lights
            .iter()
            .map(|l| GpuLight::from_light(l, &inputs.camera.view))
            .collect();
        let markers: Vec<MarkerInstance> = lights
            .iter()
            .map(|l| MarkerInstance::from_light(l, self.config.lighting.marker_scale))
            .collect();
        if !lights.is_empty() {
            self.queue.write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&gpu_lights));
            self.queue.write_buffer(&self.marker_buffer, 0, bytemuck::cast_slice(&markers));
        }

        let lighting = self.config.lighting;
        let params = LightingParams {
            light_count: lights.len() as u32,
            linear: lighting.linear,
            quadratic: lighting.quadratic,
            ambient: lighting.ambient,
            shininess: lighting.shininess,
            _pad: [0.0; 3],
        };
        self.queue.write_buffer(&self.lighting_params_buffer, 0, bytemuck::bytes_of(&params));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut graph_ctx = GraphContext {
            encoder: &mut encoder,
            resources: &self.resources,
            targets: &self.targets,
            target,
            model: inputs.model,
            frame: self.frame_count,
            stages: variant.stages(),
            strategy: variant.strategy(),
            plain_model: inputs.plain_model,
            light_count: lights.len() as u32,
            camera_bind_group: &self.camera_bind_group,
            occlusion_inputs_bind_group: &self.occlusion_inputs_bind_group,
            environment_bind_group: &self.environment_bind_group,
            lighting_bind_group: &self.lighting_bind_group,
        };

        self.graph.execute(&mut graph_ctx)?;

        self.queue.submit(Some(encoder.finish()));
        self.frame_count += 1;
        Ok(())
    }

    /// Rebuild every size-dependent target. The old targets stay in place if
    /// the new ones cannot be created.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!("cannot resize to {}x{}", width, height)));
        }
        log::info!("Resizing renderer to {}x{}", width, height);
        self.targets = FrameTargets::new(&self.device, &self.resources.bind_group_layouts, width, height)?;
        self.config.width = width;
        self.config.height = height;
        Ok(())
    }

    /// Replace the environment cubemap used by the skybox and the
    /// directional estimator
    pub fn set_environment(&mut self, cubemap: GpuTexture) {
        self.environment_bind_group = self.resources.create_environment_bind_group(&cubemap.view);
        self.environment = cubemap;
    }

    /// Depth written by the geometry pass
    pub fn gbuffer_depth_texture(&self) -> &wgpu::Texture {
        &self.targets.gbuffer.depth.texture
    }

    /// Depth the overlay tests against
    pub fn display_depth_texture(&self) -> &wgpu::Texture {
        &self.targets.display_depth.texture
    }

    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    pub fn kernel(&self) -> &OcclusionKernel {
        &self.kernel
    }

    pub fn noise(&self) -> &NoiseTile {
        &self.noise
    }

    pub fn environment(&self) -> &GpuTexture {
        &self.environment
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn size(&self) -> (u32, u32) {
        self.targets.size()
    }

    pub fn frame_count(&self) -> u64 { self.frame_count }
    pub fn resources(&self) -> &ResourceManager { &self.resources }
    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<OcclusionParams>(), 16);
        assert_eq!(std::mem::size_of::<LightingParams>(), 32);
        assert_eq!(std::mem::size_of::<GpuLight>(), 32);
    }
}
