//! Render pass trait and execution context

use crate::mesh::Model;
use crate::resources::{FrameTargets, ResourceManager};
use crate::variant::{OcclusionStrategy, StageFlags};
use crate::Result;
use super::PassResourceBuilder;

/// Render pass trait - implemented by all rendering passes
pub trait RenderPass: Send + Sync {
    /// Unique name for this pass
    fn name(&self) -> &str;

    /// Stage this pass implements; skipped when the variant disables it
    fn stage(&self) -> StageFlags;

    /// Declare resource dependencies
    ///
    /// Called once during graph building to determine pass ordering.
    fn declare_resources(&self, _builder: &mut PassResourceBuilder) {}

    /// Execute the pass
    ///
    /// Called every frame during graph execution. Every bind group the pass
    /// uses must be set here; nothing carries over from an earlier pass.
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()>;
}

/// Context for pass execution
pub struct PassContext<'a> {
    /// Command encoder for recording GPU commands
    pub encoder: &'a mut wgpu::CommandEncoder,

    /// Resource manager for accessing GPU resources
    pub resources: &'a ResourceManager,

    /// G-buffer, occlusion and display-depth targets
    pub targets: &'a FrameTargets,

    /// Display color target
    pub target: &'a wgpu::TextureView,

    /// Model drawn by the geometry pass
    pub model: &'a Model,

    /// Group 0 – camera, shared by all passes
    pub camera_bind_group: &'a wgpu::BindGroup,

    /// Kernel, noise tile and estimator parameters
    pub occlusion_inputs_bind_group: &'a wgpu::BindGroup,

    /// Skybox cubemap + sampler
    pub environment_bind_group: &'a wgpu::BindGroup,

    /// Lights + composer parameters
    pub lighting_bind_group: &'a wgpu::BindGroup,

    /// Estimator selected for this frame
    pub strategy: OcclusionStrategy,

    /// Flat albedo instead of material textures
    pub plain_model: bool,

    /// Number of light markers to draw
    pub light_count: u32,
}

impl<'a> PassContext<'a> {
    /// Begin a render pass
    pub fn begin_render_pass(
        &mut self,
        label: &str,
        color_attachments: &[Option<wgpu::RenderPassColorAttachment>],
        depth_stencil_attachment: Option<wgpu::RenderPassDepthStencilAttachment>,
    ) -> wgpu::RenderPass<'_> {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}
