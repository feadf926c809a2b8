//! Depth transplant – hands G-buffer depth to the overlay

use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::pipeline::{depth_state, PipelineCache, PipelineSpec, ShaderDefines};
use crate::resources::BindGroupLayouts;
use crate::variant::StageFlags;
use crate::{shaders, Result};
use std::sync::Arc;

/// Rewrites the display depth buffer from the G-buffer depth so the forward
/// overlay is occluded by deferred geometry.
///
/// A full-screen draw writing `frag_depth` with `Always`; depth-to-depth
/// texture copies are unavailable on downlevel backends.
pub struct DepthTransplantPass {
    pipeline: Arc<wgpu::RenderPipeline>,
}

impl DepthTransplantPass {
    pub fn new(cache: &mut PipelineCache, layouts: &BindGroupLayouts) -> Result<Self> {
        let defines = ShaderDefines::new();
        let pipeline = cache.get_or_create(&PipelineSpec {
            depth_stencil: Some(depth_state(wgpu::CompareFunction::Always, true)),
            ..PipelineSpec::full_screen(
                "depth_transplant",
                shaders::DEPTH_TRANSPLANT,
                &defines,
                &[&layouts.depth_texture],
                &[],
            )
        })?;
        Ok(Self { pipeline })
    }
}

impl RenderPass for DepthTransplantPass {
    fn name(&self) -> &str {
        "depth_transplant"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::DEPTH_TRANSPLANT
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        // Reading lit_color orders the transplant after lighting
        builder
            .read(names::GBUFFER_DEPTH)
            .read(names::LIT_COLOR)
            .write(names::DISPLAY_DEPTH);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let targets = ctx.targets;

        let mut pass = ctx.begin_render_pass(
            "Depth Transplant Pass",
            &[],
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.display_depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
        );

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &targets.gbuffer_depth_bind_group, &[]);
        pass.draw(0..3, 0..1);

        Ok(())
    }
}
