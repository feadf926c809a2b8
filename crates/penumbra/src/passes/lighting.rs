//! Lighting pass – deferred point-light composition

use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::pipeline::{replace_target, PipelineCache, PipelineSpec, ShaderDefine, ShaderDefines};
use crate::resources::BindGroupLayouts;
use crate::variant::StageFlags;
use crate::{shaders, Result};
use std::sync::Arc;

/// Composes every light over the G-buffer into the display target.
/// Background pixels are written black; the overlay fills them with sky.
pub struct LightingPass {
    occluded: Arc<wgpu::RenderPipeline>,
    unoccluded: Arc<wgpu::RenderPipeline>,
}

impl LightingPass {
    pub fn new(
        cache: &mut PipelineCache,
        layouts: &BindGroupLayouts,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let mut build = |occlusion: bool| {
            let mut defines = ShaderDefines::new();
            defines.insert("OCCLUSION_ENABLED".into(), ShaderDefine::Bool(occlusion));

            cache.get_or_create(&PipelineSpec::full_screen(
                "lighting",
                shaders::LIGHTING,
                &defines,
                &[
                    &layouts.camera,
                    &layouts.gbuffer,
                    &layouts.single_texture,
                    &layouts.lighting,
                ],
                &[replace_target(surface_format)],
            ))
        };

        Ok(Self {
            occluded: build(true)?,
            unoccluded: build(false)?,
        })
    }
}

impl RenderPass for LightingPass {
    fn name(&self) -> &str {
        "lighting"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::LIGHTING
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder
            .read(names::GBUFFER)
            .read(names::OCCLUSION)
            .write(names::LIT_COLOR);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let targets = ctx.targets;
        let target = ctx.target;
        let camera_bg = ctx.camera_bind_group;
        let lighting_bg = ctx.lighting_bind_group;
        let pipeline = if ctx.strategy.runs_occlusion() {
            &self.occluded
        } else {
            &self.unoccluded
        };

        let mut pass = ctx.begin_render_pass(
            "Lighting Pass",
            &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            None,
        );

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, camera_bg, &[]);
        pass.set_bind_group(1, &targets.gbuffer_bind_group, &[]);
        // Bound for the plain variant too; the unoccluded pipeline never reads it
        pass.set_bind_group(2, &targets.occlusion_bind_group, &[]);
        pass.set_bind_group(3, lighting_bg, &[]);
        pass.draw(0..3, 0..1);

        Ok(())
    }
}
