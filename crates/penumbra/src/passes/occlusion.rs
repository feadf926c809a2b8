//! Occlusion pass – screen-space ambient / directional occlusion

use crate::config::OcclusionSettings;
use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::pipeline::{replace_target, PipelineCache, PipelineSpec, ShaderDefine, ShaderDefines};
use crate::resources::{targets, BindGroupLayouts};
use crate::variant::{OcclusionStrategy, StageFlags};
use crate::{shaders, Result};
use std::sync::Arc;

/// Evaluates the frame's estimator into the raw occlusion buffer
pub struct OcclusionPass {
    ambient: Arc<wgpu::RenderPipeline>,
    directional: Arc<wgpu::RenderPipeline>,
    combined: Arc<wgpu::RenderPipeline>,
}

impl OcclusionPass {
    pub fn new(
        cache: &mut PipelineCache,
        layouts: &BindGroupLayouts,
        settings: &OcclusionSettings,
    ) -> Result<Self> {
        let mut build = |strategy: OcclusionStrategy| {
            let mut defines = ShaderDefines::new();
            defines.insert("ESTIMATOR".into(), ShaderDefine::U32(strategy.estimator_id()));
            defines.insert("KERNEL_SIZE".into(), ShaderDefine::U32(settings.kernel_size));
            defines.insert("NOISE_TILE_SIZE".into(), ShaderDefine::U32(settings.noise_tile_size));

            cache.get_or_create(&PipelineSpec::full_screen(
                "occlusion",
                shaders::OCCLUSION,
                &defines,
                &[
                    &layouts.camera,
                    &layouts.gbuffer,
                    &layouts.occlusion_inputs,
                    &layouts.environment,
                ],
                &[replace_target(targets::OCCLUSION_FORMAT)],
            ))
        };

        Ok(Self {
            ambient: build(OcclusionStrategy::Ambient)?,
            directional: build(OcclusionStrategy::Directional)?,
            combined: build(OcclusionStrategy::Combined)?,
        })
    }

    fn pipeline(&self, strategy: OcclusionStrategy) -> Option<&Arc<wgpu::RenderPipeline>> {
        match strategy {
            OcclusionStrategy::None => None,
            OcclusionStrategy::Ambient => Some(&self.ambient),
            OcclusionStrategy::Directional => Some(&self.directional),
            OcclusionStrategy::Combined => Some(&self.combined),
        }
    }
}

impl RenderPass for OcclusionPass {
    fn name(&self) -> &str {
        "occlusion"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::OCCLUSION
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.read(names::GBUFFER).write(names::OCCLUSION_RAW);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let Some(pipeline) = self.pipeline(ctx.strategy) else {
            return Ok(());
        };

        let targets = ctx.targets;
        let camera_bg = ctx.camera_bind_group;
        let inputs_bg = ctx.occlusion_inputs_bind_group;
        let environment_bg = ctx.environment_bind_group;

        let mut pass = ctx.begin_render_pass(
            "Occlusion Pass",
            &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.occlusion_raw.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            None,
        );

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, camera_bg, &[]);
        pass.set_bind_group(1, &targets.gbuffer_bind_group, &[]);
        pass.set_bind_group(2, inputs_bg, &[]);
        pass.set_bind_group(3, environment_bg, &[]);
        pass.draw(0..3, 0..1);

        Ok(())
    }
}
