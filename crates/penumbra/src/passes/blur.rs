//! Blur pass – box filter over one noise-tile period

use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::pipeline::{replace_target, PipelineCache, PipelineSpec, ShaderDefine, ShaderDefines};
use crate::resources::{targets, BindGroupLayouts};
use crate::variant::StageFlags;
use crate::{shaders, Result};
use std::sync::Arc;

/// Smooths the raw occlusion buffer into the one lighting reads
pub struct BlurPass {
    pipeline: Arc<wgpu::RenderPipeline>,
}

impl BlurPass {
    /// `extent` matches the noise tile size so the tile pattern cancels out
    pub fn new(cache: &mut PipelineCache, layouts: &BindGroupLayouts, extent: u32) -> Result<Self> {
        let mut defines = ShaderDefines::new();
        defines.insert("BLUR_EXTENT".into(), ShaderDefine::U32(extent));

        let pipeline = cache.get_or_create(&PipelineSpec::full_screen(
            "blur",
            shaders::BLUR,
            &defines,
            &[&layouts.single_texture],
            &[replace_target(targets::OCCLUSION_FORMAT)],
        ))?;
        Ok(Self { pipeline })
    }
}

impl RenderPass for BlurPass {
    fn name(&self) -> &str {
        "blur"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::BLUR
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.read(names::OCCLUSION_RAW).write(names::OCCLUSION);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let targets = ctx.targets;

        let mut pass = ctx.begin_render_pass(
            "Blur Pass",
            &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.occlusion.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            None,
        );

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &targets.occlusion_raw_bind_group, &[]);
        pass.draw(0..3, 0..1);

        Ok(())
    }
}
