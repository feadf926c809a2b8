//! Geometry pass – rasterizes the model into the G-buffer

use crate::config::{PLAIN_ALBEDO, PLAIN_SPECULAR};
use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::pipeline::{depth_state, replace_target, PipelineCache, PipelineSpec, ShaderDefine, ShaderDefines, VertexInput};
use crate::resources::{targets, BindGroupLayouts};
use crate::variant::StageFlags;
use crate::{shaders, Result};
use std::sync::Arc;

/// Writes view-space position, normal and albedo+specular for every
/// covered pixel, plus depth
pub struct GeometryPass {
    textured: Arc<wgpu::RenderPipeline>,
    plain: Arc<wgpu::RenderPipeline>,
}

impl GeometryPass {
    pub fn new(cache: &mut PipelineCache, layouts: &BindGroupLayouts) -> Result<Self> {
        let textured = Self::build_pipeline(cache, layouts, false)?;
        let plain = Self::build_pipeline(cache, layouts, true)?;
        Ok(Self { textured, plain })
    }

    fn build_pipeline(
        cache: &mut PipelineCache,
        layouts: &BindGroupLayouts,
        plain: bool,
    ) -> Result<Arc<wgpu::RenderPipeline>> {
        let mut defines = ShaderDefines::new();
        defines.insert("PLAIN_ALBEDO".into(), ShaderDefine::Bool(plain));
        defines.insert("PLAIN_SHADE".into(), ShaderDefine::F32(PLAIN_ALBEDO));
        defines.insert("PLAIN_SPECULAR".into(), ShaderDefine::F32(PLAIN_SPECULAR));

        cache.get_or_create(&PipelineSpec {
            shader_id: "geometry",
            source: shaders::GEOMETRY,
            defines: &defines,
            bind_group_layouts: &[&layouts.camera, &layouts.material],
            vertex: VertexInput::Mesh,
            color_targets: &[
                replace_target(targets::POSITION_FORMAT),
                replace_target(targets::NORMAL_FORMAT),
                replace_target(targets::ALBEDO_FORMAT),
            ],
            depth_stencil: Some(depth_state(wgpu::CompareFunction::Less, true)),
            cull_mode: None,
        })
    }
}

fn clear(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            // Zero w marks background texels for the full-screen passes
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

impl RenderPass for GeometryPass {
    fn name(&self) -> &str {
        "geometry"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::GEOMETRY
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.write(names::GBUFFER).write(names::GBUFFER_DEPTH);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let targets = ctx.targets;
        let gbuffer = &targets.gbuffer;
        let camera_bg = ctx.camera_bind_group;
        let model = ctx.model;
        let pipeline = if ctx.plain_model { &self.plain } else { &self.textured };

        let [position, normal, albedo] = gbuffer.color_views();
        let mut pass = ctx.begin_render_pass(
            "Geometry Pass",
            &[clear(position), clear(normal), clear(albedo)],
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
        );

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, camera_bg, &[]);
        model.draw(&mut pass, 1);

        Ok(())
    }
}
