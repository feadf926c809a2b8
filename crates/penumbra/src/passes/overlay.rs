//! Overlay pass – forward-rendered light markers and skybox

use crate::graph::{names, PassContext, PassResourceBuilder, RenderPass};
use crate::mesh::GpuMesh;
use crate::pipeline::{depth_state, replace_target, PipelineCache, PipelineSpec, ShaderDefines, VertexInput};
use crate::resources::BindGroupLayouts;
use crate::variant::StageFlags;
use crate::{shaders, Result};
use std::sync::Arc;

/// Draws one unlit cube per light, then the skybox behind everything.
///
/// Both test against the transplanted display depth. Depth state is part of
/// each pipeline, so the skybox's LessEqual/no-write state never leaks into
/// the next frame.
pub struct OverlayPass {
    marker_pipeline: Arc<wgpu::RenderPipeline>,
    skybox_pipeline: Arc<wgpu::RenderPipeline>,
    cube: GpuMesh,
    /// One `MarkerInstance` per light, written by the renderer each frame
    instance_buffer: Arc<wgpu::Buffer>,
}

impl OverlayPass {
    pub fn new(
        cache: &mut PipelineCache,
        layouts: &BindGroupLayouts,
        surface_format: wgpu::TextureFormat,
        cube: GpuMesh,
        instance_buffer: Arc<wgpu::Buffer>,
    ) -> Result<Self> {
        let defines = ShaderDefines::new();
        let color_targets = [replace_target(surface_format)];

        let marker_pipeline = cache.get_or_create(&PipelineSpec {
            shader_id: "light_marker",
            source: shaders::LIGHT_MARKER,
            defines: &defines,
            bind_group_layouts: &[&layouts.camera],
            vertex: VertexInput::InstancedPositions,
            color_targets: &color_targets,
            depth_stencil: Some(depth_state(wgpu::CompareFunction::Less, true)),
            cull_mode: Some(wgpu::Face::Back),
        })?;

        let skybox_pipeline = cache.get_or_create(&PipelineSpec {
            shader_id: "skybox",
            source: shaders::SKYBOX,
            defines: &defines,
            bind_group_layouts: &[&layouts.camera, &layouts.environment],
            vertex: VertexInput::Positions,
            color_targets: &color_targets,
            // Passes only where nothing was drawn (depth still 1.0)
            depth_stencil: Some(depth_state(wgpu::CompareFunction::LessEqual, false)),
            cull_mode: None,
        })?;

        Ok(Self {
            marker_pipeline,
            skybox_pipeline,
            cube,
            instance_buffer,
        })
    }
}

impl RenderPass for OverlayPass {
    fn name(&self) -> &str {
        "overlay"
    }

    fn stage(&self) -> StageFlags {
        StageFlags::OVERLAY
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder
            .read(names::LIT_COLOR)
            .read(names::DISPLAY_DEPTH)
            .write(names::FINAL_COLOR);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let targets = ctx.targets;
        let target = ctx.target;
        let camera_bg = ctx.camera_bind_group;
        let environment_bg = ctx.environment_bind_group;
        let count = ctx.light_count;

        let mut pass = ctx.begin_render_pass(
            "Overlay Pass",
            &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.display_depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
        );

        pass.set_bind_group(0, camera_bg, &[]);
        self.cube.bind(&mut pass, 0);

        if count > 0 {
            pass.set_pipeline(&self.marker_pipeline);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            pass.draw_indexed(0..self.cube.index_count, 0, 0..count);
        }

        pass.set_pipeline(&self.skybox_pipeline);
        pass.set_bind_group(1, environment_bg, &[]);
        pass.draw_indexed(0..self.cube.index_count, 0, 0..1);

        Ok(())
    }
}
