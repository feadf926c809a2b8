//! Pipeline descriptions and shader specialization constants

use crate::light::MarkerInstance;
use crate::mesh::Vertex;
use std::collections::BTreeMap;

/// Shader specialization constant value
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderDefine {
    Bool(bool),
    U32(u32),
    F32(f32),
}

/// Ordered so the injected preamble (and the cache key) is deterministic
pub type ShaderDefines = BTreeMap<String, ShaderDefine>;

/// Vertex buffers a pipeline consumes
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum VertexInput {
    /// No buffers; the vertex shader emits a full-screen triangle
    FullScreen,
    /// `Vertex` buffer
    Mesh,
    /// Positions of a `Vertex` buffer only
    Positions,
    /// Positions plus a per-instance `MarkerInstance` buffer
    InstancedPositions,
}

impl VertexInput {
    pub fn layouts(self) -> &'static [wgpu::VertexBufferLayout<'static>] {
        const MESH: &[wgpu::VertexBufferLayout<'static>] = &[Vertex::LAYOUT];
        const POSITIONS: &[wgpu::VertexBufferLayout<'static>] = &[Vertex::POSITION_LAYOUT];
        const INSTANCED: &[wgpu::VertexBufferLayout<'static>] =
            &[Vertex::POSITION_LAYOUT, MarkerInstance::LAYOUT];
        match self {
            VertexInput::FullScreen => &[],
            VertexInput::Mesh => MESH,
            VertexInput::Positions => POSITIONS,
            VertexInput::InstancedPositions => INSTANCED,
        }
    }
}

/// Everything needed to build one render pipeline
pub struct PipelineSpec<'a> {
    /// Cache and debug label
    pub shader_id: &'a str,
    pub source: &'a str,
    pub defines: &'a ShaderDefines,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub vertex: VertexInput,
    pub color_targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
}

impl<'a> PipelineSpec<'a> {
    /// Full-screen pass writing a single color target without depth
    pub fn full_screen(
        shader_id: &'a str,
        source: &'a str,
        defines: &'a ShaderDefines,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
        color_targets: &'a [Option<wgpu::ColorTargetState>],
    ) -> Self {
        Self {
            shader_id,
            source,
            defines,
            bind_group_layouts,
            vertex: VertexInput::FullScreen,
            color_targets,
            depth_stencil: None,
            cull_mode: None,
        }
    }
}

/// Opaque color target of `format`
pub fn replace_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Depth32Float state with the given compare function
pub fn depth_state(compare: wgpu::CompareFunction, write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: wgpu::TextureFormat::Depth32Float,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
