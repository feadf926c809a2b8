//! Pipeline management system

mod cache;
mod spec;

pub use cache::{apply_defines, PipelineCache, PipelineKey};
pub use spec::{depth_state, replace_target, PipelineSpec, ShaderDefine, ShaderDefines, VertexInput};
