//! Pipeline cache keyed by shader and specialization constants

use super::{PipelineSpec, ShaderDefine, ShaderDefines};
use crate::resources::capture_validation;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Key for pipeline cache lookup
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct PipelineKey {
    pub shader_id: String,
    /// Rendered override preamble
    pub defines: String,
}

/// Prepend WGSL `override` declarations for every define
pub fn apply_defines(source: &str, defines: &ShaderDefines) -> String {
    let mut result = render_defines(defines);
    result.push_str(source);
    result
}

fn render_defines(defines: &ShaderDefines) -> String {
    let mut result = String::new();
    for (name, value) in defines {
        match value {
            ShaderDefine::Bool(b) => {
                result.push_str(&format!("override {}: bool = {};\n", name, b));
            }
            ShaderDefine::U32(u) => {
                result.push_str(&format!("override {}: u32 = {}u;\n", name, u));
            }
            ShaderDefine::F32(f) => {
                // Debug formatting keeps the decimal point ("1.0", not "1").
                result.push_str(&format!("override {}: f32 = {:?};\n", name, f));
            }
        }
    }
    result
}

/// Pipeline cache; every build runs inside a validation scope so shader and
/// pipeline errors surface as `Error`s at construction time
pub struct PipelineCache {
    device: Arc<wgpu::Device>,
    cache: HashMap<PipelineKey, Arc<wgpu::RenderPipeline>>,
    surface_format: wgpu::TextureFormat,
}

impl PipelineCache {
    pub fn new(device: Arc<wgpu::Device>, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            cache: HashMap::new(),
            surface_format,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Get or create the pipeline described by `spec`
    pub fn get_or_create(&mut self, spec: &PipelineSpec) -> Result<Arc<wgpu::RenderPipeline>> {
        let key = PipelineKey {
            shader_id: spec.shader_id.to_string(),
            defines: render_defines(spec.defines),
        };

        if let Some(pipeline) = self.cache.get(&key) {
            log::trace!("Using cached pipeline: {}", key.shader_id);
            return Ok(pipeline.clone());
        }

        log::info!("Creating pipeline: {}", key.shader_id);
        log::debug!("  defines: {:?}", spec.defines);

        let device = &self.device;
        let processed_source = apply_defines(spec.source, spec.defines);

        let (shader_module, error) = capture_validation(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(spec.shader_id),
                source: wgpu::ShaderSource::Wgsl(processed_source.into()),
            })
        });
        if let Some(err) = error {
            return Err(Error::Shader(format!("{}: {}", spec.shader_id, err)));
        }

        let (pipeline, error) = capture_validation(device, || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{}_layout", spec.shader_id)),
                bind_group_layouts: spec.bind_group_layouts,
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(spec.shader_id),
                layout: Some(&layout),
                cache: None,
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    buffers: spec.vertex.layouts(),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    targets: spec.color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: spec.cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: spec.depth_stencil.clone(),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        });
        if let Some(err) = error {
            return Err(Error::Pipeline(format!("{}: {}", spec.shader_id, err)));
        }

        let pipeline = Arc::new(pipeline);
        self.cache.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the pipeline cache
    pub fn clear(&mut self) {
        log::info!("Clearing pipeline cache ({} pipelines)", self.cache.len());
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_are_prepended_as_overrides() {
        let mut defines = ShaderDefines::new();
        defines.insert("KERNEL_SIZE".into(), ShaderDefine::U32(32));
        defines.insert("PLAIN_ALBEDO".into(), ShaderDefine::Bool(true));
        defines.insert("RADIUS".into(), ShaderDefine::F32(1.0));

        let out = apply_defines("fn main() {}", &defines);
        assert_eq!(
            out,
            "override KERNEL_SIZE: u32 = 32u;\n\
             override PLAIN_ALBEDO: bool = true;\n\
             override RADIUS: f32 = 1.0;\n\
             fn main() {}"
        );
    }

    #[test]
    fn no_defines_leaves_source_untouched() {
        assert_eq!(apply_defines("x", &ShaderDefines::new()), "x");
    }

    #[test]
    fn float_defines_keep_fraction() {
        let mut defines = ShaderDefines::new();
        defines.insert("BIAS".into(), ShaderDefine::F32(0.025));
        assert!(apply_defines("", &defines).contains("= 0.025;"));
    }
}
