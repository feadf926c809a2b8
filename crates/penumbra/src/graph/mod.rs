//! Render graph system with automatic dependency resolution
//!
//! The render graph orders passes from the resources they read and write.
//! Every logical resource has exactly one writer per frame.

mod pass;
mod resource;

pub use pass::{PassContext, RenderPass};
pub use resource::{names, PassId, ResourceHandle};

use crate::mesh::Model;
use crate::resources::{FrameTargets, ResourceManager};
use crate::variant::{OcclusionStrategy, StageFlags};
use crate::{Error, Result};
use std::collections::{HashMap, VecDeque};

/// Render graph for automatic pass ordering
pub struct RenderGraph {
    passes: Vec<PassNode>,
    execution_order: Vec<usize>,
}

struct PassNode {
    pass: Box<dyn RenderPass>,
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            execution_order: Vec::new(),
        }
    }

    /// Add a pass to the graph
    pub fn add_pass(&mut self, pass: impl RenderPass + 'static) -> PassId {
        let id = PassId(self.passes.len());

        // Get resource declarations from the pass
        let mut builder = PassResourceBuilder::new();
        pass.declare_resources(&mut builder);

        let node = PassNode {
            pass: Box::new(pass),
            reads: builder.reads,
            writes: builder.writes,
        };

        self.passes.push(node);
        id
    }

    /// Build the graph - resolve dependencies and determine execution order
    pub fn build(&mut self) -> Result<()> {
        log::info!("Building render graph with {} passes", self.passes.len());

        // Collect ALL resource writers before building edges so ordering is
        // independent of registration order.
        let mut resource_writers: HashMap<ResourceHandle, usize> = HashMap::new();
        for (i, pass) in self.passes.iter().enumerate() {
            for &resource in &pass.writes {
                if let Some(&other) = resource_writers.get(&resource) {
                    if other != i {
                        return Err(Error::Graph(format!(
                            "passes '{}' and '{}' both write {:?}",
                            self.passes[other].pass.name(),
                            pass.pass.name(),
                            resource
                        )));
                    }
                }
                resource_writers.insert(resource, i);
            }
        }

        let mut in_degree = vec![0; self.passes.len()];
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); self.passes.len()];

        for (i, pass) in self.passes.iter().enumerate() {
            for &resource in &pass.reads {
                if let Some(&writer_idx) = resource_writers.get(&resource) {
                    adj_list[writer_idx].push(i);
                    in_degree[i] += 1;
                }
            }
        }

        // Kahn's algorithm, FIFO to preserve insertion order
        let mut queue: VecDeque<usize> = (0..self.passes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut order = Vec::new();

        while let Some(node) = queue.pop_front() {
            order.push(node);

            for &neighbor in &adj_list[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if order.len() != self.passes.len() {
            return Err(Error::Graph(
                "Cyclic dependency detected in render graph".to_string()
            ));
        }

        self.execution_order = order;

        for (i, &pass_idx) in self.execution_order.iter().enumerate() {
            log::debug!(
                "  Pass {}: {}",
                i,
                self.passes[pass_idx].pass.name()
            );
        }

        log::info!("Render graph built successfully");
        Ok(())
    }

    /// Pass names in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .map(|&i| self.passes[i].pass.name())
            .collect()
    }

    /// Execute the render graph, skipping passes whose stage is inactive
    pub fn execute(&mut self, ctx: &mut GraphContext) -> Result<()> {
        log::trace!("Executing render graph (frame {})", ctx.frame);

        for &pass_idx in &self.execution_order {
            let node = &mut self.passes[pass_idx];
            if !ctx.stages.contains(node.pass.stage()) {
                log::trace!("  Skipping pass: {}", node.pass.name());
                continue;
            }
            log::trace!("  Executing pass: {}", node.pass.name());

            let mut pass_ctx = PassContext {
                encoder: &mut *ctx.encoder,
                resources: ctx.resources,
                targets: ctx.targets,
                target: ctx.target,
                model: ctx.model,
                camera_bind_group: ctx.camera_bind_group,
                occlusion_inputs_bind_group: ctx.occlusion_inputs_bind_group,
                environment_bind_group: ctx.environment_bind_group,
                lighting_bind_group: ctx.lighting_bind_group,
                strategy: ctx.strategy,
                plain_model: ctx.plain_model,
                light_count: ctx.light_count,
            };

            node.pass.execute(&mut pass_ctx)?;
        }

        Ok(())
    }
}

/// Context for graph execution
pub struct GraphContext<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub resources: &'a ResourceManager,
    pub targets: &'a FrameTargets,
    pub target: &'a wgpu::TextureView,
    pub model: &'a Model,
    pub frame: u64,
    /// Stages enabled for this frame's variant
    pub stages: StageFlags,
    pub strategy: OcclusionStrategy,
    pub plain_model: bool,
    pub light_count: u32,
    pub camera_bind_group: &'a wgpu::BindGroup,
    pub occlusion_inputs_bind_group: &'a wgpu::BindGroup,
    pub environment_bind_group: &'a wgpu::BindGroup,
    pub lighting_bind_group: &'a wgpu::BindGroup,
}

/// Builder for declaring pass resource dependencies
pub struct PassResourceBuilder {
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
}

impl PassResourceBuilder {
    fn new() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Declare that this pass reads a resource
    pub fn read(&mut self, resource: &str) -> &mut Self {
        self.reads.push(ResourceHandle::named(resource));
        self
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: &str) -> &mut Self {
        self.writes.push(ResourceHandle::named(resource));
        self
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}
