//! Resource management for graph

/// Pass identifier
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct PassId(pub usize);

/// Resource handle for graph resources
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    /// Create a named resource handle (deterministic)
    pub fn named(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Logical resources exchanged between the frame passes
pub mod names {
    pub const GBUFFER: &str = "gbuffer";
    pub const GBUFFER_DEPTH: &str = "gbuffer_depth";
    pub const OCCLUSION_RAW: &str = "occlusion_raw";
    pub const OCCLUSION: &str = "occlusion";
    pub const LIT_COLOR: &str = "lit_color";
    pub const DISPLAY_DEPTH: &str = "display_depth";
    pub const FINAL_COLOR: &str = "final_color";
}
