//! Pipeline variants and the occlusion strategy they select

use bitflags::bitflags;

bitflags! {
    /// Stages of the frame skeleton a variant executes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StageFlags: u32 {
        const GEOMETRY = 1 << 0;
        const OCCLUSION = 1 << 1;
        const BLUR = 1 << 2;
        const LIGHTING = 1 << 3;
        const DEPTH_TRANSPLANT = 1 << 4;
        const OVERLAY = 1 << 5;
    }
}

/// Which renderer the frame driver selected for this frame
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq)]
pub enum PipelineVariant {
    /// Deferred lighting only
    #[default]
    Plain,
    /// Screen-space ambient occlusion
    Ssao,
    /// Screen-space directional occlusion
    Ssdo,
    /// Directional occlusion modulated by ambient occlusion
    Combined,
}

impl PipelineVariant {
    pub const ALL: [PipelineVariant; 4] = [
        PipelineVariant::Plain,
        PipelineVariant::Ssao,
        PipelineVariant::Ssdo,
        PipelineVariant::Combined,
    ];

    pub fn strategy(self) -> OcclusionStrategy {
        match self {
            PipelineVariant::Plain => OcclusionStrategy::None,
            PipelineVariant::Ssao => OcclusionStrategy::Ambient,
            PipelineVariant::Ssdo => OcclusionStrategy::Directional,
            PipelineVariant::Combined => OcclusionStrategy::Combined,
        }
    }

    /// Stages that run for this variant. Plain skips occlusion and blur.
    pub fn stages(self) -> StageFlags {
        if self.strategy().runs_occlusion() {
            StageFlags::all()
        } else {
            StageFlags::all() - StageFlags::OCCLUSION - StageFlags::BLUR
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineVariant::Plain => "plain",
            PipelineVariant::Ssao => "ssao",
            PipelineVariant::Ssdo => "ssdo",
            PipelineVariant::Combined => "ssao+ssdo",
        }
    }
}

/// Per-pixel estimator run by the occlusion pass
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum OcclusionStrategy {
    None,
    Ambient,
    Directional,
    Combined,
}

impl OcclusionStrategy {
    pub fn runs_occlusion(self) -> bool {
        !matches!(self, OcclusionStrategy::None)
    }

    /// Value of the `ESTIMATOR` override in the occlusion shader
    pub fn estimator_id(self) -> u32 {
        match self {
            OcclusionStrategy::None => 0,
            OcclusionStrategy::Ambient => 1,
            OcclusionStrategy::Directional => 2,
            OcclusionStrategy::Combined => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_skips_occlusion_and_blur() {
        let stages = PipelineVariant::Plain.stages();
        assert!(!stages.contains(StageFlags::OCCLUSION));
        assert!(!stages.contains(StageFlags::BLUR));
        assert!(stages.contains(StageFlags::GEOMETRY | StageFlags::LIGHTING | StageFlags::OVERLAY));
    }

    #[test]
    fn occluded_variants_run_every_stage() {
        for variant in [PipelineVariant::Ssao, PipelineVariant::Ssdo, PipelineVariant::Combined] {
            assert_eq!(variant.stages(), StageFlags::all(), "{:?}", variant);
            assert!(variant.strategy().runs_occlusion());
        }
    }

    #[test]
    fn estimator_ids_are_distinct() {
        let mut ids: Vec<u32> = PipelineVariant::ALL
            .iter()
            .map(|v| v.strategy().estimator_id())
            .collect();
        ids.dedup();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
