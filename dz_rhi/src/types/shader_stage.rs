/// Shader stages and stage-visibility masks

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A single pipeline stage (or a stage group used for visibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Compute,
    Raygen,
    AnyHit,
    ClosestHit,
    Miss,
    Intersection,
    Callable,
    Mesh,
    Task,
    AllGraphics,
    All,
}

impl ShaderStage {
    /// DXC target profile (shader model 6.6)
    ///
    /// Stage groups cannot be compiled and return `None`.
    pub fn target_profile(self) -> Option<&'static str> {
        let profile = match self {
            ShaderStage::Vertex => "vs_6_6",
            ShaderStage::Hull => "hs_6_6",
            ShaderStage::Domain => "ds_6_6",
            ShaderStage::Geometry => "gs_6_6",
            ShaderStage::Pixel => "ps_6_6",
            ShaderStage::Compute => "cs_6_6",
            ShaderStage::Mesh => "ms_6_6",
            ShaderStage::Task => "as_6_6",
            ShaderStage::Raygen
            | ShaderStage::AnyHit
            | ShaderStage::ClosestHit
            | ShaderStage::Miss
            | ShaderStage::Intersection
            | ShaderStage::Callable => "lib_6_6",
            ShaderStage::AllGraphics | ShaderStage::All => return None,
        };
        Some(profile)
    }

    /// Ray-tracing library stage
    pub fn is_ray_tracing(self) -> bool {
        matches!(
            self,
            ShaderStage::Raygen
                | ShaderStage::AnyHit
                | ShaderStage::ClosestHit
                | ShaderStage::Miss
                | ShaderStage::Intersection
                | ShaderStage::Callable
        )
    }

    /// Visibility mask covering this stage
    pub fn stages(self) -> ShaderStages {
        match self {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Hull => ShaderStages::HULL,
            ShaderStage::Domain => ShaderStages::DOMAIN,
            ShaderStage::Geometry => ShaderStages::GEOMETRY,
            ShaderStage::Pixel => ShaderStages::PIXEL,
            ShaderStage::Compute => ShaderStages::COMPUTE,
            ShaderStage::Raygen => ShaderStages::RAYGEN,
            ShaderStage::AnyHit => ShaderStages::ANY_HIT,
            ShaderStage::ClosestHit => ShaderStages::CLOSEST_HIT,
            ShaderStage::Miss => ShaderStages::MISS,
            ShaderStage::Intersection => ShaderStages::INTERSECTION,
            ShaderStage::Callable => ShaderStages::CALLABLE,
            ShaderStage::Mesh => ShaderStages::MESH,
            ShaderStage::Task => ShaderStages::TASK,
            ShaderStage::AllGraphics => ShaderStages::ALL_GRAPHICS,
            ShaderStage::All => ShaderStages::all(),
        }
    }
}

bitflags! {
    /// Set of stages a binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const HULL = 1 << 1;
        const DOMAIN = 1 << 2;
        const GEOMETRY = 1 << 3;
        const PIXEL = 1 << 4;
        const COMPUTE = 1 << 5;
        const RAYGEN = 1 << 6;
        const ANY_HIT = 1 << 7;
        const CLOSEST_HIT = 1 << 8;
        const MISS = 1 << 9;
        const INTERSECTION = 1 << 10;
        const CALLABLE = 1 << 11;
        const MESH = 1 << 12;
        const TASK = 1 << 13;

        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::HULL.bits()
            | Self::DOMAIN.bits()
            | Self::GEOMETRY.bits()
            | Self::PIXEL.bits()
            | Self::MESH.bits()
            | Self::TASK.bits();
        const ALL_RAY_TRACING = Self::RAYGEN.bits()
            | Self::ANY_HIT.bits()
            | Self::CLOSEST_HIT.bits()
            | Self::MISS.bits()
            | Self::INTERSECTION.bits()
            | Self::CALLABLE.bits();
    }
}

impl ShaderStages {
    /// Visible to exactly one stage
    pub fn single_stage(self) -> Option<ShaderStage> {
        const SINGLE: [(ShaderStages, ShaderStage); 14] = [
            (ShaderStages::VERTEX, ShaderStage::Vertex),
            (ShaderStages::HULL, ShaderStage::Hull),
            (ShaderStages::DOMAIN, ShaderStage::Domain),
            (ShaderStages::GEOMETRY, ShaderStage::Geometry),
            (ShaderStages::PIXEL, ShaderStage::Pixel),
            (ShaderStages::COMPUTE, ShaderStage::Compute),
            (ShaderStages::RAYGEN, ShaderStage::Raygen),
            (ShaderStages::ANY_HIT, ShaderStage::AnyHit),
            (ShaderStages::CLOSEST_HIT, ShaderStage::ClosestHit),
            (ShaderStages::MISS, ShaderStage::Miss),
            (ShaderStages::INTERSECTION, ShaderStage::Intersection),
            (ShaderStages::CALLABLE, ShaderStage::Callable),
            (ShaderStages::MESH, ShaderStage::Mesh),
            (ShaderStages::TASK, ShaderStage::Task),
        ];
        SINGLE.iter().find(|(mask, _)| *mask == self).map(|(_, stage)| *stage)
    }
}

#[cfg(test)]
#[path = "shader_stage_tests.rs"]
mod tests;
