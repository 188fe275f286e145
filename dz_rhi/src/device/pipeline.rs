/// Pipeline state objects

use std::sync::Arc;
use crate::binding::RootSignature;
use crate::shader::{CompiledShader, InputLayoutDesc};
use crate::types::Format;

/// Where a pipeline binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindPoint {
    #[default]
    Graphics,
    Compute,
    RayTracing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// Fixed-function state of a graphics pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineDesc {
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub render_target_formats: Vec<Format>,
    pub depth_stencil_format: Format,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for GraphicsPipelineDesc {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            render_target_formats: vec![Format::B8G8R8A8Unorm],
            depth_stencil_format: Format::Undefined,
            depth_test: false,
            depth_write: false,
        }
    }
}

#[derive(Clone)]
pub struct PipelineDesc {
    pub bind_point: BindPoint,
    pub root_signature: Arc<dyn RootSignature>,
    pub input_layout: InputLayoutDesc,
    pub shaders: Vec<CompiledShader>,
    pub graphics: GraphicsPipelineDesc,
}

pub trait Pipeline: Send + Sync {
    fn bind_point(&self) -> BindPoint;

    /// Signature the pipeline was created against
    fn root_signature(&self) -> &Arc<dyn RootSignature>;

    fn as_any(&self) -> &dyn std::any::Any;
}
