/// Barrier strategies
///
/// A strategy turns a [`BarrierPlan`] into the barrier structures of one
/// native API. It is chosen once per device from its capabilities and then
/// held as an immutable field by every command list of that device.

use crate::barrier::native::{
    barrier_access, barrier_layout, barrier_sync, resource_states, subresource_index,
    BarrierAccess, BarrierLayout, BarrierSync, ResourceStates, ALL_SUBRESOURCES,
};
use crate::barrier::translator::{BarrierKind, BarrierPlan, TransferHalf};
use crate::config::RhiConfiguration;
use crate::device::DeviceCapabilities;
use crate::error::Result;
use crate::types::QueueType;

pub trait BarrierStrategy: Send + Sync {
    type Output;

    fn name(&self) -> &'static str;

    /// Whether one mip/layer can be transitioned on its own
    fn supports_subresource_barriers(&self) -> bool;

    fn translate(&self, plan: &BarrierPlan, queue: QueueType) -> Result<Self::Output>;
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyBarrier {
    Transition {
        resource: u64,
        subresource: u32,
        before: ResourceStates,
        after: ResourceStates,
    },
    /// `None` waits for all outstanding UAV writes
    Uav { resource: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalBarrier {
    pub sync_before: BarrierSync,
    pub sync_after: BarrierSync,
    pub access_before: BarrierAccess,
    pub access_after: BarrierAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBarrier {
    pub resource: u64,
    pub offset: u64,
    pub size: u64,
    pub sync_before: BarrierSync,
    pub sync_after: BarrierSync,
    pub access_before: BarrierAccess,
    pub access_after: BarrierAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceRange {
    pub first_mip_level: u32,
    pub num_mip_levels: u32,
    pub first_array_slice: u32,
    pub num_array_slices: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBarrier {
    pub resource: u64,
    pub subresources: SubresourceRange,
    pub sync_before: BarrierSync,
    pub sync_after: BarrierSync,
    pub access_before: BarrierAccess,
    pub access_after: BarrierAccess,
    pub layout_before: BarrierLayout,
    pub layout_after: BarrierLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierGroup {
    Global(Vec<GlobalBarrier>),
    Buffer(Vec<BufferBarrier>),
    Texture(Vec<TextureBarrier>),
}

/// What one `pipeline_barrier` call records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierBatch {
    Legacy(Vec<LegacyBarrier>),
    Enhanced(Vec<BarrierGroup>),
}

impl BarrierBatch {
    pub fn is_empty(&self) -> bool {
        match self {
            BarrierBatch::Legacy(barriers) => barriers.is_empty(),
            BarrierBatch::Enhanced(groups) => groups.is_empty(),
        }
    }
}

// ============================================================================
// Legacy: whole-state transitions plus UAV barriers
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyBarrierStrategy;

impl BarrierStrategy for LegacyBarrierStrategy {
    type Output = BarrierBatch;

    fn name(&self) -> &'static str {
        "legacy"
    }

    fn supports_subresource_barriers(&self) -> bool {
        true
    }

    fn translate(&self, plan: &BarrierPlan, _queue: QueueType) -> Result<BarrierBatch> {
        let mut barriers = Vec::with_capacity(plan.len());

        for texture in &plan.textures {
            let resource = texture.resource.native_handle();
            if texture.kind == BarrierKind::Hazard {
                barriers.push(LegacyBarrier::Uav { resource: Some(resource) });
                continue;
            }
            let desc = texture.resource.desc();
            let subresource = texture.subresource
                .map(|s| subresource_index(s.mip_level, s.array_layer, 0, desc.mip_levels, desc.array_size))
                .unwrap_or(ALL_SUBRESOURCES);
            let before = resource_states(texture.old_state);
            let after = resource_states(texture.new_state);
            if before != after {
                barriers.push(LegacyBarrier::Transition { resource, subresource, before, after });
            }
        }

        for buffer in &plan.buffers {
            let resource = buffer.resource.native_handle();
            if buffer.kind == BarrierKind::Hazard {
                barriers.push(LegacyBarrier::Uav { resource: Some(resource) });
                continue;
            }
            let before = resource_states(buffer.old_state);
            let after = resource_states(buffer.new_state);
            if before != after {
                barriers.push(LegacyBarrier::Transition {
                    resource,
                    subresource: ALL_SUBRESOURCES,
                    before,
                    after,
                });
            }
        }

        // Legacy barriers have no global transition; a memory dependency is
        // expressed as a UAV barrier on every resource.
        if !plan.memory.is_empty() {
            barriers.push(LegacyBarrier::Uav { resource: None });
        }

        Ok(BarrierBatch::Legacy(barriers))
    }
}

// ============================================================================
// Enhanced: separately synchronized barrier groups
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedBarrierStrategy;

impl BarrierStrategy for EnhancedBarrierStrategy {
    type Output = BarrierBatch;

    fn name(&self) -> &'static str {
        "enhanced"
    }

    fn supports_subresource_barriers(&self) -> bool {
        true
    }

    fn translate(&self, plan: &BarrierPlan, queue: QueueType) -> Result<BarrierBatch> {
        let global: Vec<GlobalBarrier> = plan.memory.iter()
            .map(|memory| GlobalBarrier {
                sync_before: barrier_sync(memory.old_state),
                sync_after: barrier_sync(memory.new_state),
                access_before: barrier_access(memory.old_state),
                access_after: barrier_access(memory.new_state),
            })
            .collect();

        let buffers: Vec<BufferBarrier> = plan.buffers.iter()
            .map(|buffer| BufferBarrier {
                resource: buffer.resource.native_handle(),
                offset: 0,
                size: buffer.resource.desc().num_bytes,
                sync_before: barrier_sync(buffer.old_state),
                sync_after: barrier_sync(buffer.new_state),
                access_before: barrier_access(buffer.old_state),
                access_after: barrier_access(buffer.new_state),
            })
            .collect();

        let mut textures = Vec::with_capacity(plan.textures.len());
        for texture in &plan.textures {
            let desc = texture.resource.desc();
            let subresources = match texture.subresource {
                Some(s) => SubresourceRange {
                    first_mip_level: s.mip_level,
                    num_mip_levels: 1,
                    first_array_slice: s.array_layer,
                    num_array_slices: 1,
                },
                None => SubresourceRange {
                    first_mip_level: 0,
                    num_mip_levels: desc.mip_levels,
                    first_array_slice: 0,
                    num_array_slices: desc.array_size.max(desc.depth),
                },
            };

            let (layout_before, layout_after) = match (texture.kind, texture.transfer) {
                (BarrierKind::Hazard, _) => {
                    let layout = barrier_layout(texture.new_state, queue);
                    (layout, layout)
                }
                // The Common side of a transfer must be readable by any queue
                (_, Some(transfer)) => match transfer.half {
                    TransferHalf::Release => (barrier_layout(texture.old_state, queue), BarrierLayout::Common),
                    TransferHalf::Acquire => (BarrierLayout::Common, barrier_layout(texture.new_state, queue)),
                },
                (BarrierKind::Transition, None) => (
                    barrier_layout(texture.old_state, queue),
                    barrier_layout(texture.new_state, queue),
                ),
            };

            textures.push(TextureBarrier {
                resource: texture.resource.native_handle(),
                subresources,
                sync_before: barrier_sync(texture.old_state),
                sync_after: barrier_sync(texture.new_state),
                access_before: barrier_access(texture.old_state),
                access_after: barrier_access(texture.new_state),
                layout_before,
                layout_after,
            });
        }

        let mut groups = Vec::with_capacity(3);
        if !global.is_empty() {
            groups.push(BarrierGroup::Global(global));
        }
        if !buffers.is_empty() {
            groups.push(BarrierGroup::Buffer(buffers));
        }
        if !textures.is_empty() {
            groups.push(BarrierGroup::Texture(textures));
        }
        Ok(BarrierBatch::Enhanced(groups))
    }
}

/// Strategy for a device, decided once from its capabilities
pub fn select_barrier_strategy(
    capabilities: &DeviceCapabilities,
    config: &RhiConfiguration,
) -> Box<dyn BarrierStrategy<Output = BarrierBatch>> {
    if capabilities.enhanced_barriers && config.use_enhanced_barriers {
        Box::new(EnhancedBarrierStrategy)
    } else {
        Box::new(LegacyBarrierStrategy)
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
