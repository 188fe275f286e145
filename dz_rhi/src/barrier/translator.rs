/// Barrier planning
///
/// `BarrierTranslator::plan` applies every backend-independent rule to a
/// [`PipelineBarrierDesc`]: normalization, self-transition elision, hazard
/// detection, cross-queue half transitions and validation. Strategies only
/// turn the resulting plan into native barriers.

use std::sync::Arc;
use crate::barrier::barrier_desc::PipelineBarrierDesc;
use crate::device::{BufferResource, TextureResource};
use crate::error::Result;
use crate::types::{QueueType, ResourceDescriptor, ResourceUsage};

/// Layout/state transition or same-state hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    Transition,
    /// UAV or acceleration-structure hazard; the native layout never changes
    Hazard,
}

/// Which half of a queue ownership transfer a list records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferHalf {
    /// `old -> Common` on the source queue
    Release,
    /// `Common -> new` on the destination queue
    Acquire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTransfer {
    pub source_queue: QueueType,
    pub destination_queue: QueueType,
    pub half: TransferHalf,
}

/// One mip of one array layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subresource {
    pub mip_level: u32,
    pub array_layer: u32,
}

#[derive(Clone)]
pub struct TextureBarrierPlan {
    pub resource: Arc<dyn TextureResource>,
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
    pub kind: BarrierKind,
    /// `None` covers every subresource
    pub subresource: Option<Subresource>,
    pub transfer: Option<QueueTransfer>,
}

#[derive(Clone)]
pub struct BufferBarrierPlan {
    pub resource: Arc<dyn BufferResource>,
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
    pub kind: BarrierKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBarrierPlan {
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
    pub kind: BarrierKind,
}

/// Validated, normalized barriers for one list on one queue
#[derive(Clone, Default)]
pub struct BarrierPlan {
    pub textures: Vec<TextureBarrierPlan>,
    pub buffers: Vec<BufferBarrierPlan>,
    pub memory: Vec<MemoryBarrierPlan>,
}

impl BarrierPlan {
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.buffers.is_empty() && self.memory.is_empty()
    }

    pub fn len(&self) -> usize {
        self.textures.len() + self.buffers.len() + self.memory.len()
    }
}

/// Same-state hazard pairs: UAV to UAV and AS write/read in either order
pub fn is_hazard(old_state: ResourceUsage, new_state: ResourceUsage) -> bool {
    let uav = ResourceUsage::UNORDERED_ACCESS;
    let as_read = ResourceUsage::ACCELERATION_STRUCTURE_READ;
    let as_write = ResourceUsage::ACCELERATION_STRUCTURE_WRITE;
    (old_state.contains(uav) && new_state.contains(uav))
        || (old_state == as_write && new_state == as_read)
        || (old_state == as_read && new_state == as_write)
}

pub struct BarrierTranslator;

impl BarrierTranslator {
    /// Plan the barriers `desc` needs on a `queue` list
    ///
    /// Without `fine_grained` support, subresource-scoped texture barriers are
    /// widened to the whole resource with a warning.
    ///
    /// # Errors
    ///
    /// `ContractViolation` when a usage is not allowed by the resource's
    /// descriptor, cannot be expressed on a copy queue, or a queue transfer
    /// is recorded on a queue that is neither its source nor destination.
    /// Nothing is planned when any barrier fails.
    pub fn plan(desc: &PipelineBarrierDesc, queue: QueueType, fine_grained: bool) -> Result<BarrierPlan> {
        let mut plan = BarrierPlan::default();

        for barrier in &desc.texture_barriers {
            let descriptor = barrier.resource.desc().descriptor;
            let name = &barrier.resource.desc().debug_name;
            validate_usage(descriptor, barrier.old_state, name)?;
            validate_usage(descriptor, barrier.new_state, name)?;

            let mut old_state = barrier.old_state.normalized();
            let mut new_state = barrier.new_state.normalized();
            let mut transfer = None;

            if barrier.is_cross_queue() {
                let half = if queue == barrier.source_queue {
                    new_state = ResourceUsage::COMMON;
                    TransferHalf::Release
                } else if queue == barrier.destination_queue {
                    old_state = ResourceUsage::COMMON;
                    TransferHalf::Acquire
                } else {
                    crate::engine_bail!("dz::BarrierTranslator", ContractViolation =>
                        "Queue transfer {} -> {} of '{}' recorded on a {} list",
                        barrier.source_queue, barrier.destination_queue, name, queue);
                };
                transfer = Some(QueueTransfer {
                    source_queue: barrier.source_queue,
                    destination_queue: barrier.destination_queue,
                    half,
                });
            }

            validate_queue(queue, old_state, new_state, name)?;

            let kind = if transfer.is_none() && is_hazard(old_state, new_state) {
                BarrierKind::Hazard
            } else if old_state == new_state && transfer.is_none() {
                continue;
            } else {
                BarrierKind::Transition
            };

            let subresource = if barrier.enable_subresource_barrier {
                if fine_grained {
                    Some(Subresource { mip_level: barrier.mip_level, array_layer: barrier.array_layer })
                } else {
                    crate::engine_warn!("dz::BarrierTranslator",
                        "Subresource barriers unsupported, transitioning all of '{}' instead of mip {} layer {}",
                        name, barrier.mip_level, barrier.array_layer);
                    None
                }
            } else {
                None
            };

            plan.textures.push(TextureBarrierPlan {
                resource: Arc::clone(&barrier.resource),
                old_state,
                new_state,
                kind,
                subresource,
                transfer,
            });
        }

        for barrier in &desc.buffer_barriers {
            let descriptor = barrier.resource.desc().descriptor;
            let name = &barrier.resource.desc().debug_name;
            validate_usage(descriptor, barrier.old_state, name)?;
            validate_usage(descriptor, barrier.new_state, name)?;

            let old_state = barrier.old_state.normalized();
            let new_state = barrier.new_state.normalized();
            validate_queue(queue, old_state, new_state, name)?;

            let kind = if is_hazard(old_state, new_state) {
                BarrierKind::Hazard
            } else if old_state == new_state {
                continue;
            } else {
                BarrierKind::Transition
            };
            plan.buffers.push(BufferBarrierPlan {
                resource: Arc::clone(&barrier.resource),
                old_state,
                new_state,
                kind,
            });
        }

        for barrier in &desc.memory_barriers {
            let old_state = barrier.old_state.normalized();
            let new_state = barrier.new_state.normalized();
            validate_queue(queue, old_state, new_state, "memory")?;

            let kind = if is_hazard(old_state, new_state) {
                BarrierKind::Hazard
            } else if old_state == new_state {
                continue;
            } else {
                BarrierKind::Transition
            };
            plan.memory.push(MemoryBarrierPlan { old_state, new_state, kind });
        }

        Ok(plan)
    }
}

fn validate_usage(descriptor: ResourceDescriptor, usage: ResourceUsage, name: &str) -> Result<()> {
    if !descriptor.allows_usage(usage) {
        crate::engine_bail!("dz::BarrierTranslator", ContractViolation =>
            "'{}' ({:?}) cannot be used as {:?}", name, descriptor, usage);
    }
    Ok(())
}

fn validate_queue(queue: QueueType, old_state: ResourceUsage, new_state: ResourceUsage, name: &str) -> Result<()> {
    if queue == QueueType::Copy {
        let allowed = ResourceUsage::copy_queue_compatible();
        if !allowed.contains(old_state) || !allowed.contains(new_state) {
            crate::engine_bail!("dz::BarrierTranslator", ContractViolation =>
                "Copy queue cannot express {:?} -> {:?} for '{}'", old_state, new_state, name);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
