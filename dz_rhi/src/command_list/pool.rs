/// Command list pools
///
/// A pool owns a fixed number of lists for one queue. Lists are handed out by
/// mutable reference, so separate lists of the same pool can be recorded on
/// separate threads at the same time.

use crate::command_list::{CommandList, CommandListDesc};
use crate::error::Result;
use crate::types::QueueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandListPoolDesc {
    pub queue_type: QueueType,
    pub num_command_lists: u32,
}

impl Default for CommandListPoolDesc {
    fn default() -> Self {
        Self { queue_type: QueueType::Graphics, num_command_lists: 1 }
    }
}

impl CommandListPoolDesc {
    pub fn new(queue_type: QueueType, num_command_lists: u32) -> Self {
        Self { queue_type, num_command_lists }
    }
}

pub struct CommandListPool {
    queue_type: QueueType,
    command_lists: Vec<CommandList>,
}

impl CommandListPool {
    /// Build every list of the pool with `create`
    ///
    /// # Errors
    ///
    /// `ContractViolation` for an empty pool, otherwise the first error
    /// `create` returns. No pool is built when any list fails.
    pub fn new(
        desc: &CommandListPoolDesc,
        mut create: impl FnMut(&CommandListDesc) -> Result<CommandList>,
    ) -> Result<Self> {
        if desc.num_command_lists == 0 {
            crate::engine_bail!("dz::CommandListPool", ContractViolation =>
                "A {} command list pool needs at least one list", desc.queue_type);
        }

        let list_desc = CommandListDesc { queue_type: desc.queue_type };
        let command_lists = (0..desc.num_command_lists)
            .map(|_| create(&list_desc))
            .collect::<Result<Vec<_>>>()?;

        crate::engine_debug!("dz::CommandListPool", "Created {} {} command list(s)",
            command_lists.len(), desc.queue_type);
        Ok(Self { queue_type: desc.queue_type, command_lists })
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn len(&self) -> usize {
        self.command_lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.command_lists.is_empty()
    }

    /// Every list; split the slice to record on several threads
    pub fn command_lists(&mut self) -> &mut [CommandList] {
        &mut self.command_lists
    }

    pub fn command_list(&mut self, index: usize) -> Option<&mut CommandList> {
        self.command_lists.get_mut(index)
    }

    pub fn into_command_lists(self) -> Vec<CommandList> {
        self.command_lists
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
