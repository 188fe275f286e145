//! Unit tests for pool.rs

use super::*;
use crate::binding::RootSignatureDesc;
use crate::command_list::{CommandListState, ExecuteDesc};
use crate::device::mock_device::{MockDevice, MockPipeline, MockRootSignature};
use crate::device::{BindPoint, LogicalDevice};
use crate::dz::Error;

#[test]
fn test_pool_creates_every_list() {
    let device = MockDevice::new();

    let mut pool = device.create_command_list_pool(&CommandListPoolDesc::new(QueueType::Compute, 3)).unwrap();

    assert_eq!(pool.len(), 3);
    assert_eq!(pool.queue_type(), QueueType::Compute);
    assert!(pool.command_lists().iter().all(|list| list.queue_type() == QueueType::Compute));
    assert!(pool.command_lists().iter().all(|list| list.state() == CommandListState::Initial));
    assert!(pool.command_list(3).is_none());
}

#[test]
fn test_default_pool_has_one_graphics_list() {
    let device = MockDevice::new();

    let pool = device.create_command_list_pool(&CommandListPoolDesc::default()).unwrap();

    let lists = pool.into_command_lists();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].queue_type(), QueueType::Graphics);
}

#[test]
fn test_empty_pool_is_rejected() {
    let device = MockDevice::new();

    let result = device.create_command_list_pool(&CommandListPoolDesc::new(QueueType::Copy, 0));

    assert!(matches!(result, Err(Error::ContractViolation(_))));
}

#[test]
fn test_failed_list_fails_the_pool() {
    let desc = CommandListPoolDesc::new(QueueType::Graphics, 4);
    let device = MockDevice::new();
    let mut created = 0;

    let result = CommandListPool::new(&desc, |list_desc| {
        created += 1;
        if created == 2 {
            return Err(Error::OutOfMemory);
        }
        device.create_command_list(list_desc)
    });

    assert!(matches!(result, Err(Error::OutOfMemory)));
    assert_eq!(created, 2);
}

#[test]
fn test_lists_record_on_separate_threads() {
    let device = MockDevice::new();
    let rs = MockRootSignature::new(&RootSignatureDesc::default()).unwrap();
    let pipeline = MockPipeline::new(BindPoint::Compute, &rs);
    let mut pool = device.create_command_list_pool(&CommandListPoolDesc::new(QueueType::Compute, 4)).unwrap();

    std::thread::scope(|scope| {
        for list in pool.command_lists().iter_mut() {
            let pipeline = &pipeline;
            scope.spawn(move || {
                list.begin().unwrap();
                list.bind_pipeline(pipeline).unwrap();
                list.dispatch(8, 8, 1).unwrap();
                list.execute(&ExecuteDesc::default()).unwrap();
            });
        }
    });

    assert!(pool.command_lists().iter().all(|list| list.state() == CommandListState::Submitted));
    let dispatches = device.commands().iter().filter(|c| c.starts_with("dispatch(")).count();
    assert_eq!(dispatches, 4);
}
