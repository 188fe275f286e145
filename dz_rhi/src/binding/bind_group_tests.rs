//! Unit tests for bind_group.rs

use super::*;
use crate::binding::root_signature::{RootConstantResourceBinding, RootSignatureDesc};
use crate::device::mock_device::{MockBuffer, MockNativeBindGroup, MockRootSignature, MockSampler, MockTexture};
use crate::dz::Error;
use crate::shader::reflection::ReflectionBinding;
use crate::types::ShaderStages;

// ============================================================================
// Helper Functions
// ============================================================================

fn binding(name: &str, binding_type: ResourceBindingType, descriptor: ResourceDescriptor, slot: u32, space: u32) -> ReflectionBinding {
    ReflectionBinding {
        name: name.to_string(),
        binding: slot,
        register_space: space,
        array_size: 1,
        binding_type,
        descriptor,
        stages: ShaderStages::PIXEL,
        fields: Vec::new(),
        num_bytes: 0,
    }
}

/// cbuffer at b0 space0, texture t0 + sampler s0 in space1, root-level
/// b0 and t0 in space30, and 16 bytes of root constants
fn textured_signature() -> Arc<dyn RootSignature> {
    let desc = RootSignatureDesc {
        resource_bindings: vec![
            binding("Frame", ResourceBindingType::ConstantBuffer, ResourceDescriptor::UNIFORM_BUFFER, 0, 0),
            binding("albedo", ResourceBindingType::ShaderResource, ResourceDescriptor::TEXTURE, 0, 1),
            binding("linear", ResourceBindingType::Sampler, ResourceDescriptor::SAMPLER, 0, 1),
            binding("Draw", ResourceBindingType::ConstantBuffer, ResourceDescriptor::UNIFORM_BUFFER, 0, 30),
            binding("Lights", ResourceBindingType::ShaderResource, ResourceDescriptor::STRUCTURED_BUFFER, 0, 30),
        ],
        root_constants: vec![RootConstantResourceBinding {
            name: "push".to_string(),
            binding: 0,
            num_bytes: 16,
            stages: ShaderStages::VERTEX,
        }],
        ..Default::default()
    };
    MockRootSignature::new(&desc).unwrap()
}

fn group(root_signature: &Arc<dyn RootSignature>, space: u32) -> ResourceBindGroup {
    let desc = ResourceBindGroupDesc::new(Arc::clone(root_signature), space);
    ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default())).unwrap()
}

fn applied_batches(group: &ResourceBindGroup) -> usize {
    group.with_native(|native, _| {
        native.as_any().downcast_ref::<MockNativeBindGroup>().map(|m| m.applied.len()).unwrap_or(0)
    }).unwrap()
}

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn test_table_sized_from_layout() {
    let rs = textured_signature();

    let space0 = group(&rs, 0);
    let space1 = group(&rs, 1);
    let space30 = group(&rs, 30);

    let table = space0.table().unwrap();
    assert_eq!((table.cbv_srv_uav_count(), table.sampler_count(), table.root_descriptor_count()), (1, 0, 0));
    let table = space1.table().unwrap();
    assert_eq!((table.cbv_srv_uav_count(), table.sampler_count(), table.root_descriptor_count()), (1, 1, 0));
    let table = space30.table().unwrap();
    assert_eq!((table.cbv_srv_uav_count(), table.sampler_count(), table.root_descriptor_count()), (0, 0, 2));
}

#[test]
fn test_unknown_space_is_rejected() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::new(Arc::clone(&rs), 7);

    let result = ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default()));

    assert!(matches!(result, Err(Error::Binding(_))));
}

// ============================================================================
// Updates
// ============================================================================

#[test]
fn test_textured_update() {
    let rs = textured_signature();
    let space1 = group(&rs, 1);
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");
    let sampler = MockSampler::new();

    space1.begin_update().unwrap();
    space1.srv_texture(0, &albedo).unwrap();
    space1.sampler(0, &sampler).unwrap();
    space1.end_update().unwrap();

    let table = space1.table().unwrap();
    assert_eq!(table.bound_count(), 2);
    let bound = table.get(BindingTarget::Table { kind: TableKind::CbvSrvUav, offset: 0 }).unwrap();
    assert_eq!(bound.native_handle(), albedo.native_handle());
    assert!(table.get(BindingTarget::Table { kind: TableKind::Sampler, offset: 0 }).is_some());
    assert_eq!(applied_batches(&space1), 1);
}

#[test]
fn test_root_descriptor_update() {
    let rs = textured_signature();
    let space30 = group(&rs, 30);
    let per_draw = MockBuffer::new(256, ResourceDescriptor::UNIFORM_BUFFER, "per_draw");

    space30.begin_update().unwrap();
    space30.cbv(0, &per_draw).unwrap();
    space30.end_update().unwrap();

    let table = space30.table().unwrap();
    assert_eq!(table.bound_count(), 1);
    // Root descriptors come last, b0 before t0
    let parameter_index = rs.layout().parameters().len() as u32 - 2;
    let bound = table.get(BindingTarget::RootDescriptor { parameter_index, index: 0 }).unwrap();
    assert_eq!(bound.native_handle(), per_draw.native_handle());
}

#[test]
fn test_kind_mismatch_leaves_group_unchanged() {
    let rs = textured_signature();
    let space1 = group(&rs, 1);
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");
    let storage = MockBuffer::new(64, ResourceDescriptor::RW_BUFFER, "storage");

    space1.begin_update().unwrap();
    space1.srv_texture(0, &albedo).unwrap();
    space1.end_update().unwrap();

    space1.begin_update().unwrap();
    // Texture slot fed with a buffer
    let result = space1.srv_buffer(0, &storage);
    assert!(matches!(result, Err(Error::Binding(_))));
    space1.end_update().unwrap();

    let table = space1.table().unwrap();
    assert_eq!(table.bound_count(), 1);
    let bound = table.get(BindingTarget::Table { kind: TableKind::CbvSrvUav, offset: 0 }).unwrap();
    assert_eq!(bound.native_handle(), albedo.native_handle());
}

#[test]
fn test_descriptor_mismatch_is_binding_error() {
    let rs = textured_signature();
    let space0 = group(&rs, 0);
    // Frame expects a uniform buffer
    let storage = MockBuffer::new(64, ResourceDescriptor::RW_BUFFER, "storage");

    space0.begin_update().unwrap();
    let result = space0.cbv(0, &storage);

    assert!(matches!(result, Err(Error::Binding(_))));
}

#[test]
fn test_missing_slot_is_binding_error() {
    let rs = textured_signature();
    let space1 = group(&rs, 1);
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");

    space1.begin_update().unwrap();
    let result = space1.srv_texture(5, &albedo);

    assert!(matches!(result, Err(Error::Binding(_))));
}

#[test]
fn test_root_descriptor_rejects_textures() {
    let rs = textured_signature();
    let space30 = group(&rs, 30);
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");

    space30.begin_update().unwrap();
    let result = space30.srv_texture(0, &albedo);

    assert!(matches!(result, Err(Error::Binding(_))));
}

#[test]
fn test_update_outside_begin_end_is_contract_violation() {
    let rs = textured_signature();
    let space1 = group(&rs, 1);
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");

    assert!(matches!(space1.srv_texture(0, &albedo), Err(Error::ContractViolation(_))));
    assert!(matches!(space1.end_update(), Err(Error::ContractViolation(_))));

    space1.begin_update().unwrap();
    assert!(matches!(space1.begin_update(), Err(Error::ContractViolation(_))));
}

#[test]
fn test_last_write_to_a_slot_wins() {
    let rs = textured_signature();
    let space1 = group(&rs, 1);
    let first = MockTexture::new(ResourceDescriptor::TEXTURE, "first");
    let second = MockTexture::new(ResourceDescriptor::TEXTURE, "second");

    space1.begin_update().unwrap();
    space1.srv_texture(0, &first).unwrap();
    space1.srv_texture(0, &second).unwrap();
    space1.end_update().unwrap();

    let written = space1.with_native(|native, _| {
        native.as_any().downcast_ref::<MockNativeBindGroup>().map(|m| m.applied[0].len()).unwrap_or(0)
    }).unwrap();
    assert_eq!(written, 1);
    let table = space1.table().unwrap();
    let bound = table.get(BindingTarget::Table { kind: TableKind::CbvSrvUav, offset: 0 }).unwrap();
    assert_eq!(bound.native_handle(), second.native_handle());
}

#[test]
fn test_failed_apply_commits_nothing() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::new(Arc::clone(&rs), 1);
    let native = MockNativeBindGroup { fail_apply: true, ..Default::default() };
    let space1 = ResourceBindGroup::new(&desc, Box::new(native)).unwrap();
    let albedo = MockTexture::new(ResourceDescriptor::TEXTURE, "albedo");

    space1.begin_update().unwrap();
    space1.srv_texture(0, &albedo).unwrap();
    assert!(space1.end_update().is_err());

    assert_eq!(space1.table().unwrap().bound_count(), 0);
    assert!(!space1.is_updating());
}

// ============================================================================
// Root constants
// ============================================================================

#[test]
fn test_root_constants() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::root_constants(Arc::clone(&rs));
    let constants = ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default())).unwrap();
    let data = [1u8; 16];

    constants.set_root_constants(0, &data).unwrap();

    assert_eq!(constants.table().unwrap().root_constant_data(0), Some(&data[..]));
}

#[test]
fn test_root_constants_reach_the_backend() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::root_constants(Arc::clone(&rs));
    let constants = ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default())).unwrap();
    let data = [7u8; 16];

    constants.set_root_constants(0, &data).unwrap();

    let stored = constants.with_native(|native, _| {
        native.as_any().downcast_ref::<MockNativeBindGroup>().map(|m| m.root_constants.clone())
    }).unwrap();
    assert_eq!(stored, Some(vec![(0, data.to_vec())]));
}

#[test]
fn test_root_constant_size_mismatch() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::root_constants(Arc::clone(&rs));
    let constants = ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default())).unwrap();

    let result = constants.set_root_constants(0, &[0u8; 12]);

    assert!(matches!(result, Err(Error::Binding(_))));
    assert!(constants.table().unwrap().root_constant_data(0).is_none());
}

#[test]
fn test_unknown_root_constant() {
    let rs = textured_signature();
    let desc = ResourceBindGroupDesc::root_constants(Arc::clone(&rs));
    let constants = ResourceBindGroup::new(&desc, Box::new(MockNativeBindGroup::default())).unwrap();

    assert!(matches!(constants.set_root_constants(3, &[0u8; 16]), Err(Error::Binding(_))));
}
