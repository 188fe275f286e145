//! Unit tests for converter.rs

use super::*;
use crate::binding::root_signature::{RootConstantResourceBinding, RootSignatureDesc};
use crate::config::RhiConfiguration;
use crate::device::SamplerDesc;
use crate::shader::fake_compiler::binding;
use crate::types::ShaderStages;

fn slot(binding_type: ResourceBindingType, binding: u32, register_space: u32) -> ResourceSlot {
    ResourceSlot { register_space, binding, binding_type }
}

/// b0/t0/s0 in space0, t0 in space1, a root-level cbuffer in space30 and
/// 16 bytes of root constants
fn layout() -> RootSignatureLayout {
    let desc = RootSignatureDesc {
        resource_bindings: vec![
            binding("Frame", ResourceBindingType::ConstantBuffer, 0, 0, ShaderStage::Vertex),
            binding("albedo", ResourceBindingType::ShaderResource, 0, 0, ShaderStage::Pixel),
            binding("linear", ResourceBindingType::Sampler, 0, 0, ShaderStage::Pixel),
            binding("shadow", ResourceBindingType::ShaderResource, 0, 1, ShaderStage::Pixel),
            binding("PerDraw", ResourceBindingType::ConstantBuffer, 0, 30, ShaderStage::Vertex),
        ],
        root_constants: vec![RootConstantResourceBinding {
            name: "push".to_string(),
            binding: 0,
            num_bytes: 16,
            stages: ShaderStages::VERTEX,
        }],
        ..Default::default()
    };
    RootSignatureLayout::build(&desc, &RhiConfiguration::default()).unwrap()
}

#[test]
fn test_entries_follow_layout_order() {
    let signature = ConverterRootSignature::from_layout(&layout());
    let parameters = signature.parameters();

    assert_eq!(parameters.len(), 5);
    assert!(matches!(parameters[0], ConverterRootParameter::Constants { register_space: 31, num_32_bit_values: 4, .. }));
    let ConverterRootParameter::DescriptorTable { descriptor_ranges } = &parameters[1] else {
        panic!("expected the space0 CBV/SRV/UAV table");
    };
    assert_eq!(descriptor_ranges.len(), 2);
    assert_eq!(descriptor_ranges[1].offset_in_descriptors_from_table_start, 1);
    assert!(matches!(&parameters[2], ConverterRootParameter::DescriptorTable { descriptor_ranges }
        if descriptor_ranges[0].range_type == ConverterRangeType::Sampler));
    assert!(matches!(parameters[4], ConverterRootParameter::Descriptor {
        descriptor_type: ConverterRangeType::Cbv, register_space: 30, .. }));
}

#[test]
fn test_descriptor_offsets_per_space() {
    let signature = ConverterRootSignature::from_layout(&layout());

    let space0 = signature.offsets(0).unwrap();
    assert_eq!((space0.cbv_srv_uav_offset, space0.sampler_offset), (Some(1), Some(2)));
    let space1 = signature.offsets(1).unwrap();
    assert_eq!((space1.cbv_srv_uav_offset, space1.sampler_offset), (Some(3), None));
    let space30 = signature.offsets(30).unwrap();
    assert_eq!(space30.root_parameter_index.get(&slot(ResourceBindingType::ConstantBuffer, 0, 30)), Some(&4));
    let space31 = signature.offsets(31).unwrap();
    assert_eq!(space31.root_parameter_index.get(&slot(ResourceBindingType::ConstantBuffer, 0, 31)), Some(&0));
    assert_eq!(signature.register_spaces().collect::<Vec<_>>(), vec![0, 1, 30, 31]);
}

#[test]
fn test_local_signature_inlines_constant_buffers() {
    let bindings = vec![
        binding("hitTexture", ResourceBindingType::ShaderResource, 1, 2, ShaderStage::ClosestHit),
        binding("HitData", ResourceBindingType::ConstantBuffer, 0, 2, ShaderStage::ClosestHit),
    ];

    let signature = ConverterRootSignature::local(&bindings);

    assert!(matches!(signature.parameters()[0],
        ConverterRootParameter::Constants { shader_register: 0, register_space: 2, num_32_bit_values: 16 }));
    assert!(matches!(signature.parameters()[1], ConverterRootParameter::DescriptorTable { .. }));
    assert_eq!(signature.offsets(2).unwrap().cbv_srv_uav_offset, Some(1));
}

#[test]
fn test_json_document() {
    let signature = ConverterRootSignature::from_layout(&layout());

    let json: serde_json::Value = serde_json::from_str(&signature.to_json().unwrap()).unwrap();

    assert_eq!(json["Version"], "1.1");
    assert_eq!(json["Parameters"][0]["ParameterType"], "32BitConstants");
    assert_eq!(json["Parameters"][0]["Num32BitValues"], 4);
    assert_eq!(json["Parameters"][1]["ParameterType"], "DescriptorTable");
    assert_eq!(json["Parameters"][1]["DescriptorRanges"][0]["RangeType"], "CBV");
    assert_eq!(json["Parameters"][4]["DescriptorType"], "CBV");
    assert_eq!(json["StaticSamplers"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn test_static_sampler_conversion() {
    let desc = StaticSamplerDesc {
        sampler: SamplerDesc {
            address_mode_u: SamplerAddressMode::ClampToEdge,
            compare_op: CompareOp::LessOrEqual,
            ..Default::default()
        },
        binding: 3,
        register_space: 1,
        stages: ShaderStages::PIXEL,
    };

    let sampler = ConverterStaticSampler::from(&desc);

    assert_eq!(sampler.filter, "MinLinearMagLinearMipLinear");
    assert_eq!(sampler.address_u, "Clamp");
    assert_eq!(sampler.address_v, "Wrap");
    assert_eq!(sampler.comparison_func, "LessEqual");
    assert_eq!((sampler.shader_register, sampler.register_space), (3, 1));
}
