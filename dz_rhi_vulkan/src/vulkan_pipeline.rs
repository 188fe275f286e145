/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// Graphics pipelines use dynamic rendering (no render pass objects) with
/// dynamic viewport and scissor. Mesh pipelines skip vertex input. Ray
/// tracing pipelines put every raygen, miss and callable shader in its own
/// general group and all hit shaders in one hit group.

use ash::vk;
use ash::vk::Handle;
use dz_rhi::dz::device::{BindPoint, Pipeline, PipelineDesc};
use dz_rhi::dz::shader::HitGroupType;
use dz_rhi::dz::{CompiledShader, Format, Result, RootSignature, ShaderStage, TargetIL};
use dz_rhi::{engine_bail, engine_debug, engine_err};
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{cull_mode_to_vk, format_to_vk, shader_stage_to_vk, topology_to_vk};
use crate::vulkan_root_signature::VulkanRootSignature;

/// Shader modules of one pipeline, destroyed once the pipeline exists
struct ShaderModules<'a> {
    ctx: &'a GpuContext,
    modules: Vec<vk::ShaderModule>,
    entry_points: Vec<CString>,
}

impl<'a> ShaderModules<'a> {
    fn new(ctx: &'a GpuContext, shaders: &[CompiledShader]) -> Result<Self> {
        let mut this = Self { ctx, modules: Vec::with_capacity(shaders.len()), entry_points: Vec::new() };
        for shader in shaders {
            if shader.target_il != TargetIL::Spirv {
                engine_bail!("dz::vulkan::Pipeline", Configuration =>
                    "{:?} shader '{}' was compiled to {:?}, expected SPIR-V",
                    shader.stage, shader.entry_point, shader.target_il);
            }
            let Some(code) = shader.bytecode_words() else {
                engine_bail!("dz::vulkan::Pipeline", Compile =>
                    "SPIR-V of {:?} shader '{}' is not a whole number of words", shader.stage, shader.entry_point);
            };
            let entry_point = CString::new(shader.entry_point.as_str())
                .map_err(|_| engine_err!("dz::vulkan::Pipeline", Configuration =>
                    "Entry point '{}' contains a NUL byte", shader.entry_point))?;

            let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
            let module = unsafe {
                ctx.device.create_shader_module(&create_info, None)
                    .map_err(|e| engine_err!("dz::vulkan::Pipeline", "Failed to create shader module: {:?}", e))?
            };
            this.modules.push(module);
            this.entry_points.push(entry_point);
        }
        Ok(this)
    }

    fn stages(&self, shaders: &[CompiledShader]) -> Vec<vk::PipelineShaderStageCreateInfo<'_>> {
        shaders.iter()
            .zip(self.modules.iter().zip(self.entry_points.iter()))
            .map(|(shader, (&module, entry_point))| vk::PipelineShaderStageCreateInfo::default()
                .stage(shader_stage_to_vk(shader.stage))
                .module(module)
                .name(entry_point))
            .collect()
    }
}

impl Drop for ShaderModules<'_> {
    fn drop(&mut self) {
        for &module in &self.modules {
            unsafe { self.ctx.device.destroy_shader_module(module, None); }
        }
    }
}

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    bind_point: BindPoint,
    root_signature: Arc<dyn RootSignature>,
    /// Ray tracing only: opaque handles of every shader group, in group order
    shader_group_handles: Vec<u8>,
}

impl VulkanPipeline {
    pub fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        let Some(root_signature) = desc.root_signature.as_any().downcast_ref::<VulkanRootSignature>() else {
            engine_bail!("dz::vulkan::Pipeline", InvalidResource => "Root signature was not created by a Vulkan device");
        };
        let pipeline_layout = root_signature.pipeline_layout();
        if desc.shaders.is_empty() {
            engine_bail!("dz::vulkan::Pipeline", Configuration => "Pipeline has no shaders");
        }

        let modules = ShaderModules::new(&ctx, &desc.shaders)?;
        let mut shader_group_handles = Vec::new();
        let pipeline = match desc.bind_point {
            BindPoint::Graphics => create_graphics_pipeline(&ctx, desc, &modules, pipeline_layout)?,
            BindPoint::Compute => create_compute_pipeline(&ctx, desc, &modules, pipeline_layout)?,
            BindPoint::RayTracing => {
                let (pipeline, handles) = create_ray_tracing_pipeline(&ctx, desc, &modules, pipeline_layout)?;
                shader_group_handles = handles;
                pipeline
            }
        };
        drop(modules);

        engine_debug!("dz::vulkan::Pipeline", "Created {:?} pipeline with {} shader(s)",
            desc.bind_point, desc.shaders.len());
        Ok(Self {
            ctx,
            pipeline,
            pipeline_layout,
            bind_point: desc.bind_point,
            root_signature: Arc::clone(&desc.root_signature),
            shader_group_handles,
        })
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Handle of shader group `index` (ray tracing pipelines only)
    pub fn shader_group_handle(&self, index: u32) -> Option<&[u8]> {
        let size = self.ctx.limits.shader_group_handle_size as usize;
        if size == 0 {
            return None;
        }
        let start = index as usize * size;
        self.shader_group_handles.get(start..start + size)
    }
}

fn create_graphics_pipeline(
    ctx: &GpuContext,
    desc: &PipelineDesc,
    modules: &ShaderModules,
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let graphics = &desc.graphics;
    let shader_stages = modules.stages(&desc.shaders);
    let is_mesh = desc.shaders.iter().any(|s| s.stage == ShaderStage::Mesh);

    let vertex_bindings: Vec<vk::VertexInputBindingDescription> = if desc.input_layout.elements.is_empty() {
        Vec::new()
    } else {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: desc.input_layout.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    };
    let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.input_layout.elements.iter()
        .map(|element| vk::VertexInputAttributeDescription {
            location: element.location,
            binding: 0,
            format: format_to_vk(element.format),
            offset: element.offset,
        })
        .collect();
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);
    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(graphics.topology))
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    // Viewports are flipped at bind time, which keeps clockwise front faces
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(cull_mode_to_vk(graphics.cull_mode))
        .front_face(vk::FrontFace::CLOCKWISE);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(graphics.depth_test)
        .depth_write_enable(graphics.depth_write)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = graphics.render_target_formats.iter()
        .map(|_| vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false))
        .collect();
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let color_formats: Vec<vk::Format> = graphics.render_target_formats.iter().map(|&f| format_to_vk(f)).collect();
    let depth_format = if graphics.depth_stencil_format == Format::Undefined {
        vk::Format::UNDEFINED
    } else {
        format_to_vk(graphics.depth_stencil_format)
    };
    let stencil_format = if graphics.depth_stencil_format.has_stencil() { depth_format } else { vk::Format::UNDEFINED };
    let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
        .color_attachment_formats(&color_formats)
        .depth_attachment_format(depth_format)
        .stencil_attachment_format(stencil_format);

    let mut pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .depth_stencil_state(&depth_stencil_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .push_next(&mut rendering_info);
    if !is_mesh {
        pipeline_create_info = pipeline_create_info
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state);
    }

    let pipelines = unsafe {
        ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
            .map_err(|(_, e)| engine_err!("dz::vulkan::Pipeline", "Failed to create graphics pipeline: {:?}", e))?
    };
    pipelines.into_iter().next()
        .ok_or_else(|| engine_err!("dz::vulkan::Pipeline", "Graphics pipeline creation returned nothing"))
}

fn create_compute_pipeline(
    ctx: &GpuContext,
    desc: &PipelineDesc,
    modules: &ShaderModules,
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let shader_stages = modules.stages(&desc.shaders);
    let Some(index) = desc.shaders.iter().position(|s| s.stage == ShaderStage::Compute) else {
        engine_bail!("dz::vulkan::Pipeline", Configuration => "Compute pipeline has no compute shader");
    };

    let create_info = vk::ComputePipelineCreateInfo::default()
        .stage(shader_stages[index])
        .layout(layout);
    let pipelines = unsafe {
        ctx.device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
            .map_err(|(_, e)| engine_err!("dz::vulkan::Pipeline", "Failed to create compute pipeline: {:?}", e))?
    };
    pipelines.into_iter().next()
        .ok_or_else(|| engine_err!("dz::vulkan::Pipeline", "Compute pipeline creation returned nothing"))
}

fn create_ray_tracing_pipeline(
    ctx: &GpuContext,
    desc: &PipelineDesc,
    modules: &ShaderModules,
    layout: vk::PipelineLayout,
) -> Result<(vk::Pipeline, Vec<u8>)> {
    let Some(loader) = &ctx.extensions.ray_tracing_pipeline else {
        engine_bail!("dz::vulkan::Pipeline", Configuration => "Ray tracing pipelines are not supported by this device");
    };
    let shader_stages = modules.stages(&desc.shaders);

    let mut groups = Vec::new();
    let mut hit_group = vk::RayTracingShaderGroupCreateInfoKHR::default()
        .ty(vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP)
        .general_shader(vk::SHADER_UNUSED_KHR)
        .closest_hit_shader(vk::SHADER_UNUSED_KHR)
        .any_hit_shader(vk::SHADER_UNUSED_KHR)
        .intersection_shader(vk::SHADER_UNUSED_KHR);
    let mut has_hit_group = false;
    let mut max_recursion_depth = 1;

    for (index, shader) in desc.shaders.iter().enumerate() {
        let index = index as u32;
        if let Some(ray_tracing) = &shader.ray_tracing {
            max_recursion_depth = max_recursion_depth.max(ray_tracing.max_recursion_depth);
            if ray_tracing.hit_group_type == HitGroupType::Aabbs {
                hit_group = hit_group.ty(vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP);
            }
        }
        match shader.stage {
            ShaderStage::Raygen | ShaderStage::Miss | ShaderStage::Callable => {
                groups.push(vk::RayTracingShaderGroupCreateInfoKHR::default()
                    .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
                    .general_shader(index)
                    .closest_hit_shader(vk::SHADER_UNUSED_KHR)
                    .any_hit_shader(vk::SHADER_UNUSED_KHR)
                    .intersection_shader(vk::SHADER_UNUSED_KHR));
            }
            ShaderStage::ClosestHit => {
                hit_group = hit_group.closest_hit_shader(index);
                has_hit_group = true;
            }
            ShaderStage::AnyHit => {
                hit_group = hit_group.any_hit_shader(index);
                has_hit_group = true;
            }
            ShaderStage::Intersection => {
                hit_group = hit_group
                    .ty(vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP)
                    .intersection_shader(index);
                has_hit_group = true;
            }
            other => engine_bail!("dz::vulkan::Pipeline", Configuration =>
                "{:?} shader cannot be part of a ray tracing pipeline", other),
        }
    }
    if has_hit_group {
        groups.push(hit_group);
    }

    let create_info = vk::RayTracingPipelineCreateInfoKHR::default()
        .stages(&shader_stages)
        .groups(&groups)
        .max_pipeline_ray_recursion_depth(max_recursion_depth)
        .layout(layout);
    let pipeline = unsafe {
        loader.create_ray_tracing_pipelines(
            vk::DeferredOperationKHR::null(),
            vk::PipelineCache::null(),
            &[create_info],
            None,
        )
        .map_err(|(_, e)| engine_err!("dz::vulkan::Pipeline", "Failed to create ray tracing pipeline: {:?}", e))?
        .into_iter()
        .next()
        .ok_or_else(|| engine_err!("dz::vulkan::Pipeline", "Ray tracing pipeline creation returned nothing"))?
    };

    let handle_size = ctx.limits.shader_group_handle_size as usize;
    let handles = unsafe {
        loader.get_ray_tracing_shader_group_handles(pipeline, 0, groups.len() as u32, groups.len() * handle_size)
    };
    match handles {
        Ok(handles) => Ok((pipeline, handles)),
        Err(e) => {
            unsafe { ctx.device.destroy_pipeline(pipeline, None); }
            Err(engine_err!("dz::vulkan::Pipeline", "Failed to read shader group handles: {:?}", e))
        }
    }
}

impl Pipeline for VulkanPipeline {
    fn bind_point(&self) -> BindPoint {
        self.bind_point
    }

    fn root_signature(&self) -> &Arc<dyn RootSignature> {
        &self.root_signature
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        if !self.pipeline.is_null() {
            unsafe { self.ctx.device.destroy_pipeline(self.pipeline, None); }
        }
    }
}
