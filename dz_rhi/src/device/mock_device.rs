/// Mock device for unit tests (no GPU required)
///
/// Every object hands out a unique fake native handle. Command lists record
/// their native calls as strings into a shared log so tests can assert on
/// exact call order, and barrier plans are translated through the real
/// strategy the device would select.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::barrier::{select_barrier_strategy, BarrierBatch, BarrierPlan, BarrierStrategy};
use crate::binding::{
    BindingWrite, NativeBindGroup, ResourceBindGroup, ResourceBindGroupDesc, RootSignature,
    RootSignatureDesc, RootSignatureLayout,
};
use crate::command_list::{
    BuildBottomLevelASDesc, BuildTopLevelASDesc, CommandList, CommandListBackend, CommandListDesc, CommandListPool,
    CommandListPoolDesc,
    CopyBufferRegionDesc, CopyBufferToTextureDesc, CopyTextureRegionDesc, CopyTextureToBufferDesc,
    DispatchRaysDesc, IndexType, RenderingDesc, ScissorRect, Viewport,
};
use crate::config::RhiConfiguration;
use crate::device::{
    BindPoint, BufferDesc, BufferResource, DeviceCapabilities, Fence, LogicalDevice, NativeHandle,
    Pipeline, PipelineDesc, PresentDesc, Sampler, SamplerDesc, Semaphore, SwapChain, TextureDesc,
    TextureResource,
};
use crate::error::Result;
use crate::types::ResourceDescriptor;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// Shared, ordered record of native calls
pub type CommandLog = Arc<Mutex<Vec<String>>>;

fn push(log: &CommandLog, entry: impl Into<String>) {
    if let Ok(mut log) = log.lock() {
        log.push(entry.into());
    }
}

/// Snapshot of a log
pub fn entries(log: &CommandLog) -> Vec<String> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

// ============================================================================
// Mock Resources
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    pub handle: u64,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(num_bytes: u64, descriptor: ResourceDescriptor, name: &str) -> Arc<dyn BufferResource> {
        Self::from_desc(BufferDesc {
            num_bytes,
            descriptor,
            debug_name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn from_desc(desc: BufferDesc) -> Arc<dyn BufferResource> {
        let data = Mutex::new(vec![0; desc.num_bytes as usize]);
        Arc::new(Self { desc, handle: next_handle(), data })
    }
}

impl NativeHandle for MockBuffer {
    fn native_handle(&self) -> u64 {
        self.handle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BufferResource for MockBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut contents = self.data.lock()
            .map_err(|_| crate::engine_err!("dz::mock", "buffer poisoned"))?;
        let end = match (offset as usize).checked_add(data.len()) {
            Some(end) if end <= contents.len() => end,
            _ => crate::engine_bail!("dz::mock", InvalidResource => "write past the end of '{}'", self.desc.debug_name),
        };
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockTexture {
    pub desc: TextureDesc,
    pub handle: u64,
}

impl MockTexture {
    pub fn new(descriptor: ResourceDescriptor, name: &str) -> Arc<dyn TextureResource> {
        Self::from_desc(TextureDesc {
            width: 64,
            height: 64,
            descriptor,
            debug_name: name.to_string(),
            ..Default::default()
        })
    }

    /// Texture with a full mip chain and `array_size` layers
    pub fn layered(descriptor: ResourceDescriptor, mip_levels: u32, array_size: u32, name: &str) -> Arc<dyn TextureResource> {
        Self::from_desc(TextureDesc {
            width: 256,
            height: 256,
            mip_levels,
            array_size,
            descriptor,
            debug_name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn from_desc(desc: TextureDesc) -> Arc<dyn TextureResource> {
        Arc::new(Self { desc, handle: next_handle() })
    }
}

impl NativeHandle for MockTexture {
    fn native_handle(&self) -> u64 {
        self.handle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TextureResource for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct MockSampler {
    pub desc: SamplerDesc,
    pub handle: u64,
}

impl MockSampler {
    pub fn new() -> Arc<dyn Sampler> {
        Arc::new(Self { desc: SamplerDesc::default(), handle: next_handle() })
    }
}

impl NativeHandle for MockSampler {
    fn native_handle(&self) -> u64 {
        self.handle
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sampler for MockSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

// ============================================================================
// Mock Binding
// ============================================================================

pub struct MockRootSignature {
    pub layout: RootSignatureLayout,
}

impl MockRootSignature {
    pub fn new(desc: &RootSignatureDesc) -> Result<Arc<dyn RootSignature>> {
        Self::with_config(desc, &RhiConfiguration::default())
    }

    pub fn with_config(desc: &RootSignatureDesc, config: &RhiConfiguration) -> Result<Arc<dyn RootSignature>> {
        Ok(Arc::new(Self { layout: RootSignatureLayout::build(desc, config)? }))
    }
}

impl RootSignature for MockRootSignature {
    fn layout(&self) -> &RootSignatureLayout {
        &self.layout
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Records every write batch it receives; can be told to fail
#[derive(Default)]
pub struct MockNativeBindGroup {
    pub applied: Vec<Vec<BindingWrite>>,
    pub root_constants: Vec<(u32, Vec<u8>)>,
    pub fail_apply: bool,
}

impl NativeBindGroup for MockNativeBindGroup {
    fn apply(&mut self, _layout: &RootSignatureLayout, writes: &[BindingWrite]) -> Result<()> {
        if self.fail_apply {
            crate::engine_bail!("dz::mock", "descriptor write failed");
        }
        self.applied.push(writes.to_vec());
        Ok(())
    }

    fn set_root_constants(&mut self, binding: u32, data: &[u8]) -> Result<()> {
        self.root_constants.push((binding, data.to_vec()));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipeline {
    pub bind_point: BindPoint,
    pub root_signature: Arc<dyn RootSignature>,
    pub handle: u64,
}

impl MockPipeline {
    pub fn new(bind_point: BindPoint, root_signature: &Arc<dyn RootSignature>) -> Arc<dyn Pipeline> {
        Arc::new(Self { bind_point, root_signature: Arc::clone(root_signature), handle: next_handle() })
    }
}

impl Pipeline for MockPipeline {
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

// ============================================================================
// Mock Synchronization
// ============================================================================

pub struct MockFence {
    pub id: u64,
}

impl Fence for MockFence {
    fn wait(&self) -> Result<()> {
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSemaphore {
    pub id: u64,
}

pub fn mock_semaphore() -> Arc<dyn Semaphore> {
    Arc::new(MockSemaphore { id: next_handle() })
}

pub fn mock_fence() -> Arc<dyn Fence> {
    Arc::new(MockFence { id: next_handle() })
}

fn semaphore_id(semaphore: &Arc<dyn Semaphore>) -> u64 {
    semaphore.as_any().downcast_ref::<MockSemaphore>().map(|s| s.id).unwrap_or(0)
}

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSwapChain {
    pub images: Vec<Arc<dyn TextureResource>>,
}

impl MockSwapChain {
    pub fn new(image_count: u32) -> Arc<dyn SwapChain> {
        let images = (0..image_count)
            .map(|i| MockTexture::new(ResourceDescriptor::RENDER_TARGET, &format!("backbuffer{}", i)))
            .collect();
        Arc::new(Self { images })
    }
}

impl SwapChain for MockSwapChain {
    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn render_target(&self, index: u32) -> Option<Arc<dyn TextureResource>> {
        self.images.get(index as usize).cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Command Backend
// ============================================================================

pub struct MockCommandBackend {
    pub log: CommandLog,
    pub batches: Arc<Mutex<Vec<BarrierBatch>>>,
    strategy: Box<dyn BarrierStrategy<Output = BarrierBatch>>,
    queue_type: crate::types::QueueType,
    subresource_barriers: bool,
}

impl MockCommandBackend {
    pub fn new(desc: &CommandListDesc, capabilities: &DeviceCapabilities, log: CommandLog) -> Self {
        Self {
            log,
            batches: Arc::new(Mutex::new(Vec::new())),
            strategy: select_barrier_strategy(capabilities, &RhiConfiguration::default()),
            queue_type: desc.queue_type,
            subresource_barriers: capabilities.subresource_barriers,
        }
    }

    /// Native commands recorded so far (shared with the device log)
    pub fn commands(&self) -> Vec<String> {
        entries(&self.log)
    }

    fn record(&self, entry: impl Into<String>) -> Result<()> {
        push(&self.log, entry);
        Ok(())
    }
}

impl CommandListBackend for MockCommandBackend {
    fn supports_subresource_barriers(&self) -> bool {
        self.subresource_barriers && self.strategy.supports_subresource_barriers()
    }

    fn begin(&mut self) -> Result<()> {
        self.record("begin")
    }

    fn end(&mut self) -> Result<()> {
        self.record("end")
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.record(format!("begin_rendering({})", desc.render_targets.len()))
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.record("end_rendering")
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.record("bind_pipeline")
    }

    fn set_root_signature(&mut self, _root_signature: &Arc<dyn RootSignature>, bind_point: BindPoint) -> Result<()> {
        self.record(format!("set_root_signature({:?})", bind_point))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn BufferResource>, offset: u64) -> Result<()> {
        self.record(format!("bind_vertex_buffer({})", offset))
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn BufferResource>, offset: u64, index_type: IndexType) -> Result<()> {
        self.record(format!("bind_index_buffer({}, {:?})", offset, index_type))
    }

    fn bind_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.record(format!("bind_viewport({}x{})", viewport.width, viewport.height))
    }

    fn bind_scissor_rect(&mut self, rect: &ScissorRect) -> Result<()> {
        self.record(format!("bind_scissor_rect({}x{})", rect.width(), rect.height()))
    }

    fn bind_resource_group(&mut self, group: &ResourceBindGroup, _bind_point: BindPoint) -> Result<()> {
        self.record(format!("bind_resource_group(space{})", group.register_space()))
    }

    fn pipeline_barrier(&mut self, plan: &BarrierPlan) -> Result<()> {
        let batch = self.strategy.translate(plan, self.queue_type)?;
        let count = match &batch {
            BarrierBatch::Legacy(barriers) => barriers.len(),
            BarrierBatch::Enhanced(groups) => groups.len(),
        };
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch);
        }
        self.record(format!("pipeline_barrier({}:{})", self.strategy.name(), count))
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.record(format!("draw({}, {}, {}, {})", vertex_count, instance_count, first_vertex, first_instance))
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.record(format!("draw_indexed({}, {}, {}, {}, {})",
            index_count, instance_count, first_index, vertex_offset, first_instance))
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record(format!("dispatch({}, {}, {})", x, y, z))
    }

    fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record(format!("dispatch_mesh({}, {}, {})", x, y, z))
    }

    fn dispatch_rays(&mut self, desc: &DispatchRaysDesc) -> Result<()> {
        self.record(format!("dispatch_rays({}, {}, {})", desc.width, desc.height, desc.depth))
    }

    fn copy_buffer_region(&mut self, desc: &CopyBufferRegionDesc) -> Result<()> {
        self.record(format!("copy_buffer_region({} -> {}, {})", desc.src_offset, desc.dst_offset, desc.num_bytes))
    }

    fn copy_texture_region(&mut self, desc: &CopyTextureRegionDesc) -> Result<()> {
        self.record(format!("copy_texture_region({}x{})", desc.width, desc.height))
    }

    fn copy_buffer_to_texture(&mut self, desc: &CopyBufferToTextureDesc) -> Result<()> {
        self.record(format!("copy_buffer_to_texture(mip {})", desc.mip_level))
    }

    fn copy_texture_to_buffer(&mut self, desc: &CopyTextureToBufferDesc) -> Result<()> {
        self.record(format!("copy_texture_to_buffer({})", desc.dst_offset))
    }

    fn build_top_level_as(&mut self, desc: &BuildTopLevelASDesc) -> Result<()> {
        self.record(format!("build_top_level_as({})", desc.num_instances))
    }

    fn build_bottom_level_as(&mut self, desc: &BuildBottomLevelASDesc) -> Result<()> {
        self.record(format!("build_bottom_level_as({})", desc.geometries.len()))
    }

    fn queue_wait(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()> {
        self.record(format!("queue_wait({})", semaphore_id(semaphore)))
    }

    fn queue_submit(&mut self) -> Result<()> {
        self.record("queue_submit")
    }

    fn queue_signal(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()> {
        self.record(format!("queue_signal({})", semaphore_id(semaphore)))
    }

    fn queue_signal_fence(&mut self, _fence: &Arc<dyn Fence>) -> Result<()> {
        self.record("queue_signal_fence")
    }

    fn present(&mut self, desc: &PresentDesc) -> Result<()> {
        self.record(format!("present({})", desc.image_index))
    }
}

// ============================================================================
// Mock Device
// ============================================================================

pub struct MockDevice {
    pub capabilities: DeviceCapabilities,
    pub config: RhiConfiguration,
    pub log: CommandLog,
    pub lost: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::default())
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            config: RhiConfiguration::default(),
            log: Arc::new(Mutex::new(Vec::new())),
            lost: false,
        }
    }

    pub fn commands(&self) -> Vec<String> {
        entries(&self.log)
    }
}

impl LogicalDevice for MockDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer_resource(&self, desc: &BufferDesc) -> Result<Arc<dyn BufferResource>> {
        if desc.num_bytes == 0 {
            crate::engine_bail!("dz::mock", InvalidResource => "Buffer '{}' has zero size", desc.debug_name);
        }
        Ok(MockBuffer::from_desc(desc.clone()))
    }

    fn create_texture_resource(&self, desc: &TextureDesc) -> Result<Arc<dyn TextureResource>> {
        Ok(MockTexture::from_desc(desc.clone()))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(MockSampler { desc: *desc, handle: next_handle() }))
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<Arc<dyn RootSignature>> {
        MockRootSignature::with_config(desc, &self.config)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(MockPipeline::new(desc.bind_point, &desc.root_signature))
    }

    fn create_resource_bind_group(&self, desc: &ResourceBindGroupDesc) -> Result<Arc<ResourceBindGroup>> {
        Ok(Arc::new(ResourceBindGroup::new(desc, Box::new(MockNativeBindGroup::default()))?))
    }

    fn create_command_list(&self, desc: &CommandListDesc) -> Result<CommandList> {
        let backend = MockCommandBackend::new(desc, &self.capabilities, Arc::clone(&self.log));
        Ok(CommandList::new(desc, Box::new(backend)))
    }

    fn create_command_list_pool(&self, desc: &CommandListPoolDesc) -> Result<CommandListPool> {
        CommandListPool::new(desc, |list_desc| self.create_command_list(list_desc))
    }

    fn create_fence(&self) -> Result<Arc<dyn Fence>> {
        Ok(mock_fence())
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(mock_semaphore())
    }

    fn is_device_lost(&self) -> bool {
        self.lost
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}
