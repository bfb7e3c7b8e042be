//! Recording backend for tests and development without a GPU.
//!
//! [`NullDevice`] implements [`Device`] without touching any GPU API. It
//! allocates heap memory for host-visible buffers (so staging uploads,
//! dynamic replicas and readback behave observably), performs
//! buffer-to-buffer copies when both sides are host-visible, and records
//! every command-buffer call into a log that tests can inspect via
//! [`NullDevice::commands`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{
    AccelerationStructure, AccelerationStructureCreateInfo, BindPoint, BlasBuild, Buffer,
    BufferBarrier, BufferCopy, BufferCreateInfo, BufferImageCopy, CommandBuffer, ComputePipeline,
    ComputePipelineDesc, Device, DeviceProperties, Dispatch, Draw, DrawIndexed, Fence, Image,
    ImageBarrier, ImageBlit, ImageCopy, ImageCreateInfo, QueuePresent, QueueSubmit, RasterPipeline,
    RasterPipelineDesc, RasterShaderStages, RenderPassInfo, RenderTarget, RenderTargetCreateInfo,
    ResourceViewInfo, SamplerCreateInfo, SamplerId, Semaphore, ShaderResourceId, ShaderStageInfo,
    SwapChainCreateInfo, SwapChainId, TimestampPool, TimestampPoolCreateInfo, TlasBuild,
    UnorderedAccessId,
};
use crate::access::StageFlags;
use crate::error::GraphicsError;
use crate::types::{Extent3d, ImageDimension, ImageUsage, IndexFormat, LabelColor, Rect, Viewport};

/// One recorded command-buffer call.
#[derive(Debug, Clone, PartialEq)]
pub enum NullCommand {
    BeginLabel(String),
    EndLabel,
    BufferBarrier(BufferBarrier),
    ImageBarrier(ImageBarrier),
    CopyBufferToBuffer(BufferCopy),
    CopyBufferToImage(BufferImageCopy),
    CopyImageToImage(ImageCopy),
    BlitImageToImage(ImageBlit),
    ClearUnorderedAccess {
        view: UnorderedAccessId,
    },
    UpdateBuffer {
        buffer: Buffer,
        offset: u64,
        len: usize,
    },
    PushConstant {
        len: usize,
        offset: u32,
        bind_point: BindPoint,
    },
    SetUniformBufferView {
        slot: u32,
        buffer: Buffer,
        bind_point: BindPoint,
    },
    SetUnorderedAccessView {
        slot: u32,
        view: UnorderedAccessId,
        bind_point: BindPoint,
    },
    SetRasterPipeline(RasterPipeline),
    SetComputePipeline(ComputePipeline),
    SetViewport(Viewport),
    SetScissor(Rect),
    SetVertexBuffer {
        slot: u32,
        buffer: Buffer,
        offset: u64,
    },
    SetIndexBuffer {
        buffer: Buffer,
        offset: u64,
        format: IndexFormat,
    },
    Draw(Draw),
    DrawIndexed(DrawIndexed),
    DrawIndirect {
        buffer: Buffer,
        offset: u64,
        draw_count: u32,
    },
    DrawIndexedIndirect {
        buffer: Buffer,
        offset: u64,
        draw_count: u32,
    },
    Dispatch(Dispatch),
    DispatchIndirect {
        buffer: Buffer,
        offset: u64,
    },
    BeginRenderPass {
        color_count: usize,
        has_depth_stencil: bool,
        render_area: Rect,
    },
    EndRenderPass,
    WriteTimestamp {
        pool: TimestampPool,
        index: u32,
    },
    InvalidateTimestamps {
        pool: TimestampPool,
        first: u32,
        count: u32,
    },
    BuildAccelerationStructures {
        blas_count: usize,
        tlas_count: usize,
    },
    SubmitCommandBuffer {
        name: String,
    },
    SubmitQueue {
        signal_fences: Vec<(Fence, u64)>,
    },
    PresentQueue {
        wait_semaphores: usize,
    },
    EnqueuePresent(SwapChainId),
}

struct BufferRecord {
    info: BufferCreateInfo,
    /// Host memory backing, present for host-visible domains.
    data: Option<Vec<u8>>,
}

struct SwapChainRecord {
    name: String,
    back_buffers: Vec<Image>,
    next: usize,
    fail_acquire: bool,
}

#[derive(Default)]
struct StateInner {
    buffers: HashMap<u64, BufferRecord>,
    images: HashMap<u64, ImageCreateInfo>,
    swap_chains: HashMap<u64, SwapChainRecord>,
    timestamp_pools: HashMap<u64, Vec<u64>>,
    commands: Vec<NullCommand>,
}

struct NullState {
    inner: Mutex<StateInner>,
    next_id: AtomicU64,
    /// Fake GPU clock advanced by every timestamp write.
    tick: AtomicU64,
}

impl NullState {
    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, command: NullCommand) {
        self.inner.lock().commands.push(command);
    }
}

/// No-GPU recording device.
pub struct NullDevice {
    state: Arc<NullState>,
}

impl NullDevice {
    const ROW_ALIGNMENT: u32 = 256;

    pub fn new() -> Self {
        Self {
            state: Arc::new(NullState {
                inner: Mutex::new(StateInner::default()),
                next_id: AtomicU64::new(1),
                tick: AtomicU64::new(1),
            }),
        }
    }

    /// Snapshot of every command recorded so far, in submission order.
    pub fn commands(&self) -> Vec<NullCommand> {
        self.state.inner.lock().commands.clone()
    }

    /// Drop all recorded commands. Useful between test phases.
    pub fn clear_commands(&self) {
        self.state.inner.lock().commands.clear();
    }

    /// Number of live (not yet destroyed) buffers.
    pub fn alive_buffers(&self) -> usize {
        self.state.inner.lock().buffers.len()
    }

    /// Number of live (not yet destroyed) images.
    pub fn alive_images(&self) -> usize {
        self.state.inner.lock().images.len()
    }

    /// Force the next acquisitions on a swap chain to fail, simulating an
    /// out-of-date surface.
    pub fn set_acquire_fails(&self, swap_chain: SwapChainId, fails: bool) {
        let mut inner = self.state.inner.lock();
        let record = inner
            .swap_chains
            .get_mut(&swap_chain.raw())
            .expect("unknown swap chain handle");
        record.fail_acquire = fails;
    }

    fn align_row(row_bytes: u32) -> u32 {
        let a = Self::ROW_ALIGNMENT;
        (row_bytes + a - 1) & !(a - 1)
    }
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for NullDevice {
    fn name(&self) -> &'static str {
        "Null Device"
    }

    fn properties(&self) -> DeviceProperties {
        DeviceProperties {
            buffer_image_row_alignment: Self::ROW_ALIGNMENT,
            timestamp_tick_period_ns: 1.0,
            supports_acceleration_structures: true,
        }
    }

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Buffer, GraphicsError> {
        let id = self.state.alloc_id();
        log::trace!(
            "NullDevice: creating buffer '{}' (size: {}, domain: {:?})",
            info.name,
            info.size,
            info.domain
        );
        let data = info
            .domain
            .is_host_visible()
            .then(|| vec![0u8; info.size as usize]);
        self.state.inner.lock().buffers.insert(
            id,
            BufferRecord {
                info: info.clone(),
                data,
            },
        );
        Ok(Buffer::from_raw(id))
    }

    fn create_image(&self, info: &ImageCreateInfo) -> Result<Image, GraphicsError> {
        let id = self.state.alloc_id();
        log::trace!(
            "NullDevice: creating image '{}' ({}x{}x{})",
            info.name,
            info.extent.width,
            info.extent.height,
            info.extent.depth
        );
        self.state.inner.lock().images.insert(id, info.clone());
        Ok(Image::from_raw(id))
    }

    fn create_render_target(
        &self,
        info: &RenderTargetCreateInfo,
    ) -> Result<RenderTarget, GraphicsError> {
        log::trace!("NullDevice: creating render target '{}'", info.name);
        Ok(RenderTarget::from_raw(self.state.alloc_id()))
    }

    fn create_shader_resource(
        &self,
        _info: &ResourceViewInfo,
    ) -> Result<ShaderResourceId, GraphicsError> {
        Ok(self.state.alloc_id() as ShaderResourceId)
    }

    fn create_unordered_access(
        &self,
        _info: &ResourceViewInfo,
    ) -> Result<UnorderedAccessId, GraphicsError> {
        Ok(self.state.alloc_id() as UnorderedAccessId)
    }

    fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<SamplerId, GraphicsError> {
        log::trace!("NullDevice: creating sampler '{}'", info.name);
        Ok(self.state.alloc_id() as SamplerId)
    }

    fn create_raster_pipeline(
        &self,
        desc: &RasterPipelineDesc,
        stages: &RasterShaderStages,
    ) -> Result<RasterPipeline, GraphicsError> {
        if stages.vertex.is_none() {
            return Err(GraphicsError::PipelineCreationFailed(format!(
                "raster pipeline '{}' has no vertex stage",
                desc.name
            )));
        }
        log::trace!("NullDevice: creating raster pipeline '{}'", desc.name);
        Ok(RasterPipeline::from_raw(self.state.alloc_id()))
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
        shader: &ShaderStageInfo,
    ) -> Result<ComputePipeline, GraphicsError> {
        if shader.bytecode.is_empty() {
            return Err(GraphicsError::PipelineCreationFailed(format!(
                "compute pipeline '{}' has empty bytecode",
                desc.name
            )));
        }
        log::trace!("NullDevice: creating compute pipeline '{}'", desc.name);
        Ok(ComputePipeline::from_raw(self.state.alloc_id()))
    }

    fn create_swap_chain(&self, info: &SwapChainCreateInfo) -> Result<SwapChainId, GraphicsError> {
        let id = self.state.alloc_id();
        log::trace!(
            "NullDevice: creating swap chain '{}' ({}x{}, {} buffers)",
            info.name,
            info.extent.width,
            info.extent.height,
            info.buffer_count
        );
        let mut back_buffers = Vec::with_capacity(info.buffer_count as usize);
        {
            let mut inner = self.state.inner.lock();
            for i in 0..info.buffer_count {
                let image_id = self.state.alloc_id();
                inner.images.insert(
                    image_id,
                    ImageCreateInfo {
                        dimension: ImageDimension::D2,
                        format: Default::default(),
                        extent: Extent3d::new_2d(info.extent.width, info.extent.height),
                        mip_level_count: 1,
                        array_layer_count: 1,
                        sample_count: 1,
                        usage: ImageUsage::BLIT_DST | ImageUsage::COLOR_ATTACHMENT,
                        name: format!("{} (back buffer #{i})", info.name),
                    },
                );
                back_buffers.push(Image::from_raw(image_id));
            }
            inner.swap_chains.insert(
                id,
                SwapChainRecord {
                    name: info.name.clone(),
                    back_buffers,
                    next: 0,
                    fail_acquire: false,
                },
            );
        }
        Ok(SwapChainId::from_raw(id))
    }

    fn create_acceleration_structure(
        &self,
        info: &AccelerationStructureCreateInfo,
    ) -> Result<AccelerationStructure, GraphicsError> {
        log::trace!(
            "NullDevice: creating acceleration structure '{}' (size: {})",
            info.name,
            info.size
        );
        Ok(AccelerationStructure::from_raw(self.state.alloc_id()))
    }

    fn create_fence(&self, name: &str) -> Fence {
        log::trace!("NullDevice: creating fence '{name}'");
        Fence::from_raw(self.state.alloc_id())
    }

    fn create_semaphore(&self, name: &str) -> Semaphore {
        log::trace!("NullDevice: creating semaphore '{name}'");
        Semaphore::from_raw(self.state.alloc_id())
    }

    fn create_timestamp_pool(&self, info: &TimestampPoolCreateInfo) -> TimestampPool {
        let id = self.state.alloc_id();
        self.state
            .inner
            .lock()
            .timestamp_pools
            .insert(id, vec![0; info.query_count as usize]);
        TimestampPool::from_raw(id)
    }

    fn destroy_buffer(&self, buffer: Buffer, deferred: bool) {
        if buffer.is_null() {
            return;
        }
        log::trace!(
            "NullDevice: destroying buffer {} (deferred: {deferred})",
            buffer.raw()
        );
        self.state.inner.lock().buffers.remove(&buffer.raw());
    }

    fn destroy_image(&self, image: Image, _deferred: bool) {
        if image.is_null() {
            return;
        }
        self.state.inner.lock().images.remove(&image.raw());
    }

    fn destroy_render_target(&self, _target: RenderTarget) {}

    fn destroy_shader_resource(&self, _id: ShaderResourceId) {}

    fn destroy_unordered_access(&self, _id: UnorderedAccessId) {}

    fn destroy_sampler(&self, _id: SamplerId) {}

    fn destroy_raster_pipeline(&self, _pipeline: RasterPipeline, _deferred: bool) {}

    fn destroy_compute_pipeline(&self, _pipeline: ComputePipeline, _deferred: bool) {}

    fn destroy_swap_chain(&self, swap_chain: SwapChainId) {
        let mut inner = self.state.inner.lock();
        if let Some(record) = inner.swap_chains.remove(&swap_chain.raw()) {
            for image in record.back_buffers {
                inner.images.remove(&image.raw());
            }
        }
    }

    fn destroy_acceleration_structure(&self, _accel: AccelerationStructure) {}

    fn destroy_fence(&self, _fence: Fence) {}

    fn destroy_semaphore(&self, _semaphore: Semaphore) {}

    fn destroy_timestamp_pool(&self, pool: TimestampPool) {
        self.state.inner.lock().timestamp_pools.remove(&pool.raw());
    }

    fn buffer_info(&self, buffer: Buffer) -> BufferCreateInfo {
        self.state
            .inner
            .lock()
            .buffers
            .get(&buffer.raw())
            .expect("unknown buffer handle")
            .info
            .clone()
    }

    fn image_info(&self, image: Image) -> ImageCreateInfo {
        self.state
            .inner
            .lock()
            .images
            .get(&image.raw())
            .expect("unknown image handle")
            .clone()
    }

    fn image_size_requirements(&self, image: Image) -> u64 {
        let info = self.image_info(image);
        let bpt = info.format.bytes_per_texel();
        let mut total = 0u64;
        for mip in 0..info.mip_level_count {
            let width = (info.extent.width >> mip).max(1);
            let height = (info.extent.height >> mip).max(1);
            let depth = (info.extent.depth >> mip).max(1);
            let pitch = Self::align_row(width * bpt) as u64;
            total += pitch * height as u64 * depth as u64 * info.array_layer_count as u64;
        }
        total
    }

    fn image_row_pitch(&self, _image: Image, _mip_level: u32, row_bytes: u32) -> u32 {
        Self::align_row(row_bytes)
    }

    fn acceleration_structure_address(&self, accel: AccelerationStructure) -> u64 {
        // Stable fake device address derived from the handle.
        accel.raw() << 8
    }

    fn write_buffer(&self, buffer: Buffer, offset: u64, data: &[u8]) {
        let mut inner = self.state.inner.lock();
        let record = inner
            .buffers
            .get_mut(&buffer.raw())
            .expect("unknown buffer handle");
        match record.data.as_mut() {
            Some(bytes) => {
                let start = offset as usize;
                let end = start + data.len();
                assert!(end <= bytes.len(), "write past end of buffer");
                bytes[start..end].copy_from_slice(data);
            }
            None => log::warn!(
                "NullDevice: write_buffer on non-host-visible buffer '{}'",
                record.info.name
            ),
        }
    }

    fn read_buffer(&self, buffer: Buffer, offset: u64, size: u64) -> Vec<u8> {
        let inner = self.state.inner.lock();
        let record = inner
            .buffers
            .get(&buffer.raw())
            .expect("unknown buffer handle");
        match record.data.as_ref() {
            Some(bytes) => {
                let start = offset as usize;
                let end = (start + size as usize).min(bytes.len());
                bytes[start..end].to_vec()
            }
            None => vec![0u8; size as usize],
        }
    }

    fn acquire_next_image(&self, swap_chain: SwapChainId) -> Option<Image> {
        let mut inner = self.state.inner.lock();
        let record = inner
            .swap_chains
            .get_mut(&swap_chain.raw())
            .expect("unknown swap chain handle");
        if record.fail_acquire {
            log::warn!("NullDevice: swap chain '{}' acquire failed", record.name);
            return None;
        }
        let image = record.back_buffers[record.next % record.back_buffers.len()];
        record.next += 1;
        Some(image)
    }

    fn resize_swap_chain(&self, swap_chain: SwapChainId) {
        let mut inner = self.state.inner.lock();
        let record = inner
            .swap_chains
            .get_mut(&swap_chain.raw())
            .expect("unknown swap chain handle");
        log::trace!("NullDevice: resizing swap chain '{}'", record.name);
        record.fail_acquire = false;
    }

    fn wait_fence_value(&self, _fence: Fence, _value: u64, _timeout_ns: u64) -> bool {
        // Work completes instantly on the null device.
        true
    }

    fn wait_idle(&self) {}

    fn create_command_buffer(&self, name: &str) -> Box<dyn CommandBuffer> {
        Box::new(NullCommandBuffer {
            state: Arc::clone(&self.state),
            name: name.to_string(),
        })
    }

    fn submit_command_buffer(&self, cmd: Box<dyn CommandBuffer>) {
        // Commands were recorded into the shared log at record time; only
        // note the submission boundary.
        drop(cmd);
    }

    fn submit_queue(&self, submit: &QueueSubmit) {
        self.state.record(NullCommand::SubmitQueue {
            signal_fences: submit.signal_fences.clone(),
        });
    }

    fn present_queue(&self, present: &QueuePresent) {
        self.state.record(NullCommand::PresentQueue {
            wait_semaphores: present.wait_semaphores.len(),
        });
    }

    fn enqueue_present(&self, swap_chain: SwapChainId) {
        self.state.record(NullCommand::EnqueuePresent(swap_chain));
    }

    fn read_timestamps(&self, pool: TimestampPool, first: u32, count: u32) -> Vec<u64> {
        let inner = self.state.inner.lock();
        let values = inner
            .timestamp_pools
            .get(&pool.raw())
            .expect("unknown timestamp pool handle");
        values[first as usize..(first + count) as usize].to_vec()
    }
}

struct NullCommandBuffer {
    state: Arc<NullState>,
    name: String,
}

impl Drop for NullCommandBuffer {
    fn drop(&mut self) {
        self.state.record(NullCommand::SubmitCommandBuffer {
            name: std::mem::take(&mut self.name),
        });
    }
}

impl CommandBuffer for NullCommandBuffer {
    fn begin_label(&mut self, _color: LabelColor, name: &str) {
        self.state.record(NullCommand::BeginLabel(name.to_string()));
    }

    fn end_label(&mut self) {
        self.state.record(NullCommand::EndLabel);
    }

    fn buffer_barrier(&mut self, barrier: &BufferBarrier) {
        self.state.record(NullCommand::BufferBarrier(*barrier));
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) {
        self.state.record(NullCommand::ImageBarrier(*barrier));
    }

    fn copy_buffer_to_buffer(&mut self, copy: &BufferCopy) {
        // Execute the copy when both sides are host-visible so readback
        // and staging paths are observable in tests.
        let mut inner = self.state.inner.lock();
        let src_bytes = inner.buffers.get(&copy.src.raw()).and_then(|record| {
            record.data.as_ref().map(|bytes| {
                let start = copy.src_offset as usize;
                let end = (start + copy.size as usize).min(bytes.len());
                bytes[start..end].to_vec()
            })
        });
        if let (Some(src_bytes), Some(dst)) = (src_bytes, inner.buffers.get_mut(&copy.dst.raw())) {
            if let Some(bytes) = dst.data.as_mut() {
                let start = copy.dst_offset as usize;
                let end = (start + src_bytes.len()).min(bytes.len());
                bytes[start..end].copy_from_slice(&src_bytes[..end - start]);
            }
        }
        inner.commands.push(NullCommand::CopyBufferToBuffer(*copy));
    }

    fn copy_buffer_to_image(&mut self, copy: &BufferImageCopy) {
        self.state.record(NullCommand::CopyBufferToImage(*copy));
    }

    fn copy_image_to_image(&mut self, copy: &ImageCopy) {
        self.state.record(NullCommand::CopyImageToImage(*copy));
    }

    fn blit_image_to_image(&mut self, blit: &ImageBlit) {
        self.state.record(NullCommand::BlitImageToImage(*blit));
    }

    fn clear_unordered_access(&mut self, view: UnorderedAccessId, _value: [u32; 4]) {
        self.state.record(NullCommand::ClearUnorderedAccess { view });
    }

    fn update_buffer(&mut self, buffer: Buffer, offset: u64, data: &[u8]) {
        {
            let mut inner = self.state.inner.lock();
            if let Some(record) = inner.buffers.get_mut(&buffer.raw()) {
                if let Some(bytes) = record.data.as_mut() {
                    let start = offset as usize;
                    let end = (start + data.len()).min(bytes.len());
                    bytes[start..end].copy_from_slice(&data[..end - start]);
                }
            }
        }
        self.state.record(NullCommand::UpdateBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn push_constant(&mut self, data: &[u8], offset: u32, bind_point: BindPoint) {
        self.state.record(NullCommand::PushConstant {
            len: data.len(),
            offset,
            bind_point,
        });
    }

    fn set_uniform_buffer_view(&mut self, slot: u32, buffer: Buffer, bind_point: BindPoint) {
        self.state.record(NullCommand::SetUniformBufferView {
            slot,
            buffer,
            bind_point,
        });
    }

    fn set_unordered_access_view(
        &mut self,
        slot: u32,
        view: UnorderedAccessId,
        bind_point: BindPoint,
    ) {
        self.state.record(NullCommand::SetUnorderedAccessView {
            slot,
            view,
            bind_point,
        });
    }

    fn set_raster_pipeline(&mut self, pipeline: RasterPipeline) {
        self.state.record(NullCommand::SetRasterPipeline(pipeline));
    }

    fn set_compute_pipeline(&mut self, pipeline: ComputePipeline) {
        self.state.record(NullCommand::SetComputePipeline(pipeline));
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.state.record(NullCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &Rect) {
        self.state.record(NullCommand::SetScissor(*scissor));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: Buffer, offset: u64) {
        self.state.record(NullCommand::SetVertexBuffer {
            slot,
            buffer,
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: Buffer, offset: u64, format: IndexFormat) {
        self.state.record(NullCommand::SetIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    fn draw(&mut self, draw: &Draw) {
        self.state.record(NullCommand::Draw(*draw));
    }

    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        self.state.record(NullCommand::DrawIndexed(*draw));
    }

    fn draw_indirect(&mut self, buffer: Buffer, offset: u64, draw_count: u32, _stride: u32) {
        self.state.record(NullCommand::DrawIndirect {
            buffer,
            offset,
            draw_count,
        });
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: Buffer,
        offset: u64,
        draw_count: u32,
        _stride: u32,
    ) {
        self.state.record(NullCommand::DrawIndexedIndirect {
            buffer,
            offset,
            draw_count,
        });
    }

    fn dispatch(&mut self, dispatch: &Dispatch) {
        self.state.record(NullCommand::Dispatch(*dispatch));
    }

    fn dispatch_indirect(&mut self, buffer: Buffer, offset: u64) {
        self.state
            .record(NullCommand::DispatchIndirect { buffer, offset });
    }

    fn begin_render_pass(&mut self, info: &RenderPassInfo) {
        self.state.record(NullCommand::BeginRenderPass {
            color_count: info.color_attachments.len(),
            has_depth_stencil: info.depth_stencil_attachment.is_some(),
            render_area: info.render_area,
        });
    }

    fn end_render_pass(&mut self) {
        self.state.record(NullCommand::EndRenderPass);
    }

    fn write_timestamp(&mut self, pool: TimestampPool, _stage: StageFlags, index: u32) {
        let tick = self.state.tick.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.state.inner.lock();
        if let Some(values) = inner.timestamp_pools.get_mut(&pool.raw()) {
            values[index as usize] = tick;
        }
        inner
            .commands
            .push(NullCommand::WriteTimestamp { pool, index });
    }

    fn invalidate_timestamps(&mut self, pool: TimestampPool, first: u32, count: u32) {
        let mut inner = self.state.inner.lock();
        if let Some(values) = inner.timestamp_pools.get_mut(&pool.raw()) {
            for value in &mut values[first as usize..(first + count) as usize] {
                *value = 0;
            }
        }
        inner.commands.push(NullCommand::InvalidateTimestamps {
            pool,
            first,
            count,
        });
    }

    fn build_acceleration_structures(&mut self, blas: &[BlasBuild], tlas: &[TlasBuild]) {
        self.state.record(NullCommand::BuildAccelerationStructures {
            blas_count: blas.len(),
            tlas_count: tlas.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferLayout, BufferUsage, MemoryDomain};

    fn host_buffer(device: &NullDevice, size: u64) -> Buffer {
        device
            .create_buffer(&BufferCreateInfo {
                size,
                usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
                initial_layout: BufferLayout::TransferSrc,
                domain: MemoryDomain::HostStaging,
                name: "test".to_string(),
            })
            .unwrap()
    }

    #[test]
    fn test_host_buffer_roundtrip() {
        let device = NullDevice::new();
        let buffer = host_buffer(&device, 16);
        device.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(device.read_buffer(buffer, 4, 4), vec![1, 2, 3, 4]);
        assert_eq!(device.read_buffer(buffer, 0, 2), vec![0, 0]);
    }

    #[test]
    fn test_copy_between_host_buffers() {
        let device = NullDevice::new();
        let src = host_buffer(&device, 8);
        let dst = host_buffer(&device, 8);
        device.write_buffer(src, 0, &[9, 8, 7, 6]);

        let mut cmd = device.create_command_buffer("copy");
        cmd.copy_buffer_to_buffer(&BufferCopy {
            src,
            dst,
            src_offset: 0,
            dst_offset: 0,
            size: 4,
        });
        device.submit_command_buffer(cmd);

        assert_eq!(device.read_buffer(dst, 0, 4), vec![9, 8, 7, 6]);
    }

    #[test]
    fn test_destroy_tracks_liveness() {
        let device = NullDevice::new();
        let buffer = host_buffer(&device, 8);
        assert_eq!(device.alive_buffers(), 1);
        device.destroy_buffer(buffer, true);
        assert_eq!(device.alive_buffers(), 0);
    }

    #[test]
    fn test_timestamp_writes_are_monotonic() {
        let device = NullDevice::new();
        let pool = device.create_timestamp_pool(&TimestampPoolCreateInfo {
            query_count: 4,
            name: "ts".to_string(),
        });
        let mut cmd = device.create_command_buffer("ts");
        cmd.write_timestamp(pool, StageFlags::TOP_OF_PIPE, 0);
        cmd.write_timestamp(pool, StageFlags::BOTTOM_OF_PIPE, 1);
        device.submit_command_buffer(cmd);

        let values = device.read_timestamps(pool, 0, 2);
        assert!(values[1] > values[0]);
    }

    #[test]
    fn test_acquire_failure_is_recoverable() {
        use raw_window_handle::{
            RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle,
        };

        let device = NullDevice::new();
        let swap_chain = device
            .create_swap_chain(&SwapChainCreateInfo {
                raw_window: RawWindowHandle::Web(WebWindowHandle::new(1)),
                raw_display: RawDisplayHandle::Web(WebDisplayHandle::new()),
                format: Default::default(),
                present_mode: Default::default(),
                buffer_count: 2,
                image_usage: ImageUsage::BLIT_DST,
                extent: crate::types::Extent2d::new(640, 480),
                name: "sc".to_string(),
            })
            .unwrap();

        assert!(device.acquire_next_image(swap_chain).is_some());
        device.set_acquire_fails(swap_chain, true);
        assert!(device.acquire_next_image(swap_chain).is_none());
        device.resize_swap_chain(swap_chain);
        assert!(device.acquire_next_image(swap_chain).is_some());
    }
}
