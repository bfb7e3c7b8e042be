//! The task resource manager.
//!
//! Owns the slot table every graph-visible resource registers into, the
//! pending staging-upload queue and the dynamic-buffer roster. The graph
//! consumes the latter two during its per-frame flush phase.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use raw_window_handle::{
    HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};

use crate::backend::{
    AccelerationStructureCreateInfo, AccelerationStructureKind, Buffer, BufferCreateInfo,
    ComputePipelineDesc, Device, Image, ImageCreateInfo, PresentMode, RasterPipelineDesc,
    RenderTargetCreateInfo, RenderTargetKind, ResourceViewInfo, SamplerCreateInfo, SamplerId,
    ShaderResourceId, SwapChainCreateInfo, UnorderedAccessId,
};
use crate::error::GraphicsError;
use crate::reload::ShaderReloadBridge;
use crate::types::{
    BufferLayout, BufferRegion, BufferUsage, Format, ImageDimension, ImageLayout,
    ImageSubresource, ImageSubresourceRange, ImageUsage, ImageViewType, MemoryDomain,
};

use super::pipeline::PipelineBackRef;
use super::{
    TaskAccelerationStructure, TaskAccelerationStructureInfo, TaskBuffer, TaskBufferInfo,
    TaskColorTarget, TaskColorTargetInfo, TaskComputePipeline, TaskDepthStencilTarget,
    TaskDepthStencilTargetInfo, TaskImage, TaskImageInfo, TaskRasterPipeline,
    TaskRasterPipelineShaders, TaskShader, TaskShaderInfo, TaskSwapChain, TaskSwapChainInfo,
};

// ============================================================================
// Shared state
// ============================================================================

/// Slot table with a LIFO tombstone stack.
///
/// Register reuses the most recently released slot when one exists and
/// appends otherwise; slot ids stay stable for a resource's lifetime and are
/// dense enough to index compiler scratch arrays.
#[derive(Default)]
struct SlotRegistry {
    occupied: Vec<bool>,
    tombstones: Vec<u32>,
}

impl SlotRegistry {
    fn register(&mut self) -> u32 {
        if let Some(slot) = self.tombstones.pop() {
            debug_assert!(!self.occupied[slot as usize]);
            self.occupied[slot as usize] = true;
            slot
        } else {
            self.occupied.push(true);
            (self.occupied.len() - 1) as u32
        }
    }

    fn release(&mut self, slot: u32) {
        assert!(
            (slot as usize) < self.occupied.len(),
            "bad slot {slot} released"
        );
        assert!(self.occupied[slot as usize], "double release of slot {slot}");
        self.occupied[slot as usize] = false;
        self.tombstones.push(slot);
    }

    fn capacity(&self) -> usize {
        self.occupied.len()
    }

    fn live(&self) -> usize {
        self.occupied.len() - self.tombstones.len()
    }
}

/// One pending upload out of a staging buffer.
pub(crate) enum StagingUpload {
    Buffer {
        dst: Buffer,
        dst_layout: BufferLayout,
    },
    Image {
        dst: Image,
        dst_layout: ImageLayout,
        subresource: ImageSubresource,
        row_pitch: u32,
    },
}

/// A staging buffer and the uploads it feeds. The staging buffer is
/// destroyed (GPU-deferred) after the flush copies it out.
pub(crate) struct StagingBatch {
    pub(crate) src: Buffer,
    pub(crate) uploads: Vec<StagingUpload>,
}

/// State shared between the manager handle, every live resource and the
/// task graphs built on top.
pub(crate) struct ManagerShared {
    device: Arc<dyn Device>,
    frames_in_flight: u32,
    registry: Mutex<SlotRegistry>,
    staging: Mutex<Vec<StagingBatch>>,
    dynamic: Mutex<Vec<(u32, Weak<TaskBuffer>)>>,
}

impl ManagerShared {
    pub(crate) fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub(crate) fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    pub(crate) fn register_slot(&self) -> u32 {
        self.registry.lock().register()
    }

    pub(crate) fn release_slot(&self, slot: u32) {
        self.registry.lock().release(slot);
    }

    /// Upper bound of slot ids handed out so far. Compiler scratch arrays
    /// are sized by this.
    pub(crate) fn slot_capacity(&self) -> usize {
        self.registry.lock().capacity()
    }

    fn live_resources(&self) -> usize {
        self.registry.lock().live()
    }

    pub(crate) fn push_staging(&self, batch: StagingBatch) {
        self.staging.lock().push(batch);
    }

    /// Hand the pending staging uploads to the flush, clearing the queue.
    pub(crate) fn take_staging(&self) -> Vec<StagingBatch> {
        std::mem::take(&mut *self.staging.lock())
    }

    /// Drop pending uploads targeting a buffer that is being destroyed.
    pub(crate) fn purge_staging_buffer(&self, dst: Buffer) {
        for batch in self.staging.lock().iter_mut() {
            batch
                .uploads
                .retain(|upload| !matches!(upload, StagingUpload::Buffer { dst: d, .. } if *d == dst));
        }
    }

    /// Drop pending uploads targeting an image that is being destroyed.
    pub(crate) fn purge_staging_image(&self, dst: Image) {
        for batch in self.staging.lock().iter_mut() {
            batch
                .uploads
                .retain(|upload| !matches!(upload, StagingUpload::Image { dst: d, .. } if *d == dst));
        }
    }

    fn add_dynamic(&self, slot: u32, buffer: Weak<TaskBuffer>) {
        self.dynamic.lock().push((slot, buffer));
    }

    pub(crate) fn remove_dynamic(&self, slot: u32) {
        self.dynamic.lock().retain(|(s, _)| *s != slot);
    }

    /// Snapshot of the live dynamic buffers.
    pub(crate) fn dynamic_buffers(&self) -> Vec<Arc<TaskBuffer>> {
        self.dynamic
            .lock()
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }
}

// ============================================================================
// ResourceManager
// ============================================================================

/// Construction parameters for [`ResourceManager`].
pub struct ResourceManagerInfo {
    pub device: Arc<dyn Device>,
    /// How many frames the CPU may record ahead of the GPU. Drives the
    /// replica count of dynamic buffers and the timestamp pool count.
    pub frames_in_flight: u32,
}

/// Owner of all graph-visible resources.
///
/// All resource creation and destruction goes through this type (or through
/// dropping the `Arc` handles it returns). Dropping the manager while
/// resources are still alive is a programmer error and aborts.
pub struct ResourceManager {
    shared: Arc<ManagerShared>,
    reload_bridge: ShaderReloadBridge,
}

impl ResourceManager {
    pub fn new(info: ResourceManagerInfo) -> Self {
        assert!(
            info.frames_in_flight >= 2,
            "frames in flight must be at least 2"
        );
        let shared = Arc::new(ManagerShared {
            device: info.device,
            frames_in_flight: info.frames_in_flight,
            registry: Mutex::new(SlotRegistry::default()),
            staging: Mutex::new(Vec::new()),
            dynamic: Mutex::new(Vec::new()),
        });
        log::trace!(
            "resource manager created on '{}' ({} frames in flight)",
            shared.device.name(),
            shared.frames_in_flight
        );
        Self {
            shared,
            reload_bridge: ShaderReloadBridge::new(),
        }
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        self.shared.device()
    }

    pub fn frames_in_flight(&self) -> u32 {
        self.shared.frames_in_flight()
    }

    /// The listener the shader compiler delivers rebuilt bytecode to.
    pub fn shader_reload_listener(&self) -> &ShaderReloadBridge {
        &self.reload_bridge
    }

    pub(crate) fn shared(&self) -> &Arc<ManagerShared> {
        &self.shared
    }

    // --- buffers ------------------------------------------------------------

    /// Create a persistent buffer, optionally seeded with `initial_data`.
    ///
    /// Initial data is uploaded through a transient staging buffer during
    /// the next frame's staging flush, before any task executes.
    pub fn create_buffer(
        &self,
        info: &TaskBufferInfo,
        initial_data: &[u8],
    ) -> Result<Arc<TaskBuffer>, GraphicsError> {
        assert!(
            info.cpu_visible || !info.readback,
            "readback buffers must be cpu-visible"
        );
        let device = self.shared.device();

        let mut usage = info.usage;
        if !initial_data.is_empty() {
            usage |= BufferUsage::TRANSFER_DST;
        }

        let mut replicas = Vec::new();
        if info.dynamic {
            for i in 0..self.shared.frames_in_flight() {
                replicas.push(device.create_buffer(&BufferCreateInfo {
                    size: info.size,
                    usage: BufferUsage::TRANSFER_SRC,
                    initial_layout: if info.readback {
                        BufferLayout::TransferDst
                    } else {
                        BufferLayout::TransferSrc
                    },
                    domain: if info.readback {
                        MemoryDomain::HostReadback
                    } else {
                        MemoryDomain::HostRandomWrite
                    },
                    name: format!("{} (in flight #{i})", info.name),
                })?);
            }
        }

        let (primary, primary_is_alias) = if info.dynamic && info.cpu_visible {
            // Host reads and writes can target the replica directly, so no
            // separate device copy is needed.
            (replicas[0], true)
        } else {
            let buffer = device.create_buffer(&BufferCreateInfo {
                size: info.size,
                usage,
                initial_layout: if info.cpu_visible {
                    if info.readback {
                        BufferLayout::TransferDst
                    } else {
                        BufferLayout::ReadOnly
                    }
                } else {
                    BufferLayout::Undefined
                },
                domain: if info.cpu_visible {
                    if info.readback {
                        MemoryDomain::HostReadback
                    } else {
                        MemoryDomain::HostRandomWrite
                    }
                } else {
                    MemoryDomain::DeviceLocal
                },
                name: info.name.clone(),
            })?;
            (buffer, false)
        };

        if !initial_data.is_empty() {
            assert!(!info.dynamic, "cannot initialize a dynamic buffer with data");
            assert!(
                !info.readback,
                "cannot initialize a readback buffer with data"
            );
            assert!(
                initial_data.len() as u64 >= info.size,
                "initial data for '{}' is smaller than the buffer",
                info.name
            );
            let staging = device.create_buffer(&BufferCreateInfo {
                size: info.size,
                usage: BufferUsage::TRANSFER_SRC,
                initial_layout: BufferLayout::TransferSrc,
                domain: MemoryDomain::HostStaging,
                name: format!("{} (staging)", info.name),
            })?;
            device.write_buffer(staging, 0, &initial_data[..info.size as usize]);
            self.shared.push_staging(StagingBatch {
                src: staging,
                uploads: vec![StagingUpload::Buffer {
                    dst: primary,
                    dst_layout: BufferLayout::ReadOnly,
                }],
            });
        }

        let slot = self.shared.register_slot();
        let buffer = Arc::new(TaskBuffer::new(
            slot,
            info.clone(),
            primary,
            primary_is_alias,
            replicas,
            Arc::clone(&self.shared),
        ));
        if info.dynamic {
            self.shared.add_dynamic(slot, Arc::downgrade(&buffer));
        }
        Ok(buffer)
    }

    // --- images -------------------------------------------------------------

    /// Create a persistent image, optionally seeded with tightly packed
    /// `initial_data` for mip 0.
    ///
    /// The upload goes through a transient staging buffer whose rows are
    /// padded to the device's row alignment; one upload entry is queued per
    /// mip level.
    pub fn create_image(
        &self,
        info: &TaskImageInfo,
        initial_data: &[u8],
    ) -> Result<Arc<TaskImage>, GraphicsError> {
        let device = self.shared.device();

        let mut usage = info.usage;
        if !initial_data.is_empty() {
            usage |= ImageUsage::TRANSFER_DST;
        }

        let image = device.create_image(&ImageCreateInfo {
            dimension: info.dimension,
            format: info.format,
            extent: info.extent,
            mip_level_count: info.mip_level_count,
            array_layer_count: info.array_layer_count,
            sample_count: info.sample_count,
            usage,
            name: info.name.clone(),
        })?;

        if !initial_data.is_empty() {
            let bytes_per_texel = info.format.bytes_per_texel() as u64;
            let min_required = bytes_per_texel * info.extent.texel_count();
            assert!(min_required > 0, "invalid format for staging upload");
            assert!(
                initial_data.len() as u64 >= min_required,
                "initial data for '{}' is smaller than the image",
                info.name
            );

            let staging = device.create_buffer(&BufferCreateInfo {
                size: device.image_size_requirements(image),
                usage: BufferUsage::TRANSFER_SRC,
                initial_layout: BufferLayout::TransferSrc,
                domain: MemoryDomain::HostStaging,
                name: format!("{} (staging)", info.name),
            })?;

            // Repack the caller's tight rows into row-pitched staging rows.
            let row_bytes = (info.extent.width as u64 * bytes_per_texel) as u32;
            let row_pitch = device.image_row_pitch(image, 0, row_bytes);
            let row_count = info.extent.height as u64 * info.extent.depth as u64;
            for row in 0..row_count {
                let src_offset = (row * row_bytes as u64) as usize;
                device.write_buffer(
                    staging,
                    row * row_pitch as u64,
                    &initial_data[src_offset..src_offset + row_bytes as usize],
                );
            }

            let uploads = (0..info.mip_level_count)
                .map(|mip| StagingUpload::Image {
                    dst: image,
                    dst_layout: ImageLayout::ReadOnly,
                    subresource: ImageSubresource {
                        mip_level: mip,
                        base_array_layer: 0,
                        layer_count: info.array_layer_count,
                    },
                    row_pitch,
                })
                .collect();
            self.shared.push_staging(StagingBatch {
                src: staging,
                uploads,
            });
        }

        let slot = self.shared.register_slot();
        Ok(Arc::new(TaskImage::new(
            slot,
            info.clone(),
            image,
            Arc::clone(&self.shared),
        )))
    }

    // --- render targets -----------------------------------------------------

    pub fn create_color_target(
        &self,
        info: &TaskColorTargetInfo,
    ) -> Result<Arc<TaskColorTarget>, GraphicsError> {
        let render_target = self.shared.device().create_render_target(&RenderTargetCreateInfo {
            image: info.image.internal(),
            slice: info.slice,
            kind: RenderTargetKind::COLOR,
            name: info.name.clone(),
        })?;
        let slot = self.shared.register_slot();
        Ok(Arc::new(TaskColorTarget::new(
            slot,
            info.clone(),
            render_target,
            Arc::clone(&self.shared),
        )))
    }

    pub fn create_depth_stencil_target(
        &self,
        info: &TaskDepthStencilTargetInfo,
    ) -> Result<Arc<TaskDepthStencilTarget>, GraphicsError> {
        assert!(
            info.depth || info.stencil,
            "depth-stencil target '{}' selects neither aspect",
            info.name
        );
        let mut kind = RenderTargetKind::empty();
        if info.depth {
            kind |= RenderTargetKind::DEPTH;
        }
        if info.stencil {
            kind |= RenderTargetKind::STENCIL;
        }
        let render_target = self.shared.device().create_render_target(&RenderTargetCreateInfo {
            image: info.image.internal(),
            slice: info.slice,
            kind,
            name: info.name.clone(),
        })?;
        let slot = self.shared.register_slot();
        Ok(Arc::new(TaskDepthStencilTarget::new(
            slot,
            info.clone(),
            render_target,
            Arc::clone(&self.shared),
        )))
    }

    // --- shaders and pipelines ----------------------------------------------

    /// Register a compiled shader program.
    pub fn create_shader(&self, bytecode: Vec<u8>, name: impl Into<String>) -> Arc<TaskShader> {
        let slot = self.shared.register_slot();
        Arc::new(TaskShader::new(
            slot,
            name.into(),
            bytecode,
            Arc::clone(&self.shared),
        ))
    }

    /// Create a raster pipeline referencing the given shader stages.
    ///
    /// If the backend rejects the pipeline, a warning is logged and the
    /// returned pipeline carries a null backend object; reloading any of its
    /// shaders retries the creation on next use.
    pub fn create_raster_pipeline(
        &self,
        info: &RasterPipelineDesc,
        shaders: &TaskRasterPipelineShaders,
    ) -> Arc<TaskRasterPipeline> {
        let slot = self.shared.register_slot();
        let pipeline = Arc::new(TaskRasterPipeline::new(
            slot,
            info.clone(),
            shaders.clone(),
            Arc::clone(&self.shared),
        ));
        for stage in shaders.shaders() {
            stage.shader.add_reference(PipelineBackRef::Raster {
                slot,
                pipeline: Arc::downgrade(&pipeline),
            });
        }
        pipeline.recreate();
        pipeline
    }

    /// Create a compute pipeline referencing the given shader.
    pub fn create_compute_pipeline(
        &self,
        info: &ComputePipelineDesc,
        shader: &TaskShaderInfo,
    ) -> Arc<TaskComputePipeline> {
        let slot = self.shared.register_slot();
        let pipeline = Arc::new(TaskComputePipeline::new(
            slot,
            info.clone(),
            shader.clone(),
            Arc::clone(&self.shared),
        ));
        shader.shader.add_reference(PipelineBackRef::Compute {
            slot,
            pipeline: Arc::downgrade(&pipeline),
        });
        pipeline.recreate();
        pipeline
    }

    // --- views and samplers -------------------------------------------------

    /// Shader resource view covering the whole image, with the view type
    /// derived from the image dimension and layer count.
    pub fn default_shader_resource_view(
        &self,
        image: &Arc<TaskImage>,
    ) -> Result<ShaderResourceId, GraphicsError> {
        let info = image.info();
        let layered = info.array_layer_count > 1;
        let view_type = match info.dimension {
            ImageDimension::Cube => {
                if layered && info.array_layer_count > 6 {
                    ImageViewType::CubeArray
                } else {
                    ImageViewType::Cube
                }
            }
            ImageDimension::D1 => {
                if layered {
                    ImageViewType::D1Array
                } else {
                    ImageViewType::D1
                }
            }
            ImageDimension::D2 => {
                if layered {
                    ImageViewType::D2Array
                } else {
                    ImageViewType::D2
                }
            }
            ImageDimension::D3 => ImageViewType::D3,
        };
        self.shared.device().create_shader_resource(&ResourceViewInfo::Image {
            image: image.internal(),
            range: image.full_range(),
            view_type,
            format: None,
        })
    }

    /// Shader resource view covering the whole buffer.
    pub fn default_buffer_resource_view(
        &self,
        buffer: &Arc<TaskBuffer>,
    ) -> Result<ShaderResourceId, GraphicsError> {
        self.shared.device().create_shader_resource(&ResourceViewInfo::Buffer {
            buffer: buffer.internal(),
            region: BufferRegion::new(0, buffer.info().size),
        })
    }

    pub fn create_shader_resource_view_for_buffer(
        &self,
        info: &TaskBufferViewInfo,
    ) -> Result<ShaderResourceId, GraphicsError> {
        self.shared
            .device()
            .create_shader_resource(&info.backend_view())
    }

    pub fn create_shader_resource_view_for_image(
        &self,
        info: &TaskImageViewInfo,
    ) -> Result<ShaderResourceId, GraphicsError> {
        self.shared
            .device()
            .create_shader_resource(&info.backend_view())
    }

    pub fn create_unordered_access_view_for_buffer(
        &self,
        info: &TaskBufferViewInfo,
    ) -> Result<UnorderedAccessId, GraphicsError> {
        self.shared
            .device()
            .create_unordered_access(&info.backend_view())
    }

    pub fn create_unordered_access_view_for_image(
        &self,
        info: &TaskImageViewInfo,
    ) -> Result<UnorderedAccessId, GraphicsError> {
        self.shared
            .device()
            .create_unordered_access(&info.backend_view())
    }

    pub fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<SamplerId, GraphicsError> {
        self.shared.device().create_sampler(info)
    }

    pub fn release_shader_resource_view(&self, id: ShaderResourceId) {
        self.shared.device().destroy_shader_resource(id);
    }

    pub fn release_unordered_access_view(&self, id: UnorderedAccessId) {
        self.shared.device().destroy_unordered_access(id);
    }

    pub fn release_sampler(&self, id: SamplerId) {
        self.shared.device().destroy_sampler(id);
    }

    // --- swap chains ---------------------------------------------------------

    /// Create a swap chain bound to a window.
    pub fn create_swap_chain(
        &self,
        info: &TaskSwapChainInfo,
        window: &(impl HasWindowHandle + HasDisplayHandle),
    ) -> Result<Arc<TaskSwapChain>, GraphicsError> {
        let raw_window = window
            .window_handle()
            .map_err(|err| GraphicsError::InvalidParameter(format!("window handle: {err}")))?
            .as_raw();
        let raw_display = window
            .display_handle()
            .map_err(|err| GraphicsError::InvalidParameter(format!("display handle: {err}")))?
            .as_raw();
        self.create_swap_chain_raw(info, raw_window, raw_display)
    }

    /// Create a swap chain from raw native handles, for hosts that do not
    /// implement the `raw-window-handle` traits.
    pub fn create_swap_chain_raw(
        &self,
        info: &TaskSwapChainInfo,
        raw_window: RawWindowHandle,
        raw_display: RawDisplayHandle,
    ) -> Result<Arc<TaskSwapChain>, GraphicsError> {
        let swap_chain = self.shared.device().create_swap_chain(&SwapChainCreateInfo {
            raw_window,
            raw_display,
            format: info.format,
            present_mode: if info.vsync {
                PresentMode::VSync
            } else {
                PresentMode::LowLatency
            },
            buffer_count: self.shared.frames_in_flight(),
            image_usage: info.image_usage | ImageUsage::BLIT_DST,
            extent: info.extent,
            name: info.name.clone(),
        })?;
        let slot = self.shared.register_slot();
        Ok(Arc::new(TaskSwapChain::new(
            slot,
            info.clone(),
            swap_chain,
            Arc::clone(&self.shared),
        )))
    }

    // --- acceleration structures ---------------------------------------------

    /// Create a bottom-level acceleration structure. Fails with
    /// [`GraphicsError::FeatureNotSupported`] when the device lacks the
    /// capability.
    pub fn create_blas(
        &self,
        info: &TaskAccelerationStructureInfo,
    ) -> Result<Arc<TaskAccelerationStructure>, GraphicsError> {
        self.create_acceleration_structure(info, AccelerationStructureKind::BottomLevel)
    }

    /// Create a top-level acceleration structure. Fails with
    /// [`GraphicsError::FeatureNotSupported`] when the device lacks the
    /// capability.
    pub fn create_tlas(
        &self,
        info: &TaskAccelerationStructureInfo,
    ) -> Result<Arc<TaskAccelerationStructure>, GraphicsError> {
        self.create_acceleration_structure(info, AccelerationStructureKind::TopLevel)
    }

    fn create_acceleration_structure(
        &self,
        info: &TaskAccelerationStructureInfo,
        kind: AccelerationStructureKind,
    ) -> Result<Arc<TaskAccelerationStructure>, GraphicsError> {
        if !self
            .shared
            .device()
            .properties()
            .supports_acceleration_structures
        {
            return Err(GraphicsError::FeatureNotSupported(
                "acceleration structures".to_string(),
            ));
        }
        let accel = self
            .shared
            .device()
            .create_acceleration_structure(&AccelerationStructureCreateInfo {
                kind,
                size: info.size,
                name: info.name.clone(),
            })?;
        let slot = self.shared.register_slot();
        Ok(Arc::new(TaskAccelerationStructure::new(
            slot,
            kind,
            info.clone(),
            accel,
            Arc::clone(&self.shared),
        )))
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        let live = self.shared.live_resources();
        if live != 0 {
            log::error!(
                "{live} resources still alive at resource manager destruction; \
                 all resources must be released first"
            );
            panic!("resource manager destroyed with {live} live resources");
        }
    }
}

/// A shader-visible view over a byte range of a task buffer.
#[derive(Debug, Clone)]
pub struct TaskBufferViewInfo {
    pub buffer: Arc<TaskBuffer>,
    pub region: BufferRegion,
}

impl TaskBufferViewInfo {
    fn backend_view(&self) -> ResourceViewInfo {
        ResourceViewInfo::Buffer {
            buffer: self.buffer.internal(),
            region: self.region,
        }
    }
}

/// A shader-visible view over a subresource range of a task image.
#[derive(Debug, Clone)]
pub struct TaskImageViewInfo {
    pub image: Arc<TaskImage>,
    pub range: ImageSubresourceRange,
    pub view_type: ImageViewType,
    /// `None` inherits the image format.
    pub format: Option<Format>,
}

impl TaskImageViewInfo {
    fn backend_view(&self) -> ResourceViewInfo {
        ResourceViewInfo::Image {
            image: self.image.internal(),
            range: self.range,
            view_type: self.view_type,
            format: self.format,
        }
    }
}
