//! GPU backend abstraction layer.
//!
//! The task graph engine talks to the GPU exclusively through the [`Device`]
//! and [`CommandBuffer`] traits defined here. A backend implements both; the
//! engine holds the device as `Arc<dyn Device>` and records commands through
//! `Box<dyn CommandBuffer>` objects handed out per frame.
//!
//! Backend objects are identified by opaque `Copy` handles. Handles are plain
//! ids; ownership and lifetime live in the resource layer
//! ([`crate::resources`]), which pairs every backend object with a
//! reference-counted task resource.
//!
//! The crate ships one backend: [`null::NullDevice`], a no-GPU recording
//! backend used by the test suite and for development without hardware.

pub mod null;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::access::{Access, StageFlags};
use crate::error::GraphicsError;
use crate::types::{
    BufferLayout, BufferRegion, BufferUsage, ClearColor, Extent2d, Extent3d, Format, ImageBox,
    ImageDimension, ImageLayout, ImageSlice, ImageSubresource, ImageSubresourceRange, ImageUsage,
    ImageViewType, IndexFormat, LabelColor, MemoryDomain, Offset3d, Rect, Viewport,
};

// ============================================================================
// Opaque handles
// ============================================================================

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// The null handle. Backends never return it from a successful
            /// creation; the engine uses it as a sentinel.
            pub const NULL: Self = Self(0);

            /// Wrap a backend-assigned id.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The backend-assigned id.
            pub fn raw(self) -> u64 {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

handle_type!(
    /// Handle to a backend buffer.
    Buffer
);
handle_type!(
    /// Handle to a backend image.
    Image
);
handle_type!(
    /// Handle to a backend render target view.
    RenderTarget
);
handle_type!(
    /// Handle to a backend raster pipeline object.
    RasterPipeline
);
handle_type!(
    /// Handle to a backend compute pipeline object.
    ComputePipeline
);
handle_type!(
    /// Handle to a backend swap chain.
    SwapChainId
);
handle_type!(
    /// Handle to a timeline fence (monotonic 64-bit counter).
    Fence
);
handle_type!(
    /// Handle to a binary semaphore.
    Semaphore
);
handle_type!(
    /// Handle to a timestamp query pool.
    TimestampPool
);
handle_type!(
    /// Handle to an acceleration structure (BLAS or TLAS).
    AccelerationStructure
);

/// Opaque index of a shader resource view, consumed from shader code.
pub type ShaderResourceId = u32;
/// Opaque index of an unordered access view, consumed from shader code.
pub type UnorderedAccessId = u32;
/// Opaque index of a sampler, consumed from shader code.
pub type SamplerId = u32;

// ============================================================================
// Creation descriptors
// ============================================================================

/// Descriptor for creating a backend buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferCreateInfo {
    pub size: u64,
    pub usage: BufferUsage,
    pub initial_layout: BufferLayout,
    pub domain: MemoryDomain,
    pub name: String,
}

/// Descriptor for creating a backend image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCreateInfo {
    pub dimension: ImageDimension,
    pub format: Format,
    pub extent: Extent3d,
    pub mip_level_count: u32,
    pub array_layer_count: u32,
    pub sample_count: u32,
    pub usage: ImageUsage,
    pub name: String,
}

bitflags::bitflags! {
    /// What a render target view is used for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderTargetKind: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Descriptor for creating a render target view over an image slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetCreateInfo {
    pub image: Image,
    pub slice: ImageSlice,
    pub kind: RenderTargetKind,
    pub name: String,
}

/// Descriptor for a shader-visible view over a buffer or an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceViewInfo {
    Buffer {
        buffer: Buffer,
        region: BufferRegion,
    },
    Image {
        image: Image,
        range: ImageSubresourceRange,
        view_type: ImageViewType,
        /// `None` inherits the image format.
        format: Option<Format>,
    },
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

/// Texture coordinate addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirrorRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Descriptor for creating a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerCreateInfo {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_filter: Filter,
    pub address_mode: AddressMode,
    pub max_anisotropy: Option<f32>,
    pub name: String,
}

impl Default for SamplerCreateInfo {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_filter: Filter::Linear,
            address_mode: AddressMode::Repeat,
            max_anisotropy: None,
            name: String::new(),
        }
    }
}

/// A single specialization constant set at pipeline creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecializationConstant {
    pub id: u32,
    pub value: u32,
}

/// Bytecode plus specialization constants for one shader stage, resolved at
/// pipeline (re-)creation time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderStageInfo {
    pub bytecode: Vec<u8>,
    pub specialization: Vec<SpecializationConstant>,
}

/// Fixed-function state for a raster pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RasterPipelineDesc {
    pub color_formats: Vec<Format>,
    pub depth_format: Option<Format>,
    pub sample_count: u32,
    pub name: String,
}

/// Shader stages for a raster pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RasterShaderStages {
    pub vertex: Option<ShaderStageInfo>,
    pub hull: Option<ShaderStageInfo>,
    pub domain: Option<ShaderStageInfo>,
    pub geometry: Option<ShaderStageInfo>,
    pub fragment: Option<ShaderStageInfo>,
}

/// Fixed-function state for a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputePipelineDesc {
    pub name: String,
}

/// Output surface format class of a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwapChainFormat {
    /// 8-bit unorm LDR.
    #[default]
    Unorm8,
    /// 10-bit unorm LDR.
    Unorm10,
    /// 16-bit float HDR.
    F16Hdr,
}

/// Presentation pacing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    #[default]
    VSync,
    LowLatency,
}

/// Descriptor for creating a swap chain bound to a native window.
#[derive(Debug, Clone)]
pub struct SwapChainCreateInfo {
    pub raw_window: RawWindowHandle,
    pub raw_display: RawDisplayHandle,
    pub format: SwapChainFormat,
    pub present_mode: PresentMode,
    pub buffer_count: u32,
    pub image_usage: ImageUsage,
    pub extent: Extent2d,
    pub name: String,
}

/// Descriptor for creating a timestamp query pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPoolCreateInfo {
    pub query_count: u32,
    pub name: String,
}

/// Kind of acceleration structure to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccelerationStructureKind {
    BottomLevel,
    TopLevel,
}

/// Descriptor for creating an acceleration structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelerationStructureCreateInfo {
    pub kind: AccelerationStructureKind,
    pub size: u64,
    pub name: String,
}

// ============================================================================
// Barriers and copies
// ============================================================================

/// A memory barrier plus layout transition on a buffer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBarrier {
    pub buffer: Buffer,
    pub region: BufferRegion,
    pub src_access: Access,
    pub dst_access: Access,
    pub src_layout: BufferLayout,
    pub dst_layout: BufferLayout,
}

/// A memory barrier plus layout transition on an image subresource range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: Image,
    pub range: ImageSubresourceRange,
    pub src_access: Access,
    pub dst_access: Access,
    pub src_layout: ImageLayout,
    pub dst_layout: ImageLayout,
}

/// Buffer-to-buffer copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src: Buffer,
    pub dst: Buffer,
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// Buffer-to-image copy, honoring a row pitch in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferImageCopy {
    pub buffer: Buffer,
    pub buffer_offset: u64,
    pub image: Image,
    pub subresource: ImageSubresource,
    pub extent: Extent3d,
    pub row_pitch: u32,
}

/// Image-to-image copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCopy {
    pub src_image: Image,
    pub src_subresource: ImageSubresource,
    pub src_offset: Offset3d,
    pub dst_image: Image,
    pub dst_subresource: ImageSubresource,
    pub dst_offset: Offset3d,
    pub extent: Extent3d,
}

/// Image-to-image blit with scaling and optional axis flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBlit {
    pub src_image: Image,
    pub dst_image: Image,
    pub src_box: ImageBox,
    pub dst_box: ImageBox,
}

// ============================================================================
// Render passes, draws and dispatches
// ============================================================================

/// What to do with an attachment at render pass begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear,
    DontCare,
}

/// What to do with an attachment at render pass end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

/// How MSAA samples collapse into a resolve target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveMode {
    #[default]
    Average,
}

/// One color attachment of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttachmentInfo {
    pub target: RenderTarget,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearColor,
    pub resolve: Option<(ResolveMode, RenderTarget)>,
}

/// The depth/stencil attachment of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilAttachmentInfo {
    pub target: RenderTarget,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// Everything a backend needs to begin a render pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPassInfo {
    pub color_attachments: Vec<ColorAttachmentInfo>,
    pub depth_stencil_attachment: Option<DepthStencilAttachmentInfo>,
    pub render_area: Rect,
}

/// Arguments of a non-indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl Default for Draw {
    fn default() -> Self {
        Self {
            vertex_count: 0,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Arguments of an indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexed {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl Default for DrawIndexed {
    fn default() -> Self {
        Self {
            index_count: 0,
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        }
    }
}

/// Arguments of a compute dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    pub groups_x: u32,
    pub groups_y: u32,
    pub groups_z: u32,
}

/// Which pipeline family resource bindings target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindPoint {
    #[default]
    None,
    Graphics,
    Compute,
}

/// One BLAS build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlasBuild {
    pub dst: AccelerationStructure,
    pub geometry_buffer: Buffer,
    pub scratch_buffer: Buffer,
}

/// One TLAS build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlasBuild {
    pub dst: AccelerationStructure,
    pub instance_buffer: Buffer,
    pub instance_count: u32,
    pub scratch_buffer: Buffer,
}

// ============================================================================
// Queue submission
// ============================================================================

/// Signal operations attached to a queue submission.
#[derive(Debug, Clone, Default)]
pub struct QueueSubmit {
    /// Binary semaphores signalled when the submission is presentable.
    pub signal_present_semaphores: Vec<Semaphore>,
    /// Timeline fences and the values to signal them to.
    pub signal_fences: Vec<(Fence, u64)>,
}

/// Wait operations for a present.
#[derive(Debug, Clone, Default)]
pub struct QueuePresent {
    pub wait_semaphores: Vec<Semaphore>,
}

/// Static device capabilities and limits consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProperties {
    /// Required row alignment for buffer-to-image copies, in bytes.
    pub buffer_image_row_alignment: u32,
    /// Duration of one timestamp tick in nanoseconds.
    pub timestamp_tick_period_ns: f64,
    /// Whether BLAS/TLAS creation is available.
    pub supports_acceleration_structures: bool,
}

// ============================================================================
// Device trait
// ============================================================================

/// The GPU device abstraction consumed by the task graph engine.
///
/// All work targets the device's single presentation queue. Implementations
/// must tolerate destruction of null handles.
pub trait Device: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Static capabilities and limits.
    fn properties(&self) -> DeviceProperties;

    // --- resource creation -------------------------------------------------

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Buffer, GraphicsError>;
    fn create_image(&self, info: &ImageCreateInfo) -> Result<Image, GraphicsError>;
    fn create_render_target(
        &self,
        info: &RenderTargetCreateInfo,
    ) -> Result<RenderTarget, GraphicsError>;
    fn create_shader_resource(
        &self,
        info: &ResourceViewInfo,
    ) -> Result<ShaderResourceId, GraphicsError>;
    fn create_unordered_access(
        &self,
        info: &ResourceViewInfo,
    ) -> Result<UnorderedAccessId, GraphicsError>;
    fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<SamplerId, GraphicsError>;
    fn create_raster_pipeline(
        &self,
        desc: &RasterPipelineDesc,
        stages: &RasterShaderStages,
    ) -> Result<RasterPipeline, GraphicsError>;
    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
        shader: &ShaderStageInfo,
    ) -> Result<ComputePipeline, GraphicsError>;
    fn create_swap_chain(&self, info: &SwapChainCreateInfo) -> Result<SwapChainId, GraphicsError>;
    fn create_acceleration_structure(
        &self,
        info: &AccelerationStructureCreateInfo,
    ) -> Result<AccelerationStructure, GraphicsError>;
    fn create_fence(&self, name: &str) -> Fence;
    fn create_semaphore(&self, name: &str) -> Semaphore;
    fn create_timestamp_pool(&self, info: &TimestampPoolCreateInfo) -> TimestampPool;

    // --- resource destruction ----------------------------------------------
    //
    // `deferred` delays the actual release until the GPU has finished all
    // submissions that may still reference the object.

    fn destroy_buffer(&self, buffer: Buffer, deferred: bool);
    fn destroy_image(&self, image: Image, deferred: bool);
    fn destroy_render_target(&self, target: RenderTarget);
    fn destroy_shader_resource(&self, id: ShaderResourceId);
    fn destroy_unordered_access(&self, id: UnorderedAccessId);
    fn destroy_sampler(&self, id: SamplerId);
    fn destroy_raster_pipeline(&self, pipeline: RasterPipeline, deferred: bool);
    fn destroy_compute_pipeline(&self, pipeline: ComputePipeline, deferred: bool);
    fn destroy_swap_chain(&self, swap_chain: SwapChainId);
    fn destroy_acceleration_structure(&self, accel: AccelerationStructure);
    fn destroy_fence(&self, fence: Fence);
    fn destroy_semaphore(&self, semaphore: Semaphore);
    fn destroy_timestamp_pool(&self, pool: TimestampPool);

    // --- resource queries --------------------------------------------------

    fn buffer_info(&self, buffer: Buffer) -> BufferCreateInfo;
    fn image_info(&self, image: Image) -> ImageCreateInfo;
    /// Total staging size needed to upload the whole image, rows padded to
    /// the device's row alignment.
    fn image_size_requirements(&self, image: Image) -> u64;
    /// Aligned byte pitch for one tightly packed row of `row_bytes` bytes
    /// in the given mip.
    fn image_row_pitch(&self, image: Image, mip_level: u32, row_bytes: u32) -> u32;
    /// Opaque address of a BLAS for use in TLAS instance records.
    fn acceleration_structure_address(&self, accel: AccelerationStructure) -> u64;

    // --- host access to host-visible buffers -------------------------------

    fn write_buffer(&self, buffer: Buffer, offset: u64, data: &[u8]);
    fn read_buffer(&self, buffer: Buffer, offset: u64, size: u64) -> Vec<u8>;

    // --- swap chain --------------------------------------------------------

    /// Acquire the next back buffer. `None` means the acquisition failed
    /// (out-of-date surface); the caller skips presentation this frame.
    fn acquire_next_image(&self, swap_chain: SwapChainId) -> Option<Image>;
    fn resize_swap_chain(&self, swap_chain: SwapChainId);

    // --- synchronization and submission ------------------------------------

    /// Block until `fence` reaches `value` or the timeout elapses. Returns
    /// `false` on timeout.
    fn wait_fence_value(&self, fence: Fence, value: u64, timeout_ns: u64) -> bool;
    /// Block until the device is idle.
    fn wait_idle(&self);

    /// Start recording a new command buffer on the presentation queue.
    fn create_command_buffer(&self, name: &str) -> Box<dyn CommandBuffer>;
    /// Finish and enqueue a recorded command buffer.
    fn submit_command_buffer(&self, cmd: Box<dyn CommandBuffer>);
    /// Submit everything enqueued on the presentation queue.
    fn submit_queue(&self, submit: &QueueSubmit);
    /// Present all swap chains enqueued via [`Device::enqueue_present`].
    fn present_queue(&self, present: &QueuePresent);
    /// Mark a swap chain for presentation in the next [`Device::present_queue`].
    fn enqueue_present(&self, swap_chain: SwapChainId);

    // --- timestamps ---------------------------------------------------------

    fn read_timestamps(&self, pool: TimestampPool, first: u32, count: u32) -> Vec<u64>;
}

// ============================================================================
// Command buffer trait
// ============================================================================

/// Recording interface of a backend command buffer.
pub trait CommandBuffer {
    fn begin_label(&mut self, color: LabelColor, name: &str);
    fn end_label(&mut self);

    fn buffer_barrier(&mut self, barrier: &BufferBarrier);
    fn image_barrier(&mut self, barrier: &ImageBarrier);

    fn copy_buffer_to_buffer(&mut self, copy: &BufferCopy);
    fn copy_buffer_to_image(&mut self, copy: &BufferImageCopy);
    fn copy_image_to_image(&mut self, copy: &ImageCopy);
    fn blit_image_to_image(&mut self, blit: &ImageBlit);

    fn clear_unordered_access(&mut self, view: UnorderedAccessId, value: [u32; 4]);
    fn update_buffer(&mut self, buffer: Buffer, offset: u64, data: &[u8]);
    fn push_constant(&mut self, data: &[u8], offset: u32, bind_point: BindPoint);

    fn set_uniform_buffer_view(&mut self, slot: u32, buffer: Buffer, bind_point: BindPoint);
    fn set_unordered_access_view(
        &mut self,
        slot: u32,
        view: UnorderedAccessId,
        bind_point: BindPoint,
    );
    fn set_raster_pipeline(&mut self, pipeline: RasterPipeline);
    fn set_compute_pipeline(&mut self, pipeline: ComputePipeline);
    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, scissor: &Rect);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: Buffer, offset: u64);
    fn set_index_buffer(&mut self, buffer: Buffer, offset: u64, format: IndexFormat);

    fn draw(&mut self, draw: &Draw);
    fn draw_indexed(&mut self, draw: &DrawIndexed);
    fn draw_indirect(&mut self, buffer: Buffer, offset: u64, draw_count: u32, stride: u32);
    fn draw_indexed_indirect(&mut self, buffer: Buffer, offset: u64, draw_count: u32, stride: u32);
    fn dispatch(&mut self, dispatch: &Dispatch);
    fn dispatch_indirect(&mut self, buffer: Buffer, offset: u64);

    fn begin_render_pass(&mut self, info: &RenderPassInfo);
    fn end_render_pass(&mut self);

    fn write_timestamp(&mut self, pool: TimestampPool, stage: StageFlags, index: u32);
    fn invalidate_timestamps(&mut self, pool: TimestampPool, first: u32, count: u32);

    fn build_acceleration_structures(&mut self, blas: &[BlasBuild], tlas: &[TlasBuild]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_null() {
        assert!(Buffer::NULL.is_null());
        assert!(!Buffer::from_raw(7).is_null());
        assert_eq!(Image::from_raw(42).raw(), 42);
    }

    #[test]
    fn test_draw_defaults() {
        let draw = Draw::default();
        assert_eq!(draw.instance_count, 1);
        let draw = DrawIndexed::default();
        assert_eq!(draw.instance_count, 1);
    }
}
