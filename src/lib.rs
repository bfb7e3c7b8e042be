//! # cindergraph
//!
//! A render task graph engine: declare GPU work items ("tasks") and the
//! resources they touch, and the graph compiler orders them, batches
//! independent tasks for parallel execution, synthesizes the memory and
//! layout barriers between batches, and drives per-frame recording,
//! submission and presentation over a multi-frame pipeline.
//!
//! # Architecture
//!
//! | Layer | Type | Purpose |
//! |-------|------|---------|
//! | Frame | [`TaskGraph`] (`begin_frame`/`execute`/`end_frame`) | CPU/GPU timeline pacing, flushes, presentation |
//! | Graph | [`TaskGraph`] (`add_task`/`build`) | Dependency analysis, batching, barriers |
//! | Task | [`Task`] and the callback variants | One unit of GPU work |
//! | Resources | [`ResourceManager`] | Slot-indexed resource lifetimes, staging, dynamic buffers |
//! | Backend | [`Device`] / [`CommandBuffer`] | GPU abstraction boundary |
//!
//! # Example
//!
//! ```ignore
//! let manager = ResourceManager::new(ResourceManagerInfo { device, frames_in_flight: 2 });
//! let image = manager.create_image(&image_info, &[])?;
//! let target = manager.create_color_target(&target_info)?;
//!
//! let mut graph = TaskGraph::new(&manager);
//! graph.add_task(Box::new(GraphicsCallbackTask::new(
//!     TaskInfo::new("triangle"),
//!     move |setup| {
//!         setup.bind_color_target(BindColorTargetInfo {
//!             target: target.clone(),
//!             clear: Some(ClearColor::new(0.0, 0.0, 0.0, 1.0)),
//!             blending: false,
//!             resolve: None,
//!         });
//!     },
//!     move |cmd| cmd.draw(&Draw { vertex_count: 3, ..Default::default() }),
//! )));
//! graph.build();
//!
//! loop {
//!     graph.begin_frame(1000);
//!     graph.execute();
//!     graph.end_frame();
//! }
//! ```

pub mod access;
pub mod backend;
pub mod command_list;
pub mod error;
pub mod graph;
pub mod reload;
pub mod resources;
pub mod task;
pub mod types;

pub use access::{Access, AccessKind, StageFlags};
pub use backend::{
    BindPoint, CommandBuffer, ComputePipelineDesc, Device, DeviceProperties, Dispatch, Draw,
    DrawIndexed, RasterPipelineDesc, SpecializationConstant, SwapChainFormat,
};
pub use command_list::{TaskCommandList, MAX_PUSH_CONSTANT_SIZE};
pub use error::GraphicsError;
pub use graph::{Batch, TaskGraph, TaskId, TaskSwapChainWriteInfo};
pub use reload::{ShaderReloadBridge, ShaderReloadListener};
pub use resources::{
    ResourceManager, ResourceManagerInfo, TaskAccelerationStructure,
    TaskAccelerationStructureInfo, TaskBuffer, TaskBufferInfo, TaskBufferViewInfo,
    TaskColorTarget, TaskColorTargetInfo, TaskComputePipeline, TaskDepthStencilTarget,
    TaskDepthStencilTargetInfo, TaskImage, TaskImageInfo, TaskImageViewInfo, TaskRasterPipeline,
    TaskRasterPipelineShaders, TaskShader, TaskShaderInfo, TaskSwapChain, TaskSwapChainInfo,
};
pub use task::{
    BindColorTargetInfo, BindDepthStencilTargetInfo, ComputeCallbackTask, CustomCallbackTask,
    GraphicsCallbackTask, Task, TaskInfo, TaskKind, TaskSetup, TransferCallbackTask,
    MAX_COLOR_TARGETS,
};
pub use types::{
    BufferLayout, BufferRegion, BufferUsage, ClearColor, Extent2d, Extent3d, Format, ImageBox,
    ImageDimension, ImageLayout, ImageSlice, ImageSubresource, ImageSubresourceRange, ImageUsage,
    ImageViewType, IndexFormat, LabelColor, MemoryDomain, Offset3d, Rect, Viewport,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
