//! Graph-visible GPU resources and their manager.
//!
//! Every resource created through [`ResourceManager`] registers itself in a
//! slot table and receives a dense, stable slot id. Slot ids are what the
//! graph compiler uses to index its scratch state, and what the
//! shader-to-pipeline cross-links are keyed by.
//!
//! Resources are reference counted: the `Arc` returned by the manager is the
//! owning handle, and dropping the last clone releases the slot and destroys
//! the backend objects.

mod accel;
mod buffer;
mod image;
mod manager;
mod pipeline;
mod swapchain;
mod target;

pub use accel::{TaskAccelerationStructure, TaskAccelerationStructureInfo};
pub use buffer::{TaskBuffer, TaskBufferInfo};
pub use image::{TaskImage, TaskImageInfo};
pub use manager::{
    ResourceManager, ResourceManagerInfo, TaskBufferViewInfo, TaskImageViewInfo,
};
pub use pipeline::{
    TaskComputePipeline, TaskRasterPipeline, TaskRasterPipelineShaders, TaskShader, TaskShaderInfo,
};
pub use swapchain::{TaskSwapChain, TaskSwapChainInfo};
pub use target::{
    TaskColorTarget, TaskColorTargetInfo, TaskDepthStencilTarget, TaskDepthStencilTargetInfo,
};

pub(crate) use manager::{ManagerShared, StagingUpload};
