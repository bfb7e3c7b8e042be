//! Shared harness for the task graph integration tests.
//!
//! Everything runs against the recording [`NullDevice`], which executes
//! host-visible copies for real and logs every other command for
//! inspection.

use std::sync::Arc;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use cindergraph::backend::null::NullDevice;
use cindergraph::{
    Device, Extent2d, Extent3d, Format, ImageSlice, ImageUsage, ResourceManager,
    ResourceManagerInfo, TaskBuffer, TaskBufferInfo, TaskColorTarget, TaskColorTargetInfo,
    TaskImage, TaskImageInfo, TaskSwapChain, TaskSwapChainInfo,
};
use cindergraph::{BufferUsage, GraphicsError};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A null device plus a resource manager over it.
///
/// Field order matters: the manager asserts at drop that all resources are
/// gone, so test resources must be dropped before the context.
pub struct TestContext {
    pub device: Arc<NullDevice>,
    pub manager: ResourceManager,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_frames_in_flight(2)
    }

    pub fn with_frames_in_flight(frames_in_flight: u32) -> Self {
        init_logging();
        let device = Arc::new(NullDevice::new());
        let manager = ResourceManager::new(ResourceManagerInfo {
            device: Arc::clone(&device) as Arc<dyn Device>,
            frames_in_flight,
        });
        Self { device, manager }
    }

    pub fn create_buffer(&self, size: u64, usage: BufferUsage, name: &str) -> Arc<TaskBuffer> {
        self.manager
            .create_buffer(
                &TaskBufferInfo {
                    size,
                    usage,
                    name: name.to_string(),
                    ..Default::default()
                },
                &[],
            )
            .expect("buffer creation failed")
    }

    pub fn create_image(
        &self,
        width: u32,
        height: u32,
        usage: ImageUsage,
        name: &str,
    ) -> Arc<TaskImage> {
        self.manager
            .create_image(
                &TaskImageInfo {
                    format: Format::Rgba8Unorm,
                    extent: Extent3d::new_2d(width, height),
                    usage,
                    name: name.to_string(),
                    ..Default::default()
                },
                &[],
            )
            .expect("image creation failed")
    }

    pub fn create_color_target(&self, image: &Arc<TaskImage>, name: &str) -> Arc<TaskColorTarget> {
        self.manager
            .create_color_target(&TaskColorTargetInfo {
                image: Arc::clone(image),
                slice: ImageSlice::default(),
                name: name.to_string(),
            })
            .expect("color target creation failed")
    }

    pub fn create_swap_chain(
        &self,
        width: u32,
        height: u32,
        name: &str,
    ) -> Result<Arc<TaskSwapChain>, GraphicsError> {
        self.manager.create_swap_chain_raw(
            &TaskSwapChainInfo {
                extent: Extent2d::new(width, height),
                name: name.to_string(),
                ..Default::default()
            },
            RawWindowHandle::Web(WebWindowHandle::new(1)),
            RawDisplayHandle::Web(WebDisplayHandle::new()),
        )
    }
}
