//! Swap chain resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{SwapChainFormat, SwapChainId};
use crate::types::{Extent2d, ImageUsage};

use super::ManagerShared;

/// Descriptor for creating a [`TaskSwapChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSwapChainInfo {
    pub format: SwapChainFormat,
    /// Extra usages of the back buffer images (blit destination is always
    /// included by swap chain writes).
    pub image_usage: ImageUsage,
    pub vsync: bool,
    pub extent: Extent2d,
    pub name: String,
}

impl Default for TaskSwapChainInfo {
    fn default() -> Self {
        Self {
            format: SwapChainFormat::Unorm8,
            image_usage: ImageUsage::empty(),
            vsync: true,
            extent: Extent2d::default(),
            name: String::new(),
        }
    }
}

/// A swap chain registered with the resource manager.
///
/// Resizing is deferred: [`TaskSwapChain::request_resize`] only sets a flag,
/// and the next `begin_frame` waits for the device to go idle and rebuilds
/// the swap chain.
pub struct TaskSwapChain {
    slot: u32,
    info: TaskSwapChainInfo,
    swap_chain: SwapChainId,
    resize_requested: AtomicBool,
    owner: Arc<ManagerShared>,
}

impl TaskSwapChain {
    pub(crate) fn new(
        slot: u32,
        info: TaskSwapChainInfo,
        swap_chain: SwapChainId,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            swap_chain,
            resize_requested: AtomicBool::new(false),
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &TaskSwapChainInfo {
        &self.info
    }

    /// The backend swap chain handle.
    pub fn internal(&self) -> SwapChainId {
        self.swap_chain
    }

    /// Request a rebuild at the start of the next frame (e.g. after the
    /// window was resized).
    pub fn request_resize(&self) {
        self.resize_requested.store(true, Ordering::Relaxed);
    }

    /// Consume a pending resize request.
    pub(crate) fn take_resize_request(&self) -> bool {
        self.resize_requested.swap(false, Ordering::Relaxed)
    }
}

impl Drop for TaskSwapChain {
    fn drop(&mut self) {
        self.owner.device().destroy_swap_chain(self.swap_chain);
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSwapChain")
            .field("slot", &self.slot)
            .field("extent", &self.info.extent)
            .field("vsync", &self.info.vsync)
            .field("name", &self.info.name)
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskSwapChain: Send, Sync);
