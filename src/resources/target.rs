//! Render target views over task images.

use std::sync::Arc;

use crate::backend::RenderTarget;
use crate::types::ImageSlice;

use super::{ManagerShared, TaskImage};

/// Descriptor for creating a [`TaskColorTarget`].
#[derive(Debug, Clone)]
pub struct TaskColorTargetInfo {
    pub image: Arc<TaskImage>,
    pub slice: ImageSlice,
    pub name: String,
}

/// A color render target view over one mip/layer of a task image.
pub struct TaskColorTarget {
    slot: u32,
    info: TaskColorTargetInfo,
    render_target: RenderTarget,
    owner: Arc<ManagerShared>,
}

impl TaskColorTarget {
    pub(crate) fn new(
        slot: u32,
        info: TaskColorTargetInfo,
        render_target: RenderTarget,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            render_target,
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &TaskColorTargetInfo {
        &self.info
    }

    /// The image this target views.
    pub fn image(&self) -> &Arc<TaskImage> {
        &self.info.image
    }

    /// The backend render target handle.
    pub fn internal(&self) -> RenderTarget {
        self.render_target
    }
}

impl Drop for TaskColorTarget {
    fn drop(&mut self) {
        self.owner.device().destroy_render_target(self.render_target);
        self.owner.release_slot(self.slot);
    }
}

/// Descriptor for creating a [`TaskDepthStencilTarget`].
#[derive(Debug, Clone)]
pub struct TaskDepthStencilTargetInfo {
    pub image: Arc<TaskImage>,
    pub slice: ImageSlice,
    /// View includes the depth aspect.
    pub depth: bool,
    /// View includes the stencil aspect.
    pub stencil: bool,
    pub name: String,
}

/// A depth/stencil render target view over one mip/layer of a task image.
pub struct TaskDepthStencilTarget {
    slot: u32,
    info: TaskDepthStencilTargetInfo,
    render_target: RenderTarget,
    owner: Arc<ManagerShared>,
}

impl TaskDepthStencilTarget {
    pub(crate) fn new(
        slot: u32,
        info: TaskDepthStencilTargetInfo,
        render_target: RenderTarget,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            render_target,
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &TaskDepthStencilTargetInfo {
        &self.info
    }

    pub fn image(&self) -> &Arc<TaskImage> {
        &self.info.image
    }

    pub fn internal(&self) -> RenderTarget {
        self.render_target
    }
}

impl Drop for TaskDepthStencilTarget {
    fn drop(&mut self) {
        self.owner.device().destroy_render_target(self.render_target);
        self.owner.release_slot(self.slot);
    }
}

static_assertions::assert_impl_all!(TaskColorTarget: Send, Sync);
static_assertions::assert_impl_all!(TaskDepthStencilTarget: Send, Sync);
