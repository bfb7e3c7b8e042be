//! Graph-visible image resource.

use std::sync::Arc;

use crate::backend::Image;
use crate::types::{Extent3d, Format, ImageDimension, ImageSubresourceRange, ImageUsage};

use super::ManagerShared;

/// Descriptor for creating a [`TaskImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskImageInfo {
    pub dimension: ImageDimension,
    pub format: Format,
    pub extent: Extent3d,
    pub mip_level_count: u32,
    pub array_layer_count: u32,
    pub sample_count: u32,
    pub usage: ImageUsage,
    pub name: String,
}

impl Default for TaskImageInfo {
    fn default() -> Self {
        Self {
            dimension: ImageDimension::D2,
            format: Format::Rgba8Unorm,
            extent: Extent3d::default(),
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            usage: ImageUsage::empty(),
            name: String::new(),
        }
    }
}

/// An image registered with the resource manager.
pub struct TaskImage {
    slot: u32,
    info: TaskImageInfo,
    image: Image,
    owner: Arc<ManagerShared>,
}

impl TaskImage {
    pub(crate) fn new(slot: u32, info: TaskImageInfo, image: Image, owner: Arc<ManagerShared>) -> Self {
        Self {
            slot,
            info,
            image,
            owner,
        }
    }

    /// Stable slot id of this resource.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &TaskImageInfo {
        &self.info
    }

    /// The backend image handle.
    pub fn internal(&self) -> Image {
        self.image
    }

    /// Subresource range covering every mip level and array layer.
    pub fn full_range(&self) -> ImageSubresourceRange {
        ImageSubresourceRange {
            base_mip_level: 0,
            level_count: self.info.mip_level_count,
            base_array_layer: 0,
            layer_count: self.info.array_layer_count,
        }
    }
}

impl Drop for TaskImage {
    fn drop(&mut self) {
        self.owner.purge_staging_image(self.image);
        self.owner.device().destroy_image(self.image, true);
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskImage")
            .field("slot", &self.slot)
            .field("extent", &self.info.extent)
            .field("format", &self.info.format)
            .field("name", &self.info.name)
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskImage: Send, Sync);
