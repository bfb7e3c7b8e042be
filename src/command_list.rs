//! Typed command list handed to tasks during execution.
//!
//! [`TaskCommandList`] is a thin translation layer over the backend command
//! buffer: every method that takes a task resource extracts the backend
//! handle before dispatching. Binding a pipeline first re-creates its
//! backend object if a shader reload marked it dirty.

use std::sync::Arc;

use crate::backend::{
    BindPoint, BlasBuild, BufferCopy, CommandBuffer, Device, Dispatch, Draw, DrawIndexed,
    ImageCopy, TlasBuild, UnorderedAccessId,
};
use crate::resources::{
    TaskAccelerationStructure, TaskBuffer, TaskComputePipeline, TaskImage, TaskRasterPipeline,
};
use crate::types::{ImageSubresource, IndexFormat, Offset3d, Rect, Viewport};

/// Upper size limit for push constants, in bytes.
pub const MAX_PUSH_CONSTANT_SIZE: usize = 128;

/// Command recording interface passed to [`crate::task::Task::execute`].
pub struct TaskCommandList<'a> {
    cmd: &'a mut dyn CommandBuffer,
    device: &'a Arc<dyn Device>,
    bind_point: BindPoint,
}

impl<'a> TaskCommandList<'a> {
    pub(crate) fn new(
        cmd: &'a mut dyn CommandBuffer,
        device: &'a Arc<dyn Device>,
        bind_point: BindPoint,
    ) -> Self {
        Self {
            cmd,
            device,
            bind_point,
        }
    }

    /// Bind point of the task currently executing; push constants and view
    /// bindings are routed to it.
    pub fn bind_point(&self) -> BindPoint {
        self.bind_point
    }

    /// Escape hatch to the backend command buffer, used by custom tasks.
    pub fn raw(&mut self) -> &mut dyn CommandBuffer {
        &mut *self.cmd
    }

    // --- copies -------------------------------------------------------------

    pub fn copy_buffer(
        &mut self,
        src: &TaskBuffer,
        dst: &TaskBuffer,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    ) {
        self.cmd.copy_buffer_to_buffer(&BufferCopy {
            src: src.internal(),
            dst: dst.internal(),
            src_offset,
            dst_offset,
            size,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy_image(
        &mut self,
        src: &TaskImage,
        dst: &TaskImage,
        src_subresource: ImageSubresource,
        src_offset: Offset3d,
        dst_subresource: ImageSubresource,
        dst_offset: Offset3d,
        extent: crate::types::Extent3d,
    ) {
        self.cmd.copy_image_to_image(&ImageCopy {
            src_image: src.internal(),
            src_subresource,
            src_offset,
            dst_image: dst.internal(),
            dst_subresource,
            dst_offset,
            extent,
        });
    }

    pub fn clear_unordered_access_view(&mut self, view: UnorderedAccessId, value: [u32; 4]) {
        self.cmd.clear_unordered_access(view, value);
    }

    /// Inline update of a buffer region from CPU data.
    pub fn update_buffer(&mut self, buffer: &TaskBuffer, offset: u64, data: &[u8]) {
        self.cmd.update_buffer(buffer.internal(), offset, data);
    }

    // --- push constants and bindings ----------------------------------------

    /// Push raw constant bytes to the current bind point.
    pub fn push_constant_bytes(&mut self, data: &[u8], offset: u32) {
        assert!(
            data.len() <= MAX_PUSH_CONSTANT_SIZE,
            "push constant of {} bytes exceeds the {MAX_PUSH_CONSTANT_SIZE}-byte limit; \
             use a uniform buffer instead",
            data.len()
        );
        self.cmd.push_constant(data, offset, self.bind_point);
    }

    /// Push a plain-old-data value as a constant to the current bind point.
    pub fn push_constant<T: bytemuck::NoUninit>(&mut self, value: &T, offset: u32) {
        const {
            assert!(
                std::mem::size_of::<T>() <= MAX_PUSH_CONSTANT_SIZE,
                "push constant type is too large; use a uniform buffer instead"
            );
        }
        self.push_constant_bytes(bytemuck::bytes_of(value), offset);
    }

    pub fn set_uniform_buffer_view(&mut self, slot: u32, buffer: &TaskBuffer) {
        self.cmd
            .set_uniform_buffer_view(slot, buffer.internal(), self.bind_point);
    }

    pub fn set_unordered_access_view(&mut self, slot: u32, view: UnorderedAccessId) {
        self.cmd
            .set_unordered_access_view(slot, view, self.bind_point);
    }

    /// Bind a raster pipeline, re-creating its backend object first if a
    /// shader reload marked it dirty.
    pub fn set_raster_pipeline(&mut self, pipeline: &TaskRasterPipeline) {
        if pipeline.take_dirty() {
            self.device
                .destroy_raster_pipeline(pipeline.internal(), true);
            pipeline.recreate();
        }
        self.cmd.set_raster_pipeline(pipeline.internal());
    }

    /// Bind a compute pipeline, re-creating its backend object first if a
    /// shader reload marked it dirty.
    pub fn set_compute_pipeline(&mut self, pipeline: &TaskComputePipeline) {
        if pipeline.take_dirty() {
            self.device
                .destroy_compute_pipeline(pipeline.internal(), true);
            pipeline.recreate();
        }
        self.cmd.set_compute_pipeline(pipeline.internal());
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.cmd.set_viewport(viewport);
    }

    pub fn set_scissor(&mut self, scissor: &Rect) {
        self.cmd.set_scissor(scissor);
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &TaskBuffer, offset: u64) {
        self.cmd.set_vertex_buffer(slot, buffer.internal(), offset);
    }

    pub fn set_index_buffer(&mut self, buffer: &TaskBuffer, offset: u64, format: IndexFormat) {
        self.cmd.set_index_buffer(buffer.internal(), offset, format);
    }

    // --- draws and dispatches -----------------------------------------------

    pub fn draw(&mut self, draw: &Draw) {
        self.cmd.draw(draw);
    }

    pub fn draw_indexed(&mut self, draw: &DrawIndexed) {
        self.cmd.draw_indexed(draw);
    }

    pub fn draw_indirect(
        &mut self,
        buffer: &TaskBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        self.cmd
            .draw_indirect(buffer.internal(), offset, draw_count, stride);
    }

    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &TaskBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        self.cmd
            .draw_indexed_indirect(buffer.internal(), offset, draw_count, stride);
    }

    pub fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.cmd.dispatch(&Dispatch {
            groups_x,
            groups_y,
            groups_z,
        });
    }

    pub fn dispatch_indirect(&mut self, buffer: &TaskBuffer, offset: u64) {
        self.cmd.dispatch_indirect(buffer.internal(), offset);
    }

    // --- acceleration structures ---------------------------------------------

    /// Build a bottom-level acceleration structure from a geometry buffer.
    pub fn build_blas(
        &mut self,
        blas: &TaskAccelerationStructure,
        geometry: &TaskBuffer,
        scratch: &TaskBuffer,
    ) {
        self.cmd.build_acceleration_structures(
            &[BlasBuild {
                dst: blas.internal(),
                geometry_buffer: geometry.internal(),
                scratch_buffer: scratch.internal(),
            }],
            &[],
        );
    }

    /// Build a top-level acceleration structure from an instance buffer.
    pub fn build_tlas(
        &mut self,
        tlas: &TaskAccelerationStructure,
        instances: &TaskBuffer,
        instance_count: u32,
        scratch: &TaskBuffer,
    ) {
        self.cmd.build_acceleration_structures(
            &[],
            &[TlasBuild {
                dst: tlas.internal(),
                instance_buffer: instances.internal(),
                instance_count,
                scratch_buffer: scratch.internal(),
            }],
        );
    }
}
