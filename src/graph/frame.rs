//! Per-frame execution: timeline pacing, flushes, recording, presentation.
//!
//! The frame protocol is `begin_frame` → `execute` → `end_frame`:
//!
//! - `begin_frame` advances the CPU timeline, services deferred swap-chain
//!   resizes, and blocks until the GPU has caught up to within
//!   `frames_in_flight` frames.
//! - `execute` records one command buffer: staging and dynamic-buffer
//!   flushes first, then every batch (barriers, then tasks), with
//!   timestamps around the whole graph, the flush phase and each task.
//! - `end_frame` submits with the frame's timeline signal and presents all
//!   registered swap chains.

use crate::access::{Access, StageFlags};
use crate::backend::{
    BufferBarrier, BufferCopy, BufferImageCopy, CommandBuffer, ImageBarrier, QueuePresent,
    QueueSubmit, TimestampPool,
};
use crate::command_list::TaskCommandList;
use crate::resources::StagingUpload;
use crate::types::{BufferLayout, BufferRegion, ImageLayout, ImageSubresourceRange, LabelColor};

use super::{TaskGraph, TaskId};

impl TaskGraph {
    /// Start a frame.
    ///
    /// Waits on the GPU timeline for the value `cpu_timeline -
    /// frames_in_flight` with the given timeout. A timeout is treated as a
    /// GPU hang and aborts.
    pub fn begin_frame(&mut self, timeout_ms: u32) {
        assert!(self.baked, "build() must be called before starting a frame");
        self.cpu_timeline += 1;
        self.in_frame = true;

        for swap_chain in &self.swap_chains {
            if swap_chain.take_resize_request() {
                self.device.wait_idle();
                self.device.resize_swap_chain(swap_chain.internal());
            }
        }

        // CPU writes between begin_frame and execute must land in this
        // frame's replica, so the index advances here rather than at flush.
        for buffer in self.manager.dynamic_buffers() {
            buffer.set_current_replica(self.frame_index);
        }

        let wait_value = self.cpu_timeline.saturating_sub(self.frames_in_flight as u64);
        let timeout_ns = timeout_ms as u64 * 1_000_000;
        if !self
            .device
            .wait_fence_value(self.timeline, wait_value, timeout_ns)
        {
            log::error!("GPU timeline wait timed out after {timeout_ms} ms, device is hanging");
            panic!("GPU timeline wait timed out");
        }
    }

    /// Record and enqueue this frame's command buffer.
    pub fn execute(&mut self) {
        assert!(self.in_frame, "do not call execute() outside of a frame");

        let pool = self.timestamp_pools[self.frame_index as usize];
        let query_count = (self.tasks.len() * 2 + 4) as u32;
        let mut cmd = self
            .device
            .create_command_buffer(&format!("task graph commands #{}", self.frame_index));

        cmd.invalidate_timestamps(pool, 0, query_count);
        cmd.write_timestamp(pool, StageFlags::TOP_OF_PIPE, self.base_graph_timestamp);

        cmd.write_timestamp(pool, StageFlags::TOP_OF_PIPE, self.base_flush_timestamp);
        self.flush_staging_buffers(cmd.as_mut());
        self.flush_dynamic_buffers(cmd.as_mut());
        cmd.write_timestamp(pool, StageFlags::BOTTOM_OF_PIPE, self.base_flush_timestamp + 1);

        let batches = std::mem::take(&mut self.batches);
        for (batch_index, batch) in batches.iter().enumerate() {
            cmd.begin_label(
                LabelColor::BLACK,
                &format!("sync barriers batch #{batch_index}"),
            );
            for barrier in batch.image_barriers() {
                cmd.image_barrier(barrier);
            }
            for barrier in batch.buffer_barriers() {
                cmd.buffer_barrier(barrier);
            }
            cmd.end_label();

            for &task_id in batch.task_ids() {
                let record = &mut self.tasks[task_id as usize];
                cmd.begin_label(record.color, &record.name);
                cmd.write_timestamp(pool, StageFlags::TOP_OF_PIPE, record.base_timestamp);
                if let Some(render_pass) = &record.render_pass {
                    cmd.begin_render_pass(render_pass);
                }
                let mut list = TaskCommandList::new(cmd.as_mut(), &self.device, record.bind_point);
                record.task.execute(&mut list);
                if record.render_pass.is_some() {
                    cmd.end_render_pass();
                }
                cmd.write_timestamp(pool, StageFlags::BOTTOM_OF_PIPE, record.base_timestamp + 1);
                cmd.end_label();
            }
        }
        self.batches = batches;

        cmd.write_timestamp(pool, StageFlags::BOTTOM_OF_PIPE, self.base_graph_timestamp + 1);
        self.device.submit_command_buffer(cmd);
    }

    /// Present all registered swap chains and submit the queue with this
    /// frame's timeline signal.
    pub fn end_frame(&mut self) {
        for swap_chain in &self.swap_chains {
            self.device.enqueue_present(swap_chain.internal());
        }
        let semaphore = self.render_finished[self.frame_index as usize];
        self.device.submit_queue(&QueueSubmit {
            signal_present_semaphores: vec![semaphore],
            signal_fences: vec![(self.timeline, self.cpu_timeline)],
        });
        self.device.present_queue(&QueuePresent {
            wait_semaphores: vec![semaphore],
        });
        self.frame_index = (self.frame_index + 1) % self.frames_in_flight;
        self.in_frame = false;
    }

    // --- flushes -------------------------------------------------------------

    /// Copy every pending staging upload into its destination, then release
    /// the staging buffers once the GPU is done with them.
    fn flush_staging_buffers(&self, cmd: &mut dyn CommandBuffer) {
        cmd.begin_label(LabelColor::BLUE, "flush staging buffers");
        for batch in self.manager.take_staging() {
            cmd.buffer_barrier(&BufferBarrier {
                buffer: batch.src,
                region: BufferRegion::whole(),
                src_access: Access::HOST_WRITE,
                dst_access: Access::TRANSFER_READ,
                src_layout: BufferLayout::TransferSrc,
                dst_layout: BufferLayout::TransferSrc,
            });
            for upload in &batch.uploads {
                match upload {
                    StagingUpload::Buffer { dst, dst_layout } => {
                        cmd.buffer_barrier(&BufferBarrier {
                            buffer: *dst,
                            region: BufferRegion::whole(),
                            src_access: Access::NONE,
                            dst_access: Access::TRANSFER_WRITE,
                            src_layout: BufferLayout::Undefined,
                            dst_layout: BufferLayout::TransferDst,
                        });
                        cmd.copy_buffer_to_buffer(&BufferCopy {
                            src: batch.src,
                            dst: *dst,
                            src_offset: 0,
                            dst_offset: 0,
                            size: self.device.buffer_info(*dst).size,
                        });
                        cmd.buffer_barrier(&BufferBarrier {
                            buffer: *dst,
                            region: BufferRegion::whole(),
                            src_access: Access::TRANSFER_WRITE,
                            dst_access: Access::READ_WRITE,
                            src_layout: BufferLayout::TransferDst,
                            dst_layout: *dst_layout,
                        });
                    }
                    StagingUpload::Image {
                        dst,
                        dst_layout,
                        subresource,
                        row_pitch,
                    } => {
                        let info = self.device.image_info(*dst);
                        let range = ImageSubresourceRange {
                            base_mip_level: 0,
                            level_count: info.mip_level_count,
                            base_array_layer: 0,
                            layer_count: info.array_layer_count,
                        };
                        cmd.image_barrier(&ImageBarrier {
                            image: *dst,
                            range,
                            src_access: Access::NONE,
                            dst_access: Access::TRANSFER_WRITE,
                            src_layout: ImageLayout::Undefined,
                            dst_layout: ImageLayout::TransferDst,
                        });
                        cmd.copy_buffer_to_image(&BufferImageCopy {
                            buffer: batch.src,
                            buffer_offset: 0,
                            image: *dst,
                            subresource: *subresource,
                            extent: info.extent,
                            row_pitch: *row_pitch,
                        });
                        cmd.image_barrier(&ImageBarrier {
                            image: *dst,
                            range,
                            src_access: Access::TRANSFER_WRITE,
                            dst_access: Access::READ_WRITE,
                            src_layout: ImageLayout::TransferDst,
                            dst_layout: *dst_layout,
                        });
                    }
                }
            }
            self.device.destroy_buffer(batch.src, true);
        }
        cmd.end_label();
    }

    /// Make this frame's dynamic-buffer replicas visible: CPU-visible
    /// buffers re-point their primary at the replica, the rest get a device
    /// copy into the primary.
    fn flush_dynamic_buffers(&self, cmd: &mut dyn CommandBuffer) {
        cmd.begin_label(LabelColor::BLUE, "flush dynamic buffers");
        for buffer in self.manager.dynamic_buffers() {
            buffer.set_current_replica(self.frame_index);
            let replica = buffer.replica(self.frame_index);
            if buffer.info().cpu_visible {
                buffer.point_primary_at(replica);
                continue;
            }
            cmd.buffer_barrier(&BufferBarrier {
                buffer: replica,
                region: BufferRegion::whole(),
                src_access: Access::HOST_WRITE,
                dst_access: Access::TRANSFER_READ,
                src_layout: BufferLayout::TransferSrc,
                dst_layout: BufferLayout::TransferSrc,
            });
            let primary = buffer.internal();
            cmd.buffer_barrier(&BufferBarrier {
                buffer: primary,
                region: BufferRegion::whole(),
                src_access: Access::NONE,
                dst_access: Access::TRANSFER_WRITE,
                src_layout: BufferLayout::Undefined,
                dst_layout: BufferLayout::TransferDst,
            });
            cmd.copy_buffer_to_buffer(&BufferCopy {
                src: replica,
                dst: primary,
                src_offset: 0,
                dst_offset: 0,
                size: buffer.info().size,
            });
            cmd.buffer_barrier(&BufferBarrier {
                buffer: primary,
                region: BufferRegion::whole(),
                src_access: Access::TRANSFER_WRITE,
                dst_access: Access::READ,
                src_layout: BufferLayout::TransferDst,
                dst_layout: BufferLayout::ReadOnly,
            });
        }
        cmd.end_label();
    }

    // --- timings -------------------------------------------------------------

    /// Pool of the most recently completed frame.
    fn completed_pool(&self) -> Option<TimestampPool> {
        if self.timestamp_pools.is_empty() {
            return None;
        }
        let index = ((self.frame_index + 1) % self.frames_in_flight) as usize;
        Some(self.timestamp_pools[index])
    }

    fn timing_ns(&self, base_index: u32) -> f64 {
        let Some(pool) = self.completed_pool() else {
            return 0.0;
        };
        let timestamps = self.device.read_timestamps(pool, base_index, 2);
        let delta = timestamps[1].saturating_sub(timestamps[0]);
        delta as f64 * self.device.properties().timestamp_tick_period_ns
    }

    /// GPU time of the whole graph in the most recently completed frame,
    /// in nanoseconds.
    pub fn graph_timing_ns(&self) -> f64 {
        self.timing_ns(self.base_graph_timestamp)
    }

    /// GPU time of the staging and dynamic-buffer flushes in the most
    /// recently completed frame, in nanoseconds.
    pub fn flushes_timing_ns(&self) -> f64 {
        self.timing_ns(self.base_flush_timestamp)
    }

    /// GPU time of one task in the most recently completed frame, in
    /// nanoseconds. Returns 0 for unknown ids.
    pub fn task_timing_ns(&self, task: TaskId) -> f64 {
        match self.tasks.get(task as usize) {
            Some(record) => self.timing_ns(record.base_timestamp),
            None => 0.0,
        }
    }
}
