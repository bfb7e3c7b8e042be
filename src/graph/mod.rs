//! The task graph.
//!
//! Usage follows a strict lifecycle:
//!
//! 1. Create resources through the [`ResourceManager`](crate::resources::ResourceManager).
//! 2. Add tasks with [`TaskGraph::add_task`]; each task's `setup` phase runs
//!    immediately and declares its resource accesses.
//! 3. [`TaskGraph::build`] compiles the dependency DAG into batches of
//!    independent tasks with the barriers required between them.
//! 4. Per frame: [`TaskGraph::begin_frame`](TaskGraph::begin_frame) →
//!    [`TaskGraph::execute`](TaskGraph::execute) →
//!    [`TaskGraph::end_frame`](TaskGraph::end_frame).
//! 5. [`TaskGraph::reset`] drops the tasks and batches so the graph can be
//!    rebuilt.

mod compile;
mod frame;

pub use compile::Batch;

use std::sync::Arc;

use crate::access::Access;
use crate::backend::{
    BindPoint, ColorAttachmentInfo, CommandBuffer, DepthStencilAttachmentInfo, Device, Fence,
    ImageBarrier, ImageBlit, LoadOp, RenderPassInfo, ResolveMode, Semaphore, StoreOp,
    TimestampPool,
};
use crate::resources::{ManagerShared, ResourceManager, TaskImage, TaskSwapChain};
use crate::task::{CustomCallbackTask, Task, TaskInfo, TaskKind, TaskSetup};
use crate::types::{
    ImageBox, ImageLayout, ImageSubresourceRange, ImageUsage, LabelColor, Rect,
};

/// Dense id of a task inside one graph, assigned by `add_task` in insertion
/// order.
pub type TaskId = u32;

/// Parameters of a swap chain write (see [`TaskGraph::add_swap_chain_write`]).
#[derive(Clone)]
pub struct TaskSwapChainWriteInfo {
    /// Image presented to the swap chain. Must carry `BLIT_SRC` and
    /// `TRANSFER_SRC` usage.
    pub image: Arc<TaskImage>,
    pub swap_chain: Arc<TaskSwapChain>,
    pub src_rect: Rect,
    pub dst_rect: Rect,
    /// Flip the blit vertically, for origin-top-left viewport conventions.
    pub flip_y: bool,
}

pub(crate) struct TaskRecord {
    pub(crate) task: Box<dyn Task>,
    pub(crate) setup: TaskSetup,
    pub(crate) render_pass: Option<RenderPassInfo>,
    pub(crate) base_timestamp: u32,
    // Cached from the task so the hot loop avoids virtual calls.
    pub(crate) kind: TaskKind,
    pub(crate) bind_point: BindPoint,
    pub(crate) name: String,
    pub(crate) color: LabelColor,
}

/// A render task graph: an ordered set of tasks compiled into batches of
/// GPU-parallel work with automatically synthesized barriers.
pub struct TaskGraph {
    pub(crate) device: Arc<dyn Device>,
    pub(crate) manager: Arc<ManagerShared>,
    pub(crate) frames_in_flight: u32,
    pub(crate) tasks: Vec<TaskRecord>,
    pub(crate) batches: Vec<Batch>,
    pub(crate) swap_chains: Vec<Arc<TaskSwapChain>>,
    pub(crate) timestamp_pools: Vec<TimestampPool>,
    pub(crate) base_graph_timestamp: u32,
    pub(crate) base_flush_timestamp: u32,
    pub(crate) timeline: Fence,
    pub(crate) render_finished: Vec<Semaphore>,
    pub(crate) frame_index: u32,
    pub(crate) cpu_timeline: u64,
    pub(crate) in_frame: bool,
    pub(crate) baked: bool,
}

impl TaskGraph {
    /// Create a graph over the manager's device and frame pacing.
    pub fn new(manager: &ResourceManager) -> Self {
        let device = Arc::clone(manager.device());
        let frames_in_flight = manager.frames_in_flight();
        let timeline = device.create_fence("task graph gpu timeline");
        let render_finished = (0..frames_in_flight)
            .map(|i| device.create_semaphore(&format!("task graph render finished #{i}")))
            .collect();
        Self {
            device,
            manager: Arc::clone(manager.shared()),
            frames_in_flight,
            tasks: Vec::new(),
            batches: Vec::new(),
            swap_chains: Vec::new(),
            timestamp_pools: Vec::new(),
            base_graph_timestamp: 0,
            base_flush_timestamp: 0,
            timeline,
            render_finished,
            frame_index: 0,
            cpu_timeline: 0,
            in_frame: false,
            baked: false,
        }
    }

    /// Add a task to the graph, running its setup phase immediately.
    ///
    /// Ownership of the task transfers to the graph until [`TaskGraph::reset`].
    /// Rejected once the graph is built.
    pub fn add_task(&mut self, mut task: Box<dyn Task>) -> TaskId {
        assert!(!self.baked, "cannot add tasks to a graph after it was built");
        let kind = task.kind();
        let bind_point = task.bind_point();
        let mut setup = TaskSetup::new(kind);
        task.setup(&mut setup);

        let render_pass = (kind == TaskKind::Graphics).then(|| Self::build_render_pass(&setup));

        let id = self.tasks.len() as TaskId;
        let info = task.info();
        let name = info.name.clone();
        let color = info.color;
        self.tasks.push(TaskRecord {
            task,
            setup,
            render_pass,
            base_timestamp: 0,
            kind,
            bind_point,
            name,
            color,
        });
        id
    }

    /// Translate bound targets into backend render pass state. The render
    /// area is taken from the first bound target's image.
    fn build_render_pass(setup: &TaskSetup) -> RenderPassInfo {
        let mut info = RenderPassInfo::default();
        for color_target in &setup.color_targets {
            info.color_attachments.push(ColorAttachmentInfo {
                target: color_target.target.internal(),
                load_op: if color_target.clear.is_some() {
                    LoadOp::Clear
                } else {
                    LoadOp::Load
                },
                store_op: StoreOp::Store,
                clear: color_target.clear.unwrap_or_default(),
                resolve: color_target
                    .resolve
                    .as_ref()
                    .map(|resolve| (ResolveMode::Average, resolve.internal())),
            });
        }
        if let Some(depth_stencil) = &setup.depth_stencil_target {
            info.depth_stencil_attachment = Some(DepthStencilAttachmentInfo {
                target: depth_stencil.target.internal(),
                depth_load_op: if depth_stencil.depth_clear.is_some() {
                    LoadOp::Clear
                } else if depth_stencil.load_depth {
                    LoadOp::Load
                } else {
                    LoadOp::DontCare
                },
                depth_store_op: if depth_stencil.store_depth {
                    StoreOp::Store
                } else {
                    StoreOp::DontCare
                },
                stencil_load_op: if depth_stencil.stencil_clear.is_some() {
                    LoadOp::Clear
                } else if depth_stencil.load_stencil {
                    LoadOp::Load
                } else {
                    LoadOp::DontCare
                },
                stencil_store_op: if depth_stencil.store_stencil {
                    StoreOp::Store
                } else {
                    StoreOp::DontCare
                },
                clear_depth: depth_stencil.depth_clear.unwrap_or(0.0),
                clear_stencil: depth_stencil.stencil_clear.unwrap_or(0),
            });
        }

        let extent = if let Some(color_target) = setup.color_targets.first() {
            color_target.target.image().info().extent
        } else if let Some(depth_stencil) = &setup.depth_stencil_target {
            depth_stencil.target.image().info().extent
        } else {
            panic!("graphics task has no render targets");
        };
        info.render_area = Rect::from_dimensions(extent.width, extent.height);
        info
    }

    /// Inject a transfer task that blits `image` to the swap chain's next
    /// back buffer and transitions it for presentation.
    ///
    /// If acquisition fails (out-of-date surface) the task silently skips
    /// the frame; the next `begin_frame`'s resize pass recovers.
    pub fn add_swap_chain_write(&mut self, info: TaskSwapChainWriteInfo) -> TaskId {
        assert!(!self.baked, "cannot add tasks to a graph after it was built");
        assert!(
            info.image
                .info()
                .usage
                .contains(ImageUsage::BLIT_SRC | ImageUsage::TRANSFER_SRC),
            "swap chain write image must be created with BLIT_SRC and TRANSFER_SRC usages"
        );
        self.swap_chains.push(Arc::clone(&info.swap_chain));

        let device = Arc::clone(&self.device);
        let setup_image = Arc::clone(&info.image);
        let src_image = info.image.internal();
        let swap_chain = info.swap_chain.internal();
        let src_rect = info.src_rect;
        let dst_rect = info.dst_rect;
        let flip_y = info.flip_y;

        let task = CustomCallbackTask::new(
            TaskInfo::new("write swap buffer"),
            TaskKind::Transfer,
            move |setup| setup.use_image(&setup_image, Access::BLIT_READ),
            move |cmd: &mut dyn CommandBuffer| {
                let Some(back_buffer) = device.acquire_next_image(swap_chain) else {
                    return;
                };
                cmd.image_barrier(&ImageBarrier {
                    image: back_buffer,
                    range: ImageSubresourceRange::default(),
                    src_access: Access::BOTTOM_OF_PIPE_READ,
                    dst_access: Access::BLIT_WRITE,
                    src_layout: ImageLayout::Undefined,
                    dst_layout: ImageLayout::BlitDst,
                });
                let mut dst_box = ImageBox {
                    x: dst_rect.x,
                    y: dst_rect.y,
                    z: 0,
                    width: dst_rect.width as i32,
                    height: dst_rect.height as i32,
                    depth: 1,
                };
                if flip_y {
                    dst_box.y += dst_box.height;
                    dst_box.height = -dst_box.height;
                }
                cmd.blit_image_to_image(&ImageBlit {
                    src_image,
                    dst_image: back_buffer,
                    src_box: ImageBox {
                        x: src_rect.x,
                        y: src_rect.y,
                        z: 0,
                        width: src_rect.width as i32,
                        height: src_rect.height as i32,
                        depth: 1,
                    },
                    dst_box,
                });
                cmd.image_barrier(&ImageBarrier {
                    image: back_buffer,
                    range: ImageSubresourceRange::default(),
                    src_access: Access::BLIT_WRITE,
                    dst_access: Access::TOP_OF_PIPE_READ_WRITE,
                    src_layout: ImageLayout::BlitDst,
                    dst_layout: ImageLayout::PresentSrc,
                });
            },
        );
        self.add_task(Box::new(task))
    }

    /// Drop all tasks, batches and swap chain registrations, unmarking the
    /// graph as built. Resources referenced by task setups are released.
    pub fn reset(&mut self) {
        if !self.timestamp_pools.is_empty() {
            // Pools may still be referenced by in-flight frames.
            self.device.wait_idle();
            for pool in self.timestamp_pools.drain(..) {
                self.device.destroy_timestamp_pool(pool);
            }
        }
        self.swap_chains.clear();
        self.tasks.clear();
        self.batches.clear();
        self.baked = false;
    }

    /// Number of tasks currently in the graph.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// The compiled batches. Empty before [`TaskGraph::build`].
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Whether [`TaskGraph::build`] has been called since the last reset.
    pub fn is_baked(&self) -> bool {
        self.baked
    }

    /// Name of a task, if the id is valid.
    pub fn task_name(&self, id: TaskId) -> Option<&str> {
        self.tasks.get(id as usize).map(|record| record.name.as_str())
    }

    /// Human-readable dump of the compiled batches with their barriers.
    pub fn describe(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        out.push_str("task graph batches:\n");
        for (i, batch) in self.batches.iter().enumerate() {
            let _ = writeln!(out, "  batch {i}:");
            out.push_str("    buffer barriers:\n");
            for barrier in batch.buffer_barriers() {
                let name = self.device.buffer_info(barrier.buffer).name;
                let _ = writeln!(
                    out,
                    "      buffer {:#018x} {{{name}}}, layout: {:?} -> {:?}",
                    barrier.buffer.raw(),
                    barrier.src_layout,
                    barrier.dst_layout
                );
            }
            out.push_str("    image barriers:\n");
            for barrier in batch.image_barriers() {
                let name = self.device.image_info(barrier.image).name;
                let _ = writeln!(
                    out,
                    "      image {:#018x} {{{name}}}, mips {}..{}, layers {}..{}, layout: {:?} -> {:?}",
                    barrier.image.raw(),
                    barrier.range.base_mip_level,
                    barrier.range.base_mip_level + barrier.range.level_count,
                    barrier.range.base_array_layer,
                    barrier.range.base_array_layer + barrier.range.layer_count,
                    barrier.src_layout,
                    barrier.dst_layout
                );
            }
            out.push_str("    tasks:\n");
            for &task_id in batch.task_ids() {
                let name = &self.tasks[task_id as usize].name;
                let _ = writeln!(out, "      {task_id} {{{name}}}");
            }
        }
        out
    }
}

impl Drop for TaskGraph {
    fn drop(&mut self) {
        self.device.wait_idle();
        self.reset();
        self.device.destroy_fence(self.timeline);
        for semaphore in self.render_finished.drain(..) {
            self.device.destroy_semaphore(semaphore);
        }
    }
}
