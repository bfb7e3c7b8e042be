//! Graph compilation: dependency analysis, batching, barrier synthesis and
//! intra-batch reordering.
//!
//! [`TaskGraph::build`] runs four phases over the added tasks:
//!
//! 1. **Parents**: walking tasks in insertion order, the most recent task
//!    that touched each resource slot becomes a parent of the next toucher.
//!    Any two uses of the same resource serialize; no access-kind analysis
//!    happens here.
//! 2. **Batching**: Kahn-style rounds where every task with an empty parent
//!    set forms the next batch and is removed from the remaining parent
//!    sets.
//! 3. **Barriers**: walking batches in order with per-slot access state,
//!    every access change emits one barrier with layouts derived from the
//!    old and new access.
//! 4. **Reordering**: within each batch, tasks matching the previous
//!    batch's trailing kind sort first and tasks matching the next batch's
//!    leading kind sort last, minimizing bind-point switches at batch
//!    boundaries.

use fixedbitset::FixedBitSet;

use crate::access::{Access, StageFlags};
use crate::backend::{BufferBarrier, ImageBarrier, TimestampPoolCreateInfo};
use crate::task::TaskKind;
use crate::types::{BufferLayout, BufferRegion, ImageLayout};

use super::{TaskGraph, TaskId};

/// A set of tasks that execute in parallel on the GPU, preceded by the
/// barriers that make their declared accesses valid.
#[derive(Debug, Default)]
pub struct Batch {
    pub(crate) task_ids: Vec<TaskId>,
    pub(crate) buffer_barriers: Vec<BufferBarrier>,
    pub(crate) image_barriers: Vec<ImageBarrier>,
}

impl Batch {
    /// Tasks of this batch in execution order.
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    pub fn buffer_barriers(&self) -> &[BufferBarrier] {
        &self.buffer_barriers
    }

    pub fn image_barriers(&self) -> &[ImageBarrier] {
        &self.image_barriers
    }
}

/// Derive the buffer layout an access requires.
///
/// Mixing transfer reads and transfer writes in one access is a programmer
/// error and aborts.
pub(crate) fn buffer_layout_for(access: Access) -> BufferLayout {
    if access.is_none() {
        return BufferLayout::Undefined;
    }
    let transfer = access.stages.intersects(
        StageFlags::TRANSFER | StageFlags::RESOLVE | StageFlags::BLIT | StageFlags::COPY,
    );
    let read = access.is_read();
    let write = access.is_write();

    if transfer {
        if read && !write {
            return BufferLayout::TransferSrc;
        }
        if write && !read {
            return BufferLayout::TransferDst;
        }
        panic!("invalid buffer access: transfer stages combined with read+write");
    }
    if read && !write {
        return BufferLayout::ReadOnly;
    }
    if write {
        return BufferLayout::UnorderedAccess;
    }
    panic!("invalid buffer access: stages set but no direction");
}

/// Derive the image layout an access requires.
pub(crate) fn image_layout_for(access: Access) -> ImageLayout {
    if access.is_none() {
        return ImageLayout::Undefined;
    }
    let transfer = access
        .stages
        .intersects(StageFlags::TRANSFER | StageFlags::COPY);
    let blit = access.stages.intersects(StageFlags::BLIT);
    let render_target = access.stages.intersects(
        StageFlags::COLOR_ATTACHMENT_OUTPUT
            | StageFlags::EARLY_FRAGMENT_TESTS
            | StageFlags::LATE_FRAGMENT_TESTS,
    );
    let read = access.is_read();
    let write = access.is_write();

    if transfer {
        if read && !write {
            return ImageLayout::TransferSrc;
        }
        if write && !read {
            return ImageLayout::TransferDst;
        }
        panic!("invalid image access: transfer stages combined with read+write");
    }
    if blit {
        if read && !write {
            return ImageLayout::BlitSrc;
        }
        if write && !read {
            return ImageLayout::BlitDst;
        }
        panic!("invalid image access: blit stage combined with read+write");
    }
    if render_target {
        if write {
            return ImageLayout::RenderTarget;
        }
        if read {
            return ImageLayout::RenderTargetReadOnly;
        }
        panic!("invalid image access: attachment stages set but no direction");
    }
    if read && !write {
        return ImageLayout::ReadOnly;
    }
    if write {
        return ImageLayout::UnorderedAccess;
    }
    panic!("invalid image access: stages set but no direction");
}

impl TaskGraph {
    /// Compile the added tasks into batches and barriers.
    ///
    /// After building, the graph is baked: no further tasks can be added
    /// until [`TaskGraph::reset`].
    pub fn build(&mut self) {
        assert!(!self.baked, "graph already built; call reset() first");
        log::trace!("rebuilding tasks");

        let slot_capacity = self.manager.slot_capacity();
        let task_count = self.tasks.len();

        // Phase 1: per-slot last toucher -> deduplicated parent sets.
        let mut last_toucher: Vec<Option<TaskId>> = vec![None; slot_capacity];
        let mut parents: Vec<FixedBitSet> = (0..task_count)
            .map(|_| FixedBitSet::with_capacity(task_count))
            .collect();
        for (task_index, record) in self.tasks.iter().enumerate() {
            let slots = record
                .setup
                .buffer_deps
                .iter()
                .map(|dep| dep.buffer.slot())
                .chain(record.setup.image_deps.iter().map(|dep| dep.image.slot()))
                .chain(record.setup.accel_deps.iter().map(|dep| dep.accel.slot()));
            for slot in slots {
                if let Some(parent) = last_toucher[slot as usize] {
                    // A task touching the same resource twice is not its
                    // own parent.
                    if parent as usize != task_index {
                        parents[task_index].insert(parent as usize);
                    }
                }
                last_toucher[slot as usize] = Some(task_index as TaskId);
            }
        }

        // Phase 2: Kahn-style rounds; each round of parentless tasks is one
        // batch.
        let mut queue: Vec<TaskId> = (0..task_count as TaskId).collect();
        let mut batches: Vec<Batch> = Vec::new();
        while !queue.is_empty() {
            let (ready, rest): (Vec<TaskId>, Vec<TaskId>) = queue
                .iter()
                .copied()
                .partition(|&id| parents[id as usize].is_clear());
            assert!(
                !ready.is_empty(),
                "task graph contains a dependency cycle"
            );
            let mut done = FixedBitSet::with_capacity(task_count);
            for &id in &ready {
                done.insert(id as usize);
            }
            for &id in &rest {
                parents[id as usize].difference_with(&done);
            }
            queue = rest;
            batches.push(Batch {
                task_ids: ready,
                ..Default::default()
            });
        }

        // Phase 3: track per-slot access across batches and emit one
        // barrier per access change.
        let mut current_access: Vec<Access> = vec![Access::NONE; slot_capacity];
        for batch in &mut batches {
            for &task_id in &batch.task_ids {
                let record = &self.tasks[task_id as usize];
                for dep in &record.setup.buffer_deps {
                    let state = &mut current_access[dep.buffer.slot() as usize];
                    if *state != dep.access {
                        batch.buffer_barriers.push(BufferBarrier {
                            buffer: dep.buffer.internal(),
                            region: BufferRegion::whole(),
                            src_access: *state,
                            dst_access: dep.access,
                            src_layout: buffer_layout_for(*state),
                            dst_layout: buffer_layout_for(dep.access),
                        });
                        *state = dep.access;
                    }
                }
                for dep in &record.setup.image_deps {
                    let state = &mut current_access[dep.image.slot() as usize];
                    if *state != dep.access {
                        batch.image_barriers.push(ImageBarrier {
                            image: dep.image.internal(),
                            range: dep.image.full_range(),
                            src_access: *state,
                            dst_access: dep.access,
                            src_layout: image_layout_for(*state),
                            dst_layout: image_layout_for(dep.access),
                        });
                        *state = dep.access;
                    }
                }
                // Acceleration structure dependencies order tasks (phase 1)
                // but carry their own barriers inside the build commands.
            }
        }

        // Phase 4: stable-sort each batch for queue-kind locality at batch
        // boundaries.
        let mut previous_kind = TaskKind::None;
        for i in 0..batches.len() {
            let next_leading_kind = batches
                .get(i + 1)
                .and_then(|batch| batch.task_ids.first())
                .map(|&id| self.tasks[id as usize].kind)
                .unwrap_or(TaskKind::None);
            let prev = previous_kind;
            let rank = |kind: TaskKind| -> u8 {
                if kind == prev {
                    0
                } else if next_leading_kind != TaskKind::None && kind == next_leading_kind {
                    2
                } else {
                    1
                }
            };
            let tasks = &self.tasks;
            batches[i].task_ids.sort_by(|&a, &b| {
                let kind_a = tasks[a as usize].kind;
                let kind_b = tasks[b as usize].kind;
                (rank(kind_a), kind_a).cmp(&(rank(kind_b), kind_b))
            });
            if let Some(&last) = batches[i].task_ids.last() {
                previous_kind = tasks[last as usize].kind;
            }
        }

        // Phase 5: timestamp pools, one per frame in flight; two queries per
        // task plus the whole-graph and flush pairs.
        log::trace!("injecting timestamp queries");
        let query_count = (task_count * 2 + 4) as u32;
        for i in 0..self.frames_in_flight {
            let pool = self.device.create_timestamp_pool(&TimestampPoolCreateInfo {
                query_count,
                name: format!("timestamp query pool fif={i}"),
            });
            self.timestamp_pools.push(pool);
        }
        self.base_graph_timestamp = (task_count * 2) as u32;
        self.base_flush_timestamp = (task_count * 2 + 2) as u32;
        for (i, record) in self.tasks.iter_mut().enumerate() {
            record.base_timestamp = (2 * i) as u32;
        }

        self.batches = batches;
        self.baked = true;
        log::trace!(
            "rebuilt task graph, {} tasks, {} batches",
            self.tasks.len(),
            self.batches.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Access::NONE, BufferLayout::Undefined)]
    #[case(Access::TRANSFER_READ, BufferLayout::TransferSrc)]
    #[case(Access::TRANSFER_WRITE, BufferLayout::TransferDst)]
    #[case(Access::COPY_READ, BufferLayout::TransferSrc)]
    #[case(Access::VERTEX_SHADER_READ, BufferLayout::ReadOnly)]
    #[case(Access::VERTEX_INPUT_READ, BufferLayout::ReadOnly)]
    #[case(Access::COMPUTE_SHADER_WRITE, BufferLayout::UnorderedAccess)]
    #[case(Access::COMPUTE_SHADER_READ_WRITE, BufferLayout::UnorderedAccess)]
    fn test_buffer_layout_derivation(#[case] access: Access, #[case] expected: BufferLayout) {
        assert_eq!(buffer_layout_for(access), expected);
    }

    #[rstest]
    #[case(Access::NONE, ImageLayout::Undefined)]
    #[case(Access::TRANSFER_READ, ImageLayout::TransferSrc)]
    #[case(Access::TRANSFER_WRITE, ImageLayout::TransferDst)]
    #[case(Access::BLIT_READ, ImageLayout::BlitSrc)]
    #[case(Access::BLIT_WRITE, ImageLayout::BlitDst)]
    #[case(Access::COLOR_ATTACHMENT_OUTPUT_WRITE, ImageLayout::RenderTarget)]
    #[case(Access::COLOR_ATTACHMENT_OUTPUT_READ_WRITE, ImageLayout::RenderTarget)]
    #[case(Access::FRAGMENT_TESTS_READ, ImageLayout::RenderTargetReadOnly)]
    #[case(Access::FRAGMENT_TESTS_READ_WRITE, ImageLayout::RenderTarget)]
    #[case(Access::FRAGMENT_SHADER_READ, ImageLayout::ReadOnly)]
    #[case(Access::COMPUTE_SHADER_WRITE, ImageLayout::UnorderedAccess)]
    fn test_image_layout_derivation(#[case] access: Access, #[case] expected: ImageLayout) {
        assert_eq!(image_layout_for(access), expected);
    }

    #[test]
    #[should_panic(expected = "transfer stages combined with read+write")]
    fn test_mixed_transfer_access_panics() {
        use crate::access::AccessKind;
        buffer_layout_for(Access::new(StageFlags::TRANSFER, AccessKind::READ_WRITE));
    }
}
