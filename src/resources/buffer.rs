//! Graph-visible buffer resource.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::Buffer;
use crate::types::BufferUsage;

use super::ManagerShared;

/// Descriptor for creating a [`TaskBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskBufferInfo {
    /// Size in bytes.
    pub size: u64,
    /// Usage flags of the primary buffer.
    pub usage: BufferUsage,
    /// Buffer lives in host-visible memory.
    pub cpu_visible: bool,
    /// Buffer contents can be read back on the CPU. Requires `cpu_visible`.
    pub readback: bool,
    /// Buffer gets one host-writable replica per frame in flight, flushed
    /// into the primary at the start of every frame.
    pub dynamic: bool,
    /// Debug name.
    pub name: String,
}

/// A buffer registered with the resource manager.
///
/// Dynamic buffers own `frames_in_flight` host-visible replicas next to the
/// primary buffer; [`TaskBuffer::write`] targets the replica of the frame
/// currently being recorded, and the per-frame dynamic flush moves the bytes
/// into the primary (or re-points the primary, when the buffer is also
/// CPU-visible and no device copy is needed).
pub struct TaskBuffer {
    slot: u32,
    info: TaskBufferInfo,
    primary: Mutex<Buffer>,
    /// The primary aliases `replicas[0]` and must not be destroyed twice.
    primary_is_alias: bool,
    replicas: Vec<Buffer>,
    current_replica: AtomicU32,
    owner: Arc<ManagerShared>,
}

impl TaskBuffer {
    pub(crate) fn new(
        slot: u32,
        info: TaskBufferInfo,
        primary: Buffer,
        primary_is_alias: bool,
        replicas: Vec<Buffer>,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            primary: Mutex::new(primary),
            primary_is_alias,
            replicas,
            current_replica: AtomicU32::new(0),
            owner,
        }
    }

    /// Stable slot id of this resource.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &TaskBufferInfo {
        &self.info
    }

    /// The backend buffer tasks read from this frame.
    pub fn internal(&self) -> Buffer {
        *self.primary.lock()
    }

    pub(crate) fn replica(&self, index: u32) -> Buffer {
        self.replicas[index as usize]
    }

    pub(crate) fn set_current_replica(&self, index: u32) {
        self.current_replica.store(index, Ordering::Relaxed);
    }

    pub(crate) fn point_primary_at(&self, buffer: Buffer) {
        *self.primary.lock() = buffer;
    }

    /// The host-visible backend buffer CPU writes and reads go through:
    /// the current in-flight replica for dynamic buffers, the primary
    /// otherwise.
    fn host_buffer(&self) -> Buffer {
        if self.info.dynamic {
            self.replica(self.current_replica.load(Ordering::Relaxed))
        } else {
            assert!(
                self.info.cpu_visible,
                "buffer '{}' is not host-visible",
                self.info.name
            );
            *self.primary.lock()
        }
    }

    /// Write bytes into the buffer's host side.
    ///
    /// For dynamic buffers this targets the replica of the frame currently
    /// being recorded; the bytes become visible to tasks after that frame's
    /// dynamic flush.
    pub fn write(&self, offset: u64, data: &[u8]) {
        self.owner.device().write_buffer(self.host_buffer(), offset, data);
    }

    /// Read bytes back from the buffer's host side.
    pub fn read(&self, offset: u64, size: u64) -> Vec<u8> {
        self.owner.device().read_buffer(self.host_buffer(), offset, size)
    }
}

impl Drop for TaskBuffer {
    fn drop(&mut self) {
        if self.info.dynamic {
            self.owner.remove_dynamic(self.slot);
        }
        let primary = *self.primary.lock();
        self.owner.purge_staging_buffer(primary);
        if !self.primary_is_alias {
            self.owner.device().destroy_buffer(primary, true);
        }
        for &replica in &self.replicas {
            self.owner.device().destroy_buffer(replica, true);
        }
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBuffer")
            .field("slot", &self.slot)
            .field("size", &self.info.size)
            .field("name", &self.info.name)
            .field("dynamic", &self.info.dynamic)
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskBuffer: Send, Sync);
