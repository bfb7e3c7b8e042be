//! Buffer usage flags and memory domains.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as read/write storage.
        const STORAGE = 1 << 3;
        /// Buffer can supply indirect draw/dispatch arguments.
        const INDIRECT = 1 << 4;
        /// Buffer can be the source of a transfer.
        const TRANSFER_SRC = 1 << 5;
        /// Buffer can be the destination of a transfer.
        const TRANSFER_DST = 1 << 6;
        /// Buffer can feed acceleration structure builds.
        const ACCELERATION_STRUCTURE_INPUT = 1 << 7;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Which memory heap a buffer is allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryDomain {
    /// Fast device-local memory, not host-visible.
    #[default]
    DeviceLocal,
    /// Host-visible, write-combined memory for frequent CPU writes.
    HostRandomWrite,
    /// Host-visible, cached memory for CPU readback.
    HostReadback,
    /// Host-visible memory for one-shot staging uploads.
    HostStaging,
}

impl MemoryDomain {
    /// Whether buffers in this domain can be accessed from the CPU.
    pub fn is_host_visible(self) -> bool {
        !matches!(self, Self::DeviceLocal)
    }
}

/// A byte range within a buffer. The default covers the whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRegion {
    pub offset: u64,
    /// Size in bytes; [`BufferRegion::WHOLE_SIZE`] means "to the end".
    pub size: u64,
}

impl BufferRegion {
    /// Sentinel size meaning "the rest of the buffer".
    pub const WHOLE_SIZE: u64 = u64::MAX;

    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// The whole buffer.
    pub fn whole() -> Self {
        Self {
            offset: 0,
            size: Self::WHOLE_SIZE,
        }
    }
}

impl Default for BufferRegion {
    fn default() -> Self {
        Self::whole()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_domain_host_visibility() {
        assert!(!MemoryDomain::DeviceLocal.is_host_visible());
        assert!(MemoryDomain::HostRandomWrite.is_host_visible());
        assert!(MemoryDomain::HostReadback.is_host_visible());
        assert!(MemoryDomain::HostStaging.is_host_visible());
    }

    #[test]
    fn test_buffer_region_default_is_whole() {
        let region = BufferRegion::default();
        assert_eq!(region.offset, 0);
        assert_eq!(region.size, BufferRegion::WHOLE_SIZE);
    }
}
