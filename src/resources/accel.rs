//! Acceleration structure resources (capability-gated).

use std::sync::Arc;

use crate::backend::{AccelerationStructure, AccelerationStructureKind};

use super::ManagerShared;

/// Descriptor for creating a BLAS or TLAS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskAccelerationStructureInfo {
    /// Backend-reported size of the structure, in bytes.
    pub size: u64,
    pub name: String,
}

/// A bottom- or top-level acceleration structure registered with the
/// resource manager.
pub struct TaskAccelerationStructure {
    slot: u32,
    kind: AccelerationStructureKind,
    info: TaskAccelerationStructureInfo,
    accel: AccelerationStructure,
    owner: Arc<ManagerShared>,
}

impl TaskAccelerationStructure {
    pub(crate) fn new(
        slot: u32,
        kind: AccelerationStructureKind,
        info: TaskAccelerationStructureInfo,
        accel: AccelerationStructure,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            kind,
            info,
            accel,
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn kind(&self) -> AccelerationStructureKind {
        self.kind
    }

    pub fn info(&self) -> &TaskAccelerationStructureInfo {
        &self.info
    }

    /// The backend acceleration structure handle.
    pub fn internal(&self) -> AccelerationStructure {
        self.accel
    }

    /// Opaque device address, used to populate TLAS instance records.
    pub fn device_address(&self) -> u64 {
        self.owner.device().acceleration_structure_address(self.accel)
    }
}

impl Drop for TaskAccelerationStructure {
    fn drop(&mut self) {
        self.owner.device().destroy_acceleration_structure(self.accel);
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskAccelerationStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAccelerationStructure")
            .field("slot", &self.slot)
            .field("kind", &self.kind)
            .field("name", &self.info.name)
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskAccelerationStructure: Send, Sync);
