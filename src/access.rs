//! Access declarations for task dependencies.
//!
//! An [`Access`] pairs the pipeline stages that touch a resource with the
//! direction of the access (read, write or both). Tasks declare one access
//! per resource during setup; the graph compiler derives barriers and layout
//! transitions from consecutive accesses to the same resource.

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages an access participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StageFlags: u32 {
        /// Synthetic earliest stage.
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const HULL_SHADER = 1 << 4;
        const DOMAIN_SHADER = 1 << 5;
        const GEOMETRY_SHADER = 1 << 6;
        const FRAGMENT_SHADER = 1 << 7;
        const EARLY_FRAGMENT_TESTS = 1 << 8;
        const LATE_FRAGMENT_TESTS = 1 << 9;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
        const COMPUTE_SHADER = 1 << 11;
        const COPY = 1 << 12;
        const BLIT = 1 << 13;
        const RESOLVE = 1 << 14;
        const TRANSFER = 1 << 15;
        const HOST = 1 << 16;
        const ACCELERATION_STRUCTURE_BUILD = 1 << 17;
        /// Synthetic latest stage.
        const BOTTOM_OF_PIPE = 1 << 18;

        /// All rasterization stages.
        const ALL_GRAPHICS = Self::DRAW_INDIRECT.bits()
            | Self::VERTEX_INPUT.bits()
            | Self::VERTEX_SHADER.bits()
            | Self::HULL_SHADER.bits()
            | Self::DOMAIN_SHADER.bits()
            | Self::GEOMETRY_SHADER.bits()
            | Self::FRAGMENT_SHADER.bits()
            | Self::EARLY_FRAGMENT_TESTS.bits()
            | Self::LATE_FRAGMENT_TESTS.bits()
            | Self::COLOR_ATTACHMENT_OUTPUT.bits();

        /// Every stage that executes commands.
        const ALL_COMMANDS = Self::ALL_GRAPHICS.bits()
            | Self::COMPUTE_SHADER.bits()
            | Self::COPY.bits()
            | Self::BLIT.bits()
            | Self::RESOLVE.bits()
            | Self::TRANSFER.bits()
            | Self::ACCELERATION_STRUCTURE_BUILD.bits();
    }
}

impl Default for StageFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Direction of an access.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessKind: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Default for AccessKind {
    fn default() -> Self {
        Self::empty()
    }
}

/// How a task touches a resource within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Access {
    /// Stages participating in the access.
    pub stages: StageFlags,
    /// Read/write direction.
    pub kind: AccessKind,
}

impl Access {
    pub const fn new(stages: StageFlags, kind: AccessKind) -> Self {
        Self { stages, kind }
    }

    /// No access at all. This is the initial state of every resource.
    pub const NONE: Self = Self::new(StageFlags::empty(), AccessKind::empty());

    pub const TOP_OF_PIPE_READ_WRITE: Self =
        Self::new(StageFlags::TOP_OF_PIPE, AccessKind::READ_WRITE);
    pub const BOTTOM_OF_PIPE_READ: Self = Self::new(StageFlags::BOTTOM_OF_PIPE, AccessKind::READ);

    pub const HOST_WRITE: Self = Self::new(StageFlags::HOST, AccessKind::WRITE);

    pub const TRANSFER_READ: Self = Self::new(StageFlags::TRANSFER, AccessKind::READ);
    pub const TRANSFER_WRITE: Self = Self::new(StageFlags::TRANSFER, AccessKind::WRITE);
    pub const COPY_READ: Self = Self::new(StageFlags::COPY, AccessKind::READ);
    pub const COPY_WRITE: Self = Self::new(StageFlags::COPY, AccessKind::WRITE);
    pub const BLIT_READ: Self = Self::new(StageFlags::BLIT, AccessKind::READ);
    pub const BLIT_WRITE: Self = Self::new(StageFlags::BLIT, AccessKind::WRITE);

    pub const VERTEX_INPUT_READ: Self = Self::new(StageFlags::VERTEX_INPUT, AccessKind::READ);
    pub const DRAW_INDIRECT_READ: Self = Self::new(StageFlags::DRAW_INDIRECT, AccessKind::READ);
    pub const VERTEX_SHADER_READ: Self = Self::new(StageFlags::VERTEX_SHADER, AccessKind::READ);
    pub const FRAGMENT_SHADER_READ: Self = Self::new(StageFlags::FRAGMENT_SHADER, AccessKind::READ);

    pub const COLOR_ATTACHMENT_OUTPUT_WRITE: Self =
        Self::new(StageFlags::COLOR_ATTACHMENT_OUTPUT, AccessKind::WRITE);
    pub const COLOR_ATTACHMENT_OUTPUT_READ_WRITE: Self =
        Self::new(StageFlags::COLOR_ATTACHMENT_OUTPUT, AccessKind::READ_WRITE);

    pub const FRAGMENT_TESTS_READ: Self = Self::new(
        StageFlags::EARLY_FRAGMENT_TESTS.union(StageFlags::LATE_FRAGMENT_TESTS),
        AccessKind::READ,
    );
    pub const FRAGMENT_TESTS_READ_WRITE: Self = Self::new(
        StageFlags::EARLY_FRAGMENT_TESTS.union(StageFlags::LATE_FRAGMENT_TESTS),
        AccessKind::READ_WRITE,
    );

    pub const COMPUTE_SHADER_READ: Self = Self::new(StageFlags::COMPUTE_SHADER, AccessKind::READ);
    pub const COMPUTE_SHADER_WRITE: Self = Self::new(StageFlags::COMPUTE_SHADER, AccessKind::WRITE);
    pub const COMPUTE_SHADER_READ_WRITE: Self =
        Self::new(StageFlags::COMPUTE_SHADER, AccessKind::READ_WRITE);

    pub const ACCELERATION_STRUCTURE_BUILD_READ_WRITE: Self = Self::new(
        StageFlags::ACCELERATION_STRUCTURE_BUILD,
        AccessKind::READ_WRITE,
    );

    /// Generic read from any stage. Broad and therefore slow; prefer a
    /// precise access when the stage is known.
    pub const READ: Self = Self::new(StageFlags::ALL_COMMANDS, AccessKind::READ);
    /// Generic read/write from any stage.
    pub const READ_WRITE: Self = Self::new(StageFlags::ALL_COMMANDS, AccessKind::READ_WRITE);

    /// True if no stage and no direction is set.
    pub fn is_none(&self) -> bool {
        self.stages.is_empty() && self.kind.is_empty()
    }

    pub fn is_read(&self) -> bool {
        self.kind.contains(AccessKind::READ)
    }

    pub fn is_write(&self) -> bool {
        self.kind.contains(AccessKind::WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_none() {
        assert!(Access::NONE.is_none());
        assert!(!Access::NONE.is_read());
        assert!(!Access::NONE.is_write());
    }

    #[test]
    fn test_access_directions() {
        assert!(Access::TRANSFER_READ.is_read());
        assert!(!Access::TRANSFER_READ.is_write());
        assert!(Access::COMPUTE_SHADER_WRITE.is_write());
        assert!(!Access::COMPUTE_SHADER_WRITE.is_read());
        assert!(Access::COLOR_ATTACHMENT_OUTPUT_READ_WRITE.is_read());
        assert!(Access::COLOR_ATTACHMENT_OUTPUT_READ_WRITE.is_write());
    }

    #[test]
    fn test_fragment_tests_cover_both_stages() {
        assert!(Access::FRAGMENT_TESTS_READ
            .stages
            .contains(StageFlags::EARLY_FRAGMENT_TESTS | StageFlags::LATE_FRAGMENT_TESTS));
    }

    #[test]
    fn test_all_commands_superset() {
        assert!(StageFlags::ALL_COMMANDS.contains(StageFlags::ALL_GRAPHICS));
        assert!(StageFlags::ALL_COMMANDS.contains(StageFlags::COMPUTE_SHADER));
        assert!(StageFlags::ALL_COMMANDS.contains(StageFlags::TRANSFER));
        assert!(!StageFlags::ALL_COMMANDS.contains(StageFlags::HOST));
    }
}
