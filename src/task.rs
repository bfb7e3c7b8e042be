//! Task authoring surface.
//!
//! A [`Task`] is a user-declared unit of GPU work with two phases: `setup`
//! runs once when the task is added to a graph and declares the resources
//! the task touches; `execute` runs every frame and records commands.
//!
//! Concrete tasks either implement the trait directly or use the callback
//! variants ([`GraphicsCallbackTask`], [`ComputeCallbackTask`],
//! [`TransferCallbackTask`], [`CustomCallbackTask`]) that delegate both
//! phases to closures.

use std::sync::Arc;

use crate::access::Access;
use crate::backend::{BindPoint, CommandBuffer};
use crate::command_list::TaskCommandList;
use crate::resources::{
    TaskAccelerationStructure, TaskBuffer, TaskColorTarget, TaskDepthStencilTarget, TaskImage,
};
use crate::types::{ClearColor, LabelColor};

/// Queue-kind of a task, used for intra-batch ordering.
///
/// The discriminant order is the tie-break order of the batch reorder pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskKind {
    /// Identity element; no task reports this kind.
    #[default]
    None,
    Graphics,
    Compute,
    Transfer,
    Custom,
}

/// Name and label color of a task.
#[derive(Debug, Clone, Default)]
pub struct TaskInfo {
    pub name: String,
    pub color: LabelColor,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: LabelColor::BLACK,
        }
    }

    pub fn with_color(mut self, color: LabelColor) -> Self {
        self.color = color;
        self
    }
}

/// A declared buffer dependency.
#[derive(Debug, Clone)]
pub struct TaskBufferAccess {
    pub buffer: Arc<TaskBuffer>,
    pub access: Access,
}

/// A declared image dependency.
#[derive(Debug, Clone)]
pub struct TaskImageAccess {
    pub image: Arc<TaskImage>,
    pub access: Access,
}

/// A declared acceleration structure dependency.
#[derive(Debug, Clone)]
pub struct TaskAccelAccess {
    pub accel: Arc<TaskAccelerationStructure>,
    pub access: Access,
}

/// Color target binding of a graphics task.
#[derive(Clone)]
pub struct BindColorTargetInfo {
    pub target: Arc<TaskColorTarget>,
    /// Clear before rendering; `None` loads the previous contents.
    pub clear: Option<ClearColor>,
    /// Target is blended into rather than overwritten.
    pub blending: bool,
    /// MSAA resolve destination.
    pub resolve: Option<Arc<TaskColorTarget>>,
}

/// Depth/stencil target binding of a graphics task.
#[derive(Clone)]
pub struct BindDepthStencilTargetInfo {
    pub target: Arc<TaskDepthStencilTarget>,
    /// Clear depth before rendering; `None` keeps or discards per `load_depth`.
    pub depth_clear: Option<f32>,
    /// Clear stencil before rendering; `None` keeps or discards per `load_stencil`.
    pub stencil_clear: Option<u32>,
    /// Depth test only, no depth writes.
    pub read_only: bool,
    /// Load existing depth contents when not clearing.
    pub load_depth: bool,
    /// Load existing stencil contents when not clearing.
    pub load_stencil: bool,
    /// Keep depth contents after the pass.
    pub store_depth: bool,
    /// Keep stencil contents after the pass.
    pub store_stencil: bool,
}

/// Maximum number of color targets a graphics task may bind.
pub const MAX_COLOR_TARGETS: usize = 8;

/// Dependency collector passed to [`Task::setup`].
///
/// Graphics tasks additionally bind their render targets here; target
/// bindings implicitly declare the matching image accesses.
pub struct TaskSetup {
    kind: TaskKind,
    pub(crate) buffer_deps: Vec<TaskBufferAccess>,
    pub(crate) image_deps: Vec<TaskImageAccess>,
    pub(crate) accel_deps: Vec<TaskAccelAccess>,
    pub(crate) color_targets: Vec<BindColorTargetInfo>,
    pub(crate) depth_stencil_target: Option<BindDepthStencilTargetInfo>,
}

impl TaskSetup {
    pub(crate) fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            buffer_deps: Vec::new(),
            image_deps: Vec::new(),
            accel_deps: Vec::new(),
            color_targets: Vec::new(),
            depth_stencil_target: None,
        }
    }

    /// Declare that the task accesses `buffer`.
    pub fn use_buffer(&mut self, buffer: &Arc<TaskBuffer>, access: Access) {
        self.buffer_deps.push(TaskBufferAccess {
            buffer: Arc::clone(buffer),
            access,
        });
    }

    /// Declare that the task accesses `image`.
    pub fn use_image(&mut self, image: &Arc<TaskImage>, access: Access) {
        self.image_deps.push(TaskImageAccess {
            image: Arc::clone(image),
            access,
        });
    }

    /// Declare that the task accesses an acceleration structure.
    pub fn use_acceleration_structure(
        &mut self,
        accel: &Arc<TaskAccelerationStructure>,
        access: Access,
    ) {
        self.accel_deps.push(TaskAccelAccess {
            accel: Arc::clone(accel),
            access,
        });
    }

    /// Bind a color target. Implicitly declares the target image as written
    /// (or read-written when blending), and the resolve image as written.
    pub fn bind_color_target(&mut self, info: BindColorTargetInfo) {
        assert_eq!(
            self.kind,
            TaskKind::Graphics,
            "only graphics tasks bind color targets"
        );
        assert!(
            self.color_targets.len() < MAX_COLOR_TARGETS,
            "trying to bind more than {MAX_COLOR_TARGETS} color targets"
        );
        let access = if info.blending {
            Access::COLOR_ATTACHMENT_OUTPUT_READ_WRITE
        } else {
            Access::COLOR_ATTACHMENT_OUTPUT_WRITE
        };
        self.use_image(info.target.image(), access);
        if let Some(resolve) = &info.resolve {
            // Resolving happens through color attachment output as well.
            self.use_image(resolve.image(), Access::COLOR_ATTACHMENT_OUTPUT_WRITE);
        }
        self.color_targets.push(info);
    }

    /// Bind the depth/stencil target. Implicitly declares the target image
    /// with fragment-test access. At most one may be bound.
    pub fn bind_depth_stencil_target(&mut self, info: BindDepthStencilTargetInfo) {
        assert_eq!(
            self.kind,
            TaskKind::Graphics,
            "only graphics tasks bind depth-stencil targets"
        );
        assert!(
            self.depth_stencil_target.is_none(),
            "depth-stencil target already bound"
        );
        let access = if info.read_only {
            Access::FRAGMENT_TESTS_READ
        } else {
            Access::FRAGMENT_TESTS_READ_WRITE
        };
        self.use_image(info.target.image(), access);
        self.depth_stencil_target = Some(info);
    }
}

/// A unit of GPU work in a task graph.
pub trait Task: 'static {
    fn info(&self) -> &TaskInfo;

    fn kind(&self) -> TaskKind;

    /// Which pipeline family this task binds resources to.
    fn bind_point(&self) -> BindPoint;

    /// Declare resource dependencies (and render targets, for graphics
    /// tasks). Called once when the task is added to a graph.
    fn setup(&mut self, setup: &mut TaskSetup);

    /// Record this frame's commands. Called once per frame between the
    /// batch barriers.
    fn execute(&mut self, cmd: &mut TaskCommandList<'_>);
}

// ============================================================================
// Callback tasks
// ============================================================================

type SetupFn = Box<dyn FnMut(&mut TaskSetup)>;
type ExecuteFn = Box<dyn FnMut(&mut TaskCommandList<'_>)>;
type RawExecuteFn = Box<dyn FnMut(&mut dyn CommandBuffer)>;

macro_rules! callback_task {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $bind_point:expr) => {
        $(#[$meta])*
        pub struct $name {
            info: TaskInfo,
            setup: SetupFn,
            execute: ExecuteFn,
        }

        impl $name {
            pub fn new(
                info: TaskInfo,
                setup: impl FnMut(&mut TaskSetup) + 'static,
                execute: impl FnMut(&mut TaskCommandList<'_>) + 'static,
            ) -> Self {
                Self {
                    info,
                    setup: Box::new(setup),
                    execute: Box::new(execute),
                }
            }
        }

        impl Task for $name {
            fn info(&self) -> &TaskInfo {
                &self.info
            }

            fn kind(&self) -> TaskKind {
                $kind
            }

            fn bind_point(&self) -> BindPoint {
                $bind_point
            }

            fn setup(&mut self, setup: &mut TaskSetup) {
                (self.setup)(setup);
            }

            fn execute(&mut self, cmd: &mut TaskCommandList<'_>) {
                (self.execute)(cmd);
            }
        }
    };
}

callback_task!(
    /// Graphics task delegating setup and execution to closures.
    GraphicsCallbackTask,
    TaskKind::Graphics,
    BindPoint::Graphics
);
callback_task!(
    /// Compute task delegating setup and execution to closures.
    ComputeCallbackTask,
    TaskKind::Compute,
    BindPoint::Compute
);
callback_task!(
    /// Transfer task delegating setup and execution to closures.
    TransferCallbackTask,
    TaskKind::Transfer,
    BindPoint::None
);

/// Task that records directly into the backend command buffer, bypassing
/// the typed command list. Carries an explicit kind so the reorder pass can
/// place it.
pub struct CustomCallbackTask {
    info: TaskInfo,
    kind: TaskKind,
    setup: SetupFn,
    execute: RawExecuteFn,
}

impl CustomCallbackTask {
    pub fn new(
        info: TaskInfo,
        kind: TaskKind,
        setup: impl FnMut(&mut TaskSetup) + 'static,
        execute: impl FnMut(&mut dyn CommandBuffer) + 'static,
    ) -> Self {
        Self {
            info,
            kind,
            setup: Box::new(setup),
            execute: Box::new(execute),
        }
    }
}

impl Task for CustomCallbackTask {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn bind_point(&self) -> BindPoint {
        BindPoint::None
    }

    fn setup(&mut self, setup: &mut TaskSetup) {
        (self.setup)(setup);
    }

    fn execute(&mut self, cmd: &mut TaskCommandList<'_>) {
        (self.execute)(cmd.raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::null::NullDevice;
    use crate::backend::Device;
    use crate::resources::{
        ResourceManager, ResourceManagerInfo, TaskColorTargetInfo, TaskImageInfo,
    };
    use crate::types::{Extent3d, ImageSlice, ImageUsage};

    fn test_manager() -> ResourceManager {
        ResourceManager::new(ResourceManagerInfo {
            device: Arc::new(NullDevice::new()) as Arc<dyn Device>,
            frames_in_flight: 2,
        })
    }

    fn color_target(manager: &ResourceManager, name: &str) -> Arc<TaskColorTarget> {
        let image = manager
            .create_image(
                &TaskImageInfo {
                    extent: Extent3d::new_2d(64, 64),
                    usage: ImageUsage::COLOR_ATTACHMENT,
                    name: format!("{name}_image"),
                    ..Default::default()
                },
                &[],
            )
            .unwrap();
        manager
            .create_color_target(&TaskColorTargetInfo {
                image,
                slice: ImageSlice::default(),
                name: name.to_string(),
            })
            .unwrap()
    }

    #[test]
    fn test_bind_color_target_declares_write_access() {
        let manager = test_manager();
        let target = color_target(&manager, "rt");

        let mut setup = TaskSetup::new(TaskKind::Graphics);
        setup.bind_color_target(BindColorTargetInfo {
            target: Arc::clone(&target),
            clear: Some(ClearColor::new(0.0, 0.0, 0.0, 1.0)),
            blending: false,
            resolve: None,
        });

        assert_eq!(setup.image_deps.len(), 1);
        assert_eq!(
            setup.image_deps[0].access,
            Access::COLOR_ATTACHMENT_OUTPUT_WRITE
        );
        drop(setup);
        drop(target);
    }

    #[test]
    fn test_bind_blended_color_target_declares_read_write() {
        let manager = test_manager();
        let target = color_target(&manager, "rt");

        let mut setup = TaskSetup::new(TaskKind::Graphics);
        setup.bind_color_target(BindColorTargetInfo {
            target: Arc::clone(&target),
            clear: None,
            blending: true,
            resolve: None,
        });

        assert_eq!(
            setup.image_deps[0].access,
            Access::COLOR_ATTACHMENT_OUTPUT_READ_WRITE
        );
        drop(setup);
        drop(target);
    }

    #[test]
    fn test_resolve_target_adds_second_write() {
        let manager = test_manager();
        let target = color_target(&manager, "msaa");
        let resolve = color_target(&manager, "resolve");

        let mut setup = TaskSetup::new(TaskKind::Graphics);
        setup.bind_color_target(BindColorTargetInfo {
            target: Arc::clone(&target),
            clear: None,
            blending: false,
            resolve: Some(Arc::clone(&resolve)),
        });

        assert_eq!(setup.image_deps.len(), 2);
        assert!(setup
            .image_deps
            .iter()
            .all(|dep| dep.access.is_write()));
        drop(setup);
        drop(resolve);
        drop(target);
    }

    #[test]
    #[should_panic(expected = "more than 8 color targets")]
    fn test_ninth_color_target_panics() {
        let manager = test_manager();
        let mut setup = TaskSetup::new(TaskKind::Graphics);
        let targets: Vec<_> = (0..9).map(|i| color_target(&manager, &format!("rt{i}"))).collect();
        for target in &targets {
            setup.bind_color_target(BindColorTargetInfo {
                target: Arc::clone(target),
                clear: None,
                blending: false,
                resolve: None,
            });
        }
    }

    #[test]
    fn test_kind_order_for_reordering() {
        assert!(TaskKind::None < TaskKind::Graphics);
        assert!(TaskKind::Graphics < TaskKind::Compute);
        assert!(TaskKind::Compute < TaskKind::Transfer);
        assert!(TaskKind::Transfer < TaskKind::Custom);
    }
}
