//! Shaders and pipelines with hot-reload cross-referencing.
//!
//! A [`TaskShader`] owns the current bytecode of one shader program and a
//! back-set of the pipelines that were built from it, keyed by the
//! pipeline's slot id. When the shader is reloaded (see [`crate::reload`]),
//! every pipeline in the back-set is marked dirty; the actual backend
//! pipeline object is rebuilt lazily on its next use by the command list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{
    ComputePipeline, ComputePipelineDesc, RasterPipeline, RasterPipelineDesc, RasterShaderStages,
    ShaderStageInfo, SpecializationConstant,
};

use super::ManagerShared;

/// A shader program registered with the resource manager.
pub struct TaskShader {
    slot: u32,
    name: String,
    bytecode: Mutex<Vec<u8>>,
    referenced_by: Mutex<Vec<PipelineBackRef>>,
    owner: Arc<ManagerShared>,
}

/// Non-owning back-link from a shader to a pipeline built from it.
pub(crate) enum PipelineBackRef {
    Raster {
        slot: u32,
        pipeline: Weak<TaskRasterPipeline>,
    },
    Compute {
        slot: u32,
        pipeline: Weak<TaskComputePipeline>,
    },
}

impl PipelineBackRef {
    fn slot(&self) -> u32 {
        match self {
            Self::Raster { slot, .. } | Self::Compute { slot, .. } => *slot,
        }
    }
}

impl TaskShader {
    pub(crate) fn new(slot: u32, name: String, bytecode: Vec<u8>, owner: Arc<ManagerShared>) -> Self {
        Self {
            slot,
            name,
            bytecode: Mutex::new(bytecode),
            referenced_by: Mutex::new(Vec::new()),
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current bytecode of the program.
    pub fn bytecode(&self) -> Vec<u8> {
        self.bytecode.lock().clone()
    }

    /// Slots of the pipelines currently referencing this shader.
    pub fn referencing_pipelines(&self) -> Vec<u32> {
        self.referenced_by.lock().iter().map(|r| r.slot()).collect()
    }

    pub(crate) fn swap_bytecode(&self, bytecode: Vec<u8>) {
        *self.bytecode.lock() = bytecode;
    }

    pub(crate) fn add_reference(&self, back_ref: PipelineBackRef) {
        let mut refs = self.referenced_by.lock();
        if refs.iter().all(|r| r.slot() != back_ref.slot()) {
            refs.push(back_ref);
        }
    }

    pub(crate) fn remove_reference(&self, slot: u32) {
        self.referenced_by.lock().retain(|r| r.slot() != slot);
    }

    /// Mark every referencing pipeline dirty so it is rebuilt on next use.
    pub(crate) fn dirty_referencing_pipelines(&self) {
        for back_ref in self.referenced_by.lock().iter() {
            match back_ref {
                PipelineBackRef::Raster { pipeline, .. } => {
                    if let Some(pipeline) = pipeline.upgrade() {
                        pipeline.set_dirty();
                    }
                }
                PipelineBackRef::Compute { pipeline, .. } => {
                    if let Some(pipeline) = pipeline.upgrade() {
                        pipeline.set_dirty();
                    }
                }
            }
        }
    }
}

impl Drop for TaskShader {
    fn drop(&mut self) {
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskShader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskShader")
            .field("slot", &self.slot)
            .field("name", &self.name)
            .field("bytecode_len", &self.bytecode.lock().len())
            .finish()
    }
}

/// A shader plus the specialization constants to apply at pipeline creation.
#[derive(Debug, Clone)]
pub struct TaskShaderInfo {
    pub shader: Arc<TaskShader>,
    pub specialization: Vec<SpecializationConstant>,
}

impl TaskShaderInfo {
    pub fn new(shader: Arc<TaskShader>) -> Self {
        Self {
            shader,
            specialization: Vec::new(),
        }
    }

    pub fn with_specialization(mut self, constants: Vec<SpecializationConstant>) -> Self {
        self.specialization = constants;
        self
    }

    /// Resolve to backend stage info, pulling the shader's current bytecode.
    fn resolve(&self) -> ShaderStageInfo {
        ShaderStageInfo {
            bytecode: self.shader.bytecode(),
            specialization: self.specialization.clone(),
        }
    }
}

/// Shader stage set of a raster pipeline.
#[derive(Debug, Clone, Default)]
pub struct TaskRasterPipelineShaders {
    pub vertex: Option<TaskShaderInfo>,
    pub hull: Option<TaskShaderInfo>,
    pub domain: Option<TaskShaderInfo>,
    pub geometry: Option<TaskShaderInfo>,
    pub fragment: Option<TaskShaderInfo>,
}

impl TaskRasterPipelineShaders {
    /// Iterate over the stages that are present.
    pub(crate) fn shaders(&self) -> impl Iterator<Item = &TaskShaderInfo> {
        [
            self.vertex.as_ref(),
            self.hull.as_ref(),
            self.domain.as_ref(),
            self.geometry.as_ref(),
            self.fragment.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// A raster pipeline whose backend object is rebuilt when any of its
/// shaders reloads.
pub struct TaskRasterPipeline {
    slot: u32,
    info: RasterPipelineDesc,
    stages: TaskRasterPipelineShaders,
    pipeline: Mutex<RasterPipeline>,
    dirty: AtomicBool,
    owner: Arc<ManagerShared>,
}

impl TaskRasterPipeline {
    pub(crate) fn new(
        slot: u32,
        info: RasterPipelineDesc,
        stages: TaskRasterPipelineShaders,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            stages,
            pipeline: Mutex::new(RasterPipeline::NULL),
            dirty: AtomicBool::new(false),
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &RasterPipelineDesc {
        &self.info
    }

    /// The backend pipeline object. Null if the last (re-)creation failed.
    pub fn internal(&self) -> RasterPipeline {
        *self.pipeline.lock()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn set_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Clear the dirty flag, returning whether it was set.
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    /// Build a fresh backend pipeline from the current shader bytecodes.
    /// On failure logs a warning and leaves the null pipeline bound; the
    /// next shader reload retries.
    pub(crate) fn recreate(&self) {
        let stages = RasterShaderStages {
            vertex: self.stages.vertex.as_ref().map(TaskShaderInfo::resolve),
            hull: self.stages.hull.as_ref().map(TaskShaderInfo::resolve),
            domain: self.stages.domain.as_ref().map(TaskShaderInfo::resolve),
            geometry: self.stages.geometry.as_ref().map(TaskShaderInfo::resolve),
            fragment: self.stages.fragment.as_ref().map(TaskShaderInfo::resolve),
        };
        match self.owner.device().create_raster_pipeline(&self.info, &stages) {
            Ok(pipeline) => *self.pipeline.lock() = pipeline,
            Err(err) => {
                log::warn!("failed to create raster pipeline '{}': {err}", self.info.name);
                *self.pipeline.lock() = RasterPipeline::NULL;
            }
        }
    }
}

impl Drop for TaskRasterPipeline {
    fn drop(&mut self) {
        for stage in self.stages.shaders() {
            stage.shader.remove_reference(self.slot);
        }
        self.owner
            .device()
            .destroy_raster_pipeline(*self.pipeline.lock(), false);
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskRasterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRasterPipeline")
            .field("slot", &self.slot)
            .field("name", &self.info.name)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// A compute pipeline whose backend object is rebuilt when its shader
/// reloads.
pub struct TaskComputePipeline {
    slot: u32,
    info: ComputePipelineDesc,
    shader: TaskShaderInfo,
    pipeline: Mutex<ComputePipeline>,
    dirty: AtomicBool,
    owner: Arc<ManagerShared>,
}

impl TaskComputePipeline {
    pub(crate) fn new(
        slot: u32,
        info: ComputePipelineDesc,
        shader: TaskShaderInfo,
        owner: Arc<ManagerShared>,
    ) -> Self {
        Self {
            slot,
            info,
            shader,
            pipeline: Mutex::new(ComputePipeline::NULL),
            dirty: AtomicBool::new(false),
            owner,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn info(&self) -> &ComputePipelineDesc {
        &self.info
    }

    /// The backend pipeline object. Null if the last (re-)creation failed.
    pub fn internal(&self) -> ComputePipeline {
        *self.pipeline.lock()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn set_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    pub(crate) fn recreate(&self) {
        match self
            .owner
            .device()
            .create_compute_pipeline(&self.info, &self.shader.resolve())
        {
            Ok(pipeline) => *self.pipeline.lock() = pipeline,
            Err(err) => {
                log::warn!(
                    "failed to create compute pipeline '{}': {err}",
                    self.info.name
                );
                *self.pipeline.lock() = ComputePipeline::NULL;
            }
        }
    }
}

impl Drop for TaskComputePipeline {
    fn drop(&mut self) {
        self.shader.shader.remove_reference(self.slot);
        self.owner
            .device()
            .destroy_compute_pipeline(*self.pipeline.lock(), false);
        self.owner.release_slot(self.slot);
    }
}

impl std::fmt::Debug for TaskComputePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskComputePipeline")
            .field("slot", &self.slot)
            .field("name", &self.info.name)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

static_assertions::assert_impl_all!(TaskShader: Send, Sync);
static_assertions::assert_impl_all!(TaskRasterPipeline: Send, Sync);
static_assertions::assert_impl_all!(TaskComputePipeline: Send, Sync);
