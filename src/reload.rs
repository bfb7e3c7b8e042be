//! Shader hot-reload bridge.
//!
//! The external shader compiler delivers rebuilt bytecode for a live
//! [`TaskShader`] through [`ShaderReloadListener`]. The bridge swaps the
//! shader's bytecode and marks every referencing pipeline dirty; backend
//! pipeline objects are reconstructed lazily the next time the command list
//! binds them.

use std::sync::Arc;

use crate::resources::TaskShader;

/// Receiver for rebuilt shader bytecode.
pub trait ShaderReloadListener {
    fn on_shader_reloaded(&self, shader: &Arc<TaskShader>, bytecode: Vec<u8>);
}

/// The resource manager's reload listener.
pub struct ShaderReloadBridge {
    _private: (),
}

impl ShaderReloadBridge {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

impl ShaderReloadListener for ShaderReloadBridge {
    fn on_shader_reloaded(&self, shader: &Arc<TaskShader>, bytecode: Vec<u8>) {
        log::trace!(
            "shader '{}' reloaded ({} bytes), dirtying {} pipelines",
            shader.name(),
            bytecode.len(),
            shader.referencing_pipelines().len()
        );
        shader.swap_bytecode(bytecode);
        shader.dirty_referencing_pipelines();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::null::NullDevice;
    use crate::backend::{ComputePipelineDesc, Device, RasterPipelineDesc};
    use crate::resources::{
        ResourceManager, ResourceManagerInfo, TaskRasterPipelineShaders, TaskShaderInfo,
    };

    fn test_manager() -> ResourceManager {
        ResourceManager::new(ResourceManagerInfo {
            device: Arc::new(NullDevice::new()) as Arc<dyn Device>,
            frames_in_flight: 2,
        })
    }

    #[test]
    fn test_reload_dirties_referencing_pipelines() {
        let manager = test_manager();
        let vertex = manager.create_shader(vec![1, 2, 3], "vs");
        let fragment = manager.create_shader(vec![4, 5, 6], "fs");

        let pipeline = manager.create_raster_pipeline(
            &RasterPipelineDesc {
                name: "opaque".to_string(),
                ..Default::default()
            },
            &TaskRasterPipelineShaders {
                vertex: Some(TaskShaderInfo::new(Arc::clone(&vertex))),
                fragment: Some(TaskShaderInfo::new(Arc::clone(&fragment))),
                ..Default::default()
            },
        );
        assert!(!pipeline.is_dirty());

        manager
            .shader_reload_listener()
            .on_shader_reloaded(&fragment, vec![9, 9, 9]);

        assert!(pipeline.is_dirty());
        assert_eq!(fragment.bytecode(), vec![9, 9, 9]);
        // The vertex shader was untouched.
        assert_eq!(vertex.bytecode(), vec![1, 2, 3]);

        drop(pipeline);
        // Dropping the pipeline detaches it from both shaders.
        assert!(vertex.referencing_pipelines().is_empty());
        assert!(fragment.referencing_pipelines().is_empty());
        drop(vertex);
        drop(fragment);
    }

    #[test]
    fn test_reload_dirties_compute_pipelines() {
        let manager = test_manager();
        let shader = manager.create_shader(vec![1], "cs");
        let pipeline = manager.create_compute_pipeline(
            &ComputePipelineDesc {
                name: "sim".to_string(),
            },
            &TaskShaderInfo::new(Arc::clone(&shader)),
        );
        assert!(!pipeline.is_dirty());

        manager
            .shader_reload_listener()
            .on_shader_reloaded(&shader, vec![2]);
        assert!(pipeline.is_dirty());

        drop(pipeline);
        drop(shader);
    }
}
