/// Shader programs made of one compiled module per pipeline stage

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::platform::read_entire_file;
use crate::renderer::{GraphicsDevice, NativeShaderModule, RenderingContext};

/// Pipeline stage a shader module runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Source handed to the backend compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// Text source, compiled by the backend
    SourceCode(String),
    /// Precompiled backend bytecode
    Bytecode(Vec<u8>),
}

/// One stage of a shader program
#[derive(Debug, Clone)]
pub struct ShaderStageDescription {
    pub stage: ShaderStage,
    pub source: ShaderSource,
    /// Entry point function name (defaults to "main")
    pub entry_point: String,
}

impl ShaderStageDescription {
    pub fn from_source(stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            stage,
            source: ShaderSource::SourceCode(source.into()),
            entry_point: "main".to_string(),
        }
    }

    /// Read a stage's text source from disk
    ///
    /// # Errors
    ///
    /// `FileReadFailed` if the file cannot be read, `InvalidResource` if it is
    /// not valid UTF-8.
    pub fn from_file(stage: ShaderStage, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_entire_file(path).map_err(|error| {
            crate::engine_error!("cave::Shader", "{}", error);
            error
        })?;
        let source = String::from_utf8(bytes).map_err(|_| {
            Error::InvalidResource(format!("shader source '{}' is not valid UTF-8", path.display()))
        })?;
        Ok(Self::from_source(stage, source))
    }

    pub fn with_entry_point(mut self, entry_point: &str) -> Self {
        self.entry_point = entry_point.to_string();
        self
    }
}

/// Descriptor for creating a shader program
#[derive(Debug, Clone, Default)]
pub struct ShaderDescription {
    pub stages: Vec<ShaderStageDescription>,
}

#[derive(Debug, Clone, Copy)]
struct ShaderModule {
    stage: ShaderStage,
    handle: NativeShaderModule,
}

/// Compiled shader program
///
/// The native modules are destroyed when the last `Arc<Shader>` is dropped.
pub struct Shader {
    device: Arc<dyn GraphicsDevice>,
    modules: Vec<ShaderModule>,
}

impl Shader {
    /// Compile every stage of a shader program
    ///
    /// # Errors
    ///
    /// `InvalidResource` for an empty or duplicated stage list,
    /// `ShaderCompilationFailed` if the backend rejects a stage.
    pub fn create(context: &RenderingContext, desc: &ShaderDescription) -> Result<Arc<Shader>> {
        if desc.stages.is_empty() {
            crate::engine_bail!("cave::Shader", InvalidResource, "shader description has no stages");
        }

        let device = Arc::clone(context.device());
        let mut shader = Shader { device, modules: Vec::with_capacity(desc.stages.len()) };

        for stage_desc in &desc.stages {
            if shader.has_stage(stage_desc.stage) {
                crate::engine_bail!(
                    "cave::Shader",
                    InvalidResource,
                    "stage {:?} declared twice",
                    stage_desc.stage
                );
            }
            // Already compiled modules are released by Drop on early return.
            let handle = shader.device.compile_shader_module(
                stage_desc.stage,
                &stage_desc.source,
                &stage_desc.entry_point,
            )?;
            shader.modules.push(ShaderModule { stage: stage_desc.stage, handle });
        }

        Ok(Arc::new(shader))
    }

    /// Native module compiled for `stage`
    pub fn module(&self, stage: ShaderStage) -> Option<NativeShaderModule> {
        self.modules
            .iter()
            .find(|module| module.stage == stage)
            .map(|module| module.handle)
    }

    pub fn has_stage(&self, stage: ShaderStage) -> bool {
        self.module(stage).is_some()
    }

    pub fn stage_count(&self) -> usize {
        self.modules.len()
    }

    pub(crate) fn modules(&self) -> impl Iterator<Item = (ShaderStage, NativeShaderModule)> + '_ {
        self.modules.iter().map(|module| (module.stage, module.handle))
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        for module in self.modules.drain(..) {
            self.device.destroy_shader_module(module.handle);
        }
    }
}
