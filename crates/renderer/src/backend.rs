use std::fmt;

use crate::types::{UniformType, UniformValue};

/// Reasons a compute program failed to build.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("shader source is empty")]
    EmptySource,
    #[error("shader compilation failed:\n{log}")]
    Compile { log: String },
    #[error("program link failed:\n{log}")]
    Link { log: String },
    #[error("graphics backend error: {0}")]
    Backend(String),
}

impl CompileError {
    /// Driver diagnostic text, if the failure produced any.
    pub fn log(&self) -> Option<&str> {
        match self {
            Self::Compile { log } | Self::Link { log } => Some(log.as_str()),
            Self::EmptySource | Self::Backend(_) => None,
        }
    }
}

/// One live uniform as reported by the driver for a linked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveUniform {
    pub name: String,
    pub type_tag: u32,
    pub array_len: i32,
}

/// GPU primitives the hot-reload pipeline is built on.
///
/// Every call is thread-affine: it talks to whichever context is current on
/// the calling thread.
pub trait ShaderBackend {
    type Program: Copy + Eq + fmt::Debug + Send + 'static;

    /// Compiles a single compute stage and links it into a program.
    fn compile_compute(&self, source: &str) -> Result<Self::Program, CompileError>;

    /// Lists the uniforms that survived dead-code elimination.
    fn live_uniforms(&self, program: Self::Program) -> Vec<LiveUniform>;

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    fn use_program(&self, program: Option<Self::Program>);

    /// Uploads `value` to `location` of the program currently in use.
    fn bind_uniform(&self, location: u32, ty: UniformType, value: &UniformValue);

    fn delete_program(&self, program: Self::Program);
}

/// The secondary graphics context used off the render thread.
///
/// `activate` makes the context current on the calling thread and returns
/// the backend that issues calls against it.
pub trait CompileContext: Send + 'static {
    type Backend: ShaderBackend;

    fn activate(&mut self) -> anyhow::Result<&Self::Backend>;
}
