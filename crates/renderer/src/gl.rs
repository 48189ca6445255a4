//! OpenGL implementation of [`ShaderBackend`] on top of `glow`.

use std::ffi::c_void;
use std::mem;
use std::sync::Arc;

use glow::HasContext;
use tracing::{debug, error, info, trace, warn};

use crate::backend::{CompileError, LiveUniform, ShaderBackend};
use crate::types::{UniformType, UniformValue};

type Uniform1d = unsafe extern "system" fn(i32, f64);
type Uniform2d = unsafe extern "system" fn(i32, f64, f64);
type Uniform3d = unsafe extern "system" fn(i32, f64, f64, f64);
type Uniform4d = unsafe extern "system" fn(i32, f64, f64, f64, f64);

/// `glUniform*d` entry points; `glow` does not wrap them.
#[derive(Clone, Copy, Default)]
struct DoubleUniforms {
    one: Option<Uniform1d>,
    two: Option<Uniform2d>,
    three: Option<Uniform3d>,
    four: Option<Uniform4d>,
}

impl DoubleUniforms {
    fn load(loader: &mut impl FnMut(&str) -> *const c_void) -> Self {
        // SAFETY: each symbol, when present, has the signature given by the
        // GL 4.0 specification for that entry point.
        unsafe {
            Self {
                one: load_fn::<Uniform1d>(loader, "glUniform1d"),
                two: load_fn::<Uniform2d>(loader, "glUniform2d"),
                three: load_fn::<Uniform3d>(loader, "glUniform3d"),
                four: load_fn::<Uniform4d>(loader, "glUniform4d"),
            }
        }
    }
}

unsafe fn load_fn<F: Copy>(loader: &mut impl FnMut(&str) -> *const c_void, name: &str) -> Option<F> {
    let pointer = loader(name);
    if pointer.is_null() {
        None
    } else {
        Some(mem::transmute_copy::<*const c_void, F>(&pointer))
    }
}

/// Routes GL debug messages into `tracing`.
fn install_debug_callback(gl: &mut glow::Context) {
    if !gl.supports_debug() {
        debug!("GL debug output not supported by this context");
        return;
    }
    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
        gl.debug_message_callback(|source, kind, id, severity, message| match severity {
            glow::DEBUG_SEVERITY_HIGH => error!(source, kind, id, "GL: {message}"),
            glow::DEBUG_SEVERITY_MEDIUM => warn!(source, kind, id, "GL: {message}"),
            glow::DEBUG_SEVERITY_LOW => debug!(source, kind, id, "GL: {message}"),
            _ => trace!(source, kind, id, "GL: {message}"),
        });
    }
}

/// A `glow` context together with the few entry points it lacks.
///
/// The context is shared with the GUI painter, hence the `Arc`.
pub struct GlBackend {
    gl: Arc<glow::Context>,
    doubles: DoubleUniforms,
}

impl GlBackend {
    /// Loads GL through `loader`. The context must be current on this thread.
    ///
    /// # Safety
    ///
    /// `loader` must return valid GL function pointers for the current context.
    pub unsafe fn from_loader(
        mut loader: impl FnMut(&str) -> *const c_void,
        debug_output: bool,
    ) -> Self {
        let mut gl = glow::Context::from_loader_function(|name| loader(name));
        let doubles = DoubleUniforms::load(&mut loader);
        if debug_output {
            install_debug_callback(&mut gl);
        }
        Self {
            gl: Arc::new(gl),
            doubles,
        }
    }

    pub fn gl(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    pub fn version_string(&self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }

    /// Builds a vertex+fragment program, used for the screen copy pass.
    pub fn compile_render_program(
        &self,
        vertex: &str,
        fragment: &str,
    ) -> Result<glow::NativeProgram, CompileError> {
        unsafe {
            let vertex = self.compile_stage(glow::VERTEX_SHADER, vertex)?;
            let fragment = match self.compile_stage(glow::FRAGMENT_SHADER, fragment) {
                Ok(shader) => shader,
                Err(err) => {
                    self.gl.delete_shader(vertex);
                    return Err(err);
                }
            };
            self.link(&[vertex, fragment])
        }
    }

    unsafe fn compile_stage(&self, stage: u32, source: &str) -> Result<glow::NativeShader, CompileError> {
        if source.trim().is_empty() {
            return Err(CompileError::EmptySource);
        }
        let shader = self.gl.create_shader(stage).map_err(CompileError::Backend)?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if !self.gl.get_shader_compile_status(shader) {
            let log = self.gl.get_shader_info_log(shader);
            self.gl.delete_shader(shader);
            return Err(CompileError::Compile { log });
        }
        Ok(shader)
    }

    /// Links `shaders` into a program and deletes them either way.
    unsafe fn link(&self, shaders: &[glow::NativeShader]) -> Result<glow::NativeProgram, CompileError> {
        let program = match self.gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                for &shader in shaders {
                    self.gl.delete_shader(shader);
                }
                return Err(CompileError::Backend(err));
            }
        };
        for &shader in shaders {
            self.gl.attach_shader(program, shader);
        }
        self.gl.link_program(program);
        let linked = self.gl.get_program_link_status(program);
        for &shader in shaders {
            self.gl.detach_shader(program, shader);
            self.gl.delete_shader(shader);
        }
        if !linked {
            let log = self.gl.get_program_info_log(program);
            self.gl.delete_program(program);
            return Err(CompileError::Link { log });
        }
        Ok(program)
    }

    fn bind_doubles(&self, location: i32, ty: UniformType, lanes: [f64; 4]) {
        let doubles = self.doubles;
        let [x, y, z, w] = lanes;
        // SAFETY: pointers were loaded for this context's GL implementation.
        let bound = unsafe {
            match ty.components() {
                1 => doubles.one.map(|f| f(location, x)),
                2 => doubles.two.map(|f| f(location, x, y)),
                3 => doubles.three.map(|f| f(location, x, y, z)),
                _ => doubles.four.map(|f| f(location, x, y, z, w)),
            }
        };
        if bound.is_none() {
            warn!(location, %ty, "double precision uniforms are not available");
        }
    }
}

impl ShaderBackend for GlBackend {
    type Program = glow::NativeProgram;

    fn compile_compute(&self, source: &str) -> Result<glow::NativeProgram, CompileError> {
        unsafe {
            let shader = self.compile_stage(glow::COMPUTE_SHADER, source)?;
            let program = self.link(&[shader])?;
            // Objects built on one context become visible to sharing contexts
            // only once the commands that built them have completed.
            self.gl.finish();
            info!(program = ?program, "compute program linked");
            Ok(program)
        }
    }

    fn live_uniforms(&self, program: glow::NativeProgram) -> Vec<LiveUniform> {
        unsafe {
            let count = self.gl.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|active| LiveUniform {
                    name: active.name,
                    type_tag: active.utype,
                    array_len: active.size,
                })
                .collect()
        }
    }

    fn uniform_location(&self, program: glow::NativeProgram, name: &str) -> Option<u32> {
        unsafe { self.gl.get_uniform_location(program, name) }.map(|location| location.0)
    }

    fn use_program(&self, program: Option<glow::NativeProgram>) {
        unsafe { self.gl.use_program(program) }
    }

    fn bind_uniform(&self, location: u32, ty: UniformType, value: &UniformValue) {
        let slot = glow::NativeUniformLocation(location);
        let slot = Some(&slot);
        unsafe {
            match (*value, ty.components()) {
                (UniformValue::Float(v), _) if ty.is_double() => self.bind_doubles(
                    location as i32,
                    ty,
                    [v[0] as f64, v[1] as f64, v[2] as f64, v[3] as f64],
                ),
                (UniformValue::Float(v), 1) => self.gl.uniform_1_f32(slot, v[0]),
                (UniformValue::Float(v), 2) => self.gl.uniform_2_f32(slot, v[0], v[1]),
                (UniformValue::Float(v), 3) => self.gl.uniform_3_f32(slot, v[0], v[1], v[2]),
                (UniformValue::Float(v), _) => self.gl.uniform_4_f32(slot, v[0], v[1], v[2], v[3]),
                (UniformValue::Int(v), components) if ty.is_unsigned() => {
                    let v = v.map(|lane| lane.max(0) as u32);
                    match components {
                        1 => self.gl.uniform_1_u32(slot, v[0]),
                        2 => self.gl.uniform_2_u32(slot, v[0], v[1]),
                        3 => self.gl.uniform_3_u32(slot, v[0], v[1], v[2]),
                        _ => self.gl.uniform_4_u32(slot, v[0], v[1], v[2], v[3]),
                    }
                }
                (UniformValue::Int(v), 1) => self.gl.uniform_1_i32(slot, v[0]),
                (UniformValue::Int(v), 2) => self.gl.uniform_2_i32(slot, v[0], v[1]),
                (UniformValue::Int(v), 3) => self.gl.uniform_3_i32(slot, v[0], v[1], v[2]),
                (UniformValue::Int(v), _) => self.gl.uniform_4_i32(slot, v[0], v[1], v[2], v[3]),
                (UniformValue::Bool(v), components) => {
                    let v = v.map(u32::from);
                    match components {
                        1 => self.gl.uniform_1_u32(slot, v[0]),
                        2 => self.gl.uniform_2_u32(slot, v[0], v[1]),
                        3 => self.gl.uniform_3_u32(slot, v[0], v[1], v[2]),
                        _ => self.gl.uniform_4_u32(slot, v[0], v[1], v[2], v[3]),
                    }
                }
            }
        }
    }

    fn delete_program(&self, program: glow::NativeProgram) {
        unsafe { self.gl.delete_program(program) }
    }
}
