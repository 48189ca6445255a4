use anyhow::{anyhow, Context, Result};
use glow::HasContext;
use renderer::gl::GlBackend;
use renderer::{bind_parameters, read_source, EngineSlots, HotProgram, ShaderBackend, UniformType, UniformValue};
use sceneconfig::{GroupSize, ViewerConfig};
use tracing::debug;

use crate::locations::{copy as copy_loc, OUTPUT_IMAGE_UNIT};
use crate::params::{EngineParameters, EngineUniform, PostProcess};

/// The RGBA32F image the raymarch program writes and the copy pass samples.
pub struct OutputImage {
    texture: glow::NativeTexture,
    width: u32,
    height: u32,
}

impl OutputImage {
    pub fn new(gl: &glow::Context, width: u32, height: u32) -> Result<Self> {
        let texture = unsafe { gl.create_texture() }
            .map_err(|err| anyhow!("failed to create the output image: {err}"))?;
        let image = Self {
            texture,
            width,
            height,
        };
        image.allocate(gl);
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn allocate(&self, gl: &glow::Context) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + OUTPUT_IMAGE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA32F as i32,
                self.width as i32,
                self.height as i32,
                0,
                glow::RGBA,
                glow::FLOAT,
                None,
            );
        }
        debug!(width = self.width, height = self.height, "allocated output image");
    }

    /// Reallocates storage; the contents are undefined until the next dispatch.
    pub fn resize(&mut self, gl: &glow::Context, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.allocate(gl);
    }

    /// Binds the image for writing and, on the same unit, for sampling.
    fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + OUTPUT_IMAGE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.bind_image_texture(
                OUTPUT_IMAGE_UNIT,
                self.texture,
                0,
                false,
                0,
                glow::WRITE_ONLY,
                glow::RGBA32F,
            );
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.texture) }
    }
}

/// Binds every engine value the active program declares. Returns how many were bound.
pub fn bind_engine_uniforms<B: ShaderBackend>(
    backend: &B,
    slots: &EngineSlots,
    uniforms: &[EngineUniform],
) -> usize {
    let mut bound = 0;
    for uniform in uniforms {
        if let Some(location) = slots.get(uniform.name) {
            backend.bind_uniform(location, uniform.ty, &uniform.value);
            bound += 1;
        }
    }
    bound
}

/// Runs the scene program over the output image.
pub fn dispatch(
    backend: &GlBackend,
    scene: &HotProgram<glow::NativeProgram>,
    image: &OutputImage,
    engine: &EngineParameters,
    group_size: &GroupSize,
    time: f32,
) {
    let gl = backend.gl();
    image.bind(gl);
    backend.use_program(Some(scene.program()));

    let engine_uniforms = engine.uniforms(time, image.width(), image.height());
    bind_engine_uniforms(backend, scene.engine_slots(), &engine_uniforms);
    bind_parameters(backend, &scene.parameters());

    let (groups_x, groups_y) = group_size.dispatch_for(image.width(), image.height());
    unsafe {
        gl.dispatch_compute(groups_x, groups_y, 1);
        gl.memory_barrier(glow::SHADER_IMAGE_ACCESS_BARRIER_BIT);
    }
}

/// Presents the output image on the default framebuffer with a vignette.
pub struct CopyPass {
    program: glow::NativeProgram,
    quad: glow::NativeVertexArray,
}

impl CopyPass {
    pub fn new(backend: &GlBackend, config: &ViewerConfig) -> Result<Self> {
        let vertex_path = config.vertex_shader_path();
        let fragment_path = config.fragment_shader_path();
        let program = backend
            .compile_render_program(&read_source(&vertex_path), &read_source(&fragment_path))
            .with_context(|| {
                format!(
                    "failed to build the copy program from {} and {}",
                    vertex_path.display(),
                    fragment_path.display()
                )
            })?;
        let quad = match unsafe { backend.gl().create_vertex_array() } {
            Ok(quad) => quad,
            Err(err) => {
                backend.delete_program(program);
                return Err(anyhow!("failed to create the fullscreen quad: {err}"));
            }
        };
        Ok(Self { program, quad })
    }

    pub fn draw(&self, backend: &GlBackend, image: &OutputImage, post: &PostProcess) {
        let gl = backend.gl();
        backend.use_program(Some(self.program));
        let width = i32::try_from(image.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(image.height()).unwrap_or(i32::MAX);
        backend.bind_uniform(copy_loc::SCREEN_WIDTH, UniformType::UInt, &UniformValue::Int([width, 0, 0, 0]));
        backend.bind_uniform(copy_loc::SCREEN_HEIGHT, UniformType::UInt, &UniformValue::Int([height, 0, 0, 0]));
        backend.bind_uniform(
            copy_loc::VIGNETTE_RADIUS,
            UniformType::Float,
            &UniformValue::Float([post.vignette_radius, 0.0, 0.0, 0.0]),
        );
        backend.bind_uniform(
            copy_loc::VIGNETTE_SMOOTHNESS,
            UniformType::Float,
            &UniformValue::Float([post.vignette_smoothness, 0.0, 0.0, 0.0]),
        );
        unsafe {
            gl.viewport(0, 0, width, height);
            gl.disable(glow::BLEND);
            gl.disable(glow::SCISSOR_TEST);
            gl.active_texture(glow::TEXTURE0 + OUTPUT_IMAGE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, Some(image.texture));
            gl.bind_vertex_array(Some(self.quad));
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.bind_vertex_array(None);
        }
    }

    pub fn destroy(&self, backend: &GlBackend) {
        unsafe { backend.gl().delete_vertex_array(self.quad) };
        backend.delete_program(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use renderer::{resolve_engine_slots, CompileError, LiveUniform};

    /// Records binds; only the names in `declared` have a location.
    #[derive(Default)]
    struct RecordingBackend {
        declared: Vec<(&'static str, u32)>,
        bound: RefCell<Vec<(u32, UniformValue)>>,
    }

    impl ShaderBackend for RecordingBackend {
        type Program = u32;

        fn compile_compute(&self, _source: &str) -> Result<u32, CompileError> {
            Ok(1)
        }

        fn live_uniforms(&self, _program: u32) -> Vec<LiveUniform> {
            Vec::new()
        }

        fn uniform_location(&self, _program: u32, name: &str) -> Option<u32> {
            self.declared
                .iter()
                .find(|(declared, _)| *declared == name)
                .map(|(_, location)| *location)
        }

        fn use_program(&self, _program: Option<u32>) {}

        fn bind_uniform(&self, location: u32, _ty: UniformType, value: &UniformValue) {
            self.bound.borrow_mut().push((location, *value));
        }

        fn delete_program(&self, _program: u32) {}
    }

    #[test]
    fn only_live_engine_uniforms_are_bound() {
        let backend = RecordingBackend {
            declared: vec![("time", 1012), ("screen_width", 1022)],
            ..Default::default()
        };
        let slots = resolve_engine_slots(&backend, 1);
        let uniforms = EngineParameters::default().uniforms(3.0, 640, 480);

        assert_eq!(bind_engine_uniforms(&backend, &slots, &uniforms), 2);
        let bound = backend.bound.borrow();
        assert!(bound.contains(&(1012, UniformValue::Float([3.0, 0.0, 0.0, 0.0]))));
        assert!(bound.contains(&(1022, UniformValue::Int([640, 0, 0, 0]))));
    }

    #[test]
    fn scene_without_engine_inputs_binds_nothing() {
        let backend = RecordingBackend::default();
        let slots = resolve_engine_slots(&backend, 1);
        let uniforms = EngineParameters::default().uniforms(0.0, 1, 1);

        assert_eq!(bind_engine_uniforms(&backend, &slots, &uniforms), 0);
        assert!(backend.bound.borrow().is_empty());
    }
}
