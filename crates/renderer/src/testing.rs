//! In-memory backend used by the unit tests.
//!
//! "Compiling" scans the source for `uniform <type> <name>;` lines. A
//! declaration is live when its name occurs again somewhere else in the
//! source, which is close enough to what a real compiler keeps. A line
//! containing `#error` fails compilation, `#link-error` fails linking and
//! `#panic` panics.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{CompileContext, CompileError, LiveUniform, ShaderBackend};
use crate::types::{UniformType, UniformValue};

#[derive(Debug, Default)]
pub(crate) struct BackendLog {
    pub next_program: u32,
    pub programs: HashMap<u32, Vec<LiveUniform>>,
    pub deleted: Vec<u32>,
    pub bound: Vec<(u32, UniformType, UniformValue)>,
    pub in_use: Option<u32>,
    pub hidden_locations: BTreeSet<String>,
    pub activations: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedBackend {
    pub log: Arc<Mutex<BackendLog>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide_location(&self, name: &str) {
        self.log.lock().hidden_locations.insert(name.to_string());
    }

    pub fn deleted(&self) -> Vec<u32> {
        self.log.lock().deleted.clone()
    }

    pub fn live_programs(&self) -> usize {
        let log = self.log.lock();
        log.programs
            .keys()
            .filter(|id| !log.deleted.contains(id))
            .count()
    }
}

fn gl_tag(glsl: &str) -> u32 {
    match glsl {
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "double" => glow::DOUBLE,
        "dvec3" => glow::DOUBLE_VEC3,
        "int" => glow::INT,
        "ivec2" => glow::INT_VEC2,
        "uint" => glow::UNSIGNED_INT,
        "bool" => glow::BOOL,
        "bvec2" => glow::BOOL_VEC2,
        "mat4" => glow::FLOAT_MAT4,
        "image2D" => glow::IMAGE_2D,
        _ => 0,
    }
}

pub(crate) fn scan_uniforms(source: &str) -> Vec<LiveUniform> {
    let mut found = Vec::new();
    for line in source.lines() {
        let code = line.split("//").next().unwrap_or_default().trim();
        let Some(rest) = code.strip_prefix("uniform ") else {
            continue;
        };
        let mut parts = rest.trim_end_matches(';').split_whitespace();
        let (Some(ty), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        let (name, array_len) = match name.split_once('[') {
            Some((base, _)) => (format!("{base}[0]"), 2),
            None => (name.to_string(), 1),
        };
        let bare = name.trim_end_matches("[0]");
        if source.matches(bare).count() < 2 {
            continue;
        }
        found.push(LiveUniform {
            name,
            type_tag: gl_tag(ty),
            array_len,
        });
    }
    found
}

impl ShaderBackend for ScriptedBackend {
    type Program = u32;

    fn compile_compute(&self, source: &str) -> Result<u32, CompileError> {
        if source.trim().is_empty() {
            return Err(CompileError::EmptySource);
        }
        if source.contains("#error") {
            return Err(CompileError::Compile {
                log: "0:1(1): error: syntax error".into(),
            });
        }
        if source.contains("#panic") {
            panic!("scripted backend crashed");
        }
        if source.contains("#link-error") {
            return Err(CompileError::Link {
                log: "error: unresolved symbol".into(),
            });
        }
        let mut log = self.log.lock();
        log.next_program += 1;
        let id = log.next_program;
        log.programs.insert(id, scan_uniforms(source));
        Ok(id)
    }

    fn live_uniforms(&self, program: u32) -> Vec<LiveUniform> {
        self.log
            .lock()
            .programs
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let log = self.log.lock();
        if log.hidden_locations.contains(name) {
            return None;
        }
        let uniforms = log.programs.get(&program)?;
        uniforms
            .iter()
            .position(|uniform| uniform.name == name)
            .map(|index| index as u32 + 100)
    }

    fn use_program(&self, program: Option<u32>) {
        self.log.lock().in_use = program;
    }

    fn bind_uniform(&self, location: u32, ty: UniformType, value: &UniformValue) {
        self.log.lock().bound.push((location, ty, *value));
    }

    fn delete_program(&self, program: u32) {
        self.log.lock().deleted.push(program);
    }
}

/// Compile context wrapping a [`ScriptedBackend`] that shares its log.
pub(crate) struct ScriptedContext {
    pub backend: ScriptedBackend,
}

impl CompileContext for ScriptedContext {
    type Backend = ScriptedBackend;

    fn activate(&mut self) -> anyhow::Result<&ScriptedBackend> {
        self.backend.log.lock().activations += 1;
        Ok(&self.backend)
    }
}
