use std::collections::HashMap;

use tracing::{debug, warn};

use crate::backend::ShaderBackend;
use crate::reflect::RESERVED_UNIFORMS;
use crate::types::{BindingSlot, Uniform};

/// Looks up the binding slot of every parameter in a linked program.
///
/// Parameters the compiler optimized away stay in the list with an
/// unresolved slot so their values survive later merges.
pub fn resolve<B: ShaderBackend>(backend: &B, program: B::Program, uniforms: &mut [Uniform]) {
    for uniform in uniforms.iter_mut() {
        uniform.slot = match backend.uniform_location(program, &uniform.name) {
            Some(location) => BindingSlot::Resolved(location),
            None => {
                warn!(
                    uniform = %uniform.name,
                    "could not retrieve location for uniform (maybe it was optimized away?)"
                );
                BindingSlot::Unresolved
            }
        };
    }
}

/// Uploads every resolved parameter to the program currently in use.
pub fn bind_parameters<B: ShaderBackend>(backend: &B, uniforms: &[Uniform]) {
    for uniform in uniforms {
        if let BindingSlot::Resolved(location) = uniform.slot {
            backend.bind_uniform(location, uniform.ty, &uniform.value);
        }
    }
}

/// Which engine-supplied uniforms a program actually uses.
///
/// Scenes are free to ignore engine inputs such as `time`; binding a fixed
/// slot the program does not declare is an error on most drivers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineSlots {
    slots: HashMap<&'static str, u32>,
}

impl EngineSlots {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.slots.get(name).copied()
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub fn resolve_engine_slots<B: ShaderBackend>(backend: &B, program: B::Program) -> EngineSlots {
    let mut slots = HashMap::new();
    for &name in RESERVED_UNIFORMS {
        match backend.uniform_location(program, name) {
            Some(location) => {
                slots.insert(name, location);
            }
            None => debug!(uniform = name, "engine uniform not used by program"),
        }
    }
    EngineSlots { slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::reflect;
    use crate::testing::ScriptedBackend;
    use crate::types::{UniformType, UniformValue};

    const SOURCE: &str = "\
uniform float time;
uniform float glow;
uniform vec3 tint;
void main() { vec3 c = tint * glow * time; }
";

    #[test]
    fn resolves_locations_and_keeps_unresolved_entries() {
        let backend = ScriptedBackend::new();
        let program = backend.compile_compute(SOURCE).unwrap();
        backend.hide_location("tint");

        let mut uniforms = reflect(&backend, program);
        resolve(&backend, program, &mut uniforms);

        assert_eq!(uniforms.len(), 2);
        assert!(uniforms[0].slot.is_resolved());
        assert_eq!(uniforms[1].name, "tint");
        assert_eq!(uniforms[1].slot, BindingSlot::Unresolved);
    }

    #[test]
    fn binding_skips_unresolved_parameters() {
        let backend = ScriptedBackend::new();
        let mut glow = Uniform::new("glow", UniformType::Float);
        glow.slot = BindingSlot::Resolved(4);
        glow.value = UniformValue::Float([0.8, 0.0, 0.0, 0.0]);
        let tint = Uniform::new("tint", UniformType::Vec3);

        bind_parameters(&backend, &[glow, tint]);

        let bound = backend.log.lock().bound.clone();
        assert_eq!(
            bound,
            vec![(4, UniformType::Float, UniformValue::Float([0.8, 0.0, 0.0, 0.0]))]
        );
    }

    #[test]
    fn engine_slots_only_cover_live_reserved_uniforms() {
        let backend = ScriptedBackend::new();
        let program = backend.compile_compute(SOURCE).unwrap();

        let slots = resolve_engine_slots(&backend, program);
        assert!(slots.is_live("time"));
        assert!(!slots.is_live("screen_width"));
        assert!(!slots.is_live("glow"));
        assert_eq!(slots.len(), 1);
    }
}
