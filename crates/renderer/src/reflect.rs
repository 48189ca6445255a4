use tracing::{debug, warn};

use crate::backend::{LiveUniform, ShaderBackend};
use crate::types::{Uniform, UniformType};

/// Uniforms supplied by the engine itself.
///
/// These are bound at fixed slots every frame and never appear in the
/// user-facing parameter list.
pub const RESERVED_UNIFORMS: &[&str] = &[
    "_hl_epsilon",
    "_hl_z_far",
    "_hl_normal_epsilon",
    "_hl_starting_step",
    "_hl_max_iterations",
    "_hl_enable_shadow",
    "_hl_soft_shadow",
    "_hl_shadow_quality",
    "_hl_shadow_epsilon",
    "_hl_shadow_starting_step",
    "_hl_shadow_max_step",
    "_hl_enable_ambient_occlusion",
    "_hl_ambient_occlusion_step",
    "_hl_ambient_occlusion_iterations",
    "screen_width",
    "screen_height",
    "_hl_floor_height",
    "_hl_sky_color",
    "_hl_light_direction",
    "_hl_light_color",
    "_hl_camera_position",
    "_hl_camera_view",
    "_hl_camera_up",
    "_hl_camera_right",
    "_hl_focal_length",
    "time",
    "_hl_output_image",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_UNIFORMS.contains(&name)
}

/// Builds the user-facing parameter list of a linked program.
pub fn reflect<B: ShaderBackend>(backend: &B, program: B::Program) -> Vec<Uniform> {
    reflect_uniforms(backend.live_uniforms(program))
}

/// Filters driver-reported uniforms down to supported, user-declared ones.
///
/// Order follows the driver's enumeration order. Every returned entry has a
/// zero value and an unresolved slot.
pub fn reflect_uniforms(live: impl IntoIterator<Item = LiveUniform>) -> Vec<Uniform> {
    let mut uniforms = Vec::new();
    for uniform in live {
        if is_reserved(&uniform.name) {
            continue;
        }
        if uniform.array_len > 1 || uniform.name.contains('[') || uniform.name.contains('.') {
            warn!(
                uniform = %uniform.name,
                "ignoring uniform because arrays and block members are not supported"
            );
            continue;
        }
        let Some(ty) = UniformType::from_gl(uniform.type_tag) else {
            warn!(
                uniform = %uniform.name,
                type_tag = format_args!("{:#x}", uniform.type_tag),
                "ignoring uniform because its type is not currently supported"
            );
            continue;
        };
        debug!(uniform = %uniform.name, %ty, "reflected scene parameter");
        uniforms.push(Uniform::new(uniform.name, ty));
    }
    uniforms
}
