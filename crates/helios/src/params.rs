//! Engine-owned parameters: everything bound at a fixed location rather than
//! reflected from the scene.

use renderer::{UniformType, UniformValue};

use crate::locations::raymarch as loc;

#[derive(Clone, Debug, PartialEq)]
pub struct RaymarchSettings {
    pub epsilon: f32,
    pub z_far: f32,
    pub normal_epsilon: f32,
    pub starting_step: f32,
    pub max_iterations: i32,
    pub enable_shadow: bool,
    pub soft_shadow: bool,
    pub shadow_quality: f32,
    pub shadow_epsilon: f32,
    pub shadow_starting_step: f32,
    pub shadow_max_step: f32,
    pub enable_ambient_occlusion: bool,
    pub ambient_occlusion_step: f32,
    pub ambient_occlusion_iterations: i32,
}

impl Default for RaymarchSettings {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            z_far: 30.0,
            normal_epsilon: 0.0001,
            starting_step: 1.0,
            max_iterations: 100,
            enable_shadow: true,
            soft_shadow: true,
            shadow_quality: 64.0,
            shadow_epsilon: 0.001,
            shadow_starting_step: 0.03,
            shadow_max_step: 7.0,
            enable_ambient_occlusion: true,
            ambient_occlusion_step: 0.01,
            ambient_occlusion_iterations: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneSettings {
    pub floor_height: f32,
    pub sky_color: [f32; 3],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            floor_height: -0.3,
            sky_color: [0.8, 0.9, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub direction: [f32; 3],
    pub color: [f32; 3],
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: [-1.0, -1.0, -1.0],
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub focal_length: f32,
    pub position: [f32; 3],
    pub view: [f32; 3],
    pub up: [f32; 3],
    pub right: [f32; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            focal_length: 1.67,
            position: [0.0, 2.0, 5.0],
            view: [0.0, -0.5, -1.0],
            up: [0.0, 1.0, 0.0],
            right: [1.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostProcess {
    pub vignette_radius: f32,
    pub vignette_smoothness: f32,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            vignette_radius: 0.9,
            vignette_smoothness: 0.07,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineParameters {
    pub raymarch: RaymarchSettings,
    pub scene: SceneSettings,
    pub light: Light,
    pub camera: Camera,
    pub post: PostProcess,
}

/// One engine value together with the reserved name and location it binds to.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineUniform {
    pub name: &'static str,
    pub location: u32,
    pub ty: UniformType,
    pub value: UniformValue,
}

fn float(name: &'static str, location: u32, v: f32) -> EngineUniform {
    EngineUniform {
        name,
        location,
        ty: UniformType::Float,
        value: UniformValue::Float([v, 0.0, 0.0, 0.0]),
    }
}

fn vec3(name: &'static str, location: u32, v: [f32; 3]) -> EngineUniform {
    EngineUniform {
        name,
        location,
        ty: UniformType::Vec3,
        value: UniformValue::Float([v[0], v[1], v[2], 0.0]),
    }
}

fn int(name: &'static str, location: u32, v: i32) -> EngineUniform {
    EngineUniform {
        name,
        location,
        ty: UniformType::Int,
        value: UniformValue::Int([v, 0, 0, 0]),
    }
}

fn uint(name: &'static str, location: u32, v: u32) -> EngineUniform {
    EngineUniform {
        name,
        location,
        ty: UniformType::UInt,
        value: UniformValue::Int([i32::try_from(v).unwrap_or(i32::MAX), 0, 0, 0]),
    }
}

fn boolean(name: &'static str, location: u32, v: bool) -> EngineUniform {
    EngineUniform {
        name,
        location,
        ty: UniformType::Bool,
        value: UniformValue::Bool([v, false, false, false]),
    }
}

impl EngineParameters {
    /// Every value the raymarch program may read, for the current frame.
    pub fn uniforms(&self, time: f32, width: u32, height: u32) -> Vec<EngineUniform> {
        let r = &self.raymarch;
        vec![
            float("_hl_epsilon", loc::EPSILON, r.epsilon),
            float("_hl_z_far", loc::Z_FAR, r.z_far),
            float("_hl_normal_epsilon", loc::NORMAL_EPSILON, r.normal_epsilon),
            float("_hl_starting_step", loc::STARTING_STEP, r.starting_step),
            int("_hl_max_iterations", loc::MAX_ITERATIONS, r.max_iterations),
            boolean("_hl_enable_shadow", loc::ENABLE_SHADOW, r.enable_shadow),
            boolean("_hl_soft_shadow", loc::SOFT_SHADOW, r.soft_shadow),
            float("_hl_shadow_quality", loc::SHADOW_QUALITY, r.shadow_quality),
            float("_hl_shadow_epsilon", loc::SHADOW_EPSILON, r.shadow_epsilon),
            float(
                "_hl_shadow_starting_step",
                loc::SHADOW_STARTING_STEP,
                r.shadow_starting_step,
            ),
            float("_hl_shadow_max_step", loc::SHADOW_MAX_STEP, r.shadow_max_step),
            boolean(
                "_hl_enable_ambient_occlusion",
                loc::ENABLE_AMBIENT_OCCLUSION,
                r.enable_ambient_occlusion,
            ),
            float(
                "_hl_ambient_occlusion_step",
                loc::AMBIENT_OCCLUSION_STEP,
                r.ambient_occlusion_step,
            ),
            int(
                "_hl_ambient_occlusion_iterations",
                loc::AMBIENT_OCCLUSION_ITERATIONS,
                r.ambient_occlusion_iterations,
            ),
            float("time", loc::TIME, time),
            float("_hl_floor_height", loc::FLOOR_HEIGHT, self.scene.floor_height),
            vec3("_hl_sky_color", loc::SKY_COLOR, self.scene.sky_color),
            vec3("_hl_light_direction", loc::LIGHT_DIRECTION, self.light.direction),
            vec3("_hl_light_color", loc::LIGHT_COLOR, self.light.color),
            vec3("_hl_camera_position", loc::CAMERA_POSITION, self.camera.position),
            vec3("_hl_camera_view", loc::CAMERA_VIEW, self.camera.view),
            vec3("_hl_camera_up", loc::CAMERA_UP, self.camera.up),
            vec3("_hl_camera_right", loc::CAMERA_RIGHT, self.camera.right),
            float("_hl_focal_length", loc::FOCAL_LENGTH, self.camera.focal_length),
            uint("screen_width", loc::SCREEN_WIDTH, width),
            uint("screen_height", loc::SCREEN_HEIGHT, height),
        ]
    }
}
