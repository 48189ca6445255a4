//! Explicit uniform locations shared with `layout(location = N)` in the GLSL sources.

pub mod raymarch {
    pub const EPSILON: u32 = 998;
    pub const Z_FAR: u32 = 999;
    pub const NORMAL_EPSILON: u32 = 1000;
    pub const STARTING_STEP: u32 = 1001;
    pub const MAX_ITERATIONS: u32 = 1002;
    pub const ENABLE_SHADOW: u32 = 1003;
    pub const SOFT_SHADOW: u32 = 1004;
    pub const SHADOW_QUALITY: u32 = 1005;
    pub const SHADOW_EPSILON: u32 = 1006;
    pub const SHADOW_STARTING_STEP: u32 = 1007;
    pub const SHADOW_MAX_STEP: u32 = 1008;
    pub const ENABLE_AMBIENT_OCCLUSION: u32 = 1009;
    pub const AMBIENT_OCCLUSION_STEP: u32 = 1010;
    pub const AMBIENT_OCCLUSION_ITERATIONS: u32 = 1011;
    pub const TIME: u32 = 1012;
    pub const FLOOR_HEIGHT: u32 = 1013;
    pub const SKY_COLOR: u32 = 1014;
    pub const LIGHT_DIRECTION: u32 = 1015;
    pub const LIGHT_COLOR: u32 = 1016;
    pub const CAMERA_POSITION: u32 = 1017;
    pub const CAMERA_VIEW: u32 = 1018;
    pub const CAMERA_UP: u32 = 1019;
    pub const CAMERA_RIGHT: u32 = 1020;
    pub const FOCAL_LENGTH: u32 = 1021;
    pub const SCREEN_WIDTH: u32 = 1022;
    pub const SCREEN_HEIGHT: u32 = 1023;
}

pub mod copy {
    pub const VIGNETTE_RADIUS: u32 = 1020;
    pub const VIGNETTE_SMOOTHNESS: u32 = 1021;
    pub const SCREEN_WIDTH: u32 = 1022;
    pub const SCREEN_HEIGHT: u32 = 1023;
}

/// Image unit the raymarch program writes to and texture unit the copy pass samples.
pub const OUTPUT_IMAGE_UNIT: u32 = 0;
