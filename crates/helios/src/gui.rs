use std::path::Path;
use std::time::Instant;

use egui::{Color32, CollapsingHeader, DragValue, RichText, ScrollArea, Slider, Ui};
use renderer::{ReloadOutcome, ReloadReport, Uniform, UniformValue};

use crate::params::{Camera, EngineParameters, Light, PostProcess, RaymarchSettings, SceneSettings};

const ERROR_COLOR: Color32 = Color32::from_rgb(230, 90, 80);
const OK_COLOR: Color32 = Color32::from_rgb(120, 200, 120);

/// Smoothed frame time for the info panel.
#[derive(Debug)]
pub struct FrameTimer {
    last: Option<Instant>,
    average_ms: f32,
}

impl FrameTimer {
    const SMOOTHING: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            last: None,
            average_ms: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last {
            let sample = now.duration_since(last).as_secs_f32() * 1000.0;
            self.average_ms = if self.average_ms == 0.0 {
                sample
            } else {
                self.average_ms + (sample - self.average_ms) * Self::SMOOTHING
            };
        }
        self.last = Some(now);
    }

    pub fn average_ms(&self) -> f32 {
        self.average_ms
    }

    pub fn fps(&self) -> f32 {
        if self.average_ms > 0.0 {
            1000.0 / self.average_ms
        } else {
            0.0
        }
    }
}

/// Everything the panels show or edit for one frame.
pub struct PanelState<'a> {
    pub engine: &'a mut EngineParameters,
    pub parameters: &'a mut [Uniform],
    pub report: Option<&'a ReloadReport>,
    pub timer: &'a FrameTimer,
    pub scene: &'a Path,
    pub generation: u64,
    pub watching: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PanelActions {
    pub open_scene: bool,
}

pub fn draw_panels(ctx: &egui::Context, state: PanelState<'_>) -> PanelActions {
    let PanelState {
        engine,
        parameters,
        report,
        timer,
        scene,
        generation,
        watching,
    } = state;
    let mut actions = PanelActions::default();

    egui::Window::new("Scene info")
        .default_pos([12.0, 12.0])
        .show(ctx, |ui| {
            ui.label(format!(
                "{:.3} ms/frame ({:.1} FPS)",
                timer.average_ms(),
                timer.fps()
            ));
            ui.label(format!("Scene: {}", scene.display()));
            ui.label(format!(
                "Reloads adopted: {generation}{}",
                if watching { "" } else { " (watching off)" }
            ));
            if ui.button("Open scene").clicked() {
                actions.open_scene = true;
            }
            reload_status(ui, report);
        });

    egui::Window::new("Settings")
        .default_pos([12.0, 220.0])
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                CollapsingHeader::new("Raymarch settings").show(ui, |ui| {
                    raymarch_settings(ui, &mut engine.raymarch);
                });
                CollapsingHeader::new("Scene settings")
                    .default_open(true)
                    .show(ui, |ui| {
                        scene_settings(ui, &mut engine.scene);
                        CollapsingHeader::new("Postprocessing").show(ui, |ui| {
                            postprocess(ui, &mut engine.post);
                        });
                        CollapsingHeader::new("Camera").show(ui, |ui| {
                            camera(ui, &mut engine.camera);
                        });
                        CollapsingHeader::new("Light").show(ui, |ui| {
                            light(ui, &mut engine.light);
                        });
                    });
                CollapsingHeader::new("Scene parameters")
                    .default_open(true)
                    .show(ui, |ui| {
                        if parameters.is_empty() {
                            ui.weak("The scene declares no parameters.");
                        }
                        for uniform in parameters.iter_mut() {
                            parameter_editor(ui, uniform);
                        }
                    });
            });
        });

    actions
}

fn reload_status(ui: &mut Ui, report: Option<&ReloadReport>) {
    let Some(report) = report else {
        return;
    };
    let time = report.finished_at.format("%H:%M:%S");
    match &report.outcome {
        ReloadOutcome::Staged {
            parameters,
            unresolved,
        } => {
            ui.colored_label(
                OK_COLOR,
                format!("[{time}] reloaded: {parameters} parameters, {unresolved} unused"),
            );
        }
        ReloadOutcome::Failed { reason, log } => {
            ui.colored_label(ERROR_COLOR, format!("[{time}] reload failed"));
            let text = log.as_deref().unwrap_or(reason.as_str());
            ScrollArea::vertical()
                .id_source("compile-log")
                .max_height(160.0)
                .show(ui, |ui| {
                    ui.label(RichText::new(text).monospace().color(ERROR_COLOR));
                });
        }
    }
}

fn drag(ui: &mut Ui, label: &str, value: &mut f32, speed: f64) {
    ui.horizontal(|ui| {
        ui.add(DragValue::new(value).speed(speed).max_decimals(5));
        ui.label(label);
    });
}

fn drag_int(ui: &mut Ui, label: &str, value: &mut i32) {
    ui.horizontal(|ui| {
        ui.add(DragValue::new(value).clamp_range(0..=10_000));
        ui.label(label);
    });
}

fn drag3(ui: &mut Ui, label: &str, value: &mut [f32; 3], speed: f64) {
    ui.horizontal(|ui| {
        for lane in value.iter_mut() {
            ui.add(DragValue::new(lane).speed(speed).max_decimals(3));
        }
        ui.label(label);
    });
}

fn slider3(ui: &mut Ui, label: &str, value: &mut [f32; 3], range: std::ops::RangeInclusive<f32>) {
    ui.label(label);
    for (lane, axis) in value.iter_mut().zip(["x", "y", "z"]) {
        ui.add(Slider::new(lane, range.clone()).text(axis));
    }
}

fn raymarch_settings(ui: &mut Ui, settings: &mut RaymarchSettings) {
    drag(ui, "Epsilon", &mut settings.epsilon, 0.0001);
    drag(ui, "Far plane", &mut settings.z_far, 0.1);
    drag(ui, "Normal epsilon", &mut settings.normal_epsilon, 0.00001);
    drag(ui, "Starting step", &mut settings.starting_step, 0.01);
    drag_int(ui, "Max iterations", &mut settings.max_iterations);
    ui.separator();
    ui.checkbox(&mut settings.enable_shadow, "Enable shadows");
    ui.add_enabled_ui(settings.enable_shadow, |ui| {
        ui.checkbox(&mut settings.soft_shadow, "Soft shadows");
        drag(ui, "Shadow quality", &mut settings.shadow_quality, 0.5);
        drag(ui, "Shadow epsilon", &mut settings.shadow_epsilon, 0.0001);
        drag(ui, "Shadow starting step", &mut settings.shadow_starting_step, 0.001);
        drag(ui, "Shadow max step", &mut settings.shadow_max_step, 0.1);
    });
    ui.separator();
    ui.checkbox(&mut settings.enable_ambient_occlusion, "Enable ambient occlusion");
    ui.add_enabled_ui(settings.enable_ambient_occlusion, |ui| {
        drag(ui, "AO step", &mut settings.ambient_occlusion_step, 0.001);
        drag_int(ui, "AO iterations", &mut settings.ambient_occlusion_iterations);
    });
}

fn scene_settings(ui: &mut Ui, settings: &mut SceneSettings) {
    drag(ui, "Floor height", &mut settings.floor_height, 0.01);
    ui.horizontal(|ui| {
        ui.color_edit_button_rgb(&mut settings.sky_color);
        ui.label("Sky color");
    });
}

fn postprocess(ui: &mut Ui, post: &mut PostProcess) {
    ui.add(Slider::new(&mut post.vignette_radius, 0.5..=1.0).text("Vignette radius"));
    ui.add(Slider::new(&mut post.vignette_smoothness, 0.0..=0.5).text("Vignette smoothness"));
}

fn camera(ui: &mut Ui, camera: &mut Camera) {
    ui.add(Slider::new(&mut camera.focal_length, 1.0..=5.0).text("Focal length"));
    drag3(ui, "Position", &mut camera.position, 0.05);
    drag3(ui, "View", &mut camera.view, 0.01);
}

fn light(ui: &mut Ui, light: &mut Light) {
    slider3(ui, "Direction", &mut light.direction, -1.0..=1.0);
    slider3(ui, "Color", &mut light.color, 0.0..=1.0);
}

/// One row per scene parameter, with an editor matching its type.
fn parameter_editor(ui: &mut Ui, uniform: &mut Uniform) {
    let components = uniform.ty.components();
    let unsigned = uniform.ty.is_unsigned();
    let resolved = uniform.slot.is_resolved();
    ui.horizontal(|ui| {
        match &mut uniform.value {
            UniformValue::Float(lanes) => {
                for lane in lanes.iter_mut().take(components) {
                    ui.add(DragValue::new(lane).speed(0.01).max_decimals(4));
                }
            }
            UniformValue::Int(lanes) => {
                for lane in lanes.iter_mut().take(components) {
                    let editor = if unsigned {
                        DragValue::new(lane).clamp_range(0..=i32::MAX)
                    } else {
                        DragValue::new(lane)
                    };
                    ui.add(editor);
                }
            }
            UniformValue::Bool(lanes) => {
                for lane in lanes.iter_mut().take(components) {
                    ui.checkbox(lane, "");
                }
            }
        }
        ui.label(RichText::new(uniform.ty.glsl_name()).weak());
        ui.label(&uniform.name);
        if !resolved {
            ui.weak("(unused)");
        }
    });
}
