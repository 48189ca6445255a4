use std::ffi::CString;
use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use egui_glow::EguiGlow;
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{Display, GetGlDisplay};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::{HasRawWindowHandle, RawWindowHandle};
use renderer::gl::GlBackend;
use renderer::{build_initial, HotProgram, ProgramSources, ShaderBackend};
use sceneconfig::ViewerConfig;
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::context::SharedCompileContext;
use crate::gui::{draw_panels, FrameTimer, PanelState};
use crate::open::open_path;
use crate::params::EngineParameters;
use crate::raymarch::{dispatch, CopyPass, OutputImage};

const WINDOW_TITLE: &str = "Helios";

pub struct ViewerOptions {
    pub config: ViewerConfig,
    pub watch: bool,
    pub gl_debug: bool,
}

pub fn run_viewer(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create the event loop")?;
    let mut viewer = Viewer::new(&event_loop, options)?;
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            viewer.handle_event(event, elwt);
        })
        .context("window event loop failed")
}

fn context_attributes(
    raw_window_handle: RawWindowHandle,
    debug: bool,
    share_with: Option<&NotCurrentContext>,
) -> glutin::context::ContextAttributes {
    let mut builder = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 3))))
        .with_profile(GlProfile::Core)
        .with_debug(debug);
    if let Some(context) = share_with {
        builder = builder.with_sharing(context);
    }
    builder.build(Some(raw_window_handle))
}

fn non_zero(size: PhysicalSize<u32>) -> Option<(NonZeroU32, NonZeroU32)> {
    Some((NonZeroU32::new(size.width)?, NonZeroU32::new(size.height)?))
}

fn load_backend(display: &Display, debug_output: bool) -> GlBackend {
    // SAFETY: called with the window context current on this thread.
    unsafe {
        GlBackend::from_loader(
            |symbol| match CString::new(symbol) {
                Ok(symbol) => display.get_proc_address(&symbol),
                Err(_) => std::ptr::null(),
            },
            debug_output,
        )
    }
}

struct Viewer {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    backend: GlBackend,
    scene: Option<HotProgram<glow::NativeProgram>>,
    scene_path: PathBuf,
    image: OutputImage,
    copy: CopyPass,
    egui: EguiGlow,
    engine: EngineParameters,
    config: ViewerConfig,
    started: Instant,
    timer: FrameTimer,
}

impl Viewer {
    fn new(event_loop: &EventLoop<()>, options: ViewerOptions) -> Result<Self> {
        let ViewerOptions {
            config,
            watch,
            gl_debug,
        } = options;
        let target: &EventLoopWindowTarget<()> = event_loop;

        let requested = PhysicalSize::new(config.resolution.width, config.resolution.height);
        let mut window_builder = WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(requested);
        if config.fullscreen {
            window_builder = window_builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(0);
        // The picker must hand back a config; an empty match unwinds with a
        // marker payload that becomes an ordinary error here.
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            DisplayBuilder::new()
                .with_window_builder(Some(window_builder))
                .build(target, template, |configs| {
                    fewest_samples(configs, GlConfig::num_samples)
                        .unwrap_or_else(|| panic::panic_any(NoMatchingConfig))
                })
        }));
        let (window, gl_config) = match built {
            Ok(result) => result.map_err(|err| anyhow!("failed to create the window: {err}"))?,
            Err(payload) if payload.is::<NoMatchingConfig>() => {
                bail!("no OpenGL config matches the requested window format")
            }
            Err(payload) => panic::resume_unwind(payload),
        };
        let window = window.ok_or_else(|| anyhow!("display builder returned no window"))?;

        let raw_window_handle = window.raw_window_handle();
        let display = gl_config.display();

        let primary = unsafe {
            display.create_context(&gl_config, &context_attributes(raw_window_handle, gl_debug, None))
        }
        .context("failed to create an OpenGL 4.3 core context")?;
        let secondary = unsafe {
            display.create_context(
                &gl_config,
                &context_attributes(raw_window_handle, gl_debug, Some(&primary)),
            )
        }
        .context("failed to create the shared compile context")?;

        let size = window.inner_size();
        let (width, height) =
            non_zero(size).ok_or_else(|| anyhow!("window has an empty client area"))?;
        let surface_attributes =
            SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window_handle, width, height);
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .context("failed to create the window surface")?;
        let context = primary
            .make_current(&surface)
            .context("failed to make the window context current")?;
        if let Err(err) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
            warn!(error = %err, "could not enable vsync");
        }

        let backend = load_backend(&display, gl_debug);
        info!(version = %backend.version_string(), "OpenGL context ready");

        let sources = ProgramSources {
            base: config.base_path(),
            library: config.library_path(),
            scene: config.scene_path(),
            main: config.main_path(),
        };
        let initial = build_initial(&backend, &sources)
            .with_context(|| format!("failed to build the scene program from {}", sources.scene.display()))?;
        info!(parameters = initial.parameters().len(), "scene program built");

        let scene_path = sources.scene.clone();
        let mut scene = HotProgram::new(
            initial,
            SharedCompileContext::new(display.clone(), secondary, gl_debug),
            sources,
            config.scene_reload_interval(),
        );
        if watch {
            scene.start_watching();
        } else {
            info!("scene watching disabled");
        }

        let image = OutputImage::new(backend.gl(), size.width, size.height)?;
        let copy = CopyPass::new(&backend, &config)?;
        let egui = EguiGlow::new(target, Arc::clone(backend.gl()), None, None);

        Ok(Self {
            window,
            surface,
            context,
            backend,
            scene: Some(scene),
            scene_path,
            image,
            copy,
            egui,
            engine: EngineParameters::default(),
            config,
            started: Instant::now(),
            timer: FrameTimer::new(),
        })
    }

    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { event, .. } => {
                if let WindowEvent::RedrawRequested = event {
                    if let Err(err) = self.redraw() {
                        error!(error = %format!("{err:#}"), "frame failed; shutting down");
                        elwt.exit();
                    }
                    return;
                }

                let response = self.egui.on_window_event(&self.window, &event);
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key: Key::Named(NamedKey::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } if !response.consumed => elwt.exit(),
                    WindowEvent::Resized(size) => self.resize(size),
                    _ => {}
                }
            }
            Event::AboutToWait => self.window.request_redraw(),
            Event::LoopExiting => self.shutdown(),
            _ => {}
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        // Minimized windows report an empty size; keep the last image.
        let Some((width, height)) = non_zero(size) else {
            return;
        };
        self.surface.resize(&self.context, width, height);
        self.image.resize(self.backend.gl(), size.width, size.height);
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };

        scene.maybe_swap_program(&self.backend);
        let time = self.started.elapsed().as_secs_f32();
        dispatch(
            &self.backend,
            scene,
            &self.image,
            &self.engine,
            &self.config.group_size,
            time,
        );
        self.copy.draw(&self.backend, &self.image, &self.engine.post);
        self.timer.tick(Instant::now());

        let report = scene.poll_reports().cloned();
        let generation = scene.generation();
        let watching = scene.is_watching();
        let mut open_scene = false;
        {
            let mut parameters = scene.parameters();
            let engine = &mut self.engine;
            let timer = &self.timer;
            let scene_path = self.scene_path.as_path();
            self.egui.run(&self.window, |ctx| {
                let actions = draw_panels(
                    ctx,
                    PanelState {
                        engine: &mut *engine,
                        parameters: &mut parameters,
                        report: report.as_ref(),
                        timer,
                        scene: scene_path,
                        generation,
                        watching,
                    },
                );
                open_scene |= actions.open_scene;
            });
        }
        self.egui.paint(&self.window);

        if open_scene {
            if let Err(err) = open_path(&self.scene_path) {
                warn!(error = %err, path = %self.scene_path.display(), "could not open the scene");
            }
        }

        self.surface
            .swap_buffers(&self.context)
            .context("failed to present the frame")
    }

    fn shutdown(&mut self) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        info!("shutting down");
        scene.release(&self.backend);
        self.backend.use_program(None);
        self.copy.destroy(&self.backend);
        self.image.destroy(self.backend.gl());
        self.egui.destroy();
    }
}

struct NoMatchingConfig;

/// Picks the first config with the fewest samples.
fn fewest_samples<T>(configs: impl Iterator<Item = T>, samples: impl Fn(&T) -> u8) -> Option<T> {
    configs.reduce(|best, next| {
        if samples(&next) < samples(&best) {
            next
        } else {
            best
        }
    })
}
