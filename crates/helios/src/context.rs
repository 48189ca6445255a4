use std::ffi::CString;

use anyhow::{anyhow, bail, Context, Result};
use glutin::context::{NotCurrentContext, PossiblyCurrentContext};
use glutin::display::Display;
use glutin::prelude::*;
use renderer::gl::GlBackend;
use renderer::{CompileContext, ThreadBound};
use tracing::{debug, info};

/// A GL context that shares objects with the window context and compiles
/// scene programs on whichever thread the watcher runs on.
///
/// It has no surface of its own; activation makes it current surfaceless.
pub struct SharedCompileContext {
    display: Display,
    pending: Option<NotCurrentContext>,
    current: Option<PossiblyCurrentContext>,
    backend: Option<ThreadBound<GlBackend>>,
    debug_output: bool,
}

// SAFETY: the context is only made current from `activate`, which takes
// `&mut self`; the backend it loads is thread-bound and asserts that later use
// stays on the thread that activated it.
unsafe impl Send for SharedCompileContext {}

impl SharedCompileContext {
    pub fn new(display: Display, context: NotCurrentContext, debug_output: bool) -> Self {
        Self {
            display,
            pending: Some(context),
            current: None,
            backend: None,
            debug_output,
        }
    }

    fn make_current_here(&mut self) -> Result<()> {
        let context = match (self.pending.take(), self.current.take()) {
            (Some(context), _) => context,
            (None, Some(current)) => current
                .make_not_current()
                .context("failed to release the compile context")?,
            (None, None) => bail!("compile context was lost by an earlier failed activation"),
        };
        let current = context
            .make_current_surfaceless()
            .context("failed to make the compile context current")?;
        self.current = Some(current);

        match &mut self.backend {
            Some(backend) => {
                debug!("compile context moved to a new thread");
                backend.bind_to_current_thread();
            }
            None => {
                let display = self.display.clone();
                // SAFETY: the context was made current on this thread above.
                let backend = unsafe {
                    GlBackend::from_loader(
                        |symbol| match CString::new(symbol) {
                            Ok(symbol) => display.get_proc_address(&symbol),
                            Err(_) => std::ptr::null(),
                        },
                        self.debug_output,
                    )
                };
                info!(version = %backend.version_string(), "compile context ready");
                self.backend = Some(ThreadBound::bound_here(backend));
            }
        }
        Ok(())
    }
}

impl CompileContext for SharedCompileContext {
    type Backend = GlBackend;

    fn activate(&mut self) -> Result<&GlBackend> {
        let ready = self
            .backend
            .as_ref()
            .is_some_and(|backend| backend.is_bound_here());
        if !ready {
            self.make_current_here()?;
        }
        self.backend
            .as_ref()
            .map(ThreadBound::get)
            .ok_or_else(|| anyhow!("compile context has no backend"))
    }
}
