use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::MutexGuard;

use crate::backend::{CompileContext, ShaderBackend};
use crate::reload::{ReloadReport, Reloader};
use crate::resolve::EngineSlots;
use crate::source::ProgramSources;
use crate::swap::{staging_slot, ActiveProgram, ProgramGeneration, SwapGate};
use crate::types::Uniform;
use crate::watcher::FileWatcher;

/// A scene program that rebuilds itself whenever the scene file changes.
///
/// This is the surface the render loop talks to: call
/// [`HotProgram::maybe_swap_program`] once per frame before drawing, then
/// read [`HotProgram::program`] and bind [`HotProgram::parameters`].
pub struct HotProgram<P> {
    active: ActiveProgram<P>,
    gate: SwapGate<P>,
    watcher: FileWatcher,
    reports: Receiver<ReloadReport>,
    last_report: Option<ReloadReport>,
}

impl<P: Copy + Eq + std::fmt::Debug + Send + 'static> HotProgram<P> {
    /// Wires the watcher, reloader and swap gate around an initial program.
    ///
    /// Watching does not begin until [`HotProgram::start_watching`].
    pub fn new<C>(
        initial: ProgramGeneration<P>,
        context: C,
        sources: ProgramSources,
        poll_interval: Duration,
    ) -> Self
    where
        C: CompileContext,
        C::Backend: ShaderBackend<Program = P>,
    {
        let active = ActiveProgram::new(initial);
        let (stager, gate) = staging_slot();
        let (report_tx, reports) = unbounded();
        let scene = sources.scene.clone();
        let mut reloader =
            Reloader::new(context, sources, stager, active.shared_parameters()).with_reports(report_tx);
        let watcher = FileWatcher::new(scene, poll_interval, move || {
            reloader.reload();
        });
        Self {
            active,
            gate,
            watcher,
            reports,
            last_report: None,
        }
    }

    pub fn start_watching(&mut self) -> bool {
        self.watcher.start()
    }

    pub fn stop_watching(&mut self) {
        self.watcher.stop();
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Adopts a staged program, if any.
    ///
    /// A panic raised by a reload on the watcher thread resumes here.
    pub fn maybe_swap_program<B>(&mut self, backend: &B) -> bool
    where
        B: ShaderBackend<Program = P>,
    {
        self.watcher.propagate_panic();
        self.gate.maybe_swap(backend, &mut self.active)
    }

    pub fn program(&self) -> P {
        self.active.program()
    }

    pub fn engine_slots(&self) -> &EngineSlots {
        self.active.engine_slots()
    }

    pub fn generation(&self) -> u64 {
        self.active.generation()
    }

    pub fn parameters(&self) -> MutexGuard<'_, Vec<Uniform>> {
        self.active.parameters()
    }

    /// Drains finished reload reports and returns the most recent one seen.
    pub fn poll_reports(&mut self) -> Option<&ReloadReport> {
        while let Ok(report) = self.reports.try_recv() {
            self.last_report = Some(report);
        }
        self.last_report.as_ref()
    }

    /// Stops watching and destroys the active program.
    pub fn release<B>(mut self, backend: &B)
    where
        B: ShaderBackend<Program = P>,
    {
        self.watcher.stop();
        if self.gate.maybe_swap(backend, &mut self.active) {
            tracing::debug!("adopted a late staged program during shutdown");
        }
        self.active.release(backend);
    }
}
