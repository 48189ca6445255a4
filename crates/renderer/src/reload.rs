use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::backend::{CompileContext, CompileError, ShaderBackend};
use crate::merge::merge;
use crate::reflect::reflect;
use crate::resolve::{resolve, resolve_engine_slots};
use crate::source::ProgramSources;
use crate::swap::{ProgramGeneration, SharedParameters, Stager, Staging};
use crate::types::Uniform;

type ProgramOf<C> = <<C as CompileContext>::Backend as ShaderBackend>::Program;

/// What a single reload attempt ended with.
#[derive(Clone, Debug, PartialEq)]
pub enum ReloadOutcome {
    Staged {
        parameters: usize,
        unresolved: usize,
    },
    Failed {
        reason: String,
        log: Option<String>,
    },
}

impl ReloadOutcome {
    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Staged { .. })
    }
}

/// A reload outcome stamped with the wall-clock time it finished.
#[derive(Clone, Debug)]
pub struct ReloadReport {
    pub finished_at: DateTime<Local>,
    pub outcome: ReloadOutcome,
}

/// Compiles `source`, reflects it and carries values over from `previous`.
pub fn build_generation<B: ShaderBackend>(
    backend: &B,
    source: &str,
    previous: &[Uniform],
) -> Result<ProgramGeneration<B::Program>, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::EmptySource);
    }
    let program = backend.compile_compute(source)?;
    let fresh = reflect(backend, program);
    let mut parameters = merge(previous, fresh);
    resolve(backend, program, &mut parameters);
    let engine_slots = resolve_engine_slots(backend, program);
    Ok(ProgramGeneration::new(program, parameters, engine_slots))
}

/// Builds the first program at startup on the primary context.
pub fn build_initial<B: ShaderBackend>(
    backend: &B,
    sources: &ProgramSources,
) -> Result<ProgramGeneration<B::Program>, CompileError> {
    build_generation(backend, &sources.aggregate(), &[])
}

/// Rebuilds the scene program off the render thread and stages the result.
///
/// Failures are logged and reported but never propagate: the render loop
/// keeps the last good program until a later edit compiles.
pub struct Reloader<C: CompileContext> {
    context: C,
    sources: ProgramSources,
    stager: Stager<ProgramOf<C>>,
    parameters: SharedParameters,
    reports: Option<Sender<ReloadReport>>,
}

impl<C: CompileContext> Reloader<C> {
    pub fn new(
        context: C,
        sources: ProgramSources,
        stager: Stager<ProgramOf<C>>,
        parameters: SharedParameters,
    ) -> Self {
        Self {
            context,
            sources,
            stager,
            parameters,
            reports: None,
        }
    }

    /// Publishes every outcome on `reports` in addition to logging it.
    pub fn with_reports(mut self, reports: Sender<ReloadReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn sources(&self) -> &ProgramSources {
        &self.sources
    }

    pub fn reload(&mut self) -> ReloadOutcome {
        info!(scene = %self.sources.scene.display(), "recompiling scene");
        let outcome = self.try_reload();
        match &outcome {
            ReloadOutcome::Staged {
                parameters,
                unresolved,
            } => info!(parameters, unresolved, "scene program staged"),
            ReloadOutcome::Failed { reason, log } => warn!(
                reason = %reason,
                log = log.as_deref().unwrap_or(""),
                "scene reload failed; keeping previous program"
            ),
        }
        if let Some(reports) = &self.reports {
            let _ = reports.send(ReloadReport {
                finished_at: Local::now(),
                outcome: outcome.clone(),
            });
        }
        outcome
    }

    fn try_reload(&mut self) -> ReloadOutcome {
        let backend = match self.context.activate() {
            Ok(backend) => backend,
            Err(err) => {
                return ReloadOutcome::Failed {
                    reason: format!("failed to activate compile context: {err:#}"),
                    log: None,
                }
            }
        };

        let source = self.sources.aggregate();
        let program = match backend.compile_compute(&source) {
            Ok(program) => program,
            Err(err) => {
                return ReloadOutcome::Failed {
                    reason: err.to_string(),
                    log: err.log().map(str::to_owned),
                }
            }
        };

        let fresh = reflect(backend, program);
        let previous = self.parameters.lock().clone();
        let mut parameters = merge(&previous, fresh);
        resolve(backend, program, &mut parameters);
        let engine_slots = resolve_engine_slots(backend, program);

        let count = parameters.len();
        let unresolved = parameters
            .iter()
            .filter(|uniform| !uniform.slot.is_resolved())
            .count();

        match self
            .stager
            .stage(ProgramGeneration::new(program, parameters, engine_slots))
        {
            Staging::Staged { evicted } => {
                if let Some(stale) = evicted {
                    debug!(program = ?stale.program(), "discarding superseded staged program");
                    backend.delete_program(stale.program());
                }
                ReloadOutcome::Staged {
                    parameters: count,
                    unresolved,
                }
            }
            Staging::Rejected(generation) => {
                backend.delete_program(generation.program());
                ReloadOutcome::Failed {
                    reason: "render loop is no longer accepting programs".into(),
                    log: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crossbeam_channel::unbounded;
    use tempfile::TempDir;

    use crate::swap::{staging_slot, ActiveProgram};
    use crate::testing::{ScriptedBackend, ScriptedContext};
    use crate::types::{UniformType, UniformValue};

    const MAIN: &str = "\nvoid main() { float d = map(vec3(0)); }\n";

    fn sources(dir: &TempDir, scene: &str) -> ProgramSources {
        let root = dir.path();
        fs::write(root.join("base.comp"), "#version 430\nuniform float time;\n").unwrap();
        fs::write(root.join("library.comp"), "").unwrap();
        fs::write(root.join("scene.comp"), scene).unwrap();
        fs::write(root.join("main.comp"), MAIN).unwrap();
        ProgramSources {
            base: root.join("base.comp"),
            library: root.join("library.comp"),
            scene: root.join("scene.comp"),
            main: root.join("main.comp"),
        }
    }

    #[test]
    fn initial_build_reflects_and_resolves() {
        let dir = TempDir::new().unwrap();
        let sources = sources(&dir, "uniform float glow;\nfloat map(vec3 p) { return glow * time; }");
        let backend = ScriptedBackend::new();

        let generation = build_initial(&backend, &sources).unwrap();
        assert_eq!(generation.parameters().len(), 1);
        assert_eq!(generation.parameters()[0].name, "glow");
        assert!(generation.parameters()[0].slot.is_resolved());
        assert!(generation.engine_slots().is_live("time"));
    }

    #[test]
    fn empty_source_is_a_compile_failure() {
        let backend = ScriptedBackend::new();
        assert!(matches!(
            build_generation(&backend, "  \n", &[]),
            Err(CompileError::EmptySource)
        ));
    }

    #[test]
    fn failed_reload_stages_nothing_and_reports() {
        let dir = TempDir::new().unwrap();
        let sources = sources(&dir, "float map(vec3 p) { #error }");
        let backend = ScriptedBackend::new();
        let (stager, gate) = staging_slot();
        let (report_tx, report_rx) = unbounded();
        let mut reloader = Reloader::new(
            ScriptedContext {
                backend: backend.clone(),
            },
            sources,
            stager,
            Default::default(),
        )
        .with_reports(report_tx);

        let outcome = reloader.reload();
        assert!(matches!(outcome, ReloadOutcome::Failed { log: Some(_), .. }));
        assert!(!gate.is_pending());
        let report = report_rx.try_recv().unwrap();
        assert_eq!(report.outcome, outcome);
        assert_eq!(backend.log.lock().activations, 1);
    }

    #[test]
    fn link_failure_keeps_the_active_program_and_reports_the_log() {
        let dir = TempDir::new().unwrap();
        let scene = "uniform float glow;\nfloat map(vec3 p) { return glow; }";
        let sources = sources(&dir, scene);
        let backend = ScriptedBackend::new();
        let active = ActiveProgram::new(build_initial(&backend, &sources).unwrap());
        active.parameters()[0].value = UniformValue::Float([0.8, 0.0, 0.0, 0.0]);

        fs::write(&sources.scene, format!("{scene}\n// #link-error\n")).unwrap();
        let (stager, gate) = staging_slot();
        let (report_tx, report_rx) = unbounded();
        let mut reloader = Reloader::new(
            ScriptedContext {
                backend: backend.clone(),
            },
            sources,
            stager,
            active.shared_parameters(),
        )
        .with_reports(report_tx);

        let outcome = reloader.reload();
        match &outcome {
            ReloadOutcome::Failed { log, .. } => {
                assert_eq!(log.as_deref(), Some("error: unresolved symbol"));
            }
            other => panic!("expected a link failure, got {other:?}"),
        }
        assert!(!gate.is_pending());
        assert_eq!(report_rx.try_recv().unwrap().outcome, outcome);
        assert!(backend.deleted().is_empty());
        assert_eq!(backend.live_programs(), 1);
        assert_eq!(
            active.parameters()[0].value,
            UniformValue::Float([0.8, 0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn successful_reload_merges_against_active_parameters() {
        let dir = TempDir::new().unwrap();
        let scene = "uniform float glow;\nfloat map(vec3 p) { return glow; }";
        let sources = sources(&dir, scene);
        let backend = ScriptedBackend::new();

        let mut active = ActiveProgram::new(build_initial(&backend, &sources).unwrap());
        active.parameters()[0].value = UniformValue::Float([0.8, 0.0, 0.0, 0.0]);

        let (stager, gate) = staging_slot();
        let mut reloader = Reloader::new(
            ScriptedContext {
                backend: backend.clone(),
            },
            sources,
            stager,
            active.shared_parameters(),
        );

        let outcome = reloader.reload();
        assert_eq!(
            outcome,
            ReloadOutcome::Staged {
                parameters: 1,
                unresolved: 0
            }
        );
        let before = active.program();
        assert!(gate.maybe_swap(&backend, &mut active));
        assert_ne!(active.program(), before);
        assert_eq!(active.parameters()[0].ty, UniformType::Float);
        assert_eq!(
            active.parameters()[0].value,
            UniformValue::Float([0.8, 0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn second_reload_before_adoption_destroys_the_stale_program() {
        let dir = TempDir::new().unwrap();
        let sources = sources(&dir, "float map(vec3 p) { return 1.0; }");
        let backend = ScriptedBackend::new();
        let (stager, gate) = staging_slot();
        let mut reloader = Reloader::new(
            ScriptedContext {
                backend: backend.clone(),
            },
            sources,
            stager,
            Default::default(),
        );

        assert!(reloader.reload().is_staged());
        assert!(reloader.reload().is_staged());
        assert_eq!(backend.deleted(), vec![1]);
        assert!(gate.is_pending());
    }
}
