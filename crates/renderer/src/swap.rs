use std::mem;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::backend::ShaderBackend;
use crate::merge::merge;
use crate::resolve::EngineSlots;
use crate::types::Uniform;

/// The active parameter list, shared between the render loop (which edits
/// and binds it) and the reload thread (which merges against it).
pub type SharedParameters = Arc<Mutex<Vec<Uniform>>>;

/// A compiled program together with its reflected parameters.
///
/// The program handle has a single owner at all times; dropping a generation
/// without handing its program to [`ShaderBackend::delete_program`] leaks it.
#[derive(Debug)]
pub struct ProgramGeneration<P> {
    program: P,
    parameters: Vec<Uniform>,
    engine_slots: EngineSlots,
}

impl<P: Copy> ProgramGeneration<P> {
    pub fn new(program: P, parameters: Vec<Uniform>, engine_slots: EngineSlots) -> Self {
        Self {
            program,
            parameters,
            engine_slots,
        }
    }

    pub fn program(&self) -> P {
        self.program
    }

    pub fn parameters(&self) -> &[Uniform] {
        &self.parameters
    }

    pub fn engine_slots(&self) -> &EngineSlots {
        &self.engine_slots
    }

    pub fn into_parts(self) -> (P, Vec<Uniform>, EngineSlots) {
        (self.program, self.parameters, self.engine_slots)
    }
}

/// Creates the single-slot handoff between the reload thread and the render loop.
pub fn staging_slot<P>() -> (Stager<P>, SwapGate<P>) {
    let (sender, receiver) = bounded(1);
    let stager = Stager {
        sender,
        evict: receiver.clone(),
    };
    (stager, SwapGate { receiver })
}

/// Result of handing a generation to the [`Stager`].
#[derive(Debug)]
pub enum Staging<P> {
    /// The generation now waits for the render loop. `evicted` holds an
    /// earlier generation that was never adopted; its program must be
    /// destroyed by the caller.
    Staged {
        evicted: Option<ProgramGeneration<P>>,
    },
    /// The slot could not take the generation; ownership returns to the caller.
    Rejected(ProgramGeneration<P>),
}

/// Producer side of the staging slot, owned by the reload thread.
pub struct Stager<P> {
    sender: Sender<ProgramGeneration<P>>,
    evict: Receiver<ProgramGeneration<P>>,
}

impl<P> Stager<P> {
    pub fn stage(&self, generation: ProgramGeneration<P>) -> Staging<P> {
        let evicted = self.evict.try_recv().ok();
        match self.sender.try_send(generation) {
            Ok(()) => Staging::Staged { evicted },
            Err(TrySendError::Full(generation) | TrySendError::Disconnected(generation)) => {
                Staging::Rejected(generation)
            }
        }
    }
}

/// Consumer side of the staging slot, checked once per frame on the render thread.
pub struct SwapGate<P> {
    receiver: Receiver<ProgramGeneration<P>>,
}

impl<P: Copy + Eq + std::fmt::Debug> SwapGate<P> {
    pub fn is_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Adopts a staged generation if one is waiting.
    ///
    /// Must run between frames with the primary context current. Returns
    /// whether the active program changed.
    pub fn maybe_swap<B>(&self, backend: &B, active: &mut ActiveProgram<P>) -> bool
    where
        B: ShaderBackend<Program = P>,
    {
        match self.receiver.try_recv() {
            Ok(staged) => {
                active.adopt(backend, staged);
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }
}

/// The generation the render loop currently draws with.
#[derive(Debug)]
pub struct ActiveProgram<P> {
    program: P,
    engine_slots: EngineSlots,
    parameters: SharedParameters,
    generation: u64,
}

impl<P: Copy + Eq + std::fmt::Debug> ActiveProgram<P> {
    pub fn new(initial: ProgramGeneration<P>) -> Self {
        let (program, parameters, engine_slots) = initial.into_parts();
        Self {
            program,
            engine_slots,
            parameters: Arc::new(Mutex::new(parameters)),
            generation: 0,
        }
    }

    pub fn program(&self) -> P {
        self.program
    }

    pub fn engine_slots(&self) -> &EngineSlots {
        &self.engine_slots
    }

    /// Number of reloads adopted since startup.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn parameters(&self) -> MutexGuard<'_, Vec<Uniform>> {
        self.parameters.lock()
    }

    pub fn shared_parameters(&self) -> SharedParameters {
        Arc::clone(&self.parameters)
    }

    fn adopt<B>(&mut self, backend: &B, staged: ProgramGeneration<P>)
    where
        B: ShaderBackend<Program = P>,
    {
        let (program, fresh, engine_slots) = staged.into_parts();
        {
            // Values may have been edited while the reload was in flight.
            let mut parameters = self.parameters.lock();
            let merged = merge(&parameters, fresh);
            *parameters = merged;
        }
        backend.use_program(None);
        let previous = mem::replace(&mut self.program, program);
        backend.delete_program(previous);
        self.engine_slots = engine_slots;
        self.generation += 1;
        info!(
            generation = self.generation,
            program = ?program,
            retired = ?previous,
            "adopted reloaded scene program"
        );
    }

    /// Destroys the active program. Used on shutdown.
    pub fn release<B>(self, backend: &B)
    where
        B: ShaderBackend<Program = P>,
    {
        backend.use_program(None);
        backend.delete_program(self.program);
        debug!(program = ?self.program, "released active scene program");
    }
}
