//! Hot-reloading compute programs for the Helios raymarcher.
//!
//! The crate keeps a scene program alive while its source changes on disk:
//!
//! ```text
//!   FileWatcher ──(mtime advanced)──▶ Reloader::reload   [watcher thread, secondary context]
//!                                        │ aggregate → compile → reflect → merge → resolve
//!                                        ▼
//!                                     Stager ──▶ SwapGate::maybe_swap      [render thread]
//!                                                   └─▶ ActiveProgram (program + parameters)
//! ```
//!
//! GPU access goes through [`ShaderBackend`] and [`CompileContext`] so the
//! pipeline can be exercised without a driver; [`gl::GlBackend`] is the
//! OpenGL implementation used by the viewer.

pub mod backend;
pub mod context;
pub mod gl;
pub mod hot;
pub mod merge;
pub mod reflect;
pub mod reload;
pub mod resolve;
pub mod source;
pub mod swap;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use backend::{CompileContext, CompileError, LiveUniform, ShaderBackend};
pub use context::ThreadBound;
pub use hot::HotProgram;
pub use merge::merge;
pub use reflect::{is_reserved, reflect, reflect_uniforms, RESERVED_UNIFORMS};
pub use reload::{build_generation, build_initial, ReloadOutcome, ReloadReport, Reloader};
pub use resolve::{bind_parameters, resolve, resolve_engine_slots, EngineSlots};
pub use source::{aggregate_texts, read_source, ProgramSources};
pub use swap::{staging_slot, ActiveProgram, ProgramGeneration, SharedParameters, Stager, Staging, SwapGate};
pub use types::{BindingSlot, Uniform, UniformType, UniformValue, ValueKind};
pub use watcher::FileWatcher;
