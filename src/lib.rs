//! # fieldsim
//!
//! GPU lattice field simulation orchestrator built on `wgpu`.
//!
//! A simulation is a fixed-size lattice of fermion and gauge field
//! state evolved by caller-supplied WGSL compute stages and rendered by
//! a chain of composition stages into an output texture. The crate
//! owns the full lifecycle: device acquisition, buffer sizing and
//! allocation, stage reflection, frame planning, event submission,
//! readback, and optional video encoding.
//!
//! ## Design Goals
//! - One validated initialization; no partially usable state
//! - Upload-and-encode ticks with no GPU object creation on the hot path
//! - Fixed, documented binding contract between host and shaders
//! - Bounded, double-buffered event submission
//!
//! ## Quick start
//! ```ignore
//! use fieldsim::prelude::*;
//!
//! let registry = DedicatedBufferRegistry::builtin();
//! let stages = vec![
//!     StageEntry::new(StageProgram::compute("evolution", EVOLUTION_WGSL)),
//!     StageEntry::new(StageProgram::render("display", DISPLAY_WGSL)),
//! ];
//! let mut sim = Orchestrator::initialize(
//!     SimulationConfig::default(),
//!     stages,
//!     2,
//!     OutputTarget::default(),
//!     &registry,
//!     None,
//! )?;
//! sim.step()?;
//! sim.release();
//! # Ok::<(), fieldsim::SimError>(())
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod gpu;
pub mod orchestrator;
pub mod sim;
pub mod sink;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Lifecycle

pub use orchestrator::Orchestrator;

// Configuration

pub use sim::config::{FieldProperties, OutputTarget, SimulationConfig, MAX_FIELDS};

// Events and field selection

pub use sim::events::{
    BarrierInformation,
    FermionFieldState,
    FermionModeData,
    FieldsMask,
    GaugeVectorPack,
    PokeInformation,
    MAX_BARRIERS,
    MAX_FERMION_MODES,
    MAX_POKES,
};

// Stage programs

pub use sim::stage::{
    PropertyOverride,
    PropertyValue,
    StageEntry,
    StageInterface,
    StageProgram,
};

// Dedicated buffers

pub use sim::registry::{
    DedicatedBufferDeclaration,
    DedicatedBufferRegistry,
    ElementCountFn,
    ResolvedDedicatedBuffer,
};

// Submission queues

pub use sim::queue::SubmissionQueue;

// Errors

pub use sim::error::{ConfigError, GpuError, SimError, SimResult, SinkError};

// Frame sinks

pub use sink::{FfmpegFrameSink, FrameSink, RecordingSettings, SinkWorker};

// GPU handles for hosts that present or extend the simulation

pub use gpu::buffers::SimulationBuffers;
pub use gpu::context::GpuContext;
pub use gpu::pipeline::OUTPUT_FORMAT;

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used simulation types.
///
/// Import with:
/// ```rust
/// use fieldsim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BarrierInformation,
        DedicatedBufferRegistry,
        FermionModeData,
        FfmpegFrameSink,
        FieldProperties,
        FieldsMask,
        FrameSink,
        Orchestrator,
        OutputTarget,
        PokeInformation,
        PropertyValue,
        RecordingSettings,
        SimError,
        SimulationConfig,
        StageEntry,
        StageProgram,
    };
}
