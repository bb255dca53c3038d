//! # Orchestrator
//!
//! Top-level lifecycle of a simulation: initialize, tick, release.
//!
//! ## Purpose
//! Owns every moving part in one place. Initialization validates the
//! configuration and stage programs, acquires the device, allocates
//! buffers, resolves dedicated buffers, builds the frame plan, realizes
//! pipelines and, when recording, starts the capture ring and sink
//! worker. A failed initialization leaves nothing behind.
//!
//! ## Tick shape
//! [`Orchestrator::step`] is upload-and-encode only: deliver finished
//! captures, apply the three event windows, re-encode the prebuilt
//! plan, submit, request readback maps. No GPU object is created on
//! the hot path and nothing blocks.
//!
//! ## Teardown
//! [`Orchestrator::release`] flushes in-flight captures into the sink,
//! closes the sink worker, then drops all GPU state. It may be called
//! any number of times; `Drop` delegates to it. Stepping a released
//! orchestrator reports [`GpuError::Released`].

use tracing::{info, warn};

use crate::gpu::buffers::{required_storage_buffers, GlobalParams, SimulationBuffers};
use crate::gpu::capture::CaptureRing;
use crate::gpu::context::GpuContext;
use crate::gpu::pipeline::FramePipelines;
use crate::gpu::plan::FramePlan;
use crate::sim::config::{OutputTarget, SimulationConfig};
use crate::sim::error::{ConfigError, GpuError, SimError};
use crate::sim::events::{
    BarrierInformation, FermionModeData, FieldsMask, PokeInformation, MAX_BARRIERS,
    MAX_FERMION_MODES, MAX_POKES,
};
use crate::sim::queue::SubmissionQueue;
use crate::sim::registry::DedicatedBufferRegistry;
use crate::sim::stage::{StageEntry, StageInterface};
use crate::sink::{FrameSink, SinkWorker};

/// Everything a live simulation owns. Bundled so release is a single
/// [`Option::take`].
struct SimulationState {
    context: GpuContext,
    config: SimulationConfig,
    mask: FieldsMask,
    buffers: SimulationBuffers,
    plan: FramePlan,
    pipelines: FramePipelines,
    pokes: SubmissionQueue<PokeInformation>,
    barriers: SubmissionQueue<BarrierInformation>,
    fermion_modes: SubmissionQueue<FermionModeData>,
    capture: Option<CaptureRing>,
    sink: Option<SinkWorker>,
    ticks: u64,
}

/// Drives a lattice field simulation on the GPU.
///
/// ## Role
/// The only public entry point of the crate: hosts construct one with
/// [`Orchestrator::initialize`], feed events through the submit
/// methods, and advance time with [`Orchestrator::step`].
pub struct Orchestrator {
    state: Option<SimulationState>,
}

impl Orchestrator {

    /// Builds a ready-to-step simulation.
    ///
    /// `stages` is one ordered list; compute-tagged entries form the
    /// dispatch sequence and render-tagged entries the composition
    /// chain, each in declared order. `pass_count` repetitions of the
    /// compute sequence run per tick. When `sink` is present every
    /// finished frame is read back and committed to it.
    ///
    /// ## Errors
    /// * [`ConfigError`](crate::sim::error::ConfigError) — invalid
    ///   configuration, output target, stage program, or conflicting
    ///   dedicated-buffer declarations.
    /// * [`GpuError`] — no adapter, refused device, or a buffer
    ///   exceeding device limits.
    /// * [`SinkError`](crate::sim::error::SinkError) — the sink worker
    ///   could not be started.

    pub fn initialize(
        config: SimulationConfig,
        stages: Vec<StageEntry>,
        pass_count: u32,
        target: OutputTarget,
        registry: &DedicatedBufferRegistry,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        target.validate()?;
        if pass_count == 0 {
            return Err(ConfigError::NonPositive {
                parameter: "pass count",
                value: 0.0,
            }
            .into());
        }

        let mut compute: Vec<StageEntry> = Vec::new();
        let mut render: Vec<StageEntry> = Vec::new();
        for entry in stages {
            if entry.program.is_compute() {
                compute.push(entry);
            } else {
                render.push(entry);
            }
        }

        let mut interfaces: Vec<StageInterface> = Vec::with_capacity(compute.len());
        for entry in &compute {
            interfaces.push(entry.program.validate()?);
        }
        for entry in &render {
            entry.program.validate()?;
        }

        let active = compute
            .iter()
            .chain(render.iter())
            .map(|entry| entry.program.name());
        let dedicated = registry.resolve(&config, active)?;

        let context = GpuContext::new(required_storage_buffers(dedicated.len()))?;

        let mask = FieldsMask::ALL;
        let buffers = SimulationBuffers::allocate(&context, &config, mask, &dedicated)?;

        let kernels: Vec<u32> = interfaces.iter().map(|i| i.kernel_count).collect();
        let plan = FramePlan::build(&config, &kernels, render.len(), pass_count, sink.is_some());
        let pipelines =
            FramePipelines::build(&context, &buffers, &compute, &interfaces, &render, &target);

        let (capture, sink) = match sink {
            Some(sink) => {
                let worker = SinkWorker::spawn(sink)?;
                (Some(CaptureRing::new(&context, &target)), Some(worker))
            }
            None => (None, None),
        };

        info!(
            width = config.width,
            height = config.height,
            depth = config.depth,
            fields = config.field_count(),
            compute_stages = compute.len(),
            render_stages = render.len(),
            passes = pass_count,
            recording = sink.is_some(),
            "simulation initialized"
        );

        Ok(Orchestrator {
            state: Some(SimulationState {
                context,
                config,
                mask,
                buffers,
                plan,
                pipelines,
                pokes: SubmissionQueue::new(MAX_POKES, "pokes"),
                barriers: SubmissionQueue::new(MAX_BARRIERS, "barriers"),
                fermion_modes: SubmissionQueue::new(MAX_FERMION_MODES, "fermion modes"),
                capture,
                sink,
                ticks: 0,
            }),
        })
    }

    /// Advances the simulation by one tick.
    ///
    /// Applies the pending event windows, encodes the frame plan and
    /// submits it. Capture and sink hiccups cost dropped frames, never
    /// errors.
    ///
    /// ## Errors
    /// [`GpuError::Released`] after [`Orchestrator::release`].

    pub fn step(&mut self) -> Result<(), GpuError> {
        let state = self.state.as_mut().ok_or(GpuError::Released)?;

        if let (Some(ring), Some(sink)) = (state.capture.as_mut(), state.sink.as_mut()) {
            ring.drain(&state.context, |pixels| sink.submit(pixels));
        }

        state
            .pokes
            .apply_with(|window| state.buffers.upload_pokes(&state.context, window));
        state
            .barriers
            .apply_with(|window| state.buffers.upload_barriers(&state.context, window));
        state
            .fermion_modes
            .apply_with(|window| state.buffers.upload_fermion_modes(&state.context, window));

        let mut encoder = state
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("fieldsim_tick"),
            });
        state
            .pipelines
            .encode(&mut encoder, &state.plan, state.capture.as_mut());
        state.context.queue.submit(Some(encoder.finish()));

        if let Some(ring) = state.capture.as_mut() {
            ring.request_maps();
        }

        state.ticks += 1;
        Ok(())
    }

    /// Queues a poke for the next tick. Silently dropped when the
    /// window is full or the simulation is released.
    pub fn submit_poke(&mut self, poke: PokeInformation) {
        if let Some(state) = self.state.as_mut() {
            state.pokes.submit(poke);
        }
    }

    /// Queues a barrier for the next tick. Silently dropped when the
    /// window is full or the simulation is released.
    pub fn submit_barrier(&mut self, barrier: BarrierInformation) {
        if let Some(state) = self.state.as_mut() {
            state.barriers.submit(barrier);
        }
    }

    /// Queues a fermion mode for the next tick. Silently dropped when
    /// the window is full or the simulation is released.
    pub fn submit_fermion_mode(&mut self, mode: FermionModeData) {
        if let Some(state) = self.state.as_mut() {
            state.fermion_modes.submit(mode);
        }
    }

    /// Selects which fields the kernels evolve and render, effective
    /// from the next tick. No-op after release.
    pub fn set_field_mask(&mut self, mask: FieldsMask) {
        if let Some(state) = self.state.as_mut() {
            state.mask = mask;
            let params = GlobalParams::new(&state.config, mask);
            state.buffers.write_params(&state.context, &params);
        }
    }

    /// The currently selected field mask, if the simulation is live.
    pub fn field_mask(&self) -> Option<FieldsMask> {
        self.state.as_ref().map(|state| state.mask)
    }

    /// Read-only handle to the allocated buffers, for hosts that bind
    /// additional work against them. `None` after release.
    pub fn buffers(&self) -> Option<&SimulationBuffers> {
        self.state.as_ref().map(|state| &state.buffers)
    }

    /// The GPU context, for hosts that present or post-process the
    /// output. `None` after release.
    pub fn context(&self) -> Option<&GpuContext> {
        self.state.as_ref().map(|state| &state.context)
    }

    /// The texture holding the most recent finished frame. `None`
    /// after release.
    pub fn output(&self) -> Option<&wgpu::Texture> {
        self.state.as_ref().map(|state| state.pipelines.output())
    }

    /// Ticks stepped since initialization, if the simulation is live.
    pub fn ticks(&self) -> Option<u64> {
        self.state.as_ref().map(|state| state.ticks)
    }

    /// Flushes in-flight captures, shuts the sink down, and drops all
    /// GPU state. Safe to call repeatedly.
    pub fn release(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        if let (Some(ring), Some(sink)) = (state.capture.as_mut(), state.sink.as_mut()) {
            if let Err(e) = ring.finish(&state.context, |pixels| sink.submit(pixels)) {
                warn!(error = %e, "abandoning in-flight captures");
            }
        }
        if let Some(mut sink) = state.sink.take() {
            sink.close();
        }
        info!(ticks = state.ticks, "simulation released");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.release();
    }
}
