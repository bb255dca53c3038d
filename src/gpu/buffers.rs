//! # Simulation Buffers
//!
//! Allocation and ownership of every GPU-resident buffer: the global
//! parameter block, the event buffers fed by the submission queues, the
//! lattice state generations, and the dedicated buffers selected by
//! registry resolution.
//!
//! ## Binding contract
//! Stages bind the shared buffers at fixed, documented slots in
//! `@group(0)`:
//!
//! | binding | key                 | contents                                   |
//! |---------|---------------------|--------------------------------------------|
//! | 0       | `sim_params`        | [`GlobalParams`] uniform                   |
//! | 1       | `field_properties`  | one record per configured field            |
//! | 2       | `pokes`             | poke events, capacity 16                   |
//! | 3       | `barriers`          | barrier events, capacity 16                |
//! | 4       | `fermion_modes`     | fermion-mode events, capacity 1024         |
//! | 5       | `global_intrinsics` | 128 signed words of cross-stage scratch    |
//! | 6..=23  | lattice generations | see [`LATTICE_KEYS`] for the slot order    |
//!
//! Dedicated buffers bind in `@group(1)` at the slot the registry
//! assigned to their name; the slot does not depend on which stages are
//! active. Per-stage overrides occupy `@group(2)` and the composition
//! input image `@group(3)` (render stages only).
//!
//! ## Sizing
//! Field-indexed buffers hold `cell_count × field_count` elements; every
//! other lattice buffer holds `cell_count` elements. Event buffer
//! capacities are fixed. All sizing formulas are pure functions of the
//! configuration so they are testable without a device.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::gpu::context::GpuContext;
use crate::sim::config::SimulationConfig;
use crate::sim::error::GpuError;
use crate::sim::events::{
    BarrierInformation, FermionFieldState, FermionModeData, GaugeVectorPack, PokeInformation,
    FieldsMask, GLOBAL_INTRINSICS_LEN, MAX_BARRIERS, MAX_FERMION_MODES, MAX_POKES,
};
use crate::sim::registry::ResolvedDedicatedBuffer;

/// `@group(0)` binding of the [`GlobalParams`] uniform.
pub const BIND_SIM_PARAMS: u32 = 0;

/// `@group(0)` binding of the field-properties buffer.
pub const BIND_FIELD_PROPERTIES: u32 = 1;

/// `@group(0)` binding of the poke event buffer.
pub const BIND_POKES: u32 = 2;

/// `@group(0)` binding of the barrier event buffer.
pub const BIND_BARRIERS: u32 = 3;

/// `@group(0)` binding of the fermion-mode event buffer.
pub const BIND_FERMION_MODES: u32 = 4;

/// `@group(0)` binding of the global intrinsics buffer.
pub const BIND_GLOBAL_INTRINSICS: u32 = 5;

/// First `@group(0)` binding of the lattice generations; the remaining
/// seventeen follow in [`LATTICE_KEYS`] order.
pub const BIND_LATTICE_BASE: u32 = 6;

/// Documented keys of the eighteen lattice generation buffers, in
/// `@group(0)` binding order starting at [`BIND_LATTICE_BASE`].
pub const LATTICE_KEYS: [&str; 18] = [
    "prev_fermions",
    "crnt_fermions",
    "next_fermions",
    "rend_fermions",
    "prev_gauge",
    "crnt_gauge",
    "next_gauge",
    "rend_gauge",
    "prev_electric",
    "crnt_electric",
    "next_electric",
    "rend_electric",
    "prev_magnetic",
    "crnt_magnetic",
    "next_magnetic",
    "rend_magnetic",
    "temp_fermions",
    "temp_gauge",
];

/// Number of storage bindings in `@group(0)`: everything except the
/// parameter uniform.
pub const GROUP0_STORAGE_BUFFERS: u32 = 5 + LATTICE_KEYS.len() as u32;

/// Storage bindings a stage needs in total, given the number of resolved
/// dedicated buffers. Used to size the device limit request.

#[inline]
pub fn required_storage_buffers(dedicated_count: usize) -> u32 {
    GROUP0_STORAGE_BUFFERS + dedicated_count as u32
}

/// Elements in each field-indexed lattice buffer.

#[inline]
pub fn fermion_lattice_elements(config: &SimulationConfig) -> u64 {
    config.cell_count() * u64::from(config.field_count())
}

/// Elements in each per-cell lattice buffer (gauge potentials and the
/// electric/magnetic strength lattices).

#[inline]
pub fn gauge_lattice_elements(config: &SimulationConfig) -> u64 {
    config.cell_count()
}

/// Global parameter block bound to every stage at
/// `@group(0) @binding(0)`.
///
/// The depth field carries the *effective* depth (`max(depth, 1)`), so
/// kernels always see non-zero extents; two-dimensional runs appear as a
/// single slice. 48 bytes, std140-compatible.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalParams {

    /// Lattice extent along x.
    pub width: u32,

    /// Lattice extent along y.
    pub height: u32,

    /// Effective lattice extent along z.
    pub depth: u32,

    /// Number of configured fermion fields.
    pub field_count: u32,

    /// Simulation time step.
    pub temporal_unit: f32,

    /// Lattice spacing.
    pub spatial_unit: f32,

    /// Non-abelian self-interaction strength.
    pub self_interaction: f32,

    /// Upper bound on local fermion density.
    pub density_limit: f32,

    /// Upper bound on gauge field norms.
    pub norm_limit: f32,

    /// Composition brightness multiplier.
    pub brightness: f32,

    /// Active fields mask bits.
    pub field_mask: u32,

    /// Reserved.
    pub _pad: u32,
}

impl GlobalParams {

    /// Builds the parameter block for a configuration and mask.

    pub fn new(config: &SimulationConfig, mask: FieldsMask) -> Self {
        GlobalParams {
            width: config.width,
            height: config.height,
            depth: config.effective_depth(),
            field_count: config.field_count(),
            temporal_unit: config.temporal_unit,
            spatial_unit: config.spatial_unit,
            self_interaction: config.self_interaction,
            density_limit: config.density_limit,
            norm_limit: config.norm_limit,
            brightness: config.brightness,
            field_mask: mask.bits(),
            _pad: 0,
        }
    }
}

/// One allocated dedicated buffer with its registry slot.

#[derive(Debug)]
pub struct DedicatedBuffer {

    /// Buffer name from the winning declaration.
    pub name: &'static str,

    /// `@group(1)` binding slot.
    pub slot: u32,

    /// The allocated storage buffer.
    pub buffer: wgpu::Buffer,
}

/// The eighteen lattice state generations.
///
/// Field names follow the documented keys; [`ordered`](Self::ordered)
/// yields them in `@group(0)` binding order.

#[derive(Debug)]
pub struct LatticeBuffers {

    /// Fermion state, previous generation.
    pub prev_fermions: wgpu::Buffer,

    /// Fermion state, current generation.
    pub crnt_fermions: wgpu::Buffer,

    /// Fermion state, next generation.
    pub next_fermions: wgpu::Buffer,

    /// Fermion state snapshot read by composition.
    pub rend_fermions: wgpu::Buffer,

    /// Gauge potentials, previous generation.
    pub prev_gauge: wgpu::Buffer,

    /// Gauge potentials, current generation.
    pub crnt_gauge: wgpu::Buffer,

    /// Gauge potentials, next generation.
    pub next_gauge: wgpu::Buffer,

    /// Gauge potentials snapshot read by composition.
    pub rend_gauge: wgpu::Buffer,

    /// Electric strengths, previous generation.
    pub prev_electric: wgpu::Buffer,

    /// Electric strengths, current generation.
    pub crnt_electric: wgpu::Buffer,

    /// Electric strengths, next generation.
    pub next_electric: wgpu::Buffer,

    /// Electric strengths snapshot read by composition.
    pub rend_electric: wgpu::Buffer,

    /// Magnetic strengths, previous generation.
    pub prev_magnetic: wgpu::Buffer,

    /// Magnetic strengths, current generation.
    pub crnt_magnetic: wgpu::Buffer,

    /// Magnetic strengths, next generation.
    pub next_magnetic: wgpu::Buffer,

    /// Magnetic strengths snapshot read by composition.
    pub rend_magnetic: wgpu::Buffer,

    /// Fermion scratch generation used inside multi-kernel stages.
    pub temp_fermions: wgpu::Buffer,

    /// Gauge scratch generation used inside multi-kernel stages.
    pub temp_gauge: wgpu::Buffer,
}

impl LatticeBuffers {

    /// The generations in `@group(0)` binding order, matching
    /// [`LATTICE_KEYS`].

    pub fn ordered(&self) -> [&wgpu::Buffer; 18] {
        [
            &self.prev_fermions,
            &self.crnt_fermions,
            &self.next_fermions,
            &self.rend_fermions,
            &self.prev_gauge,
            &self.crnt_gauge,
            &self.next_gauge,
            &self.rend_gauge,
            &self.prev_electric,
            &self.crnt_electric,
            &self.next_electric,
            &self.rend_electric,
            &self.prev_magnetic,
            &self.crnt_magnetic,
            &self.next_magnetic,
            &self.rend_magnetic,
            &self.temp_fermions,
            &self.temp_gauge,
        ]
    }
}

/// Owning handle over every GPU-resident simulation buffer.
///
/// ## Role
/// Allocated once at initialize time from a validated configuration and a
/// resolved dedicated-buffer plan. Dropping the handle releases every
/// buffer exactly once; the orchestrator holds it inside an `Option` so
/// release is idempotent by construction.

#[derive(Debug)]
pub struct SimulationBuffers {

    /// Global parameter uniform.
    pub params: wgpu::Buffer,

    /// Per-field property records.
    pub field_properties: wgpu::Buffer,

    /// Poke event buffer.
    pub pokes: wgpu::Buffer,

    /// Barrier event buffer.
    pub barriers: wgpu::Buffer,

    /// Fermion-mode event buffer.
    pub fermion_modes: wgpu::Buffer,

    /// Cross-stage integer scratch.
    pub global_intrinsics: wgpu::Buffer,

    /// The lattice state generations.
    pub lattice: LatticeBuffers,

    /// Dedicated buffers in `@group(1)` slot order.
    pub dedicated: Vec<DedicatedBuffer>,
}

impl SimulationBuffers {

    /// Allocates every simulation buffer and uploads the initial
    /// parameter block and field properties.
    ///
    /// The caller validates `config` beforehand; `dedicated` is the plan
    /// produced by registry resolution. Lattice and event buffers start
    /// zeroed.
    ///
    /// ## Errors
    /// [`GpuError::LimitExceeded`] when a computed buffer size exceeds
    /// the device's storage-binding limit.

    pub fn allocate(
        context: &GpuContext,
        config: &SimulationConfig,
        mask: FieldsMask,
        dedicated: &[ResolvedDedicatedBuffer],
    ) -> Result<Self, GpuError> {
        use wgpu::util::DeviceExt;

        let device = &context.device;

        let fermion_bytes = fermion_lattice_elements(config) * size_of::<FermionFieldState>() as u64;
        let gauge_bytes = gauge_lattice_elements(config) * size_of::<GaugeVectorPack>() as u64;

        let max_binding = u64::from(device.limits().max_storage_buffer_binding_size);
        let largest = fermion_bytes.max(gauge_bytes);
        if largest > max_binding {
            return Err(GpuError::LimitExceeded {
                limit: "max_storage_buffer_binding_size",
                required: largest,
                available: max_binding,
            });
        }

        let storage = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            })
        };
        let event_storage = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fieldsim_params"),
            contents: bytemuck::bytes_of(&GlobalParams::new(config, mask)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let field_properties = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fieldsim_field_properties"),
            contents: bytemuck::cast_slice(&config.fields),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let pokes = event_storage(
            "fieldsim_pokes",
            (MAX_POKES * size_of::<PokeInformation>()) as u64,
        );
        let barriers = event_storage(
            "fieldsim_barriers",
            (MAX_BARRIERS * size_of::<BarrierInformation>()) as u64,
        );
        let fermion_modes = event_storage(
            "fieldsim_fermion_modes",
            (MAX_FERMION_MODES * size_of::<FermionModeData>()) as u64,
        );
        let global_intrinsics = storage(
            "fieldsim_global_intrinsics",
            (GLOBAL_INTRINSICS_LEN * size_of::<i32>()) as u64,
        );

        let lattice = LatticeBuffers {
            prev_fermions: storage("fieldsim_prev_fermions", fermion_bytes),
            crnt_fermions: storage("fieldsim_crnt_fermions", fermion_bytes),
            next_fermions: storage("fieldsim_next_fermions", fermion_bytes),
            rend_fermions: storage("fieldsim_rend_fermions", fermion_bytes),
            prev_gauge: storage("fieldsim_prev_gauge", gauge_bytes),
            crnt_gauge: storage("fieldsim_crnt_gauge", gauge_bytes),
            next_gauge: storage("fieldsim_next_gauge", gauge_bytes),
            rend_gauge: storage("fieldsim_rend_gauge", gauge_bytes),
            prev_electric: storage("fieldsim_prev_electric", gauge_bytes),
            crnt_electric: storage("fieldsim_crnt_electric", gauge_bytes),
            next_electric: storage("fieldsim_next_electric", gauge_bytes),
            rend_electric: storage("fieldsim_rend_electric", gauge_bytes),
            prev_magnetic: storage("fieldsim_prev_magnetic", gauge_bytes),
            crnt_magnetic: storage("fieldsim_crnt_magnetic", gauge_bytes),
            next_magnetic: storage("fieldsim_next_magnetic", gauge_bytes),
            rend_magnetic: storage("fieldsim_rend_magnetic", gauge_bytes),
            temp_fermions: storage("fieldsim_temp_fermions", fermion_bytes),
            temp_gauge: storage("fieldsim_temp_gauge", gauge_bytes),
        };

        let dedicated = dedicated
            .iter()
            .map(|resolved| {
                let label = format!("fieldsim_dedicated_{}", resolved.name);
                DedicatedBuffer {
                    name: resolved.name,
                    slot: resolved.slot,
                    buffer: storage(&label, resolved.size_bytes()),
                }
            })
            .collect();

        Ok(SimulationBuffers {
            params,
            field_properties,
            pokes,
            barriers,
            fermion_modes,
            global_intrinsics,
            lattice,
            dedicated,
        })
    }

    /// Rewrites the global parameter block.

    pub fn write_params(&self, context: &GpuContext, params: &GlobalParams) {
        context
            .queue
            .write_buffer(&self.params, 0, bytemuck::bytes_of(params));
    }

    /// Uploads a poke window produced by queue application.

    pub fn upload_pokes(&self, context: &GpuContext, window: &[PokeInformation]) {
        context
            .queue
            .write_buffer(&self.pokes, 0, bytemuck::cast_slice(window));
    }

    /// Uploads a barrier window produced by queue application.

    pub fn upload_barriers(&self, context: &GpuContext, window: &[BarrierInformation]) {
        context
            .queue
            .write_buffer(&self.barriers, 0, bytemuck::cast_slice(window));
    }

    /// Uploads a fermion-mode window produced by queue application.

    pub fn upload_fermion_modes(&self, context: &GpuContext, window: &[FermionModeData]) {
        context
            .queue
            .write_buffer(&self.fermion_modes, 0, bytemuck::cast_slice(window));
    }

    /// Bind group entries for `@group(0)` in binding order.

    pub fn group0_entries(&self) -> Vec<wgpu::BindGroupEntry<'_>> {
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: BIND_SIM_PARAMS,
                resource: self.params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BIND_FIELD_PROPERTIES,
                resource: self.field_properties.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BIND_POKES,
                resource: self.pokes.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BIND_BARRIERS,
                resource: self.barriers.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BIND_FERMION_MODES,
                resource: self.fermion_modes.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BIND_GLOBAL_INTRINSICS,
                resource: self.global_intrinsics.as_entire_binding(),
            },
        ];
        for (offset, buffer) in self.lattice.ordered().into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: BIND_LATTICE_BASE + offset as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        entries
    }

    /// Bind group entries for `@group(1)`, one per dedicated buffer at
    /// its registry slot.

    pub fn dedicated_entries(&self) -> Vec<wgpu::BindGroupEntry<'_>> {
        self.dedicated
            .iter()
            .map(|d| wgpu::BindGroupEntry {
                binding: d.slot,
                resource: d.buffer.as_entire_binding(),
            })
            .collect()
    }
}
