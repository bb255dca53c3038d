// Run (needs a GPU adapter):
//   cargo test --test orchestrator_gpu -- --ignored
//
// End-to-end lifecycle against a real device: initialize, poke, step,
// capture, release. The render stage paints the whole frame red, so
// every captured pixel is a checkable constant.

use std::sync::{Arc, Mutex};

use fieldsim::{
    DedicatedBufferRegistry, FieldsMask, FrameSink, GpuError, Orchestrator, OutputTarget,
    PokeInformation, SimError, SimulationConfig, SinkError, StageEntry, StageProgram,
};

/// Two-field 16×16 lattice; small enough for any adapter.
fn test_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.width = 16;
    config.height = 16;
    config.fields.truncate(2);
    config
}

/// Writes a constant amplitude into every live fermion element.
const EVOLVE: &str = r#"
struct Params {
    width: u32,
    height: u32,
    depth: u32,
    field_count: u32,
    temporal_unit: f32,
    spatial_unit: f32,
    self_interaction: f32,
    density_limit: f32,
    norm_limit: f32,
    brightness: f32,
    field_mask: u32,
    pad: u32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(7) var<storage, read_write> crnt_fermions: array<vec2<f32>>;

@compute @workgroup_size(64, 1, 1)
fn pass0(@builtin(global_invocation_id) id: vec3<u32>) {
    let cell = id.x + id.y * params.width;
    if (cell >= params.width * params.height) {
        return;
    }
    let base = cell * params.field_count * 12u;
    crnt_fermions[base] = vec2<f32>(params.temporal_unit, 0.0);
}
"#;

/// Fullscreen triangle, solid red.
const PAINT_RED: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    let y = f32(i32(index & 1u) * 2 - 1);
    return vec4<f32>(x * 3.0, y * 3.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

struct MemorySink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameSink for MemorySink {
    fn commit_frame(&mut self, pixels: &[u8]) -> Result<(), SinkError> {
        self.frames.lock().unwrap().push(pixels.to_vec());
        Ok(())
    }
}

/// Unwraps an initialization result, skipping the test on machines
/// without a GPU adapter.
fn initialize_or_skip(result: Result<Orchestrator, SimError>) -> Option<Orchestrator> {
    match result {
        Ok(orchestrator) => Some(orchestrator),
        Err(SimError::Gpu(GpuError::AdapterUnavailable)) => {
            eprintln!("skipping: no GPU adapter available");
            None
        }
        Err(e) => panic!("initialization failed: {e}"),
    }
}

/// Routes the crate's lifecycle events into the test output. Override
/// the filter with `RUST_LOG` when chasing a device issue.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fieldsim=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[test]
#[ignore = "requires GPU"]
fn recorded_run_captures_solid_red_frames() {
    init_logging();
    let collected = Arc::new(Mutex::new(Vec::new()));
    let stages = vec![
        StageEntry::new(StageProgram::compute("free_field_evolution", EVOLVE)),
        StageEntry::new(StageProgram::render("field_display", PAINT_RED)),
    ];

    // 8×8 output: a 32-byte pixel row against the 256-byte copy
    // alignment, so the readback path must strip padding.
    let Some(mut orchestrator) = initialize_or_skip(Orchestrator::initialize(
        test_config(),
        stages,
        2,
        OutputTarget { width: 8, height: 8 },
        &DedicatedBufferRegistry::builtin(),
        Some(Box::new(MemorySink { frames: collected.clone() })),
    )) else {
        return;
    };

    orchestrator.submit_poke(PokeInformation {
        strength: 5,
        radius: 2,
        center: [8, 8, 0],
        direction: [0, 1, 0],
        mask: 0b11,
    });
    orchestrator.set_field_mask(FieldsMask::NONE.with_fermion(0).with_u1());

    for _ in 0..6 {
        orchestrator.step().unwrap();
    }
    assert_eq!(orchestrator.ticks(), Some(6));
    assert_eq!(
        orchestrator.field_mask(),
        Some(FieldsMask::NONE.with_fermion(0).with_u1())
    );

    let output = orchestrator.output().unwrap();
    assert_eq!(output.width(), 8);
    assert_eq!(output.height(), 8);

    orchestrator.release();

    let frames = collected.lock().unwrap();
    assert!(!frames.is_empty(), "no frames were captured");
    for frame in frames.iter() {
        assert_eq!(frame.len(), 8 * 8 * 4);
        for pixel in frame.chunks_exact(4) {
            assert_eq!(pixel, [255, 0, 0, 255]);
        }
    }
}

#[test]
#[ignore = "requires GPU"]
fn released_orchestrator_refuses_to_step() {
    init_logging();
    let stages = vec![StageEntry::new(StageProgram::compute(
        "free_field_evolution",
        EVOLVE,
    ))];

    let Some(mut orchestrator) = initialize_or_skip(Orchestrator::initialize(
        test_config(),
        stages,
        1,
        OutputTarget { width: 8, height: 8 },
        &DedicatedBufferRegistry::builtin(),
        None,
    )) else {
        return;
    };

    assert_eq!(orchestrator.field_mask(), Some(FieldsMask::ALL));
    orchestrator.step().unwrap();
    orchestrator.step().unwrap();
    assert_eq!(orchestrator.ticks(), Some(2));
    assert!(orchestrator.buffers().is_some());

    orchestrator.release();
    orchestrator.release();

    assert!(matches!(orchestrator.step(), Err(GpuError::Released)));
    assert_eq!(orchestrator.ticks(), None);
    assert!(orchestrator.buffers().is_none());
    assert!(orchestrator.output().is_none());
}
