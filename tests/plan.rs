// Run:
//   cargo test --test plan
//
// Frame plan construction and stage reflection. Both are device-free:
// the plan is plain data and reflection runs on the naga front end, so
// the full ordering contract is checked on any machine.

use fieldsim::gpu::plan::{workgroups, FrameOp, FramePlan, WORKGROUP_SIZE_X};
use fieldsim::sim::stage::kernel_entry;
use fieldsim::{ConfigError, SimulationConfig, StageProgram};

fn config() -> SimulationConfig {
    SimulationConfig::default()
}

// ── Plan construction ───────────────────────────────────────────────────────

#[test]
fn dispatches_repeat_per_pass_in_declaration_order() {
    let plan = FramePlan::build(&config(), &[2, 1], 2, 3, false);

    // Three passes over stage 0 (kernels 0, 1) then stage 1 (kernel 0).
    assert_eq!(plan.dispatch_count(), 9);
    let groups = workgroups(&config());
    let expected: Vec<FrameOp> = (0..3)
        .flat_map(|_| {
            [
                FrameOp::Dispatch { stage: 0, kernel: 0, workgroups: groups },
                FrameOp::Dispatch { stage: 0, kernel: 1, workgroups: groups },
                FrameOp::Dispatch { stage: 1, kernel: 0, workgroups: groups },
            ]
        })
        .collect();
    assert_eq!(&plan.ops[..9], &expected[..]);
}

#[test]
fn composition_ping_pongs_from_a_cleared_slot() {
    let plan = FramePlan::build(&config(), &[2, 1], 2, 3, false);
    let tail = &plan.ops[9..];

    assert_eq!(
        tail,
        &[
            FrameOp::ClearScratch { slot: 0 },
            FrameOp::Compose { stage: 0, input: 0, output: 1 },
            FrameOp::Compose { stage: 1, input: 1, output: 0 },
            FrameOp::ResolveOutput { source: 0 },
        ]
    );
}

#[test]
fn capture_follows_the_resolve_and_reads_the_same_slot() {
    let plan = FramePlan::build(&config(), &[1], 3, 1, true);

    // Odd render count: the chain ends on slot 1.
    assert_eq!(
        &plan.ops[1..],
        &[
            FrameOp::ClearScratch { slot: 0 },
            FrameOp::Compose { stage: 0, input: 0, output: 1 },
            FrameOp::Compose { stage: 1, input: 1, output: 0 },
            FrameOp::Compose { stage: 2, input: 0, output: 1 },
            FrameOp::ResolveOutput { source: 1 },
            FrameOp::CaptureFrame { source: 1 },
        ]
    );
}

#[test]
fn render_stage_input_parity_matches_its_index() {
    let plan = FramePlan::build(&config(), &[], 6, 1, false);
    for op in &plan.ops {
        if let FrameOp::Compose { stage, input, output } = op {
            assert_eq!(*input, stage % 2);
            assert_eq!(*output, 1 - input);
        }
    }
}

#[test]
fn no_stages_still_resolves_a_cleared_frame() {
    let plan = FramePlan::build(&config(), &[], 0, 4, false);
    assert_eq!(
        plan.ops,
        vec![FrameOp::ClearScratch { slot: 0 }, FrameOp::ResolveOutput { source: 0 }]
    );
}

#[test]
fn identical_inputs_yield_identical_plans() {
    let a = FramePlan::build(&config(), &[2, 1, 3], 2, 5, true);
    let b = FramePlan::build(&config(), &[2, 1, 3], 2, 5, true);
    assert_eq!(a, b);
}

#[test]
fn workgroups_round_width_up_and_cover_rows_and_slices() {
    let exact = SimulationConfig { width: 128, height: 71, depth: 3, ..config() };
    assert_eq!(workgroups(&exact), [2, 71, 3]);

    let ragged = SimulationConfig { width: 130, height: 16, depth: 0, ..config() };
    assert_eq!(workgroups(&ragged), [3, 16, 1]);

    let narrow = SimulationConfig { width: 1, height: 1, depth: 0, ..config() };
    assert_eq!(workgroups(&narrow), [1, 1, 1]);

    assert_eq!(WORKGROUP_SIZE_X, 64);
}

// ── Stage reflection ────────────────────────────────────────────────────────

const TWO_KERNELS: &str = r#"
@compute @workgroup_size(64, 1, 1)
fn pass0(@builtin(global_invocation_id) id: vec3<u32>) {}

@compute @workgroup_size(64, 1, 1)
fn pass1(@builtin(global_invocation_id) id: vec3<u32>) {}
"#;

const UNNUMBERED_KERNEL: &str = r#"
@compute @workgroup_size(64, 1, 1)
fn evolve(@builtin(global_invocation_id) id: vec3<u32>) {}
"#;

const FULLSCREEN: &str = r#"
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

const VERTEX_ONLY: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
"#;

#[test]
fn kernel_entry_points_are_numbered_sequentially() {
    assert_eq!(kernel_entry(0), "pass0");
    assert_eq!(kernel_entry(3), "pass3");
}

#[test]
fn reflection_counts_sequential_kernels() {
    let program = StageProgram::compute("free_field_evolution", TWO_KERNELS);
    let interface = program.validate().unwrap();
    assert_eq!(interface.kernel_count, 2);
}

#[test]
fn compute_program_without_pass0_is_rejected() {
    let program = StageProgram::compute("free_field_evolution", UNNUMBERED_KERNEL);
    assert!(matches!(
        program.validate(),
        Err(ConfigError::MissingEntryPoint { stage, entry: "pass0" }) if stage == "free_field_evolution"
    ));
}

#[test]
fn malformed_source_is_a_parse_error() {
    let program = StageProgram::compute("free_field_evolution", "fn pass0( {");
    assert!(matches!(
        program.validate(),
        Err(ConfigError::ShaderParse { stage, .. }) if stage == "free_field_evolution"
    ));
}

#[test]
fn render_program_requires_both_entry_points() {
    let full = StageProgram::render("field_display", FULLSCREEN);
    assert_eq!(full.validate().unwrap().kernel_count, 0);

    let partial = StageProgram::render("field_display", VERTEX_ONLY);
    assert!(matches!(
        partial.validate(),
        Err(ConfigError::MissingEntryPoint { entry: "fs_main", .. })
    ));
}

#[test]
fn program_kind_and_name_drive_partitioning() {
    let compute = StageProgram::compute("free_field_evolution", TWO_KERNELS);
    let render = StageProgram::render("field_display", FULLSCREEN);
    assert!(compute.is_compute());
    assert!(!render.is_compute());
    assert_eq!(compute.name(), "free_field_evolution");
    assert_eq!(render.name(), "field_display");
}
