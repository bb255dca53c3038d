// Run:
//   cargo test --test resolver
//
// Dedicated buffer resolution: slot assignment at registration, the
// name-keyed union over active stages, first-wins semantics, and the
// conflict rule.

use fieldsim::{
    ConfigError, DedicatedBufferDeclaration, DedicatedBufferRegistry, SimulationConfig,
};

fn halved_cells(config: &SimulationConfig) -> u64 {
    config.cell_count() / 2
}

fn full_cells(config: &SimulationConfig) -> u64 {
    config.cell_count()
}

#[test]
fn builtin_registry_carries_the_bloom_lattices() {
    let registry = DedicatedBufferRegistry::builtin();
    assert_eq!(registry.slot_count(), 2);
    assert_eq!(registry.slot_of("bloom_lattice"), Some(0));
    assert_eq!(registry.slot_of("bloom_lattice_temp"), Some(1));
    assert_eq!(registry.declarations_for("bloom_rendering").len(), 2);
    assert_eq!(registry.declarations_for("bloom_preparation_bloom9").len(), 2);
}

#[test]
fn bloom_buffers_are_quarter_resolution_times_three_channels() {
    let registry = DedicatedBufferRegistry::builtin();
    let config = SimulationConfig::default();

    let resolved = registry.resolve(&config, ["bloom_rendering"]).unwrap();
    assert_eq!(resolved.len(), 2);

    // 128×128 two-dimensional: 32 × 32 × 1 cells per channel.
    for buffer in &resolved {
        assert_eq!(buffer.element_size, 4);
        assert_eq!(buffer.element_count, 32 * 32 * 3);
        assert_eq!(buffer.size_bytes(), 32 * 32 * 3 * 4);
    }
    assert_eq!(resolved[0].name, "bloom_lattice");
    assert_eq!(resolved[0].slot, 0);
    assert_eq!(resolved[1].name, "bloom_lattice_temp");
    assert_eq!(resolved[1].slot, 1);
}

#[test]
fn quarter_resolution_rounds_each_axis_up() {
    let registry = DedicatedBufferRegistry::builtin();
    let config = SimulationConfig { width: 130, depth: 5, ..SimulationConfig::default() };

    let resolved = registry.resolve(&config, ["bloom_rendering"]).unwrap();
    // ceil(130/4) × ceil(128/4) × ceil(5/4) × 3
    assert_eq!(resolved[0].element_count, 33 * 32 * 2 * 3);
}

#[test]
fn inactive_and_unknown_stages_resolve_to_nothing() {
    let registry = DedicatedBufferRegistry::builtin();
    let config = SimulationConfig::default();

    assert!(registry.resolve(&config, std::iter::empty::<&str>()).unwrap().is_empty());
    assert!(registry.resolve(&config, ["free_field_evolution"]).unwrap().is_empty());
}

#[test]
fn shared_declarations_union_to_one_buffer() {
    let registry = DedicatedBufferRegistry::builtin();
    let config = SimulationConfig::default();

    // The whole bloom family shares both lattices; activating several
    // members still allocates each buffer once.
    let resolved = registry
        .resolve(
            &config,
            ["bloom_preparation_bloom3", "bloom_preparation_bloom6", "bloom_rendering"],
        )
        .unwrap();
    assert_eq!(resolved.len(), 2);
}

#[test]
fn resolution_is_order_independent_for_identical_declarations() {
    let mut registry = DedicatedBufferRegistry::new();
    let shared = [DedicatedBufferDeclaration {
        name: "histogram",
        element_size: 8,
        element_count: full_cells,
    }];
    registry.register("analysis", &shared);
    registry.register("display", &shared);

    let config = SimulationConfig::default();
    let forward = registry.resolve(&config, ["analysis", "display"]).unwrap();
    let backward = registry.resolve(&config, ["display", "analysis"]).unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 1);
    assert_eq!(forward[0].element_count, config.cell_count());
}

#[test]
fn conflicting_declarations_are_rejected() {
    let mut registry = DedicatedBufferRegistry::new();
    registry.register(
        "analysis",
        &[DedicatedBufferDeclaration {
            name: "histogram",
            element_size: 8,
            element_count: full_cells,
        }],
    );
    registry.register(
        "display",
        &[DedicatedBufferDeclaration {
            name: "histogram",
            element_size: 4,
            element_count: full_cells,
        }],
    );

    let config = SimulationConfig::default();
    let result = registry.resolve(&config, ["analysis", "display"]);
    assert!(matches!(
        result,
        Err(ConfigError::ConflictingDeclaration { name }) if name == "histogram"
    ));
}

#[test]
fn same_size_with_different_length_also_conflicts() {
    let mut registry = DedicatedBufferRegistry::new();
    registry.register(
        "analysis",
        &[DedicatedBufferDeclaration {
            name: "histogram",
            element_size: 8,
            element_count: full_cells,
        }],
    );
    registry.register(
        "display",
        &[DedicatedBufferDeclaration {
            name: "histogram",
            element_size: 8,
            element_count: halved_cells,
        }],
    );

    let config = SimulationConfig::default();
    assert!(registry.resolve(&config, ["analysis", "display"]).is_err());
}

#[test]
fn slots_stay_stable_when_only_a_subset_is_active() {
    let mut registry = DedicatedBufferRegistry::new();
    registry.register(
        "early",
        &[DedicatedBufferDeclaration {
            name: "first",
            element_size: 4,
            element_count: full_cells,
        }],
    );
    registry.register(
        "late",
        &[DedicatedBufferDeclaration {
            name: "second",
            element_size: 4,
            element_count: full_cells,
        }],
    );

    let config = SimulationConfig::default();

    // Only the later stage runs; its buffer keeps slot 1 rather than
    // compacting down to 0, so shaders can hard-code the binding.
    let resolved = registry.resolve(&config, ["late"]).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "second");
    assert_eq!(resolved[0].slot, 1);
}
