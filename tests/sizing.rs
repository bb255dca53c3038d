// Run:
//   cargo test --test sizing
//
// Configuration validation and the derived sizing arithmetic every
// buffer allocation hangs off: cell counts, per-field element counts,
// effective depth, frame rate, and the field selection mask.

use fieldsim::gpu::buffers::{fermion_lattice_elements, gauge_lattice_elements};
use fieldsim::{ConfigError, FieldsMask, OutputTarget, SimulationConfig, MAX_FIELDS};

fn base_config() -> SimulationConfig {
    SimulationConfig::default()
}

// ── Validation ──────────────────────────────────────────────────────────────

#[test]
fn default_configuration_is_valid() {
    assert!(base_config().validate().is_ok());
}

#[test]
fn zero_width_is_rejected() {
    let config = SimulationConfig { width: 0, ..base_config() };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroDimension { axis: "lattice width" })
    ));
}

#[test]
fn zero_height_is_rejected() {
    let config = SimulationConfig { height: 0, ..base_config() };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroDimension { axis: "lattice height" })
    ));
}

#[test]
fn zero_depth_is_a_valid_two_dimensional_lattice() {
    let config = SimulationConfig { depth: 0, ..base_config() };
    assert!(config.validate().is_ok());
    assert!(config.is_two_dimensional());
    assert_eq!(config.effective_depth(), 1);
}

#[test]
fn non_positive_units_are_rejected() {
    let config = SimulationConfig { temporal_unit: 0.0, ..base_config() };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { parameter: "temporal unit", .. })
    ));

    let config = SimulationConfig { spatial_unit: -0.1, ..base_config() };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { parameter: "spatial unit", .. })
    ));

    let config = SimulationConfig { norm_limit: f32::NAN, ..base_config() };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { parameter: "norm limit", .. })
    ));
}

#[test]
fn empty_field_roster_is_rejected() {
    let config = SimulationConfig { fields: Vec::new(), ..base_config() };
    assert!(matches!(config.validate(), Err(ConfigError::NoFields)));
}

#[test]
fn oversize_field_roster_is_rejected() {
    let mut config = base_config();
    config.fields.push(config.fields[0]);
    assert_eq!(config.fields.len(), MAX_FIELDS + 1);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::TooManyFields { requested: 9, maximum: 8 })
    ));
}

#[test]
fn massless_field_is_rejected() {
    let mut config = base_config();
    config.fields[3].mass = 0.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { parameter: "field mass", .. })
    ));
}

#[test]
fn output_target_rejects_degenerate_extents() {
    assert!(OutputTarget::default().validate().is_ok());
    assert!(matches!(
        OutputTarget { width: 0, height: 720 }.validate(),
        Err(ConfigError::ZeroDimension { axis: "output width" })
    ));
    assert!(matches!(
        OutputTarget { width: 1280, height: 0 }.validate(),
        Err(ConfigError::ZeroDimension { axis: "output height" })
    ));
}

// ── Derived sizing ──────────────────────────────────────────────────────────

#[test]
fn cell_count_uses_effective_depth() {
    let flat = SimulationConfig { width: 128, height: 128, depth: 0, ..base_config() };
    assert_eq!(flat.cell_count(), 128 * 128);

    let volume = SimulationConfig { width: 128, height: 128, depth: 4, ..base_config() };
    assert_eq!(volume.cell_count(), 128 * 128 * 4);
    assert!(!volume.is_two_dimensional());
}

#[test]
fn fermion_lattice_scales_with_field_count() {
    let config = base_config();
    assert_eq!(config.field_count(), 8);
    assert_eq!(fermion_lattice_elements(&config), 128 * 128 * 8);

    let mut thin = config.clone();
    thin.fields.truncate(2);
    assert_eq!(fermion_lattice_elements(&thin), 128 * 128 * 2);
}

#[test]
fn gauge_lattice_is_one_element_per_cell() {
    let config = SimulationConfig { depth: 4, ..base_config() };
    assert_eq!(gauge_lattice_elements(&config), 128 * 128 * 4);
}

#[test]
fn frame_rate_truncates_and_floors_at_one() {
    let fast = SimulationConfig { temporal_unit: 0.05, ..base_config() };
    assert_eq!(fast.frame_rate(), 20);

    let uneven = SimulationConfig { temporal_unit: 0.3, ..base_config() };
    assert_eq!(uneven.frame_rate(), 3);

    let slow = SimulationConfig { temporal_unit: 2.0, ..base_config() };
    assert_eq!(slow.frame_rate(), 1);
}

// ── Field selection mask ────────────────────────────────────────────────────

#[test]
fn full_mask_covers_twenty_bits() {
    assert_eq!(FieldsMask::ALL.bits(), 0x000F_FFFF);
    assert_eq!(FieldsMask::NONE.bits(), 0);
    for index in 0..MAX_FIELDS {
        assert!(FieldsMask::ALL.contains_fermion(index));
    }
}

#[test]
fn mask_builders_set_disjoint_bits() {
    let fermions = FieldsMask::NONE.with_fermion(0).with_fermion(7);
    assert_eq!(fermions.bits(), 0b1000_0001);
    assert!(fermions.contains_fermion(0));
    assert!(!fermions.contains_fermion(3));

    let gauge = FieldsMask::NONE.with_u1().with_su2(0).with_su2(2).with_su3(7);
    assert_eq!(gauge.bits(), (1 << 8) | (1 << 9) | (1 << 11) | (1 << 19));
}

#[test]
fn from_bits_discards_bits_above_the_mask() {
    let mask = FieldsMask::from_bits(0xFFFF_FFFF);
    assert_eq!(mask.bits(), FieldsMask::ALL.bits());

    let mask = FieldsMask::from_bits(0x0010_0000 | 0b101);
    assert_eq!(mask.bits(), 0b101);
}
