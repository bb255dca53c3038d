// Run:
//   cargo test --test layout
//
// Byte-level layout of every type that crosses the host/GPU boundary.
// Shaders index these as tightly packed arrays, so any padding the
// compiler inserts would silently shear the lattice.

use std::mem::{align_of, size_of};

use bytemuck::Zeroable;

use fieldsim::gpu::buffers::GlobalParams;
use fieldsim::{
    BarrierInformation, FermionFieldState, FermionModeData, FieldProperties, GaugeVectorPack,
    PokeInformation,
};

#[test]
fn fermion_state_is_twelve_complex_amplitudes() {
    assert_eq!(size_of::<FermionFieldState>(), 12 * 2 * 4);
    assert_eq!(align_of::<FermionFieldState>(), 4);
}

#[test]
fn gauge_pack_is_forty_eight_components() {
    assert_eq!(size_of::<GaugeVectorPack>(), 48 * 4);
    assert_eq!(align_of::<GaugeVectorPack>(), 4);
}

#[test]
fn event_records_have_no_padding() {
    // 2 scalars + two 3-vectors + mask, all i32
    assert_eq!(size_of::<PokeInformation>(), 9 * 4);
    // 3 scalars + two 3-vectors + mask, all i32
    assert_eq!(size_of::<BarrierInformation>(), 10 * 4);
    // 2 scalars + four 3-vectors, all f32
    assert_eq!(size_of::<FermionModeData>(), 14 * 4);
}

#[test]
fn field_properties_is_color_plus_four_scalars() {
    assert_eq!(size_of::<FieldProperties>(), 8 * 4);
    assert_eq!(align_of::<FieldProperties>(), 4);
}

#[test]
fn global_params_matches_uniform_block() {
    // 4 lattice words, 6 physics scalars, mask, padding
    assert_eq!(size_of::<GlobalParams>(), 48);
    assert_eq!(align_of::<GlobalParams>(), 4);
}

#[test]
fn zeroed_events_are_all_zero_bytes() {
    let poke = PokeInformation::zeroed();
    assert!(bytemuck::bytes_of(&poke).iter().all(|&b| b == 0));

    let barrier = BarrierInformation::zeroed();
    assert!(bytemuck::bytes_of(&barrier).iter().all(|&b| b == 0));

    let mode = FermionModeData::zeroed();
    assert!(bytemuck::bytes_of(&mode).iter().all(|&b| b == 0));
}

#[test]
fn event_slices_cast_to_contiguous_bytes() {
    let window = [
        PokeInformation {
            strength: 3,
            radius: 2,
            center: [1, 2, 3],
            direction: [0, 1, 0],
            mask: 0b1,
        },
        PokeInformation::zeroed(),
    ];
    let bytes: &[u8] = bytemuck::cast_slice(&window);
    assert_eq!(bytes.len(), 2 * size_of::<PokeInformation>());
    // First field of the first record, little endian
    assert_eq!(&bytes[0..4], &3i32.to_le_bytes());
    // Second record is the zeroed tail
    assert!(bytes[size_of::<PokeInformation>()..].iter().all(|&b| b == 0));
}
