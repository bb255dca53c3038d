//! # Event Records and Lattice Element Types
//!
//! Plain-old-data definitions shared between the host and the kernels:
//! the three externally submitted event records (pokes, barriers, fermion
//! modes), the per-cell lattice element types, and the fields mask that
//! scopes events and composition to a subset of fields.
//!
//! Every type here is `#[repr(C)]` and byte-for-byte identical to its GPU
//! declaration; records are uploaded with `bytemuck` casts and no
//! per-element translation.

use bytemuck::{Pod, Zeroable};

/// Capacity of the poke submission queue and its GPU buffer.
pub const MAX_POKES: usize = 16;

/// Capacity of the barrier submission queue and its GPU buffer.
pub const MAX_BARRIERS: usize = 16;

/// Capacity of the fermion-mode submission queue and its GPU buffer.
pub const MAX_FERMION_MODES: usize = 1024;

/// Element count of the global intrinsics buffer, a small block of signed
/// integers every stage can read and write for cross-stage bookkeeping.
pub const GLOBAL_INTRINSICS_LEN: usize = 128;

/// Per-cell, per-field fermion state: twelve complex amplitudes covering a
/// Dirac four-spinor across a color triplet.
///
/// Stored as `[re, im]` pairs; 96 bytes per element.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FermionFieldState {

    /// Complex amplitudes in kernel order.
    pub amplitudes: [[f32; 2]; 12],
}

/// Per-cell pack of all gauge degrees of freedom: twelve gauge channels
/// (U1, three SU2 generators, eight SU3 generators), one four-vector each.
///
/// 192 bytes per element. The same layout is used for potentials and for
/// the derived electric and magnetic strength lattices.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GaugeVectorPack {

    /// Channel-major four-vector components in kernel order.
    pub components: [f32; 48],
}

/// A localized impulse applied to the lattice on the next tick.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PokeInformation {

    /// Impulse strength in kernel units.
    pub strength: i32,

    /// Impulse radius in cells.
    pub radius: i32,

    /// Lattice coordinates of the impulse center.
    pub center: [i32; 3],

    /// Direction the impulse pushes along, in cells.
    pub direction: [i32; 3],

    /// Fields mask selecting which fields the impulse touches.
    pub mask: i32,
}

/// A capsule-shaped potential barrier between two lattice points.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BarrierInformation {

    /// Barrier potential strength in kernel units.
    pub strength: i32,

    /// Wall thickness in cells.
    pub width: i32,

    /// End-cap radius in cells.
    pub radius: i32,

    /// First capsule end point.
    pub start: [i32; 3],

    /// Second capsule end point.
    pub end: [i32; 3],

    /// Fields mask selecting which fields the barrier blocks.
    pub mask: i32,
}

/// A Gaussian wave-packet mode injected into one fermion field.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FermionModeData {

    /// Index of the target field in the configured roster.
    pub field_index: f32,

    /// Peak amplitude of the packet.
    pub amplitude: f32,

    /// Packet center in lattice coordinates.
    pub origin: [f32; 3],

    /// Wave vector of the carrier plane wave.
    pub wave_vector: [f32; 3],

    /// Spin orientation of the injected state.
    pub spin_state: [f32; 3],

    /// Per-axis inverse Gaussian widths of the envelope.
    pub inverse_width: [f32; 3],
}

/// Bit mask selecting fermion fields and gauge channels.
///
/// ## Layout
/// Bits `0..=7` select the eight fermion field slots, bit `8` the U1
/// channel, bits `9..=11` the SU2 generators, and bits `12..=19` the SU3
/// generators. The upper twelve bits are unused and always zero.
///
/// Masks travel in event records (as their `mask` field) and in the global
/// parameter block, where they scope kernels and composition to the
/// selected subset.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldsMask(u32);

impl FieldsMask {

    /// Mask with every fermion field and gauge channel selected.
    pub const ALL: FieldsMask = FieldsMask(0x000F_FFFF);

    /// Mask with nothing selected.
    pub const NONE: FieldsMask = FieldsMask(0);

    /// Selects one fermion field slot.
    ///
    /// ## Panics
    /// Panics if `index >= 8`.

    pub fn with_fermion(self, index: usize) -> Self {
        assert!(index < 8, "fermion field index out of range.");
        FieldsMask(self.0 | 1 << index)
    }

    /// Selects the U1 gauge channel.

    pub fn with_u1(self) -> Self {
        FieldsMask(self.0 | 1 << 8)
    }

    /// Selects one SU2 generator.
    ///
    /// ## Panics
    /// Panics if `generator >= 3`.

    pub fn with_su2(self, generator: usize) -> Self {
        assert!(generator < 3, "SU2 generator index out of range.");
        FieldsMask(self.0 | 1 << (9 + generator))
    }

    /// Selects one SU3 generator.
    ///
    /// ## Panics
    /// Panics if `generator >= 8`.

    pub fn with_su3(self, generator: usize) -> Self {
        assert!(generator < 8, "SU3 generator index out of range.");
        FieldsMask(self.0 | 1 << (12 + generator))
    }

    /// `true` when the given fermion field slot is selected.

    #[inline]
    pub fn contains_fermion(self, index: usize) -> bool {
        index < 8 && self.0 & (1 << index) != 0
    }

    /// Raw bit pattern as stored in event records and the parameter block.

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a mask from a raw bit pattern, discarding unused bits.

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        FieldsMask(bits & Self::ALL.0)
    }
}
