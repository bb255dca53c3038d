//! # Simulation Configuration
//!
//! This module defines the host-side description of a lattice run: its
//! dimensions, discretization units, physical limits, and the fermion field
//! roster. The configuration is validated once, before any GPU resource is
//! allocated, and is immutable for the lifetime of the simulation.
//!
//! ## Design
//! - Dimensions are plain `u32` extents. A depth of `0` selects a
//!   two-dimensional run; every derived quantity substitutes an effective
//!   depth of `1` so kernels never see a zero extent.
//! - [`FieldProperties`] is `#[repr(C)]` plain-old-data and is uploaded to
//!   its GPU buffer verbatim, one record per configured field.
//! - Validation is fail-fast and returns the first violated rule as a
//!   [`ConfigError`].
//!
//! ## Invariants
//! - `validate()` has passed before the configuration reaches buffer
//!   allocation.
//! - `fields.len() <= MAX_FIELDS` so every field owns one bit of the
//!   fermion portion of the fields mask.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::sim::error::ConfigError;

/// Maximum number of fermion fields a single simulation may carry.
///
/// Bounded by the fermion portion of the fields mask (one bit per field)
/// and the fixed layout of lattice state vectors.
pub const MAX_FIELDS: usize = 8;

/// Physical properties of a single fermion field.
///
/// One record per configured field is uploaded to the field-properties
/// buffer at allocation time, in declaration order, so kernels index it by
/// field number. The layout is stable and is part of the shader contract.

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct FieldProperties {

    /// Display color used by composition stages, RGBA in `[0, 1]`.
    pub color: [f32; 4],

    /// Field mass.
    pub mass: f32,

    /// Coupling strength to the U(1) gauge sector.
    pub u1_coupling: f32,

    /// Coupling strength to the SU(2) gauge sector.
    pub su2_coupling: f32,

    /// Coupling strength to the SU(3) gauge sector.
    pub su3_coupling: f32,
}

impl FieldProperties {

    /// Creates a field with the given color and unit mass, using the
    /// default coupling strength for all three gauge sectors.

    pub fn with_color(color: [f32; 4]) -> Self {
        FieldProperties {
            color,
            mass: 1.0,
            u1_coupling: 0.1,
            su2_coupling: 0.1,
            su3_coupling: 0.1,
        }
    }
}

/// Host-side description of a lattice field simulation.
///
/// ## Role
/// Carries everything buffer allocation and kernel dispatch need to size
/// and parameterize a run: lattice extents, discretization units, physical
/// limits, the composition brightness, and the per-field property roster.
///
/// ## Two-dimensional runs
/// `depth == 0` marks a 2-D lattice. Sizing and dispatch substitute
/// [`effective_depth`](Self::effective_depth) (`max(depth, 1)`) so the
/// plane is processed as a single slice.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {

    /// Lattice extent along x. Must be non-zero.
    pub width: u32,

    /// Lattice extent along y. Must be non-zero.
    pub height: u32,

    /// Lattice extent along z. Zero selects a two-dimensional run.
    pub depth: u32,

    /// Simulation time step. Must be positive.
    pub temporal_unit: f32,

    /// Lattice spacing. Must be positive.
    pub spatial_unit: f32,

    /// Non-abelian self-interaction strength.
    pub self_interaction: f32,

    /// Upper bound on local fermion density enforced by the kernels.
    /// Must be positive.
    pub density_limit: f32,

    /// Upper bound on gauge field norms enforced by the kernels.
    /// Must be positive.
    pub norm_limit: f32,

    /// Output brightness multiplier applied by composition stages.
    pub brightness: f32,

    /// Fermion field roster, at most [`MAX_FIELDS`] entries.
    pub fields: Vec<FieldProperties>,
}

impl SimulationConfig {

    /// Number of lattice cells, substituting the effective depth.
    ///
    /// This is the element count of every per-cell buffer; per-field
    /// buffers multiply it by [`field_count`](Self::field_count).

    #[inline]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * u64::from(self.effective_depth())
    }

    /// Depth as seen by kernels and sizing: `max(depth, 1)`.

    #[inline]
    pub fn effective_depth(&self) -> u32 {
        self.depth.max(1)
    }

    /// `true` when this configuration describes a 2-D lattice.

    #[inline]
    pub fn is_two_dimensional(&self) -> bool {
        self.depth == 0
    }

    /// Number of configured fermion fields.

    #[inline]
    pub fn field_count(&self) -> u32 {
        self.fields.len() as u32
    }

    /// Capture frame rate derived from the temporal unit: one frame per
    /// simulated time unit, truncated, floored at one frame per second.

    pub fn frame_rate(&self) -> u32 {
        ((1.0 / self.temporal_unit) as u32).max(1)
    }

    /// Checks every configuration rule, returning the first violation.
    ///
    /// ## Errors
    /// * [`ConfigError::ZeroDimension`] — width or height is zero.
    /// * [`ConfigError::NonPositive`] — a unit, limit, or field mass is
    ///   not strictly positive.
    /// * [`ConfigError::NoFields`] / [`ConfigError::TooManyFields`] — the
    ///   field roster is empty or exceeds [`MAX_FIELDS`].

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroDimension { axis: "lattice width" });
        }
        if self.height == 0 {
            return Err(ConfigError::ZeroDimension { axis: "lattice height" });
        }

        for (parameter, value) in [
            ("temporal unit", self.temporal_unit),
            ("spatial unit", self.spatial_unit),
            ("density limit", self.density_limit),
            ("norm limit", self.norm_limit),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { parameter, value });
            }
        }

        if self.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(ConfigError::TooManyFields {
                requested: self.fields.len(),
                maximum: MAX_FIELDS,
            });
        }
        for field in &self.fields {
            if !(field.mass > 0.0) {
                return Err(ConfigError::NonPositive {
                    parameter: "field mass",
                    value: field.mass,
                });
            }
        }

        Ok(())
    }
}

/// Dimensions of the output image the composition chain resolves into.
///
/// The orchestrator owns the device, so the target texture itself is
/// created at initialize time from this description; the finished
/// texture is exposed for the host to consume after every tick.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {

    /// Output width in pixels. Must be non-zero.
    pub width: u32,

    /// Output height in pixels. Must be non-zero.
    pub height: u32,
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

impl OutputTarget {

    /// Checks that both extents are non-zero.

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroDimension { axis: "output width" });
        }
        if self.height == 0 {
            return Err(ConfigError::ZeroDimension { axis: "output height" });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {

    /// A 128×128 two-dimensional run with the standard eight-field roster.

    fn default() -> Self {
        SimulationConfig {
            width: 128,
            height: 128,
            depth: 0,
            temporal_unit: 0.05,
            spatial_unit: 0.1,
            self_interaction: 0.1,
            density_limit: 10.0,
            norm_limit: 10.0,
            brightness: 1.0,
            fields: vec![
                FieldProperties::with_color([1.0, 0.0, 0.0, 1.0]),
                FieldProperties::with_color([0.0, 1.0, 0.0, 1.0]),
                FieldProperties::with_color([0.0, 0.0, 1.0, 1.0]),
                FieldProperties::with_color([1.0, 1.0, 0.0, 1.0]),
                FieldProperties::with_color([0.0, 1.0, 1.0, 1.0]),
                FieldProperties::with_color([1.0, 0.0, 1.0, 1.0]),
                FieldProperties::with_color([1.0, 1.0, 1.0, 1.0]),
                FieldProperties::with_color([0.0, 0.0, 0.0, 1.0]),
            ],
        }
    }
}
