//! # Pipeline Stages
//!
//! This module defines the description of one GPU program participating in
//! the per-tick pipeline: its kind (compute or render), its WGSL source,
//! and its per-stage property overrides.
//!
//! ## Design
//! - [`StageProgram`] is a closed tagged type. A stage is either a compute
//!   program or a render program; the distinction is made at construction
//!   and every downstream match is exhaustive.
//! - Compute programs expose their work as sequentially numbered entry
//!   points `pass0`, `pass1`, … which are discovered by reflection and
//!   dispatched in order. Render programs expose `vs_main` and `fs_main`
//!   and compose a fullscreen pass.
//! - Property overrides parameterize an individual stage without touching
//!   the shared global parameter block. Their upload layout is fixed and
//!   documented below; it is part of the shader contract.
//!
//! ## Override packing
//! Non-texture overrides pack, in declaration order, into one uniform
//! block bound at `@group(2) @binding(0)`:
//!
//! * scalar and integer overrides occupy one 16-byte slot each, value in
//!   the first component;
//! * vector overrides occupy one 16-byte slot;
//! * matrix overrides occupy four consecutive slots (64 bytes), one
//!   column per slot.
//!
//! Texture overrides do not consume uniform space. They bind a shared
//! filtering sampler at `@group(2) @binding(1)` and their views at
//! `@group(2) @binding(2)` onward, in declaration order. A stage with no
//! overrides still binds an empty group 2, so group numbering never
//! shifts between stages.

use std::sync::Arc;

use crate::sim::error::ConfigError;

/// One GPU program participating in the pipeline.
///
/// Stage identity for dedicated-buffer resolution is the program's name;
/// two entries sharing a name share dedicated storage.

#[derive(Debug, Clone)]
pub enum StageProgram {

    /// A compute program dispatched over the lattice, one dispatch per
    /// sequential kernel.
    Compute {
        /// Program name; dedicated-buffer registry key.
        name: String,

        /// WGSL source text.
        source: String,
    },

    /// A render program composing into the scratch image chain.
    Render {
        /// Program name; dedicated-buffer registry key.
        name: String,

        /// WGSL source text.
        source: String,
    },
}

impl StageProgram {

    /// Creates a compute stage program.

    pub fn compute(name: impl Into<String>, source: impl Into<String>) -> Self {
        StageProgram::Compute { name: name.into(), source: source.into() }
    }

    /// Creates a render stage program.

    pub fn render(name: impl Into<String>, source: impl Into<String>) -> Self {
        StageProgram::Render { name: name.into(), source: source.into() }
    }

    /// Program name; the dedicated-buffer registry key.

    pub fn name(&self) -> &str {
        match self {
            StageProgram::Compute { name, .. } | StageProgram::Render { name, .. } => name,
        }
    }

    /// WGSL source text.

    pub fn source(&self) -> &str {
        match self {
            StageProgram::Compute { source, .. } | StageProgram::Render { source, .. } => source,
        }
    }

    /// `true` for compute programs.

    #[inline]
    pub fn is_compute(&self) -> bool {
        matches!(self, StageProgram::Compute { .. })
    }

    /// Parses the program and discovers its entry-point interface.
    ///
    /// Compute programs are probed for `pass0`, `pass1`, … until the next
    /// index is absent; at least `pass0` must exist. Render programs must
    /// declare both `vs_main` and `fs_main`.
    ///
    /// ## Errors
    /// * [`ConfigError::ShaderParse`] — the source is not valid WGSL.
    /// * [`ConfigError::MissingEntryPoint`] — a required entry point was
    ///   not found.

    pub fn validate(&self) -> Result<StageInterface, ConfigError> {
        let module = naga::front::wgsl::parse_str(self.source()).map_err(|e| {
            ConfigError::ShaderParse {
                stage: self.name().to_owned(),
                detail: e.to_string(),
            }
        })?;

        let has_entry = |stage: naga::ShaderStage, name: &str| {
            module
                .entry_points
                .iter()
                .any(|ep| ep.stage == stage && ep.name == name)
        };

        match self {
            StageProgram::Compute { name, .. } => {
                let mut kernel_count = 0u32;
                while has_entry(naga::ShaderStage::Compute, &kernel_entry(kernel_count)) {
                    kernel_count += 1;
                }
                if kernel_count == 0 {
                    return Err(ConfigError::MissingEntryPoint {
                        stage: name.clone(),
                        entry: "pass0",
                    });
                }
                Ok(StageInterface { kernel_count })
            }
            StageProgram::Render { name, .. } => {
                for (stage, entry) in [
                    (naga::ShaderStage::Vertex, "vs_main"),
                    (naga::ShaderStage::Fragment, "fs_main"),
                ] {
                    if !has_entry(stage, entry) {
                        return Err(ConfigError::MissingEntryPoint {
                            stage: name.clone(),
                            entry,
                        });
                    }
                }
                Ok(StageInterface { kernel_count: 0 })
            }
        }
    }
}

/// Name of the `index`-th sequential compute kernel.

#[inline]
pub fn kernel_entry(index: u32) -> String {
    format!("pass{index}")
}

/// Entry-point interface of a stage, discovered by reflection.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInterface {

    /// Number of sequential compute kernels. Zero for render programs.
    pub kernel_count: u32,
}

/// One named property override applied to a single stage.

#[derive(Debug, Clone)]
pub struct PropertyOverride {

    /// Property name as documented by the stage's shader.
    pub name: String,

    /// Override value.
    pub value: PropertyValue,
}

/// Value kinds a stage property override may carry.

#[derive(Debug, Clone)]
pub enum PropertyValue {

    /// A single float, uploaded in the first component of its slot.
    Scalar(f32),

    /// A single signed integer, uploaded in the first component of its
    /// slot.
    Integer(i32),

    /// A four-component vector filling one slot.
    Vector([f32; 4]),

    /// A column-major 4×4 matrix filling four consecutive slots.
    Matrix([[f32; 4]; 4]),

    /// A texture view bound alongside the shared stage sampler.
    Texture(Arc<wgpu::TextureView>),
}

/// One pipeline stage: a program plus its property overrides.

#[derive(Debug, Clone)]
pub struct StageEntry {

    /// The GPU program this stage runs.
    pub program: StageProgram,

    /// Ordered property overrides; order fixes the packing layout.
    pub overrides: Vec<PropertyOverride>,
}

impl StageEntry {

    /// Creates a stage with no overrides.

    pub fn new(program: StageProgram) -> Self {
        StageEntry { program, overrides: Vec::new() }
    }

    /// Appends an override, returning the entry for chaining.

    pub fn with_override(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.overrides.push(PropertyOverride { name: name.into(), value });
        self
    }

    /// Packs the non-texture overrides into uniform block contents,
    /// following the documented slot layout. Empty when the stage has no
    /// non-texture overrides.

    pub fn packed_overrides(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for property in &self.overrides {
            match &property.value {
                PropertyValue::Scalar(v) => {
                    bytes.extend_from_slice(bytemuck::bytes_of(&[*v, 0.0, 0.0, 0.0]));
                }
                PropertyValue::Integer(v) => {
                    bytes.extend_from_slice(bytemuck::bytes_of(&[*v, 0, 0, 0]));
                }
                PropertyValue::Vector(v) => {
                    bytes.extend_from_slice(bytemuck::bytes_of(v));
                }
                PropertyValue::Matrix(m) => {
                    bytes.extend_from_slice(bytemuck::bytes_of(m));
                }
                PropertyValue::Texture(_) => {}
            }
        }
        bytes
    }

    /// Texture override views in declaration order.

    pub fn texture_overrides(&self) -> Vec<&Arc<wgpu::TextureView>> {
        self.overrides
            .iter()
            .filter_map(|p| match &p.value {
                PropertyValue::Texture(view) => Some(view),
                _ => None,
            })
            .collect()
    }
}
