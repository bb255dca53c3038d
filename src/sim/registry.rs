//! # Dedicated Buffer Registry
//!
//! Some stage variants need auxiliary scratch storage beyond the shared
//! lattice buffers. This module defines the declaration table that maps a
//! stage program name to the dedicated buffers it requires, and the
//! resolution step that projects the table onto an active stage list.
//!
//! ## Design
//! - The registry is an explicit, immutable table owned by the caller and
//!   passed into initialization. Two simulations never share registry
//!   state.
//! - Every unique buffer name receives a stable bind-group slot at
//!   registration time, in first-registration order. Slots therefore do
//!   not depend on which stages end up active, and shaders can hard-code
//!   them.
//! - Resolution walks the active stage list in order and unions the
//!   declarations by name. The first occurrence of a name wins; a later
//!   occurrence with a *different* element size or computed length is a
//!   configuration error.
//! - Buffers never named by an active stage are not resolved, and are
//!   never allocated.

use std::collections::HashMap;

use crate::sim::config::SimulationConfig;
use crate::sim::error::ConfigError;

/// Computes a dedicated buffer's element count from the configuration.
pub type ElementCountFn = fn(&SimulationConfig) -> u64;

/// One dedicated buffer requirement attached to a stage program name.

#[derive(Debug, Clone, Copy)]
pub struct DedicatedBufferDeclaration {

    /// Buffer name; the key under which stages bind it.
    pub name: &'static str,

    /// Size of one element in bytes.
    pub element_size: u64,

    /// Element count as a function of the simulation configuration.
    pub element_count: ElementCountFn,
}

/// A dedicated buffer selected by resolution, ready for allocation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDedicatedBuffer {

    /// Buffer name from the winning declaration.
    pub name: &'static str,

    /// Stable bind-group slot assigned at registration.
    pub slot: u32,

    /// Size of one element in bytes.
    pub element_size: u64,

    /// Element count computed for the active configuration.
    pub element_count: u64,
}

impl ResolvedDedicatedBuffer {

    /// Total buffer size in bytes.

    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.element_size * self.element_count
    }
}

/// Immutable table mapping stage program names to dedicated buffer
/// declarations.
///
/// ## Role
/// The sole mechanism for a stage variant to request scratch storage.
/// Callers either start from [`builtin`](Self::builtin), which carries the
/// declarations of the standard bloom stage family, or from
/// [`new`](Self::new) for a custom table, then register further stages
/// before handing the registry to the orchestrator.

#[derive(Debug, Clone, Default)]
pub struct DedicatedBufferRegistry {
    by_stage: HashMap<String, Vec<DedicatedBufferDeclaration>>,
    slots: Vec<&'static str>,
}

impl DedicatedBufferRegistry {

    /// Creates an empty registry.

    pub fn new() -> Self {
        DedicatedBufferRegistry::default()
    }

    /// Creates a registry pre-populated with the standard bloom stage
    /// family: nine preparation compute programs and the bloom composition
    /// program, all sharing the two quarter-resolution accumulation
    /// lattices.

    pub fn builtin() -> Self {
        let mut registry = DedicatedBufferRegistry::new();
        for stage in [
            "bloom_preparation_add_fermion_norms",
            "bloom_preparation_add_fermion_phases",
            "bloom_preparation_load_fermion_norms",
            "bloom_preparation_load_fermion_phases",
            "bloom_preparation_bloom3",
            "bloom_preparation_bloom6",
            "bloom_preparation_bloom9",
            "bloom_preparation_bloom12",
            "bloom_preparation_bloom15",
            "bloom_rendering",
        ] {
            registry.register(stage, &BLOOM_DECLARATIONS);
        }
        registry
    }

    /// Attaches declarations to a stage program name, assigning slots to
    /// any buffer names not seen before.
    ///
    /// Registering the same stage twice extends its declaration list.

    pub fn register(&mut self, stage: &str, declarations: &[DedicatedBufferDeclaration]) {
        for declaration in declarations {
            if !self.slots.contains(&declaration.name) {
                self.slots.push(declaration.name);
            }
        }
        self.by_stage
            .entry(stage.to_owned())
            .or_default()
            .extend_from_slice(declarations);
    }

    /// Declarations attached to a stage, empty for unregistered names.

    pub fn declarations_for(&self, stage: &str) -> &[DedicatedBufferDeclaration] {
        self.by_stage.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stable bind-group slot of a buffer name, if any stage declared it.

    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.slots.iter().position(|n| *n == name).map(|i| i as u32)
    }

    /// Number of distinct buffer names across all registrations.

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Projects the registry onto an active stage list, producing the set
    /// of buffers to allocate, ordered by slot.
    ///
    /// The union is keyed by buffer name; the first occurrence in stage
    /// order wins. Stages without registered declarations contribute
    /// nothing.
    ///
    /// ## Errors
    /// [`ConfigError::ConflictingDeclaration`] when two active stages
    /// declare the same name with a different element size or a different
    /// computed element count.

    pub fn resolve<'a>(
        &self,
        config: &SimulationConfig,
        active_stages: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<ResolvedDedicatedBuffer>, ConfigError> {
        let mut union: HashMap<&'static str, (u64, u64)> = HashMap::new();

        for stage in active_stages {
            for declaration in self.declarations_for(stage) {
                let element_count = (declaration.element_count)(config);

                match union.get(declaration.name) {
                    Some(&(size, count)) => {
                        if size != declaration.element_size || count != element_count {
                            return Err(ConfigError::ConflictingDeclaration {
                                name: declaration.name.to_owned(),
                            });
                        }
                    }
                    None => {
                        union.insert(declaration.name, (declaration.element_size, element_count));
                    }
                }
            }
        }

        let resolved = self
            .slots
            .iter()
            .copied()
            .enumerate()
            .filter_map(|(slot, name)| {
                union.get(name).map(|&(element_size, element_count)| ResolvedDedicatedBuffer {
                    name,
                    slot: slot as u32,
                    element_size,
                    element_count,
                })
            })
            .collect();
        Ok(resolved)
    }
}

/// Element count of the bloom accumulation lattices: the simulation
/// lattice at quarter resolution per axis, times three color channels.

fn bloom_lattice_cells(config: &SimulationConfig) -> u64 {
    let w = (u64::from(config.width) + 3) / 4;
    let h = (u64::from(config.height) + 3) / 4;
    let d = (u64::from(config.effective_depth()) + 3) / 4;
    w * h * d * 3
}

/// Shared declarations of the bloom stage family.
const BLOOM_DECLARATIONS: [DedicatedBufferDeclaration; 2] = [
    DedicatedBufferDeclaration {
        name: "bloom_lattice",
        element_size: 4,
        element_count: bloom_lattice_cells,
    },
    DedicatedBufferDeclaration {
        name: "bloom_lattice_temp",
        element_size: 4,
        element_count: bloom_lattice_cells,
    },
];
