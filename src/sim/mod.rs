//! # Simulation Core
//!
//! Host-side simulation model, independent of any GPU device.
//!
//! This module contains the building blocks the orchestrator assembles:
//! - Configuration and validation
//! - Event records and lattice element types
//! - Stage descriptions and shader reflection
//! - Dedicated buffer declarations and resolution
//! - Submission queues
//!
//! Everything here is pure host state, which keeps sizing, resolution,
//! and queue semantics testable without a device. Public API exposure is
//! controlled by `lib.rs`.

pub mod error;
pub mod config;
pub mod events;
pub mod stage;
pub mod registry;
pub mod queue;
