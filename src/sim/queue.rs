//! # Submission Queues
//!
//! This module defines the double-buffered event queue used to hand pokes,
//! barriers, and fermion modes from the host to the GPU.
//!
//! ## Purpose
//! External callers submit events at any time between ticks. Rather than
//! mutating GPU state directly, submissions accumulate in a fixed-capacity
//! host arena that is uploaded once per tick at a well-defined
//! synchronization point, giving kernels a stable view for the whole tick.
//!
//! ## Design
//! - The arena is allocated once at construction and never grows or
//!   reallocates; submission is a slot write and a cursor bump.
//! - Submissions past capacity are dropped with a warning. Event delivery
//!   is best effort by contract; producers must tolerate gaps.
//! - `apply_with` uploads enough elements to overwrite whatever the GPU
//!   buffer still holds from the previous tick: `max(submitted, applied)`
//!   elements, where `applied` is the previous upload's length. Stale
//!   records are overwritten by the zeroed tail rather than by a separate
//!   clear pass.
//!
//! ## Invariants
//! - `arena[submitted..]` is zeroed at all times, so any upload window
//!   extending past the live prefix writes zeros.
//! - After `apply_with`, the arena is fully zeroed and `submitted == 0`.
//! - A queue with `submitted == 0 && applied == 0` uploads nothing.

use bytemuck::Pod;
use tracing::warn;

/// Fixed-capacity, double-buffered event queue.
///
/// ## Role
/// One queue instance exists per event kind (pokes, barriers, fermion
/// modes), each bound to one GPU buffer of the same capacity. The queue
/// owns only the host side; the upload itself is performed by the closure
/// handed to [`apply_with`](Self::apply_with), keeping the state machine
/// testable without a device.
///
/// ## State machine
/// `Idle → Submitted(n) → Applied(n) → Idle`. An apply uploads
/// `max(n, previous applied)` elements, records `applied = n`, and resets
/// the live prefix to zero. Applying with both counts at zero is a no-op.

#[derive(Debug)]
pub struct SubmissionQueue<T: Pod> {
    arena: Box<[T]>,
    submitted: usize,
    applied: usize,
    label: &'static str,
}

impl<T: Pod> SubmissionQueue<T> {

    /// Creates a queue with a zeroed arena of `capacity` slots.
    ///
    /// The label names the queue in overflow warnings.

    pub fn new(capacity: usize, label: &'static str) -> Self {
        SubmissionQueue {
            arena: vec![T::zeroed(); capacity].into_boxed_slice(),
            submitted: 0,
            applied: 0,
            label,
        }
    }

    /// Appends an event to the live prefix.
    ///
    /// Returns `false` and drops the event when the arena is full; the
    /// drop is logged once per event at `warn` level.

    pub fn submit(&mut self, event: T) -> bool {
        if self.submitted == self.arena.len() {
            warn!(
                queue = self.label,
                capacity = self.arena.len(),
                "submission queue full; event dropped"
            );
            return false;
        }
        self.arena[self.submitted] = event;
        self.submitted += 1;
        true
    }

    /// Applies pending submissions through `upload` and resets the arena.
    ///
    /// `upload` receives the window `arena[..max(submitted, applied)]`
    /// exactly once, or not at all when there is nothing to write. Slots
    /// past the live prefix are zero, so a window longer than the current
    /// submission count clears the stale tail of the GPU buffer.

    pub fn apply_with(&mut self, upload: impl FnOnce(&[T])) {
        if self.submitted == 0 && self.applied == 0 {
            return;
        }

        let window = self.submitted.max(self.applied);
        upload(&self.arena[..window]);

        self.applied = self.submitted;
        for slot in &mut self.arena[..self.submitted] {
            *slot = T::zeroed();
        }
        self.submitted = 0;
    }

    /// Number of events submitted since the last apply.

    #[inline]
    pub fn pending(&self) -> usize {
        self.submitted
    }

    /// Number of events written by the most recent apply.

    #[inline]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Total arena capacity.

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }
}
