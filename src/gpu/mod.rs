//! # GPU Layer
//!
//! Everything that touches the device lives here. The layer is split
//! along the lifecycle of a simulation:
//!
//! * [`context`] — adapter selection, device acquisition, limit checks
//! * [`buffers`] — allocation and binding of all GPU-resident state
//! * [`plan`] — the device-free operation sequence for one tick
//! * [`pipeline`] — realization of stage programs into pipelines and
//!   bind groups
//! * [`capture`] — asynchronous readback of finished frames
//!
//! ## Execution model
//! A tick is: apply the pending event windows, re-encode the frame plan
//! against the realized pipelines, submit, then request readback maps.
//! The plan is built once at initialization; per-tick work is encoding
//! and upload only, so the hot path never creates GPU objects.
//!
//! ## Synchronization
//! Submission is fire-and-forget. The only blocking waits are at
//! teardown, when in-flight captures are flushed before the device is
//! dropped. Map completions are driven by non-blocking polls during
//! draining.

pub mod buffers;
pub mod capture;
pub mod context;
pub mod pipeline;
pub mod plan;
