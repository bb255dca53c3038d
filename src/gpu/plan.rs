//! # Frame Plan
//!
//! The device-free description of one simulation tick: which kernels are
//! dispatched, in what order, and how the composition chain ping-pongs
//! between the two scratch images.
//!
//! ## Purpose
//! Planning is separated from encoding so the ordering rules (pass
//! repetition, kernel sequencing, scratch parity, capture placement) are
//! plain data that tests inspect directly. The plan is built once at
//! initialize time and re-encoded into a fresh command encoder every
//! tick.
//!
//! ## Guarantees
//! Identical inputs produce an identical operation sequence. Stage order
//! is preserved exactly as declared, never reordered.

use crate::sim::config::SimulationConfig;

/// Compute workgroup size along x; workgroup counts divide the lattice
/// width by this and round up.
pub const WORKGROUP_SIZE_X: u32 = 64;

/// One operation in a frame plan.
///
/// `stage` fields index the compute stage list for [`Dispatch`] and the
/// render stage list for [`Compose`]; scratch slots are `0` or `1`.
///
/// [`Dispatch`]: FrameOp::Dispatch
/// [`Compose`]: FrameOp::Compose

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOp {

    /// Run one compute kernel over the whole lattice.
    Dispatch {
        /// Index into the compute stage list.
        stage: usize,

        /// Sequential kernel index within the stage.
        kernel: u32,

        /// Workgroup counts per axis.
        workgroups: [u32; 3],
    },

    /// Clear a scratch image to opaque black.
    ClearScratch {
        /// Scratch slot to clear.
        slot: usize,
    },

    /// Run one render stage, reading one scratch image and writing the
    /// other.
    Compose {
        /// Index into the render stage list.
        stage: usize,

        /// Scratch slot the stage reads.
        input: usize,

        /// Scratch slot the stage writes.
        output: usize,
    },

    /// Copy the final scratch image into the output target.
    ResolveOutput {
        /// Scratch slot holding the finished frame.
        source: usize,
    },

    /// Copy the final scratch image into a readback staging slot.
    CaptureFrame {
        /// Scratch slot holding the finished frame.
        source: usize,
    },
}

/// The ordered operation sequence of one tick.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {

    /// Operations in execution order.
    pub ops: Vec<FrameOp>,
}

impl FramePlan {

    /// Builds the tick sequence.
    ///
    /// `compute_kernels` holds the reflected kernel count of each compute
    /// stage in declaration order. The sequence is:
    ///
    /// 1. `pass_count` repetitions of every compute stage's kernels, in
    ///    declaration order, kernels in sequential order;
    /// 2. clear scratch slot 0;
    /// 3. one composition per render stage, ping-ponging between the two
    ///    scratch slots (stage 0 reads slot 0);
    /// 4. resolve the last-written slot into the output target;
    /// 5. when `capture` is set, copy the same slot into a staging
    ///    buffer for readback.

    pub fn build(
        config: &SimulationConfig,
        compute_kernels: &[u32],
        render_stage_count: usize,
        pass_count: u32,
        capture: bool,
    ) -> Self {
        let groups = workgroups(config);
        let mut ops = Vec::new();

        for _ in 0..pass_count {
            for (stage, &kernels) in compute_kernels.iter().enumerate() {
                for kernel in 0..kernels {
                    ops.push(FrameOp::Dispatch { stage, kernel, workgroups: groups });
                }
            }
        }

        ops.push(FrameOp::ClearScratch { slot: 0 });

        let mut input = 0;
        for stage in 0..render_stage_count {
            let output = 1 - input;
            ops.push(FrameOp::Compose { stage, input, output });
            input = output;
        }

        ops.push(FrameOp::ResolveOutput { source: input });
        if capture {
            ops.push(FrameOp::CaptureFrame { source: input });
        }

        FramePlan { ops }
    }

    /// Number of kernel dispatches in the plan.

    pub fn dispatch_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, FrameOp::Dispatch { .. }))
            .count()
    }
}

/// Workgroup counts covering the lattice with (64, 1, 1) groups:
/// `ceil(width / 64)` along x, one group per row and slice elsewhere.

pub fn workgroups(config: &SimulationConfig) -> [u32; 3] {
    [
        (config.width + WORKGROUP_SIZE_X - 1) / WORKGROUP_SIZE_X,
        config.height,
        config.effective_depth(),
    ]
}
