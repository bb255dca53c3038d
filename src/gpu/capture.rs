//! # Frame Capture
//!
//! Asynchronous readback of finished frames into host memory.
//!
//! ## Purpose
//! A small ring of mappable staging buffers decouples the simulation
//! loop from GPU-to-CPU transfer latency. Each captured tick copies the
//! finished frame into a free slot; mapping completes some ticks later
//! and the pixels are handed to the caller the next time the ring is
//! drained. When every slot is still in flight the frame is dropped
//! rather than stalling the loop.
//!
//! ## Slot lifecycle
//! `Free -> Encoded -> Mapping -> Free`. The copy is encoded during
//! frame encoding, the map is requested after submit, and completion is
//! signalled through a channel from the map callback. Rows are read
//! back with the row pitch padded to `COPY_BYTES_PER_ROW_ALIGNMENT`;
//! draining strips the padding so delivered frames are tightly packed
//! RGBA.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::{debug, warn};

use crate::gpu::context::GpuContext;
use crate::sim::config::OutputTarget;
use crate::sim::error::GpuError;

/// Number of staging slots. Covers the usual two to three ticks of
/// transfer latency without stalling.
pub const CAPTURE_SLOTS: usize = 3;

/// Bytes per pixel of the capture format (RGBA, 8 bits per channel).
const BYTES_PER_PIXEL: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Encoded,
    Mapping,
}

#[derive(Debug)]
struct StagingSlot {
    buffer: wgpu::Buffer,
    state: SlotState,
}

/// Ring of mappable staging buffers carrying frames back to the host.
#[derive(Debug)]
pub struct CaptureRing {
    slots: Vec<StagingSlot>,
    signal: Sender<(usize, bool)>,
    ready: Receiver<(usize, bool)>,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    dropped: u64,
    pixels: Vec<u8>,
}

impl CaptureRing {
    /// Allocates the staging slots for frames of the given output size.
    pub fn new(context: &GpuContext, output: &OutputTarget) -> Self {
        let padded_bytes_per_row = padded_bytes_per_row(output.width);
        let slot_size = u64::from(padded_bytes_per_row) * u64::from(output.height);
        let slots = (0..CAPTURE_SLOTS)
            .map(|index| {
                let label = format!("fieldsim_capture_{index}");
                let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&label),
                    size: slot_size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                StagingSlot { buffer, state: SlotState::Free }
            })
            .collect();
        let (signal, ready) = channel();
        CaptureRing {
            slots,
            signal,
            ready,
            width: output.width,
            height: output.height,
            padded_bytes_per_row,
            dropped: 0,
            pixels: Vec::with_capacity(
                (output.width * output.height * BYTES_PER_PIXEL) as usize,
            ),
        }
    }

    /// Encodes a copy of `source` into a free staging slot.
    ///
    /// Returns `false` and drops the frame when every slot is still in
    /// flight.
    pub fn encode_copy(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Texture,
    ) -> bool {
        let free = self
            .slots
            .iter()
            .position(|slot| slot.state == SlotState::Free);
        let Some(index) = free else {
            self.dropped += 1;
            debug!(dropped = self.dropped, "capture ring full, frame dropped");
            return false;
        };
        encoder.copy_texture_to_buffer(
            source.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &self.slots[index].buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.slots[index].state = SlotState::Encoded;
        true
    }

    /// Requests the map of every slot whose copy was submitted.
    ///
    /// Call once per tick, after queue submission. Completion arrives
    /// through the ring's channel and is observed by [`Self::drain`].
    pub fn request_maps(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.state != SlotState::Encoded {
                continue;
            }
            let signal = self.signal.clone();
            slot.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                let _ = signal.send((index, result.is_ok()));
            });
            slot.state = SlotState::Mapping;
        }
    }

    /// Delivers every frame whose mapping has completed.
    ///
    /// Non-blocking. `deliver` receives tightly packed RGBA pixels,
    /// `width * height * 4` bytes per frame, oldest first.
    pub fn drain(&mut self, context: &GpuContext, mut deliver: impl FnMut(&[u8])) {
        context.poll_now();
        while let Ok((index, mapped)) = self.ready.try_recv() {
            let slot = &mut self.slots[index];
            if mapped {
                self.pixels.clear();
                {
                    let data = slot.buffer.slice(..).get_mapped_range();
                    let row_bytes = (self.width * BYTES_PER_PIXEL) as usize;
                    let padded = self.padded_bytes_per_row as usize;
                    for row in 0..self.height as usize {
                        let start = row * padded;
                        self.pixels.extend_from_slice(&data[start..start + row_bytes]);
                    }
                }
                slot.buffer.unmap();
                deliver(&self.pixels);
            } else {
                warn!(slot = index, "frame readback mapping failed");
            }
            slot.state = SlotState::Free;
        }
    }

    /// Blocks until every in-flight capture has been delivered.
    ///
    /// Used at teardown so no committed frame is lost.
    ///
    /// ## Errors
    /// [`GpuError::Poll`] when waiting on the device fails.
    pub fn finish(
        &mut self,
        context: &GpuContext,
        mut deliver: impl FnMut(&[u8]),
    ) -> Result<(), GpuError> {
        self.request_maps();
        while self.in_flight() > 0 {
            context.wait_idle()?;
            self.drain(context, &mut deliver);
        }
        Ok(())
    }

    /// Number of slots currently holding an undelivered frame.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .count()
    }

    /// Number of frames dropped because the ring was full.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Row pitch of a staging slot. Copies between textures and buffers
/// require rows aligned to `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let row = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (row + align - 1) / align * align
}
