//! # GPU Context
//!
//! Device and queue acquisition for the simulation.
//!
//! ## Purpose
//! Owns the long-lived wgpu state every other GPU module borrows: the
//! instance-selected adapter's device and its submission queue.
//!
//! ## Limits
//! The lattice binding table is wide (all state generations are bound to
//! every stage at once), so the context requests a raised
//! `max_storage_buffers_per_shader_stage` at device creation. Adapters
//! that cannot satisfy the requested count fail initialization with a
//! structured error instead of a validation panic at first dispatch.

use tracing::info;

use crate::sim::error::GpuError;

/// Long-lived GPU device state.
///
/// ## Role
/// Created once per orchestrator at initialize time and dropped at
/// release. All buffer, pipeline, and encoder creation goes through this
/// handle.

pub struct GpuContext {

    /// The wgpu device.
    pub device: wgpu::Device,

    /// The device's submission queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {

    /// Acquires an adapter and device, requesting capacity for
    /// `required_storage_buffers` storage bindings per shader stage.
    ///
    /// ## Errors
    /// * [`GpuError::AdapterUnavailable`] — no compatible adapter.
    /// * [`GpuError::LimitExceeded`] — the adapter offers fewer storage
    ///   bindings per stage than the binding table needs.
    /// * [`GpuError::DeviceRequest`] — the adapter refused the device.

    pub fn new(required_storage_buffers: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|_| GpuError::AdapterUnavailable)?;

        let adapter_limits = adapter.limits();
        if adapter_limits.max_storage_buffers_per_shader_stage < required_storage_buffers {
            return Err(GpuError::LimitExceeded {
                limit: "max_storage_buffers_per_shader_stage",
                required: u64::from(required_storage_buffers),
                available: u64::from(adapter_limits.max_storage_buffers_per_shader_stage),
            });
        }

        let required_limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: required_storage_buffers,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fieldsim_device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            ..Default::default()
        }))
        .map_err(|e| GpuError::DeviceRequest { detail: e.to_string() })?;

        let info = adapter.get_info();
        info!(adapter = %info.name, backend = ?info.backend, "GPU context ready");

        Ok(GpuContext { device, queue })
    }

    /// Blocks until every submitted command buffer has completed.
    ///
    /// ## Errors
    /// [`GpuError::Poll`] when the device reports a poll failure.

    pub fn wait_idle(&self) -> Result<(), GpuError> {
        self.device
            .poll(wgpu::PollType::wait())
            .map(|_| ())
            .map_err(|e| GpuError::Poll { detail: format!("{e:?}") })
    }

    /// Processes outstanding device work without blocking, driving
    /// buffer-mapping callbacks.

    pub fn poll_now(&self) {
        // Poll failures surface through the mapping callbacks themselves.
        let _ = self.device.poll(wgpu::PollType::Poll);
    }
}
