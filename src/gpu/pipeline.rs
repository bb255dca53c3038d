//! # Frame Realization
//!
//! Turns validated stage programs into live GPU state: shader modules,
//! bind group layouts, compute and render pipelines, the two scratch
//! images the composition chain ping-pongs between, and the output
//! texture the finished frame resolves into. Realization happens once
//! at startup; every tick afterwards re-encodes the same
//! [`FramePlan`](crate::gpu::plan::FramePlan) against this state.
//!
//! ## Bind group contract
//! Every pipeline sees the same group numbering:
//!
//! * group 0: simulation state (parameter uniform plus the storage
//!   buffers documented in [`crate::gpu::buffers`]), read-write for
//!   compute stages and read-only for render stages;
//! * group 1: dedicated buffers at their registry-assigned slots;
//! * group 2: per-stage property overrides (packed uniform at binding
//!   0, shared sampler at binding 1, texture views from binding 2 up);
//!   a stage without overrides gets an empty group so the numbering
//!   never shifts;
//! * group 3 (render stages only): the scratch image carrying the
//!   previous composition result, plus the shared sampler.
//!
//! ## Invariants
//! * Composition stage `i` always reads scratch slot `i % 2`, so its
//!   input bind group is fixed at realization time.
//! * Scratch images and the output target share [`OUTPUT_FORMAT`];
//!   resolving the frame is a plain texture copy.

use tracing::debug;
use wgpu::util::DeviceExt;

use crate::gpu::buffers::{SimulationBuffers, BIND_SIM_PARAMS, GROUP0_STORAGE_BUFFERS};
use crate::gpu::capture::CaptureRing;
use crate::gpu::context::GpuContext;
use crate::gpu::plan::{FrameOp, FramePlan};
use crate::sim::config::OutputTarget;
use crate::sim::stage::{kernel_entry, StageEntry, StageInterface};

/// Texture format shared by the scratch images and the output target.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// One of the two render targets the composition chain alternates
/// between.
#[derive(Debug)]
struct ScratchImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Realized state of one compute stage: one pipeline per sequential
/// kernel, plus the stage's override bind group.
#[derive(Debug)]
struct ComputeStage {
    kernels: Vec<wgpu::ComputePipeline>,
    overrides: wgpu::BindGroup,
}

/// Realized state of one composition stage.
#[derive(Debug)]
struct RenderStage {
    pipeline: wgpu::RenderPipeline,
    overrides: wgpu::BindGroup,
    previous: wgpu::BindGroup,
}

/// Live GPU state for the whole frame: every pipeline, bind group and
/// intermediate image the frame plan needs during encoding.
///
/// Bind groups hold their bound resources alive, so per-stage override
/// uniforms and the shared sampler need no fields of their own.
#[derive(Debug)]
pub struct FramePipelines {
    compute: Vec<ComputeStage>,
    render: Vec<RenderStage>,
    simulation_compute: wgpu::BindGroup,
    simulation_render: wgpu::BindGroup,
    dedicated_compute: wgpu::BindGroup,
    dedicated_render: wgpu::BindGroup,
    scratch: [ScratchImage; 2],
    output: wgpu::Texture,
}

impl FramePipelines {
    /// Realizes every stage against the allocated buffers.
    ///
    /// `compute` and `interfaces` run in lockstep: `interfaces[i]` is
    /// the reflected shape of `compute[i]`. Programs must already have
    /// passed [`StageProgram::validate`](crate::sim::stage::StageProgram::validate),
    /// so realization itself cannot fail short of device loss.
    pub fn build(
        context: &GpuContext,
        buffers: &SimulationBuffers,
        compute: &[StageEntry],
        interfaces: &[StageInterface],
        render: &[StageEntry],
        output: &OutputTarget,
    ) -> Self {
        let device = &context.device;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fieldsim_shared_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let scratch = [
            scratch_image(device, output, 0),
            scratch_image(device, output, 1),
        ];
        let output_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fieldsim_output"),
            size: wgpu::Extent3d {
                width: output.width,
                height: output.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let simulation_compute_layout =
            simulation_layout(device, wgpu::ShaderStages::COMPUTE, false);
        let simulation_render_layout =
            simulation_layout(device, wgpu::ShaderStages::VERTEX_FRAGMENT, true);
        let dedicated_compute_layout =
            dedicated_layout(device, wgpu::ShaderStages::COMPUTE, false, buffers);
        let dedicated_render_layout =
            dedicated_layout(device, wgpu::ShaderStages::VERTEX_FRAGMENT, true, buffers);
        let previous_layout = previous_frame_layout(device);

        let simulation_compute = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fieldsim_simulation_compute"),
            layout: &simulation_compute_layout,
            entries: &buffers.group0_entries(),
        });
        let simulation_render = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fieldsim_simulation_render"),
            layout: &simulation_render_layout,
            entries: &buffers.group0_entries(),
        });
        let dedicated_compute = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fieldsim_dedicated_compute"),
            layout: &dedicated_compute_layout,
            entries: &buffers.dedicated_entries(),
        });
        let dedicated_render = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fieldsim_dedicated_render"),
            layout: &dedicated_render_layout,
            entries: &buffers.dedicated_entries(),
        });

        let compute_stages: Vec<ComputeStage> = compute
            .iter()
            .zip(interfaces)
            .map(|(entry, interface)| {
                let overrides_layout =
                    override_layout(device, wgpu::ShaderStages::COMPUTE, entry);
                let overrides = override_group(device, &overrides_layout, entry, &sampler);
                let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(entry.program.name()),
                    bind_group_layouts: &[
                        &simulation_compute_layout,
                        &dedicated_compute_layout,
                        &overrides_layout,
                    ],
                    push_constant_ranges: &[],
                });
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(entry.program.name()),
                    source: wgpu::ShaderSource::Wgsl(entry.program.source().into()),
                });
                let kernels = (0..interface.kernel_count)
                    .map(|index| {
                        let entry_point = kernel_entry(index);
                        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                            label: Some(entry.program.name()),
                            layout: Some(&layout),
                            module: &module,
                            entry_point: Some(&entry_point),
                            compilation_options: wgpu::PipelineCompilationOptions::default(),
                            cache: None,
                        })
                    })
                    .collect();
                ComputeStage { kernels, overrides }
            })
            .collect();

        let render_stages: Vec<RenderStage> = render
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let overrides_layout =
                    override_layout(device, wgpu::ShaderStages::VERTEX_FRAGMENT, entry);
                let overrides = override_group(device, &overrides_layout, entry, &sampler);
                let previous = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("fieldsim_previous_frame"),
                    layout: &previous_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                &scratch[index % 2].view,
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                });
                let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(entry.program.name()),
                    bind_group_layouts: &[
                        &simulation_render_layout,
                        &dedicated_render_layout,
                        &overrides_layout,
                        &previous_layout,
                    ],
                    push_constant_ranges: &[],
                });
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(entry.program.name()),
                    source: wgpu::ShaderSource::Wgsl(entry.program.source().into()),
                });
                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(entry.program.name()),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some("vs_main"),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        buffers: &[],
                    },
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some("fs_main"),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: OUTPUT_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    multiview: None,
                    cache: None,
                });
                RenderStage { pipeline, overrides, previous }
            })
            .collect();

        debug!(
            compute = compute_stages.len(),
            render = render_stages.len(),
            "realized frame pipelines"
        );

        Self {
            compute: compute_stages,
            render: render_stages,
            simulation_compute,
            simulation_render,
            dedicated_compute,
            dedicated_render,
            scratch,
            output: output_texture,
        }
    }

    /// Encodes every operation of `plan` into `encoder`.
    ///
    /// Capture copies are skipped when no ring is supplied, or when the
    /// ring has no free staging slot this tick.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        plan: &FramePlan,
        mut capture: Option<&mut CaptureRing>,
    ) {
        for op in &plan.ops {
            match *op {
                FrameOp::Dispatch { stage, kernel, workgroups } => {
                    let stage = &self.compute[stage];
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("fieldsim_dispatch"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&stage.kernels[kernel as usize]);
                    pass.set_bind_group(0, &self.simulation_compute, &[]);
                    pass.set_bind_group(1, &self.dedicated_compute, &[]);
                    pass.set_bind_group(2, &stage.overrides, &[]);
                    pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
                }
                FrameOp::ClearScratch { slot } => {
                    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("fieldsim_clear_scratch"),
                        color_attachments: &[Some(clear_attachment(&self.scratch[slot].view))],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                }
                FrameOp::Compose { stage, input: _, output } => {
                    let stage = &self.render[stage];
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("fieldsim_compose"),
                        color_attachments: &[Some(clear_attachment(&self.scratch[output].view))],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    pass.set_pipeline(&stage.pipeline);
                    pass.set_bind_group(0, &self.simulation_render, &[]);
                    pass.set_bind_group(1, &self.dedicated_render, &[]);
                    pass.set_bind_group(2, &stage.overrides, &[]);
                    pass.set_bind_group(3, &stage.previous, &[]);
                    pass.draw(0..3, 0..1);
                }
                FrameOp::ResolveOutput { source } => {
                    encoder.copy_texture_to_texture(
                        self.scratch[source].texture.as_image_copy(),
                        self.output.as_image_copy(),
                        self.extent(),
                    );
                }
                FrameOp::CaptureFrame { source } => {
                    if let Some(ring) = capture.as_deref_mut() {
                        ring.encode_copy(encoder, &self.scratch[source].texture);
                    }
                }
            }
        }
    }

    /// The texture the finished frame resolves into every tick.
    #[inline]
    pub fn output(&self) -> &wgpu::Texture {
        &self.output
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.output.width(),
            height: self.output.height(),
            depth_or_array_layers: 1,
        }
    }
}

fn clear_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
    }
}

fn scratch_image(device: &wgpu::Device, output: &OutputTarget, index: usize) -> ScratchImage {
    let label = format!("fieldsim_scratch_{index}");
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&label),
        size: wgpu::Extent3d {
            width: output.width,
            height: output.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    ScratchImage { texture, view }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn simulation_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(1 + GROUP0_STORAGE_BUFFERS as usize);
    entries.push(uniform_entry(BIND_SIM_PARAMS, visibility));
    for binding in 1..=GROUP0_STORAGE_BUFFERS {
        entries.push(storage_entry(binding, visibility, read_only));
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fieldsim_simulation_layout"),
        entries: &entries,
    })
}

fn dedicated_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    read_only: bool,
    buffers: &SimulationBuffers,
) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = buffers
        .dedicated
        .iter()
        .map(|dedicated| storage_entry(dedicated.slot, visibility, read_only))
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fieldsim_dedicated_layout"),
        entries: &entries,
    })
}

fn override_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    entry: &StageEntry,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::new();
    if !entry.packed_overrides().is_empty() {
        entries.push(uniform_entry(0, visibility));
    }
    let textures = entry.texture_overrides();
    if !textures.is_empty() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        for offset in 0..textures.len() as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + offset,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fieldsim_overrides_layout"),
        entries: &entries,
    })
}

fn override_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    entry: &StageEntry,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let packed = entry.packed_overrides();
    let uniform = (!packed.is_empty()).then(|| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fieldsim_overrides"),
            contents: &packed,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    });
    let textures = entry.texture_overrides();
    let mut entries = Vec::new();
    if let Some(uniform) = &uniform {
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        });
    }
    if !textures.is_empty() {
        entries.push(wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        for (offset, view) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + offset as u32,
                resource: wgpu::BindingResource::TextureView(view.as_ref()),
            });
        }
    }
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(entry.program.name()),
        layout,
        entries: &entries,
    })
}

fn previous_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fieldsim_previous_frame_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}
