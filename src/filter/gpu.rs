use crate::filter::backend::{BackendKind, CompositingBackend};
use crate::filter::rule::CompositeInputs;
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::PixelBuffer;

const WORKGROUP_SIZE: u32 = 256;
const MAX_GROUPS_PER_DIM: u32 = 65_535;
// Non-finite map coordinates are uploaded as this value. The kernel rejects any coordinate with
// magnitude of at least `COORD_LIMIT` before converting to i32; such points are out of depth
// bounds on the CPU path as well.
const UNMAPPED_SENTINEL: f32 = -1.0e30;

const HOLD_FILTER_WGSL: &str = r#"
struct Params {
  color_w: u32,
  color_h: u32,
  depth_w: u32,
  depth_h: u32,
  near: u32,
  far: u32,
  halo_len: u32,
  pixel_count: u32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> live_px: array<u32>;
@group(0) @binding(2) var<storage, read> held_px: array<u32>;
@group(0) @binding(3) var<storage, read> depth_mm: array<u32>;
@group(0) @binding(4) var<storage, read> coords: array<vec2<f32>>;
@group(0) @binding(5) var<storage, read> halo_off: array<vec2<i32>>;
@group(0) @binding(6) var<storage, read_write> out_px: array<u32>;

const COORD_LIMIT: f32 = 1.0e9;

// v - trunc(v) is exact, so values just below a half never round up.
fn round_half_away(v: f32) -> i32 {
  let t = trunc(v);
  if (abs(v - t) >= 0.5) {
    return i32(t + sign(v));
  }
  return i32(t);
}

fn in_bounds(x: i32, y: i32) -> bool {
  return x >= 0 && y >= 0 && u32(x) < params.depth_w && u32(y) < params.depth_h;
}

@compute @workgroup_size(256)
fn main(
  @builtin(global_invocation_id) gid: vec3<u32>,
  @builtin(num_workgroups) groups: vec3<u32>,
) {
  let i = gid.x + gid.y * groups.x * 256u;
  if (i >= params.pixel_count) {
    return;
  }

  var take_live = false;
  let p = coords[i];
  if (abs(p.x) < COORD_LIMIT && abs(p.y) < COORD_LIMIT) {
    let cx = round_half_away(p.x);
    let cy = round_half_away(p.y);
    if (in_bounds(cx, cy)) {
      take_live = true;
      for (var k = 0u; k < params.halo_len; k = k + 1u) {
        let nx = cx + halo_off[k].x;
        let ny = cy + halo_off[k].y;
        if (!in_bounds(nx, ny)) {
          take_live = false;
          break;
        }
        let d = depth_mm[u32(ny) * params.depth_w + u32(nx)];
        if (d < params.near || d > params.far) {
          take_live = false;
          break;
        }
      }
    }
  }

  if (take_live) {
    out_px[i] = live_px[i];
  } else {
    out_px[i] = held_px[i];
  }
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    color_w: u32,
    color_h: u32,
    depth_w: u32,
    depth_h: u32,
    near: u32,
    far: u32,
    halo_len: u32,
    pixel_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    pixel_count: u64,
    depth_count: u64,
    halo_slots: u64,
}

struct Buffers {
    layout: Layout,
    params: wgpu::Buffer,
    live: wgpu::Buffer,
    held: wgpu::Buffer,
    depth: wgpu::Buffer,
    coords: wgpu::Buffer,
    halo: wgpu::Buffer,
    out: wgpu::Buffer,
    readback: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Compute-shader backend: one invocation per color pixel.
///
/// The device is acquired eagerly in [`GpuBackend::new`] so that an unusable adapter surfaces
/// as [`HoldframeError::BackendUnavailable`] before any frame is filtered. Device buffers are
/// reused while frame geometry stays the same.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    buffers: Option<Buffers>,
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("buffers", &self.buffers.as_ref().map(|b| b.layout))
            .finish_non_exhaustive()
    }
}

impl GpuBackend {
    /// Acquire an adapter and device and compile the kernel.
    pub fn new() -> HoldframeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                HoldframeError::backend_unavailable("no gpu adapter available")
            }
            other => HoldframeError::backend_unavailable(format!(
                "wgpu request_adapter failed: {other:?}"
            )),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("holdframe_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            HoldframeError::backend_unavailable(format!("wgpu request_device failed: {e:?}"))
        })?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("holdframe_hold_filter"),
            source: wgpu::ShaderSource::Wgsl(HOLD_FILTER_WGSL.into()),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("holdframe_hold_filter_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, true),
                storage(3, true),
                storage(4, true),
                storage(5, true),
                storage(6, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("holdframe_hold_filter_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("holdframe_hold_filter_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        tracing::info!(adapter = ?adapter.get_info().name, "gpu compositing backend ready");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            buffers: None,
        })
    }

    fn ensure_buffers(&mut self, layout: Layout) -> HoldframeResult<()> {
        if self.buffers.as_ref().is_some_and(|b| b.layout == layout) {
            return Ok(());
        }

        let pixel_bytes = layout
            .pixel_count
            .checked_mul(4)
            .ok_or_else(|| HoldframeError::invalid_geometry("color buffer size overflow"))?;
        let coord_bytes = layout
            .pixel_count
            .checked_mul(8)
            .ok_or_else(|| HoldframeError::invalid_geometry("map buffer size overflow"))?;
        let depth_bytes = layout
            .depth_count
            .checked_mul(4)
            .ok_or_else(|| HoldframeError::invalid_geometry("depth buffer size overflow"))?;
        let halo_bytes = layout.halo_slots * 8;

        let device = &self.device;
        let input = |label: &'static str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("holdframe_params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let live = input("holdframe_live", pixel_bytes);
        let held = input("holdframe_held", pixel_bytes);
        let depth = input("holdframe_depth", depth_bytes);
        let coords = input("holdframe_coords", coord_bytes);
        let halo = input("holdframe_halo", halo_bytes);
        let out = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("holdframe_out"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("holdframe_readback"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("holdframe_hold_filter_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: live.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: held.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: depth.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: coords.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: halo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: out.as_entire_binding(),
                },
            ],
        });

        tracing::debug!(?layout, "allocated gpu filter buffers");
        self.buffers = Some(Buffers {
            layout,
            params,
            live,
            held,
            depth,
            coords,
            halo,
            out,
            readback,
            bind_group,
        });
        Ok(())
    }
}

impl CompositingBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn composite(&mut self, inputs: &CompositeInputs<'_>) -> HoldframeResult<PixelBuffer> {
        let color = inputs.live.size();
        let depth_size = inputs.depth.size();
        let pixel_count = u32::try_from(color.pixel_count())
            .map_err(|_| HoldframeError::invalid_geometry("color frame too large for gpu"))?;
        let halo_len = u32::try_from(inputs.halo.len())
            .map_err(|_| HoldframeError::invalid_geometry("halo too large for gpu"))?;

        let layout = Layout {
            pixel_count: u64::from(pixel_count),
            depth_count: depth_size.pixel_count() as u64,
            halo_slots: u64::from(halo_len.max(1)),
        };
        self.ensure_buffers(layout)?;
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| HoldframeError::state("gpu buffers not initialized"))?;

        let params = Params {
            color_w: color.width,
            color_h: color.height,
            depth_w: depth_size.width,
            depth_h: depth_size.height,
            near: u32::from(inputs.range.near),
            far: u32::from(inputs.range.far),
            halo_len,
            pixel_count,
        };
        let depth: Vec<u32> = inputs.depth.samples().iter().map(|&d| u32::from(d)).collect();
        let coords: Vec<f32> = inputs
            .map
            .points()
            .iter()
            .flat_map(|p| {
                if p.is_mapped() {
                    [p.x, p.y]
                } else {
                    [UNMAPPED_SENTINEL, UNMAPPED_SENTINEL]
                }
            })
            .collect();
        let mut halo: Vec<i32> = inputs.halo.iter().flat_map(|o| [o.dx, o.dy]).collect();
        if halo.is_empty() {
            halo.extend_from_slice(&[0, 0]);
        }

        self.queue
            .write_buffer(&buffers.params, 0, bytemuck::bytes_of(&params));
        self.queue
            .write_buffer(&buffers.live, 0, inputs.live.as_bytes());
        self.queue
            .write_buffer(&buffers.held, 0, inputs.held.as_bytes());
        self.queue
            .write_buffer(&buffers.depth, 0, bytemuck::cast_slice(&depth));
        self.queue
            .write_buffer(&buffers.coords, 0, bytemuck::cast_slice(&coords));
        self.queue
            .write_buffer(&buffers.halo, 0, bytemuck::cast_slice(&halo));

        let groups = pixel_count.div_ceil(WORKGROUP_SIZE);
        let groups_x = groups.min(MAX_GROUPS_PER_DIM);
        let groups_y = groups.div_ceil(groups_x);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("holdframe_hold_filter_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("holdframe_hold_filter_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        let out_bytes = layout.pixel_count * 4;
        encoder.copy_buffer_to_buffer(&buffers.out, 0, &buffers.readback, 0, out_bytes);
        self.queue.submit(Some(encoder.finish()));

        let slice = buffers.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| HoldframeError::Other(anyhow::anyhow!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| HoldframeError::Other(anyhow::anyhow!("readback channel closed")))?
            .map_err(|e| HoldframeError::Other(anyhow::anyhow!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let data = mapped.to_vec();
        drop(mapped);
        buffers.readback.unmap();

        PixelBuffer::new(color, data)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/gpu.rs"]
mod tests;
