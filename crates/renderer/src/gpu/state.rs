use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::capture::{Background, CaptureTarget, OutputConfig};
use crate::compile::DISC_VERTEX_COUNT;
use crate::scene::SceneFrame;
use crate::types::{AdapterProfile, Antialiasing};

use super::context::GpuContext;
use super::pipeline::{DiscPipeline, PipelineLayouts};
use super::readback::{read_texture, OffscreenTarget, CAPTURE_FORMAT};
use super::uniforms::{DiscUniforms, FrameUniforms};

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, size: usize, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

/// GPU resources for presenting discs to the window and capturing them.
///
/// ```text
///   SceneFrame ─▶ FrameUniforms ─┐
///              ─▶ DiscUniforms×3 ┼─▶ surface pipeline ─▶ swapchain (MSAA resolve)
///                                └─▶ capture pipeline ─▶ OffscreenTarget ─▶ readback
/// ```
pub(crate) struct GpuState {
    context: GpuContext,
    _layouts: PipelineLayouts,
    surface_pipeline: DiscPipeline,
    capture_pipeline: DiscPipeline,
    frame_slot: UniformSlot,
    disc_slots: Vec<UniformSlot>,
    multisample_target: Option<MultisampleTarget>,
    output: OutputConfig,
    capture: Option<OffscreenTarget>,
    last_fps_update: Instant,
    frames_since_last_update: u32,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing)?;
        let device = &context.device;
        let layouts = PipelineLayouts::new(device);
        let surface_pipeline =
            DiscPipeline::new(device, &layouts, context.surface_format, context.sample_count);
        let capture_pipeline = DiscPipeline::new(device, &layouts, CAPTURE_FORMAT, 1);

        let frame_slot = UniformSlot::new(
            device,
            &layouts.frame_layout,
            std::mem::size_of::<FrameUniforms>(),
            "frame uniforms",
        );
        let disc_slots = (0..3)
            .map(|_| {
                UniformSlot::new(
                    device,
                    &layouts.disc_layout,
                    std::mem::size_of::<DiscUniforms>(),
                    "disc uniforms",
                )
            })
            .collect();

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        Ok(Self {
            context,
            _layouts: layouts,
            surface_pipeline,
            capture_pipeline,
            frame_slot,
            disc_slots,
            multisample_target,
            output: OutputConfig::default(),
            capture: None,
            last_fps_update: Instant::now(),
            frames_since_last_update: 0,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.multisample_target = (self.context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            )
        });
        if self.capture.is_some() {
            self.capture = self.allocate_offscreen().ok();
        }
    }

    /// Draws the frame into the swapchain and presents it.
    pub(crate) fn present(&mut self, frame: &SceneFrame) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.context.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.write_uniforms(frame);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("surface encoder"),
                });
        let (attachment, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        self.encode_discs(
            &mut encoder,
            &self.surface_pipeline,
            attachment,
            resolve_target,
            frame,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.record_frame_stats(frame);
        Ok(())
    }

    fn record_frame_stats(&mut self, frame: &SceneFrame) {
        let now = Instant::now();
        self.frames_since_last_update += 1;
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = fps.round(),
                frame_index = frame.frame_index,
                time = frame.clock_time,
                "render stats"
            );
        }
    }

    fn write_uniforms(&self, frame: &SceneFrame) {
        let queue = &self.context.queue;
        let uniforms = FrameUniforms::from_frame(frame, self.context.aspect());
        queue.write_buffer(&self.frame_slot.buffer, 0, bytemuck::bytes_of(&uniforms));
        for (slot, disc) in self.disc_slots.iter().zip(frame.discs.iter()) {
            let uniforms = DiscUniforms::from_disc(frame, disc);
            queue.write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniforms));
        }
    }

    fn encode_discs(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &DiscPipeline,
        attachment: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
        frame: &SceneFrame,
    ) {
        let [r, g, b, a] = self.output.background.rgba().map(f64::from);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("disc pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&pipeline.pipeline);
        render_pass.set_bind_group(0, &self.frame_slot.bind_group, &[]);
        for index in frame.back_to_front() {
            render_pass.set_bind_group(1, &self.disc_slots[index].bind_group, &[]);
            render_pass.draw(0..DISC_VERTEX_COUNT, 0..1);
        }
    }

    fn draw_offscreen(&self, target: &OffscreenTarget, frame: &SceneFrame) {
        self.write_uniforms(frame);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("capture encoder"),
                });
        self.encode_discs(&mut encoder, &self.capture_pipeline, &target.view, None, frame);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn allocate_offscreen(&self) -> Result<OffscreenTarget> {
        let size = self.context.size;
        let (width, height) = self.output.scaled_size(size.width, size.height);
        let max = self.context.max_texture_dimension();
        if width > max || height > max {
            bail!("capture size {width}x{height} exceeds the GPU limit of {max}");
        }
        Ok(OffscreenTarget::new(&self.context.device, width, height))
    }
}

impl CaptureTarget for GpuState {
    fn output_config(&self) -> OutputConfig {
        self.output
    }

    fn set_output_config(&mut self, config: OutputConfig) {
        self.output = config;
        let presenting_only =
            config.pixel_density == 1.0 && config.background == Background::Transparent;
        self.capture = if presenting_only {
            None
        } else {
            match self.allocate_offscreen() {
                Ok(target) => Some(target),
                Err(err) => {
                    warn!(error = %err, "unable to allocate capture target");
                    None
                }
            }
        };
    }

    fn render(&mut self, frame: &SceneFrame) -> Result<()> {
        if let Some(capture) = self.capture.as_ref() {
            self.draw_offscreen(capture, frame);
        }
        match self.present(frame) {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.size();
                self.resize(size);
                Ok(())
            }
            Err(err) => Err(anyhow!("surface error: {err}")),
        }
    }

    fn read_pixels(&mut self) -> Result<RgbaImage> {
        match self.capture.as_ref() {
            Some(target) => read_texture(&self.context.device, &self.context.queue, target),
            None => Ok(RgbaImage::new(0, 0)),
        }
    }

    fn composite_offscreen(&mut self, frame: &SceneFrame) -> Result<RgbaImage> {
        let target = self.allocate_offscreen()?;
        self.draw_offscreen(&target, frame);
        read_texture(&self.context.device, &self.context.queue, &target)
    }
}
