//! CPU rasteriser for the disc scene.
//!
//! Every pixel casts a ray through the inverse view-projection, intersects
//! each disc plane in the disc's unit space and shades hits with
//! [`GradientParams::shade`]. Discs are blended back to front with the same
//! "over" operator the GPU pipeline configures.

use anyhow::{bail, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use image::RgbaImage;

use crate::capture::{CaptureTarget, OutputConfig};
use crate::scene::SceneFrame;

/// Floating point framebuffer; colors are clamped only when converted to bytes.
#[derive(Debug, Clone)]
struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Framebuffer {
    fn filled(width: u32, height: u32, background: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    fn to_image(&self) -> RgbaImage {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            for channel in pixel.to_array() {
                bytes.push((channel.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        // Length always matches the dimensions.
        RgbaImage::from_raw(self.width, self.height, bytes).unwrap_or_else(|| RgbaImage::new(0, 0))
    }
}

/// Headless [`CaptureTarget`] that renders with the CPU.
#[derive(Debug, Clone)]
pub struct SoftwareTarget {
    base_size: (u32, u32),
    output: OutputConfig,
    framebuffer: Option<Framebuffer>,
}

impl SoftwareTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            base_size: (width.max(1), height.max(1)),
            output: OutputConfig::default(),
            framebuffer: None,
        }
    }

    pub fn base_size(&self) -> (u32, u32) {
        self.base_size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.base_size = (width.max(1), height.max(1));
        self.framebuffer = None;
    }

    /// Renders one frame and returns it as an image.
    pub fn render_image(&mut self, frame: &SceneFrame) -> Result<RgbaImage> {
        self.render(frame)?;
        self.read_pixels()
    }

    fn rasterize(&self, frame: &SceneFrame) -> Result<Framebuffer> {
        let (width, height) = self.output.scaled_size(self.base_size.0, self.base_size.1);
        let background = Vec4::from_array(self.output.background.rgba());
        let mut framebuffer = Framebuffer::filled(width, height, background);

        let aspect = width as f32 / height as f32;
        let inverse_view_projection = frame.camera.view_projection(aspect).inverse();
        if !inverse_view_projection.is_finite() {
            bail!("camera projection is not invertible");
        }

        let layers: Vec<DiscLayer> = frame
            .back_to_front()
            .iter()
            .filter_map(|&index| DiscLayer::new(frame, index))
            .collect();

        for y in 0..height {
            let ndc_y = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
            for x in 0..width {
                let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let near = inverse_view_projection.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
                let far = inverse_view_projection.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

                let index = y as usize * width as usize + x as usize;
                let mut pixel = framebuffer.pixels[index];
                for layer in &layers {
                    if let Some(point) = layer.intersect(near, far) {
                        let source = frame.gradient.shade(point, layer.focal_offset, layer.time);
                        pixel = blend_over(source, pixel);
                    }
                }
                framebuffer.pixels[index] = pixel;
            }
        }
        Ok(framebuffer)
    }
}

impl CaptureTarget for SoftwareTarget {
    fn output_config(&self) -> OutputConfig {
        self.output
    }

    fn set_output_config(&mut self, config: OutputConfig) {
        if config != self.output {
            self.output = config;
            self.framebuffer = None;
        }
    }

    fn render(&mut self, frame: &SceneFrame) -> Result<()> {
        self.framebuffer = Some(self.rasterize(frame)?);
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<RgbaImage> {
        Ok(self
            .framebuffer
            .as_ref()
            .map(Framebuffer::to_image)
            .unwrap_or_else(|| RgbaImage::new(0, 0)))
    }

    fn composite_offscreen(&mut self, frame: &SceneFrame) -> Result<RgbaImage> {
        Ok(self.rasterize(frame)?.to_image())
    }
}

struct DiscLayer {
    inverse_model: Mat4,
    focal_offset: Vec2,
    time: f32,
}

impl DiscLayer {
    fn new(frame: &SceneFrame, index: usize) -> Option<Self> {
        let disc = &frame.discs[index];
        let model = frame.model_matrix(disc);
        // Zero radius or eccentricity collapses the disc.
        if model.determinant().abs() <= f32::EPSILON {
            return None;
        }
        Some(Self {
            inverse_model: model.inverse(),
            focal_offset: disc.focal_offset,
            time: disc.clock_time,
        })
    }

    /// Unit-space hit point of the segment `near..far` with the disc.
    fn intersect(&self, near: Vec3, far: Vec3) -> Option<Vec2> {
        let origin = self.inverse_model.transform_point3(near);
        let direction = self.inverse_model.transform_point3(far) - origin;
        if direction.z.abs() <= f32::EPSILON {
            return None;
        }
        let t = -origin.z / direction.z;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        let hit = (origin + direction * t).truncate();
        (hit.length_squared() <= 1.0).then_some(hit)
    }
}

/// Straight-alpha "over": `src·a + dst·(1−a)`, alpha `a + dst_a·(1−a)`.
fn blend_over(source: Vec4, destination: Vec4) -> Vec4 {
    let alpha = source.w.clamp(0.0, 1.0);
    let color = source.truncate().clamp(Vec3::ZERO, Vec3::ONE);
    let blended = color * alpha + destination.truncate() * (1.0 - alpha);
    blended.extend(alpha + destination.w * (1.0 - alpha))
}
