//! Still-image capture coordinated with the live render loop.
//!
//! ```text
//!   request() ──▶ Capturing ──run_pending()──▶ Success(path) ──┐
//!                     │                                        ├─tick()─▶ Idle
//!                     └──────────────────────▶ Error(detail) ──┘
//! ```
//!
//! The coordinator is the only code that changes a target's [`OutputConfig`].
//! It raises the pixel density and switches to an opaque background for the
//! export render, and a guard puts the previous configuration back
//! on every exit path before one more normal pass is rendered.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use glam::Vec3;
use image::RgbaImage;
use tracing::{debug, error, info, warn};

use crate::export::ImageSink;
use crate::gradient::hex_color;
use crate::scene::SceneFrame;

/// How long a finished capture stays visible before returning to idle.
pub const STATUS_DISPLAY: Duration = Duration::from_secs(3);
pub const EXPORT_DENSITY_FACTOR: f32 = 2.0;
pub const EXPORT_BACKGROUND: u32 = 0x111827;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Transparent,
    Opaque(Vec3),
}

impl Background {
    pub fn rgba(&self) -> [f32; 4] {
        match self {
            Background::Transparent => [0.0; 4],
            Background::Opaque(color) => [color.x, color.y, color.z, 1.0],
        }
    }
}

/// Presentation settings of a render target that capture temporarily overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputConfig {
    pub pixel_density: f32,
    pub background: Background,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pixel_density: 1.0,
            background: Background::Transparent,
        }
    }
}

impl OutputConfig {
    /// The configuration used while rendering an export.
    pub fn for_export(&self) -> Self {
        Self {
            pixel_density: self.pixel_density * EXPORT_DENSITY_FACTOR,
            background: Background::Opaque(hex_color(EXPORT_BACKGROUND)),
        }
    }

    /// Output size for a base size, never smaller than one pixel.
    pub fn scaled_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |value: u32| ((value as f32 * self.pixel_density).round() as u32).max(1);
        (scale(width), scale(height))
    }
}

/// A surface the coordinator can render into and read back from.
pub trait CaptureTarget {
    fn output_config(&self) -> OutputConfig;

    fn set_output_config(&mut self, config: OutputConfig);

    /// Runs one render pass with the current output configuration.
    fn render(&mut self, frame: &SceneFrame) -> Result<()>;

    /// Reads back the pixels of the most recent render pass.
    fn read_pixels(&mut self) -> Result<RgbaImage>;

    /// Draws the frame over the current background onto a freshly allocated
    /// offscreen surface and returns its pixels.
    fn composite_offscreen(&mut self, frame: &SceneFrame) -> Result<RgbaImage>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("render target is not available")]
    TargetMissing,
    #[error("failed to extract image data: {0}")]
    Extraction(String),
    #[error("failed to export image: {0}")]
    Export(String),
}

pub type CaptureOutcome = std::result::Result<PathBuf, CaptureError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Capturing,
    Success(PathBuf),
    Error(String),
}

impl CaptureStatus {
    /// Text for the status line, `None` while idle.
    pub fn message(&self) -> Option<String> {
        match self {
            CaptureStatus::Idle => None,
            CaptureStatus::Capturing => Some("capturing image...".to_string()),
            CaptureStatus::Success(path) => Some(format!("saved {}", path.display())),
            CaptureStatus::Error(detail) => Some(format!("capture failed: {detail}")),
        }
    }
}

/// Completion handle returned by [`CaptureCoordinator::request`].
#[derive(Debug)]
pub struct CaptureTicket {
    receiver: Receiver<CaptureOutcome>,
}

impl CaptureTicket {
    /// Non-blocking check; `None` while the capture is still pending.
    pub fn try_outcome(&self) -> Option<CaptureOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CaptureError::TargetMissing)),
        }
    }

    /// Blocks until the frame loop has serviced the capture.
    pub fn wait(self) -> CaptureOutcome {
        self.receiver
            .recv()
            .unwrap_or(Err(CaptureError::TargetMissing))
    }
}

#[derive(Debug)]
pub struct CaptureCoordinator {
    status: CaptureStatus,
    pending: Option<Sender<CaptureOutcome>>,
    finished_at: Option<Instant>,
}

impl Default for CaptureCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureCoordinator {
    pub fn new() -> Self {
        Self {
            status: CaptureStatus::Idle,
            pending: None,
            finished_at: None,
        }
    }

    pub fn status(&self) -> &CaptureStatus {
        &self.status
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.status, CaptureStatus::Capturing)
    }

    /// Starts a capture unless one is already running.
    pub fn request(&mut self) -> Option<CaptureTicket> {
        if self.is_capturing() {
            debug!("capture already in progress; ignoring request");
            return None;
        }
        let (sender, receiver) = bounded(1);
        self.pending = Some(sender);
        self.status = CaptureStatus::Capturing;
        self.finished_at = None;
        Some(CaptureTicket { receiver })
    }

    /// Services a pending capture; returns `None` when nothing was requested.
    pub fn run_pending(
        &mut self,
        target: Option<&mut dyn CaptureTarget>,
        frame: &SceneFrame,
        sink: &mut dyn ImageSink,
        now: Instant,
    ) -> Option<CaptureOutcome> {
        let sender = self.pending.take()?;
        let outcome = match target {
            None => Err(CaptureError::TargetMissing),
            Some(target) => capture_with(target, frame, sink),
        };

        match &outcome {
            Ok(path) => {
                info!(path = %path.display(), "captured disc image");
                self.status = CaptureStatus::Success(path.clone());
            }
            Err(err) => {
                error!(error = %err, "disc image capture failed");
                self.status = CaptureStatus::Error(err.to_string());
            }
        }
        self.finished_at = Some(now);
        // The requester may have dropped its ticket.
        let _ = sender.send(outcome.clone());
        Some(outcome)
    }

    /// Returns a finished status to idle once it has been displayed long enough.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(finished_at) = self.finished_at else {
            return false;
        };
        if now.saturating_duration_since(finished_at) < STATUS_DISPLAY {
            return false;
        }
        self.finished_at = None;
        self.status = CaptureStatus::Idle;
        true
    }
}

fn capture_with(
    target: &mut dyn CaptureTarget,
    frame: &SceneFrame,
    sink: &mut dyn ImageSink,
) -> CaptureOutcome {
    let extracted = {
        let mut guard = OutputGuard::apply(target);
        extract(guard.target(), frame)
    };

    if let Err(err) = target.render(frame) {
        warn!(error = %format!("{err:#}"), "failed to render frame after capture");
    }

    let image = extracted?;
    sink.write_image(&image)
        .map_err(|err| CaptureError::Export(format!("{err:#}")))
}

fn extract(
    target: &mut dyn CaptureTarget,
    frame: &SceneFrame,
) -> std::result::Result<RgbaImage, CaptureError> {
    target.render(frame).map_err(extraction_error)?;
    let image = target.read_pixels().map_err(extraction_error)?;
    if is_plausible(&image) {
        return Ok(image);
    }

    warn!(
        width = image.width(),
        height = image.height(),
        "primary readback is empty; compositing onto an offscreen surface"
    );
    let image = target
        .composite_offscreen(frame)
        .map_err(extraction_error)?;
    if is_plausible(&image) {
        Ok(image)
    } else {
        Err(CaptureError::Extraction(
            "rendered image contains no data".to_string(),
        ))
    }
}

fn extraction_error(err: anyhow::Error) -> CaptureError {
    CaptureError::Extraction(format!("{err:#}"))
}

/// An image with no pixels or only zero bytes cannot be a rendered export,
/// since the export background is opaque.
pub fn is_plausible(image: &RgbaImage) -> bool {
    image.width() > 0 && image.height() > 0 && image.as_raw().iter().any(|&byte| byte != 0)
}

/// Applies the export output configuration and restores the saved one on drop.
struct OutputGuard<'a> {
    target: &'a mut dyn CaptureTarget,
    saved: OutputConfig,
}

impl<'a> OutputGuard<'a> {
    fn apply(target: &'a mut dyn CaptureTarget) -> Self {
        let saved = target.output_config();
        let export = saved.for_export();
        debug!(?saved, ?export, "switching render target to export output");
        target.set_output_config(export);
        Self { target, saved }
    }

    fn target(&mut self) -> &mut dyn CaptureTarget {
        &mut *self.target
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        self.target.set_output_config(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::anyhow;
    use discconfig::DiscConfig;

    use super::*;
    use crate::camera::OrbitCamera;
    use crate::runtime::TimeSample;
    use crate::scene::SceneComposer;

    #[derive(Default)]
    struct FakeTarget {
        output: OutputConfig,
        renders: Vec<OutputConfig>,
        readback_empty: bool,
        composite_empty: bool,
        fail_render: bool,
        composites: usize,
    }

    impl FakeTarget {
        fn image(&self, empty: bool) -> RgbaImage {
            let (width, height) = self.output.scaled_size(4, 3);
            if empty {
                RgbaImage::new(width, height)
            } else {
                RgbaImage::from_pixel(width, height, image::Rgba([17, 24, 39, 255]))
            }
        }
    }

    impl CaptureTarget for FakeTarget {
        fn output_config(&self) -> OutputConfig {
            self.output
        }

        fn set_output_config(&mut self, config: OutputConfig) {
            self.output = config;
        }

        fn render(&mut self, _frame: &SceneFrame) -> Result<()> {
            self.renders.push(self.output);
            if self.fail_render && self.output.pixel_density > 1.0 {
                return Err(anyhow!("device lost"));
            }
            Ok(())
        }

        fn read_pixels(&mut self) -> Result<RgbaImage> {
            Ok(self.image(self.readback_empty))
        }

        fn composite_offscreen(&mut self, _frame: &SceneFrame) -> Result<RgbaImage> {
            self.composites += 1;
            Ok(self.image(self.composite_empty))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        images: Vec<RgbaImage>,
        fail: bool,
    }

    impl ImageSink for MemorySink {
        fn write_image(&mut self, image: &RgbaImage) -> Result<PathBuf> {
            if self.fail {
                return Err(anyhow!("disk full"));
            }
            self.images.push(image.clone());
            Ok(Path::new("/virtual").join(format!("image-{}.png", self.images.len())))
        }
    }

    fn frame() -> SceneFrame {
        SceneComposer::default().compose(
            &DiscConfig::default(),
            TimeSample::new(0.0, 0),
            &OrbitCamera::new(),
        )
    }

    #[test]
    fn second_request_is_ignored_while_capturing() {
        let mut coordinator = CaptureCoordinator::new();
        assert!(coordinator.request().is_some());
        assert!(coordinator.request().is_none());
        assert!(coordinator.is_capturing());
    }

    #[test]
    fn run_without_request_does_nothing() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget::default();
        let mut sink = MemorySink::default();
        let outcome = coordinator.run_pending(Some(&mut target), &frame(), &mut sink, Instant::now());
        assert!(outcome.is_none());
        assert!(target.renders.is_empty());
        assert_eq!(coordinator.status(), &CaptureStatus::Idle);
    }

    #[test]
    fn missing_target_reports_error_without_side_effects() {
        let mut coordinator = CaptureCoordinator::new();
        let mut sink = MemorySink::default();
        let ticket = coordinator.request().expect("ticket");
        let outcome = coordinator.run_pending(None, &frame(), &mut sink, Instant::now());

        assert_eq!(outcome, Some(Err(CaptureError::TargetMissing)));
        assert_eq!(ticket.wait(), Err(CaptureError::TargetMissing));
        assert!(matches!(coordinator.status(), CaptureStatus::Error(_)));
        assert!(sink.images.is_empty());
    }

    #[test]
    fn successful_capture_exports_at_double_density_and_restores_output() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget::default();
        let mut sink = MemorySink::default();
        let ticket = coordinator.request().expect("ticket");

        let outcome = coordinator
            .run_pending(Some(&mut target), &frame(), &mut sink, Instant::now())
            .expect("capture ran");

        let path = outcome.expect("capture succeeded");
        assert_eq!(ticket.try_outcome(), Some(Ok(path.clone())));
        assert_eq!(coordinator.status(), &CaptureStatus::Success(path));
        assert_eq!(target.output, OutputConfig::default());
        assert_eq!(target.renders.len(), 2);
        assert_eq!(target.renders[0], OutputConfig::default().for_export());
        assert_eq!(target.renders[1], OutputConfig::default());
        assert_eq!(target.composites, 0);
        assert_eq!(sink.images[0].dimensions(), (8, 6));
    }

    #[test]
    fn empty_readback_falls_back_to_offscreen_composite_once() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget {
            readback_empty: true,
            ..FakeTarget::default()
        };
        let mut sink = MemorySink::default();
        coordinator.request();

        let outcome = coordinator
            .run_pending(Some(&mut target), &frame(), &mut sink, Instant::now())
            .expect("capture ran");
        assert!(outcome.is_ok());
        assert_eq!(target.composites, 1);
        assert_eq!(sink.images.len(), 1);
    }

    #[test]
    fn empty_composite_is_an_extraction_error_and_output_is_restored() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget {
            readback_empty: true,
            composite_empty: true,
            ..FakeTarget::default()
        };
        let mut sink = MemorySink::default();
        coordinator.request();

        let outcome = coordinator
            .run_pending(Some(&mut target), &frame(), &mut sink, Instant::now())
            .expect("capture ran");
        assert!(matches!(outcome, Err(CaptureError::Extraction(_))));
        assert_eq!(target.composites, 1);
        assert_eq!(target.output, OutputConfig::default());
        assert_eq!(target.renders.last(), Some(&OutputConfig::default()));
        assert!(sink.images.is_empty());
    }

    #[test]
    fn render_failure_still_restores_output() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget {
            fail_render: true,
            ..FakeTarget::default()
        };
        let mut sink = MemorySink::default();
        coordinator.request();

        let outcome = coordinator
            .run_pending(Some(&mut target), &frame(), &mut sink, Instant::now())
            .expect("capture ran");
        match outcome {
            Err(CaptureError::Extraction(detail)) => assert!(detail.contains("device lost")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(target.output, OutputConfig::default());
    }

    #[test]
    fn sink_failure_is_an_export_error() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget::default();
        let mut sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        coordinator.request();

        let outcome = coordinator
            .run_pending(Some(&mut target), &frame(), &mut sink, Instant::now())
            .expect("capture ran");
        assert_eq!(outcome, Err(CaptureError::Export("disk full".to_string())));
    }

    #[test]
    fn finished_status_expires_after_display_interval() {
        let mut coordinator = CaptureCoordinator::new();
        let mut target = FakeTarget::default();
        let mut sink = MemorySink::default();
        let start = Instant::now();
        coordinator.request();
        coordinator.run_pending(Some(&mut target), &frame(), &mut sink, start);

        assert!(!coordinator.tick(start + Duration::from_secs(2)));
        assert!(matches!(coordinator.status(), CaptureStatus::Success(_)));
        assert!(coordinator.tick(start + STATUS_DISPLAY));
        assert_eq!(coordinator.status(), &CaptureStatus::Idle);
        assert!(!coordinator.tick(start + Duration::from_secs(10)));
    }

    #[test]
    fn capturing_status_never_expires() {
        let mut coordinator = CaptureCoordinator::new();
        let start = Instant::now();
        coordinator.request();
        assert!(!coordinator.tick(start + Duration::from_secs(60)));
        assert!(coordinator.is_capturing());
    }

    #[test]
    fn new_request_is_accepted_after_completion() {
        let mut coordinator = CaptureCoordinator::new();
        let mut sink = MemorySink::default();
        coordinator.request();
        coordinator.run_pending(None, &frame(), &mut sink, Instant::now());
        assert!(coordinator.request().is_some());
    }

    #[test]
    fn export_config_doubles_density_and_fills_background() {
        let export = OutputConfig {
            pixel_density: 1.5,
            background: Background::Transparent,
        }
        .for_export();
        assert_eq!(export.pixel_density, 3.0);
        assert_eq!(export.background, Background::Opaque(hex_color(0x111827)));
        assert_eq!(export.scaled_size(100, 50), (300, 150));
    }

    #[test]
    fn plausibility_rejects_blank_images() {
        assert!(!is_plausible(&RgbaImage::new(0, 0)));
        assert!(!is_plausible(&RgbaImage::new(4, 4)));
        assert!(is_plausible(&RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 1, 0]))));
    }
}
