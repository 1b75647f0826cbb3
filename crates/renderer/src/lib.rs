//! Renderer crate for discglow, three glowing gradient discs on a shared axis.
//!
//! The overall flow of one frame is:
//!
//! ```text
//!   ConfigStore ──snapshot──┐
//!   TimeSource ──sample─────┼─▶ SceneComposer::compose ─▶ SceneFrame
//!   OrbitCamera ──view──────┘                                  │
//!                           ┌──────────────────────────────────┤
//!                           ▼                                  ▼
//!                 CaptureTarget::render              CaptureCoordinator::run_pending
//!             (GpuState | SoftwareTarget)                      │
//!                                                              ▼
//!                                                 ImageSink (DirectoryExporter)
//! ```
//!
//! `Renderer` is the thin entry point that opens the interactive preview
//! window. Headless callers compose frames themselves and hand them to a
//! [`software::SoftwareTarget`] through the same [`capture::CaptureCoordinator`].

pub mod camera;
pub mod capture;
mod compile;
pub mod controls;
pub mod export;
mod gpu;
pub mod gradient;
pub mod runtime;
pub mod scene;
pub mod software;
pub mod status;
pub mod types;
mod window;

use anyhow::Result;
use discconfig::ConfigStore;

pub use capture::{CaptureCoordinator, CaptureError, CaptureOutcome, CaptureStatus, CaptureTarget};
pub use export::{DirectoryExporter, ImageSink};
pub use runtime::{RenderPolicy, TimeSample};
pub use scene::{SceneComposer, SceneFrame};
pub use types::{Antialiasing, RendererConfig};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the preview window and drives the `winit` event loop until the
    /// window closes. The store is moved into the loop and edited in place by
    /// the keyboard controls.
    pub fn run(&mut self, store: ConfigStore) -> Result<()> {
        window::run(&self.config, store)
    }
}
