//! wgpu backend for the windowed preview.
//!
//! - `context` owns the instance, device and surface and rebuilds the
//!   swapchain when the window resizes.
//! - `pipeline` builds the bufferless disc pipeline from the GLSL stages in
//!   `compile`.
//! - `uniforms` packs a [`crate::scene::SceneFrame`] into uniform blocks.
//! - `readback` owns offscreen color targets and copies them to host memory.
//! - `state` glues everything together and implements
//!   [`crate::capture::CaptureTarget`] for the window.

mod context;
mod pipeline;
mod readback;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
