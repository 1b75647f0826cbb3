use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use discconfig::ConfigStore;
use tracing::{error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::camera::OrbitCamera;
use crate::capture::{CaptureCoordinator, CaptureTarget};
use crate::controls::{self, Control};
use crate::export::{import_config_file, DirectoryExporter};
use crate::gpu::GpuState;
use crate::runtime::{RenderPolicy, RenderPolicyDriver};
use crate::scene::SceneComposer;
use crate::status::{parameter_summary, StatusLine};
use crate::types::{AdapterProfile, RendererConfig};

const WINDOW_TITLE: &str = "discglow";
const SOFTWARE_FPS_CAP: f32 = 15.0;
/// Radians of orbit per pixel dragged.
const ORBIT_SENSITIVITY: f32 = 0.005;
/// View-plane offset per pixel dragged, relative to the orbit distance.
const PAN_SENSITIVITY: f32 = 0.001;
/// Distance multiplier per scroll line; scrolling up moves closer.
const ZOOM_STEP: f32 = 0.9;
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;
/// Wake-up interval while a status message waits to expire.
const STATUS_POLL: Duration = Duration::from_millis(250);

/// Everything the preview window needs between events.
struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    mouse: MouseState,
    store: ConfigStore,
    config_dirty: Rc<Cell<bool>>,
    composer: SceneComposer,
    camera: OrbitCamera,
    driver: RenderPolicyDriver,
    coordinator: CaptureCoordinator,
    status: StatusLine,
    exporter: DirectoryExporter,
    config_path: Option<PathBuf>,
    title: String,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig, mut store: ConfigStore) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, config.antialiasing)?;
        let policy = effective_policy(config.policy, gpu.adapter_profile());

        let config_dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&config_dirty);
        store.subscribe(move |_| flag.set(true));

        Ok(Self {
            window,
            gpu,
            mouse: MouseState::default(),
            store,
            config_dirty,
            composer: SceneComposer::default(),
            camera: OrbitCamera::new(),
            driver: RenderPolicyDriver::new(policy),
            coordinator: CaptureCoordinator::new(),
            status: StatusLine::new(),
            exporter: DirectoryExporter::new(config.output_dir.clone()),
            config_path: config.config_path.clone(),
            title: String::new(),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.driver.pacer_mut().invalidate();
    }

    /// Samples the clock and the store once, presents, then services a
    /// pending capture against the same frame.
    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        let sample = self.driver.sample();
        let config = self.store.snapshot();
        let frame = self.composer.compose(&config, sample, &self.camera);

        match self.gpu.present(&frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.size();
                self.gpu.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting preview");
                elwt.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
        }

        let target: &mut dyn CaptureTarget = &mut self.gpu;
        self.coordinator
            .run_pending(Some(target), &frame, &mut self.exporter, now);
        self.driver.pacer_mut().mark_rendered(now);
        self.refresh_title(now);
    }

    /// Expires status text and picks up store changes between frames.
    fn tick(&mut self, now: Instant) {
        let capture_cleared = self.coordinator.tick(now);
        let status_cleared = self.status.expire(now);
        if self.config_dirty.replace(false) {
            self.driver.pacer_mut().invalidate();
        }
        if capture_cleared || status_cleared {
            self.refresh_title(now);
        }
    }

    fn has_status(&self, now: Instant) -> bool {
        self.status.current(now).is_some() || self.coordinator.status().message().is_some()
    }

    fn refresh_title(&mut self, now: Instant) {
        let mut title = format!(
            "{WINDOW_TITLE} | {}",
            parameter_summary(&self.store.snapshot())
        );
        let message = self
            .coordinator
            .status()
            .message()
            .or_else(|| self.status.current(now).map(str::to_owned));
        if let Some(message) = message {
            title.push_str(" | ");
            title.push_str(&message);
        }
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(control) = Control::from_key(&event.logical_key) else {
            return;
        };
        if event.repeat && !matches!(control, Control::Adjust(..)) {
            return;
        }

        let now = Instant::now();
        match control {
            Control::Adjust(parameter, steps) => {
                controls::adjust(&mut self.store, parameter, steps);
            }
            Control::Reset => {
                self.store.reset();
                info!("disc configuration reset to defaults");
            }
            Control::Capture => {
                // The ticket is not needed; the outcome shows up in the status line.
                let _ = self.coordinator.request();
            }
            Control::ExportConfig => match self.exporter.write_config(&self.store.snapshot()) {
                Ok(path) => self
                    .status
                    .show(format!("exported {}", path.display()), now),
                Err(err) => {
                    error!(error = %format!("{err:#}"), "configuration export failed");
                    self.status.show(format!("export failed: {err}"), now);
                }
            },
            Control::ReloadConfig => self.reload_config(now),
        }
        self.driver.pacer_mut().invalidate();
        self.refresh_title(now);
    }

    fn reload_config(&mut self, now: Instant) {
        let Some(path) = self.config_path.clone() else {
            self.status.show("no configuration file to reload", now);
            return;
        };
        match import_config_file(&mut self.store, &path) {
            Ok(report) => self.status.show(
                format!(
                    "imported {} field(s) from {}",
                    report.applied.len(),
                    path.display()
                ),
                now,
            ),
            Err(err) => {
                error!(error = %format!("{err:#}"), "configuration import failed");
                self.status.show(format!("{:#}", err), now);
            }
        }
    }

    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        match self.mouse.handle_cursor_moved(position) {
            Some(Drag::Orbit { dx, dy }) => {
                self.camera
                    .rotate(-dx * ORBIT_SENSITIVITY, dy * ORBIT_SENSITIVITY);
            }
            Some(Drag::Pan { dx, dy }) => {
                self.camera.pan(-dx * PAN_SENSITIVITY, dy * PAN_SENSITIVITY);
            }
            None => return,
        }
        self.driver.pacer_mut().invalidate();
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_SCROLL_LINE,
        };
        if lines == 0.0 {
            return;
        }
        self.camera.zoom(ZOOM_STEP.powf(lines));
        self.driver.pacer_mut().invalidate();
    }
}

/// Caps animation on CPU rasterizers unless the caller asked for a rate.
fn effective_policy(policy: RenderPolicy, profile: &AdapterProfile) -> RenderPolicy {
    match policy {
        RenderPolicy::Animate { target_fps: None } if profile.is_software() => {
            warn!(
                adapter = %profile.name,
                backend = ?profile.backend,
                cap = SOFTWARE_FPS_CAP,
                "software rasterizer detected; capping preview frame rate (override with --fps)"
            );
            RenderPolicy::Animate {
                target_fps: Some(SOFTWARE_FPS_CAP),
            }
        }
        other => other,
    }
}

/// Opens the preview window and drives it until closed.
pub(crate) fn run(config: &RendererConfig, store: ConfigStore) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(window_size)
        .with_transparent(true)
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config, store)?;
    info!(
        adapter = %state.gpu.adapter_profile().name,
        output_dir = %config.output_dir.display(),
        "preview window ready"
    );
    state.refresh_title(Instant::now());
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        state.handle_key(&event);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.handle_cursor_moved(position);
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button,
                        ..
                    } => {
                        state.mouse.handle_button(button, button_state);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        state.handle_scroll(delta);
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        let _ = inner_size_writer.request_inner_size(state.size());
                    }
                    WindowEvent::RedrawRequested => {
                        state.redraw(elwt);
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                state.tick(now);
                let pacer = state.driver.pacer();
                if pacer.ready_for_frame(now) {
                    tracing::trace!("pacer: issuing redraw now");
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = pacer.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else if state.has_status(now) {
                    elwt.set_control_flow(ControlFlow::WaitUntil(now + STATUS_POLL));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
}

/// Pointer position and which drag gesture is active.
#[derive(Debug, Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    orbiting: bool,
    panning: bool,
}

impl MouseState {
    fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.orbiting = pressed,
            MouseButton::Right => self.panning = pressed,
            _ => {}
        }
    }

    /// Returns the drag delta since the previous position, if a button is held.
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<Drag> {
        let previous = self.position.replace(position)?;
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        if self.orbiting {
            Some(Drag::Orbit { dx, dy })
        } else if self.panning {
            Some(Drag::Pan { dx, dy })
        } else {
            None
        }
    }
}
