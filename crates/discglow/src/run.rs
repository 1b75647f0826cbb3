use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use discconfig::ConfigStore;
use renderer::camera::OrbitCamera;
use renderer::export::import_config_file;
use renderer::runtime::{FixedTimeSource, TimeSource};
use renderer::software::SoftwareTarget;
use renderer::{
    CaptureCoordinator, CaptureTarget, DirectoryExporter, RenderPolicy, Renderer, RendererConfig,
    SceneComposer,
};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::state::Preferences;

const DEFAULT_SIZE: (u32, u32) = (1280, 720);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Command-line values layered over stored preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub size: (u32, u32),
    pub policy: RenderPolicy,
}

impl Settings {
    pub fn resolve(args: &RunArgs, preferences: &Preferences) -> Self {
        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| preferences.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let size = args
            .size
            .or(preferences.window_size)
            .unwrap_or(DEFAULT_SIZE);
        let policy = match args.time {
            Some(time) => RenderPolicy::Still { time: Some(time) },
            None => RenderPolicy::Animate {
                target_fps: args.fps.filter(|fps| *fps > 0.0),
            },
        };
        Self {
            output_dir,
            size,
            policy,
        }
    }
}

fn load_preferences() -> Result<(AppPaths, Preferences)> {
    let paths = AppPaths::discover()?;
    let preferences = Preferences::load_or_default(&paths.preferences_file())?;
    tracing::debug!(
        config = %paths.config_dir().display(),
        preferences = ?preferences,
        "resolved discglow paths"
    );
    Ok((paths, preferences))
}

/// Builds a store from the defaults and the optional `--config` file.
fn initial_store(config: Option<&Path>) -> Result<ConfigStore> {
    let mut store = ConfigStore::new();
    if let Some(path) = config {
        let report = import_config_file(&mut store, path)?;
        if !report.skipped.is_empty() {
            tracing::warn!(skipped = ?report.skipped, path = %path.display(), "some configuration fields were not applied");
        }
    }
    Ok(store)
}

pub fn run_window(args: &RunArgs) -> Result<()> {
    let (paths, mut preferences) = load_preferences()?;
    let settings = Settings::resolve(args, &preferences);
    let store = initial_store(args.config.as_deref())?;

    if preferences.remember(args.output_dir.as_deref(), args.size) {
        preferences.persist(&paths.preferences_file())?;
    }

    tracing::info!(
        size = ?settings.size,
        policy = ?settings.policy,
        output_dir = %settings.output_dir.display(),
        "starting discglow preview"
    );
    let mut renderer = Renderer::new(RendererConfig {
        surface_size: settings.size,
        antialiasing: args.antialias,
        policy: settings.policy,
        output_dir: settings.output_dir,
        config_path: args.config.clone(),
    });
    renderer.run(store)
}

/// Renders one frame on the CPU and writes it through the capture coordinator.
pub fn run_snapshot(args: &RunArgs) -> Result<PathBuf> {
    let (_, preferences) = load_preferences()?;
    let settings = Settings::resolve(args, &preferences);
    let store = initial_store(args.config.as_deref())?;

    let mut time = FixedTimeSource::new(args.time.unwrap_or(0.0));
    let frame = SceneComposer::default().compose(&store.snapshot(), time.sample(), &OrbitCamera::new());
    let mut target = SoftwareTarget::new(settings.size.0, settings.size.1);
    let mut exporter = DirectoryExporter::new(settings.output_dir);
    let mut coordinator = CaptureCoordinator::new();

    let ticket = coordinator
        .request()
        .context("a capture is already in progress")?;
    let target: &mut dyn CaptureTarget = &mut target;
    coordinator.run_pending(Some(target), &frame, &mut exporter, Instant::now());
    let path = ticket.wait().context("snapshot capture failed")?;
    Ok(path)
}

pub fn run_config_export(args: &RunArgs) -> Result<PathBuf> {
    let (_, preferences) = load_preferences()?;
    let settings = Settings::resolve(args, &preferences);
    let store = initial_store(args.config.as_deref())?;
    DirectoryExporter::new(settings.output_dir).write_config(&store.snapshot())
}

/// Imports `file` into a fresh store and describes the outcome.
pub fn run_config_check(file: &Path) -> Result<String> {
    let input = fs::read_to_string(file)
        .with_context(|| format!("failed to read configuration {}", file.display()))?;
    let mut store = ConfigStore::new();
    let report = store
        .import_json(&input)
        .with_context(|| format!("{} is not a valid disc configuration", file.display()))?;
    Ok(format!(
        "applied: {}\nskipped: {}\n{}",
        list_or_none(&report.applied),
        list_or_none(&report.skipped),
        renderer::status::parameter_summary(&store.snapshot())
    ))
}

fn list_or_none(fields: &[&str]) -> String {
    if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.join(", ")
    }
}
