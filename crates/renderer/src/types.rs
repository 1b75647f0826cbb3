use std::path::PathBuf;

use crate::runtime::RenderPolicy;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Summary of the adapter wgpu selected, used for logging and fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// CPU implementations such as llvmpipe or WARP.
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
            || self.name.to_ascii_lowercase().contains("llvmpipe")
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags: how large the window is, how frames are
/// paced, and where captures are written.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Animate continuously or hold the clock at a fixed time.
    pub policy: RenderPolicy,
    /// Directory receiving captured images and exported configurations.
    pub output_dir: PathBuf,
    /// JSON configuration re-imported by the reload key binding.
    pub config_path: Option<PathBuf>,
}

impl Default for RendererConfig {
    /// Provides a 1280x720 animated configuration writing to the current directory.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            antialiasing: Antialiasing::default(),
            policy: RenderPolicy::default(),
            output_dir: PathBuf::from("."),
            config_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn detects_software_adapters() {
        assert!(profile("llvmpipe (LLVM 15.0.7, 256 bits)", wgpu::DeviceType::Other).is_software());
        assert!(profile("SwiftShader", wgpu::DeviceType::Cpu).is_software());
        assert!(!profile("AMD Radeon RX 6800", wgpu::DeviceType::DiscreteGpu).is_software());
    }
}
