//! `svarog-assets.toml`: asset root, device selection, log level.
//! Every field has a default, and a missing file means "all defaults".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use corelib::GraphicsBackend;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub assets: AssetsConfig,
    pub device: DeviceConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding `{set}-{stage}.{ext}` shader files.
    pub root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets/shaders"),
        }
    }
}

/// Which device implementation to drive.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Headless,
    Wgpu,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    /// Shader flavour the headless device accepts.
    pub backend: String,
    /// wgpu adapter filter: auto|vulkan|dx12|metal|gl
    pub gpu_backend: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::Headless,
            backend: "vulkan".to_string(),
            gpu_backend: "auto".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn graphics_backend(&self) -> Result<GraphicsBackend> {
        self.backend
            .parse()
            .with_context(|| format!("Invalid device.backend '{}'", self.backend))
    }

    pub fn wgpu_backends(&self) -> wgpu::Backends {
        match self.gpu_backend.to_ascii_lowercase().as_str() {
            "auto" => wgpu::Backends::all(),
            "vulkan" | "vk" => wgpu::Backends::VULKAN,
            "dx12" | "d3d12" => wgpu::Backends::DX12,
            "metal" | "mtl" => wgpu::Backends::METAL,
            "gl" | "opengl" | "gles" => wgpu::Backends::GL,
            other => {
                log::warn!("Unknown gpu backend '{}', falling back to auto.", other);
                wgpu::Backends::all()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or defaults if it does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}
