//! `svarog-assets`: load textures and shaders through the asset helpers and
//! report what happened.

mod config;

use std::path::PathBuf;

use anyhow::Result;
use asset::{DirectoryAssets, HostPlatform, shader_resource_name};
use clap::{Parser, Subcommand};
use config::{AppConfig, DeviceKind};
use corelib::{GraphicsBackend, ShaderStage};
use renderer::{GraphicsDevice, HeadlessDevice, WgpuDevice, load_shader, load_texture_from_file};

#[derive(Debug, Parser)]
#[command(name = "svarog-assets", version, about = "Inspect Svarog3D shader and texture assets")]
struct Cli {
    /// Config file; defaults apply if it does not exist.
    #[arg(long, default_value = "svarog-assets.toml")]
    config: PathBuf,

    #[arg(long, value_enum)]
    device: Option<DeviceKind>,

    /// Shader flavour for the headless device (vulkan, gl, gles, metal, d3d).
    #[arg(long)]
    backend: Option<String>,

    /// wgpu adapter filter: auto|vulkan|dx12|metal|gl
    #[arg(long)]
    gpu_backend: Option<String>,

    /// Shader asset directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode an image and upload it as a sampled texture.
    Texture { path: PathBuf },
    /// Load `{set}-{stage}.{ext}` from the asset directory.
    Shader {
        set: String,
        stage: ShaderStage,
        #[arg(long, default_value = "main")]
        entry: String,
    },
    /// Print the resource name of every backend/stage pair for a shader set.
    Names { set: String },
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(kind) = cli.device {
        config.device.kind = kind;
    }
    if let Some(backend) = &cli.backend {
        config.device.backend = backend.clone();
    }
    if let Some(gpu) = &cli.gpu_backend {
        config.device.gpu_backend = gpu.clone();
    }
    if let Some(root) = &cli.assets {
        config.assets.root = root.clone();
    }
}

fn open_device(config: &AppConfig) -> Result<Box<dyn GraphicsDevice>> {
    Ok(match config.device.kind {
        DeviceKind::Headless => Box::new(HeadlessDevice::new(config.device.graphics_backend()?)),
        DeviceKind::Wgpu => Box::new(WgpuDevice::new_headless(config.device.wgpu_backends())?),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    apply_overrides(&mut config, &cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log.level.as_str()))
        .init();
    log::info!("Starting svarog-assets. Device: {:?}, assets: {:?}", config.device.kind, config.assets.root);
    log::debug!("Config: {:?}", config);

    match &cli.command {
        Command::Names { set } => {
            let platform = HostPlatform::current();
            for backend in GraphicsBackend::ALL {
                for stage in ShaderStage::ALL {
                    println!("{:<9} {}", backend, shader_resource_name(set, stage, backend, platform));
                }
            }
        }
        Command::Texture { path } => {
            let device = open_device(&config)?;
            match load_texture_from_file(path, Some(device.as_ref()), Some(device.factory())) {
                Some(texture) => println!(
                    "{}: {}x{} texture {:?}",
                    path.display(),
                    texture.width(),
                    texture.height(),
                    texture.id()
                ),
                None => println!("{}: no texture", path.display()),
            }
            device.wait_for_idle()?;
        }
        Command::Shader { set, stage, entry } => {
            let device = open_device(&config)?;
            let assets = DirectoryAssets::new(&config.assets.root);
            let shader = load_shader(device.factory(), &assets, set, *stage, entry)?;
            println!("{}-{}: shader {:?} (entry '{}')", set, stage, shader.id(), shader.entry_point());
            device.wait_for_idle()?;
        }
    }

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
