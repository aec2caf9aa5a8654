//! Renderer-side helpers: a small graphics abstraction (headless + wgpu),
//! deferred resource release, shader loading and texture upload.
//! wgpu = 26.x

pub mod gfx;
pub mod headless;
pub mod release;
pub mod shaders;
pub mod textures;
pub mod wgpu_backend;

pub use gfx::{GraphicsDevice, ResourceFactory, Shader, Texture};
pub use headless::HeadlessDevice;
pub use shaders::{load_shader, load_shader_for_platform};
pub use textures::{create_texture_from_surface, load_texture_from_file};
pub use wgpu_backend::WgpuDevice;

use corelib::GraphicsBackend;
use gfx::{CommandListId, TextureId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("Texture {0:?} is not a staging texture and cannot be mapped")]
    NotMappable(TextureId),
    #[error("Invalid texture: {0}")]
    InvalidTexture(&'static str),
    #[error("Command list {id:?}: {reason}")]
    CommandListState {
        id: CommandListId,
        reason: &'static str,
    },
    #[error("Copy extent mismatch: source {src:?}, destination {dst:?}")]
    ExtentMismatch { src: (u32, u32), dst: (u32, u32) },
    #[error("Invalid shader: {0}")]
    InvalidShader(String),
    #[error("Shader not supported on {backend}: {reason}")]
    UnsupportedShader {
        backend: GraphicsBackend,
        reason: &'static str,
    },
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type GfxResult<T> = Result<T, GfxError>;
