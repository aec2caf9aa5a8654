//! Asset loading: named asset sources, shader resource naming, image surfaces
//! and the pixel copy used for texture uploads.

pub mod embedded;
pub mod pixel;
pub mod shader_source;
pub mod surface;

pub use embedded::{AssetSource, AssetStream, DirectoryAssets, EmbeddedAssets, read_embedded_asset_bytes};
pub use pixel::{PackedPixel, copy_surface_pixels};
pub use shader_source::{HostPlatform, ShaderFormat, shader_resource_name};
pub use surface::{ChannelOrder, Surface};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset '{0}' not found")]
    NotFound(String),
    #[error("Invalid asset name '{0}'")]
    InvalidName(String),
    #[error("Asset '{name}' is too large to load ({len} bytes)")]
    TooLarge { name: String, len: u64 },
    #[error("Failed to read asset '{name}'")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
