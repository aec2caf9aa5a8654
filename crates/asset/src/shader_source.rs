//! Shader resource naming: which file flavour each backend consumes.

use corelib::{GraphicsBackend, ShaderStage};

/// Host family; only matters for Metal, which ships separate desktop and mobile libraries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    MacOs,
    Other,
}

impl HostPlatform {
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Other
        }
    }
}

/// On-disk shader flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderFormat {
    HlslBytecode,
    Glsl450,
    Glsl330,
    Glsles300,
    MetalLib,
    MetalLibIos,
}

impl ShaderFormat {
    pub fn select(backend: GraphicsBackend, platform: HostPlatform) -> Self {
        match (backend, platform) {
            (GraphicsBackend::Direct3D, _) => ShaderFormat::HlslBytecode,
            (GraphicsBackend::Vulkan, _) => ShaderFormat::Glsl450,
            (GraphicsBackend::Metal, HostPlatform::MacOs) => ShaderFormat::MetalLib,
            (GraphicsBackend::Metal, HostPlatform::Other) => ShaderFormat::MetalLibIos,
            (GraphicsBackend::OpenGL, _) => ShaderFormat::Glsl330,
            (GraphicsBackend::OpenGLES, _) => ShaderFormat::Glsles300,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ShaderFormat::HlslBytecode => "hlsl.bytes",
            ShaderFormat::Glsl450 => "450.glsl",
            ShaderFormat::Glsl330 => "330.glsl",
            ShaderFormat::Glsles300 => "300.glsles",
            ShaderFormat::MetalLib => "metallib",
            ShaderFormat::MetalLibIos => "ios.metallib",
        }
    }

    /// True for formats stored as source text rather than compiled blobs.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ShaderFormat::Glsl450 | ShaderFormat::Glsl330 | ShaderFormat::Glsles300
        )
    }
}

/// `{set}-{stage}.{extension}`
pub fn shader_resource_name(
    set: &str,
    stage: ShaderStage,
    backend: GraphicsBackend,
    platform: HostPlatform,
) -> String {
    let format = ShaderFormat::select(backend, platform);
    format!("{}-{}.{}", set, stage.lowercase_name(), format.extension())
}
