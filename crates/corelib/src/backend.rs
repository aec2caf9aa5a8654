//! Graphics backend and shader stage identifiers.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Graphics API a shader or texture targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphicsBackend {
    Direct3D,
    Vulkan,
    Metal,
    OpenGL,
    OpenGLES,
}

impl GraphicsBackend {
    pub const ALL: [GraphicsBackend; 5] = [
        GraphicsBackend::Direct3D,
        GraphicsBackend::Vulkan,
        GraphicsBackend::Metal,
        GraphicsBackend::OpenGL,
        GraphicsBackend::OpenGLES,
    ];

    /// Backends that consume shader source text rather than a precompiled blob.
    #[inline]
    pub fn uses_text_shaders(self) -> bool {
        matches!(
            self,
            GraphicsBackend::Vulkan | GraphicsBackend::OpenGL | GraphicsBackend::OpenGLES
        )
    }
}

impl fmt::Display for GraphicsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphicsBackend::Direct3D => "direct3d",
            GraphicsBackend::Vulkan => "vulkan",
            GraphicsBackend::Metal => "metal",
            GraphicsBackend::OpenGL => "opengl",
            GraphicsBackend::OpenGLES => "opengles",
        };
        f.write_str(name)
    }
}

impl FromStr for GraphicsBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct3d" | "d3d" | "d3d11" | "dx11" | "dx12" | "d3d12" => Ok(GraphicsBackend::Direct3D),
            "vulkan" | "vk" => Ok(GraphicsBackend::Vulkan),
            "metal" | "mtl" => Ok(GraphicsBackend::Metal),
            "opengl" | "gl" => Ok(GraphicsBackend::OpenGL),
            "opengles" | "gles" => Ok(GraphicsBackend::OpenGLES),
            other => Err(CoreError::UnknownBackend(other.to_string())),
        }
    }
}

/// Programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    TessellationControl,
    TessellationEvaluation,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::Geometry,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// Stage name as it appears in shader resource names.
    pub fn lowercase_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::TessellationControl => "tessellationcontrol",
            ShaderStage::TessellationEvaluation => "tessellationevaluation",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lowercase_name())
    }
}

impl FromStr for ShaderStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        ShaderStage::ALL
            .into_iter()
            .find(|stage| stage.lowercase_name() == lowered)
            .or(match lowered.as_str() {
                "vert" | "vs" => Some(ShaderStage::Vertex),
                "frag" | "fs" | "pixel" | "ps" => Some(ShaderStage::Fragment),
                "comp" | "cs" => Some(ShaderStage::Compute),
                _ => None,
            })
            .ok_or_else(|| CoreError::UnknownShaderStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_aliases_parse() {
        assert_eq!("vk".parse::<GraphicsBackend>(), Ok(GraphicsBackend::Vulkan));
        assert_eq!("GLES".parse::<GraphicsBackend>(), Ok(GraphicsBackend::OpenGLES));
        assert_eq!("dx12".parse::<GraphicsBackend>(), Ok(GraphicsBackend::Direct3D));
        assert_eq!(
            "glide".parse::<GraphicsBackend>(),
            Err(CoreError::UnknownBackend("glide".into()))
        );
    }

    #[test]
    fn backend_display_parses_back() {
        for backend in GraphicsBackend::ALL {
            assert_eq!(backend.to_string().parse::<GraphicsBackend>(), Ok(backend));
        }
    }

    #[test]
    fn stage_names_are_lowercased_variant_names() {
        assert_eq!(ShaderStage::TessellationControl.lowercase_name(), "tessellationcontrol");
        assert_eq!("Fragment".parse::<ShaderStage>(), Ok(ShaderStage::Fragment));
        assert_eq!("vs".parse::<ShaderStage>(), Ok(ShaderStage::Vertex));
        assert!("hull".parse::<ShaderStage>().is_err());
    }
}
