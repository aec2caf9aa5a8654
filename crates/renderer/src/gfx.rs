//! Backend-neutral graphics surface: resource handles, descriptions, command
//! lists and the factory/device traits the helpers are written against.

pub use corelib::{GraphicsBackend, ShaderStage};

use crate::GfxResult;
use crate::GfxError;

/// Handle for a texture owned by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle for a shader owned by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Handle for a command list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandListId(pub u32);

/// Texel formats the helpers create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8Unorm,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8Unorm => 4,
        }
    }
}

/// What a texture is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureUsage {
    /// Host-writable upload source.
    Staging,
    /// Device-local, bound for sampling.
    Sampled,
}

/// Texture creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub format: PixelFormat,
    pub usage: TextureUsage,
}

impl TextureDescription {
    pub fn texture_2d(
        width: u32,
        height: u32,
        mip_levels: u32,
        array_layers: u32,
        format: PixelFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            width,
            height,
            mip_levels,
            array_layers,
            format,
            usage,
        }
    }

    /// Tightly packed bytes per row of mip 0.
    pub fn row_pitch(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel() as usize
    }

    /// Bytes of mip 0, layer 0.
    pub fn byte_size(&self) -> usize {
        self.row_pitch() * self.height as usize
    }
}

/// A texture handle plus the description it was created from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
    desc: TextureDescription,
}

impl Texture {
    pub fn new(id: TextureId, desc: TextureDescription) -> Self {
        Self { id, desc }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn description(&self) -> &TextureDescription {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }
}

/// Shader creation parameters.
#[derive(Clone, Copy, Debug)]
pub struct ShaderDescription<'a> {
    pub stage: ShaderStage,
    pub bytecode: &'a [u8],
    pub entry_point: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shader {
    id: ShaderId,
    stage: ShaderStage,
    entry_point: String,
}

impl Shader {
    pub fn new(id: ShaderId, stage: ShaderStage, entry_point: impl Into<String>) -> Self {
        Self {
            id,
            stage,
            entry_point: entry_point.into(),
        }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// A recorded GPU command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Full-extent copy of mip 0, layer 0.
    CopyTexture {
        src: TextureId,
        dst: TextureId,
        width: u32,
        height: u32,
    },
}

/// CPU-side command recorder. Submit it to a device after [`CommandList::end`].
#[derive(Debug)]
pub struct CommandList {
    id: CommandListId,
    commands: Vec<Command>,
    recording: bool,
}

impl CommandList {
    pub fn new(id: CommandListId) -> Self {
        Self {
            id,
            commands: Vec::new(),
            recording: false,
        }
    }

    pub fn id(&self) -> CommandListId {
        self.id
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Start recording; previous contents are discarded.
    pub fn begin(&mut self) -> GfxResult<()> {
        if self.recording {
            return Err(GfxError::CommandListState {
                id: self.id,
                reason: "begin called while already recording",
            });
        }
        self.commands.clear();
        self.recording = true;
        Ok(())
    }

    pub fn copy_texture(&mut self, src: &Texture, dst: &Texture) -> GfxResult<()> {
        if !self.recording {
            return Err(GfxError::CommandListState {
                id: self.id,
                reason: "copy recorded outside begin/end",
            });
        }
        if (src.width(), src.height()) != (dst.width(), dst.height()) {
            return Err(GfxError::ExtentMismatch {
                src: (src.width(), src.height()),
                dst: (dst.width(), dst.height()),
            });
        }
        self.commands.push(Command::CopyTexture {
            src: src.id(),
            dst: dst.id(),
            width: src.width(),
            height: src.height(),
        });
        Ok(())
    }

    pub fn end(&mut self) -> GfxResult<()> {
        if !self.recording {
            return Err(GfxError::CommandListState {
                id: self.id,
                reason: "end called without begin",
            });
        }
        self.recording = false;
        Ok(())
    }
}

/// Anything a device can release once idle.
#[derive(Debug)]
pub enum Resource {
    Texture(Texture),
    Shader(Shader),
    CommandList(CommandList),
}

/// Host view of a staging texture while it is mapped.
pub struct MappedTexture<'a> {
    pub data: &'a mut [u8],
    pub row_pitch: usize,
}

/// Creates device resources.
pub trait ResourceFactory: Send + Sync {
    fn backend(&self) -> GraphicsBackend;

    fn create_shader(&self, desc: &ShaderDescription<'_>) -> GfxResult<Shader>;

    fn create_texture(&self, desc: &TextureDescription) -> GfxResult<Texture>;

    fn create_command_list(&self) -> GfxResult<CommandList>;
}

/// Executes work and owns resource lifetimes.
pub trait GraphicsDevice: Send + Sync {
    fn factory(&self) -> &dyn ResourceFactory;

    /// Map a staging texture, hand it to `write`, unmap.
    fn map_write(
        &self,
        texture: &Texture,
        write: &mut dyn FnMut(MappedTexture<'_>),
    ) -> GfxResult<()>;

    /// Queue a finished command list for execution.
    fn submit_commands(&self, commands: &CommandList) -> GfxResult<()>;

    /// Release `resource` once everything submitted so far has completed.
    fn dispose_when_idle(&self, resource: Resource);

    /// Block until submitted work is done, then release deferred resources.
    fn wait_for_idle(&self) -> GfxResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(id: u32, w: u32, h: u32) -> Texture {
        Texture::new(
            TextureId(id),
            TextureDescription::texture_2d(w, h, 1, 1, PixelFormat::Rgba8Unorm, TextureUsage::Sampled),
        )
    }

    #[test]
    fn description_sizes() {
        let desc = TextureDescription::texture_2d(3, 5, 1, 1, PixelFormat::Rgba8Unorm, TextureUsage::Staging);
        assert_eq!(desc.row_pitch(), 12);
        assert_eq!(desc.byte_size(), 60);
    }

    #[test]
    fn command_list_records_between_begin_and_end() {
        let mut cl = CommandList::new(CommandListId(7));
        assert!(cl.copy_texture(&tex(1, 2, 2), &tex(2, 2, 2)).is_err());

        cl.begin().unwrap();
        assert!(cl.begin().is_err());
        cl.copy_texture(&tex(1, 2, 2), &tex(2, 2, 2)).unwrap();
        cl.end().unwrap();

        assert!(!cl.is_recording());
        assert_eq!(
            cl.commands(),
            &[Command::CopyTexture {
                src: TextureId(1),
                dst: TextureId(2),
                width: 2,
                height: 2
            }]
        );
        assert!(cl.end().is_err());
    }

    #[test]
    fn copy_requires_matching_extents() {
        let mut cl = CommandList::new(CommandListId(0));
        cl.begin().unwrap();
        let err = cl.copy_texture(&tex(1, 2, 2), &tex(2, 4, 2)).unwrap_err();
        assert!(matches!(err, GfxError::ExtentMismatch { src: (2, 2), dst: (4, 2) }));
    }
}
