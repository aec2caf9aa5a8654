//! CPU-only device. Textures live in host memory and submitted command lists run
//! when the device is asked to go idle, so deferred release can be observed.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::gfx::{
    Command, CommandList, CommandListId, GraphicsBackend, GraphicsDevice, MappedTexture,
    Resource, ResourceFactory, Shader, ShaderDescription, ShaderId, Texture, TextureDescription,
    TextureId, TextureUsage,
};
use crate::release::ReleaseQueue;
use crate::{GfxError, GfxResult};

struct HostTexture {
    desc: TextureDescription,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    textures: HashMap<TextureId, HostTexture>,
    shaders: HashMap<ShaderId, Vec<u8>>,
    in_flight: VecDeque<(u64, Vec<Command>)>,
    submitted: u64,
    completed: u64,
    release: ReleaseQueue<Resource>,
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn execute(&mut self, command: &Command) -> GfxResult<()> {
        match *command {
            Command::CopyTexture { src, dst, .. } => {
                let source = self
                    .textures
                    .get(&src)
                    .ok_or(GfxError::UnknownTexture(src))?;
                let extent = (source.desc.width, source.desc.height);
                let data = source.data.clone();
                let target = self
                    .textures
                    .get_mut(&dst)
                    .ok_or(GfxError::UnknownTexture(dst))?;
                if (target.desc.width, target.desc.height) != extent {
                    return Err(GfxError::ExtentMismatch {
                        src: extent,
                        dst: (target.desc.width, target.desc.height),
                    });
                }
                target.data.copy_from_slice(&data);
                Ok(())
            }
        }
    }

    fn free(&mut self, resource: Resource) {
        match resource {
            Resource::Texture(texture) => {
                self.textures.remove(&texture.id());
            }
            Resource::Shader(shader) => {
                self.shaders.remove(&shader.id());
            }
            Resource::CommandList(list) => {
                log::trace!("Released command list {:?}", list.id());
            }
        }
    }
}

/// Device + factory backed by host memory.
pub struct HeadlessDevice {
    backend: GraphicsBackend,
    state: Mutex<State>,
}

impl HeadlessDevice {
    /// `backend` decides which shader flavour this device claims to consume.
    pub fn new(backend: GraphicsBackend) -> Self {
        log::info!("Creating headless device ({})", backend);
        Self {
            backend,
            state: Mutex::new(State::default()),
        }
    }

    /// Copy of a texture's contents, if it is still alive.
    pub fn texture_bytes(&self, id: TextureId) -> Option<Vec<u8>> {
        self.state.lock().textures.get(&id).map(|t| t.data.clone())
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.lock().shaders.len()
    }

    pub fn pending_releases(&self) -> usize {
        self.state.lock().release.len()
    }

    fn validate_shader(&self, desc: &ShaderDescription<'_>) -> GfxResult<()> {
        if desc.bytecode.is_empty() {
            return Err(GfxError::InvalidShader("empty bytecode".into()));
        }
        if desc.entry_point.is_empty() {
            return Err(GfxError::InvalidShader("empty entry point".into()));
        }
        if self.backend.uses_text_shaders() {
            std::str::from_utf8(desc.bytecode)
                .map_err(|e| GfxError::InvalidShader(format!("source is not UTF-8: {e}")))?;
        }
        Ok(())
    }
}

impl ResourceFactory for HeadlessDevice {
    fn backend(&self) -> GraphicsBackend {
        self.backend
    }

    fn create_shader(&self, desc: &ShaderDescription<'_>) -> GfxResult<Shader> {
        self.validate_shader(desc)?;
        let mut state = self.state.lock();
        let id = ShaderId(state.alloc_id());
        state.shaders.insert(id, desc.bytecode.to_vec());
        log::debug!("Created {} shader {:?} ({} bytes)", desc.stage, id, desc.bytecode.len());
        Ok(Shader::new(id, desc.stage, desc.entry_point))
    }

    fn create_texture(&self, desc: &TextureDescription) -> GfxResult<Texture> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GfxError::InvalidTexture("zero extent"));
        }
        if desc.mip_levels != 1 || desc.array_layers != 1 {
            return Err(GfxError::InvalidTexture(
                "headless textures have exactly one mip and one layer",
            ));
        }
        let mut state = self.state.lock();
        let id = TextureId(state.alloc_id());
        state.textures.insert(
            id,
            HostTexture {
                desc: *desc,
                data: vec![0; desc.byte_size()],
            },
        );
        log::debug!("Created {:?} texture {:?} {}x{}", desc.usage, id, desc.width, desc.height);
        Ok(Texture::new(id, *desc))
    }

    fn create_command_list(&self) -> GfxResult<CommandList> {
        let id = CommandListId(self.state.lock().alloc_id());
        Ok(CommandList::new(id))
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn factory(&self) -> &dyn ResourceFactory {
        self
    }

    fn map_write(
        &self,
        texture: &Texture,
        write: &mut dyn FnMut(MappedTexture<'_>),
    ) -> GfxResult<()> {
        let mut state = self.state.lock();
        let host = state
            .textures
            .get_mut(&texture.id())
            .ok_or(GfxError::UnknownTexture(texture.id()))?;
        if host.desc.usage != TextureUsage::Staging {
            return Err(GfxError::NotMappable(texture.id()));
        }
        let row_pitch = host.desc.row_pitch();
        write(MappedTexture {
            data: &mut host.data,
            row_pitch,
        });
        Ok(())
    }

    fn submit_commands(&self, commands: &CommandList) -> GfxResult<()> {
        if commands.is_recording() {
            return Err(GfxError::CommandListState {
                id: commands.id(),
                reason: "submitted before end",
            });
        }
        let mut state = self.state.lock();
        state.submitted += 1;
        let serial = state.submitted;
        state.in_flight.push_back((serial, commands.commands().to_vec()));
        log::debug!(
            "Submitted command list {:?} as #{} ({} commands)",
            commands.id(),
            serial,
            commands.commands().len()
        );
        Ok(())
    }

    fn dispose_when_idle(&self, resource: Resource) {
        let mut state = self.state.lock();
        let serial = state.submitted;
        state.release.push(serial, resource);
        let completed = state.completed;
        let ready = state.release.drain_completed(completed);
        for resource in ready {
            state.free(resource);
        }
    }

    fn wait_for_idle(&self) -> GfxResult<()> {
        let mut state = self.state.lock();
        let mut first_error = None;
        while let Some((serial, commands)) = state.in_flight.pop_front() {
            for command in &commands {
                if let Err(e) = state.execute(command) {
                    log::warn!("Command in submission #{} failed: {}", serial, e);
                    first_error.get_or_insert(e);
                }
            }
            // A failed batch still retires, so its deferred releases drain.
            state.completed = serial;
        }
        let completed = state.completed;
        let ready = state.release.drain_completed(completed);
        for resource in ready {
            state.free(resource);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{PixelFormat, ShaderStage};

    fn desc(usage: TextureUsage) -> TextureDescription {
        TextureDescription::texture_2d(2, 1, 1, 1, PixelFormat::Rgba8Unorm, usage)
    }

    #[test]
    fn only_staging_textures_map() {
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        let sampled = device.create_texture(&desc(TextureUsage::Sampled)).unwrap();
        let err = device.map_write(&sampled, &mut |_| {}).unwrap_err();
        assert!(matches!(err, GfxError::NotMappable(id) if id == sampled.id()));

        let staging = device.create_texture(&desc(TextureUsage::Staging)).unwrap();
        device
            .map_write(&staging, &mut |mapped| {
                assert_eq!(mapped.row_pitch, 8);
                mapped.data.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
            })
            .unwrap();
        assert_eq!(device.texture_bytes(staging.id()).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn copies_run_when_idle_and_release_follows() {
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        let staging = device.create_texture(&desc(TextureUsage::Staging)).unwrap();
        let sampled = device.create_texture(&desc(TextureUsage::Sampled)).unwrap();
        device
            .map_write(&staging, &mut |mapped| mapped.data.fill(9))
            .unwrap();

        let mut cl = device.create_command_list().unwrap();
        cl.begin().unwrap();
        cl.copy_texture(&staging, &sampled).unwrap();
        cl.end().unwrap();
        device.submit_commands(&cl).unwrap();

        device.dispose_when_idle(Resource::Texture(staging.clone()));
        device.dispose_when_idle(Resource::CommandList(cl));
        assert_eq!(device.pending_releases(), 2);
        assert!(device.texture_bytes(staging.id()).is_some());
        assert_eq!(device.texture_bytes(sampled.id()).unwrap(), vec![0; 8]);

        device.wait_for_idle().unwrap();
        assert_eq!(device.pending_releases(), 0);
        assert!(device.texture_bytes(staging.id()).is_none());
        assert_eq!(device.texture_bytes(sampled.id()).unwrap(), vec![9; 8]);
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn failed_copy_still_drains_releases() {
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        let staging = device.create_texture(&desc(TextureUsage::Staging)).unwrap();
        let sampled = device.create_texture(&desc(TextureUsage::Sampled)).unwrap();

        let mut cl = device.create_command_list().unwrap();
        cl.begin().unwrap();
        cl.copy_texture(&staging, &sampled).unwrap();
        cl.end().unwrap();

        // Destination is gone before the copy runs.
        device.dispose_when_idle(Resource::Texture(sampled));
        assert_eq!(device.live_textures(), 1);

        device.submit_commands(&cl).unwrap();
        device.dispose_when_idle(Resource::Texture(staging));
        device.dispose_when_idle(Resource::CommandList(cl));
        assert_eq!(device.pending_releases(), 2);

        assert!(matches!(device.wait_for_idle(), Err(GfxError::UnknownTexture(_))));
        assert_eq!(device.pending_releases(), 0);
        assert_eq!(device.live_textures(), 0);

        device.wait_for_idle().unwrap();
    }

    #[test]
    fn dispose_on_idle_device_is_immediate() {
        let device = HeadlessDevice::new(GraphicsBackend::OpenGL);
        let t = device.create_texture(&desc(TextureUsage::Sampled)).unwrap();
        device.dispose_when_idle(Resource::Texture(t));
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.pending_releases(), 0);
    }

    #[test]
    fn unfinished_command_list_is_rejected() {
        let device = HeadlessDevice::new(GraphicsBackend::Metal);
        let mut cl = device.create_command_list().unwrap();
        cl.begin().unwrap();
        assert!(matches!(
            device.submit_commands(&cl),
            Err(GfxError::CommandListState { .. })
        ));
    }

    #[test]
    fn shader_validation() {
        let gl = HeadlessDevice::new(GraphicsBackend::OpenGL);
        let ok = ShaderDescription {
            stage: ShaderStage::Vertex,
            bytecode: b"#version 330 core\nvoid main() {}",
            entry_point: "main",
        };
        let shader = gl.create_shader(&ok).unwrap();
        assert_eq!(shader.entry_point(), "main");
        assert_eq!(gl.live_shaders(), 1);

        let empty = ShaderDescription { bytecode: b"", ..ok };
        assert!(matches!(gl.create_shader(&empty), Err(GfxError::InvalidShader(_))));

        let binary = ShaderDescription {
            bytecode: &[0xff, 0xfe, 0x00],
            ..ok
        };
        assert!(gl.create_shader(&binary).is_err());
        // Direct3D takes compiled blobs as-is.
        let d3d = HeadlessDevice::new(GraphicsBackend::Direct3D);
        assert!(d3d.create_shader(&binary).is_ok());
    }

    #[test]
    fn zero_sized_textures_are_rejected() {
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        let mut d = desc(TextureUsage::Sampled);
        d.width = 0;
        assert!(matches!(device.create_texture(&d), Err(GfxError::InvalidTexture(_))));
    }
}
