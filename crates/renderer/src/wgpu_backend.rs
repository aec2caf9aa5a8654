//! wgpu-backed device.
//! wgpu has no host-mappable textures, so staging textures are host buffers that
//! get uploaded with `Queue::write_texture` when a copy is submitted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use asset::{HostPlatform, ShaderFormat};
use parking_lot::Mutex;
use wgpu::{
    CommandEncoderDescriptor, DeviceDescriptor, Extent3d, Instance, InstanceDescriptor,
    Origin3d, PowerPreference, RequestAdapterOptions, TexelCopyBufferLayout, TexelCopyTextureInfo,
    TextureAspect, TextureDimension, TextureFormat, TextureUsages,
};

use crate::gfx::{
    Command, CommandList, CommandListId, GraphicsBackend, GraphicsDevice, MappedTexture,
    PixelFormat, Resource, ResourceFactory, Shader, ShaderDescription, ShaderId, ShaderStage,
    Texture, TextureDescription, TextureId, TextureUsage,
};
use crate::release::ReleaseQueue;
use crate::{GfxError, GfxResult};

struct StagingTexture {
    desc: TextureDescription,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    sampled: HashMap<TextureId, wgpu::Texture>,
    staging: HashMap<TextureId, StagingTexture>,
    shaders: HashMap<ShaderId, wgpu::ShaderModule>,
    submitted: u64,
    release: ReleaseQueue<Resource>,
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn free(&mut self, resource: Resource) {
        match resource {
            Resource::Texture(texture) => {
                self.staging.remove(&texture.id());
                if let Some(t) = self.sampled.remove(&texture.id()) {
                    t.destroy();
                }
            }
            Resource::Shader(shader) => {
                self.shaders.remove(&shader.id());
            }
            Resource::CommandList(_) => {}
        }
    }
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    backend: GraphicsBackend,
    adapter_name: String,
    completed: Arc<AtomicU64>,
    state: Mutex<State>,
}

impl WgpuDevice {
    /// Open a device with no surface, picking an adapter among `backends`.
    pub fn new_headless(backends: wgpu::Backends) -> Result<Self> {
        pollster::block_on(Self::request(backends))
    }

    async fn request(backends: wgpu::Backends) -> Result<Self> {
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let info = adapter.get_info();
        let backend = map_backend(info.backend)?;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Svarog3D Asset Device"),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .context("request_device failed")?;

        log::info!("Opened wgpu device on '{}' ({:?} -> {})", info.name, info.backend, backend);

        Ok(Self {
            device,
            queue,
            backend,
            adapter_name: info.name,
            completed: Arc::new(AtomicU64::new(0)),
            state: Mutex::new(State::default()),
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Raw wgpu texture behind a sampled handle, for binding.
    pub fn wgpu_texture(&self, texture: &Texture) -> Option<wgpu::Texture> {
        self.state.lock().sampled.get(&texture.id()).cloned()
    }

    /// Run `f` inside a validation error scope. wgpu's default handler panics on
    /// uncaptured validation errors.
    fn validated<T>(&self, f: impl FnOnce() -> T) -> GfxResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GfxError::Backend(err.to_string())),
            None => Ok(value),
        }
    }

    pub fn live_textures(&self) -> usize {
        let state = self.state.lock();
        state.sampled.len() + state.staging.len()
    }

    pub fn pending_releases(&self) -> usize {
        self.state.lock().release.len()
    }

    fn collect_garbage(&self, state: &mut State) {
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("wgpu poll failed: {e}");
        }
        let ready = state.release.drain_completed(self.completed.load(Ordering::Acquire));
        for resource in ready {
            state.free(resource);
        }
    }
}

/// Which shader flavour a wgpu adapter backend corresponds to.
pub fn map_backend(backend: wgpu::Backend) -> Result<GraphicsBackend> {
    Ok(match backend {
        wgpu::Backend::Vulkan => GraphicsBackend::Vulkan,
        wgpu::Backend::Metal => GraphicsBackend::Metal,
        wgpu::Backend::Dx12 => GraphicsBackend::Direct3D,
        wgpu::Backend::Gl => {
            if cfg!(any(target_os = "android", target_os = "ios", target_arch = "wasm32")) {
                GraphicsBackend::OpenGLES
            } else {
                GraphicsBackend::OpenGL
            }
        }
        other => bail!("Unsupported wgpu backend {:?}", other),
    })
}

/// naga's GLSL frontend only accepts `main`.
const GLSL_ENTRY_POINT: &str = "main";

fn texture_format(format: PixelFormat) -> TextureFormat {
    match format {
        PixelFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
    }
}

fn glsl_stage(stage: ShaderStage) -> Option<wgpu::naga::ShaderStage> {
    match stage {
        ShaderStage::Vertex => Some(wgpu::naga::ShaderStage::Vertex),
        ShaderStage::Fragment => Some(wgpu::naga::ShaderStage::Fragment),
        ShaderStage::Compute => Some(wgpu::naga::ShaderStage::Compute),
        ShaderStage::Geometry
        | ShaderStage::TessellationControl
        | ShaderStage::TessellationEvaluation => None,
    }
}

impl ResourceFactory for WgpuDevice {
    fn backend(&self) -> GraphicsBackend {
        self.backend
    }

    fn create_shader(&self, desc: &ShaderDescription<'_>) -> GfxResult<Shader> {
        let format = ShaderFormat::select(self.backend, HostPlatform::current());
        if !format.is_text() {
            return Err(GfxError::UnsupportedShader {
                backend: self.backend,
                reason: "precompiled shader libraries cannot be loaded through wgpu",
            });
        }
        let stage = glsl_stage(desc.stage).ok_or(GfxError::UnsupportedShader {
            backend: self.backend,
            reason: "wgpu only has vertex, fragment and compute stages",
        })?;
        if desc.entry_point != GLSL_ENTRY_POINT {
            return Err(GfxError::InvalidShader(format!(
                "GLSL entry point must be '{}', got '{}'",
                GLSL_ENTRY_POINT, desc.entry_point
            )));
        }
        let source = std::str::from_utf8(desc.bytecode)
            .map_err(|e| GfxError::InvalidShader(format!("source is not UTF-8: {e}")))?;

        let module = self
            .validated(|| {
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(desc.stage.lowercase_name()),
                    source: wgpu::ShaderSource::Glsl {
                        shader: source.into(),
                        stage,
                        defines: &[],
                    },
                })
            })
            .map_err(|e| match e {
                GfxError::Backend(msg) => GfxError::InvalidShader(msg),
                other => other,
            })?;

        let mut state = self.state.lock();
        let id = ShaderId(state.alloc_id());
        state.shaders.insert(id, module);
        Ok(Shader::new(id, desc.stage, desc.entry_point))
    }

    fn create_texture(&self, desc: &TextureDescription) -> GfxResult<Texture> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GfxError::InvalidTexture("zero extent"));
        }
        let limits = self.device.limits();
        if desc.width > limits.max_texture_dimension_2d
            || desc.height > limits.max_texture_dimension_2d
        {
            return Err(GfxError::InvalidTexture("extent exceeds the adapter's 2D texture limit"));
        }
        if desc.array_layers > limits.max_texture_array_layers {
            return Err(GfxError::InvalidTexture("too many array layers for the adapter"));
        }

        match desc.usage {
            TextureUsage::Staging => {
                let mut state = self.state.lock();
                let id = TextureId(state.alloc_id());
                state.staging.insert(
                    id,
                    StagingTexture {
                        desc: *desc,
                        data: vec![0; desc.byte_size()],
                    },
                );
                Ok(Texture::new(id, *desc))
            }
            TextureUsage::Sampled => {
                let texture = self.validated(|| {
                    self.device.create_texture(&wgpu::TextureDescriptor {
                        label: Some("Sampled texture"),
                        size: Extent3d {
                            width: desc.width,
                            height: desc.height,
                            depth_or_array_layers: desc.array_layers.max(1),
                        },
                        mip_level_count: desc.mip_levels.max(1),
                        sample_count: 1,
                        dimension: TextureDimension::D2,
                        format: texture_format(desc.format),
                        usage: TextureUsages::TEXTURE_BINDING
                            | TextureUsages::COPY_DST
                            | TextureUsages::COPY_SRC,
                        view_formats: &[],
                    })
                })?;
                let mut state = self.state.lock();
                let id = TextureId(state.alloc_id());
                state.sampled.insert(id, texture);
                Ok(Texture::new(id, *desc))
            }
        }
    }

    fn create_command_list(&self) -> GfxResult<CommandList> {
        let id = CommandListId(self.state.lock().alloc_id());
        Ok(CommandList::new(id))
    }
}

impl GraphicsDevice for WgpuDevice {
    fn factory(&self) -> &dyn ResourceFactory {
        self
    }

    fn map_write(
        &self,
        texture: &Texture,
        write: &mut dyn FnMut(MappedTexture<'_>),
    ) -> GfxResult<()> {
        let mut state = self.state.lock();
        if state.sampled.contains_key(&texture.id()) {
            return Err(GfxError::NotMappable(texture.id()));
        }
        let staging = state
            .staging
            .get_mut(&texture.id())
            .ok_or(GfxError::UnknownTexture(texture.id()))?;
        let row_pitch = staging.desc.row_pitch();
        write(MappedTexture {
            data: &mut staging.data,
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

        // Resolve everything before queueing any upload.
        let mut uploads = Vec::with_capacity(commands.commands().len());
        for command in commands.commands() {
            match *command {
                Command::CopyTexture {
                    src,
                    dst,
                    width,
                    height,
                } => {
                    let source = state.staging.get(&src).ok_or(GfxError::UnknownTexture(src))?;
                    let target = state.sampled.get(&dst).ok_or(GfxError::UnknownTexture(dst))?;
                    uploads.push((source, target, width, height));
                }
            }
        }

        self.validated(|| {
            for &(source, target, width, height) in &uploads {
                self.queue.write_texture(
                    TexelCopyTextureInfo {
                        texture: target,
                        mip_level: 0,
                        origin: Origin3d::ZERO,
                        aspect: TextureAspect::All,
                    },
                    &source.data,
                    TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(source.desc.row_pitch() as u32),
                        rows_per_image: Some(height),
                    },
                    Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                );
            }
        })?;

        let encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Texture upload"),
        });
        self.queue.submit(Some(encoder.finish()));

        state.submitted += 1;
        let serial = state.submitted;
        let completed = self.completed.clone();
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(serial, Ordering::AcqRel);
        });

        log::debug!("Submitted command list {:?} as #{}", commands.id(), serial);
        Ok(())
    }

    fn dispose_when_idle(&self, resource: Resource) {
        let mut state = self.state.lock();
        let serial = state.submitted;
        state.release.push(serial, resource);
        self.collect_garbage(&mut state);
    }

    fn wait_for_idle(&self) -> GfxResult<()> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| GfxError::Backend(e.to_string()))?;

        let mut state = self.state.lock();
        let ready = state.release.drain_all();
        for resource in ready {
            state.free(resource);
        }
        Ok(())
    }
}
