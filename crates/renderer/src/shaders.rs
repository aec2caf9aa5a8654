//! Shader loading from named assets.

use anyhow::{Context, Result};
use asset::{AssetSource, HostPlatform, read_embedded_asset_bytes, shader_resource_name};

use crate::gfx::{ResourceFactory, Shader, ShaderDescription, ShaderStage};

/// Load `{set}-{stage}.{ext}` for the factory's backend on this host and build a shader.
pub fn load_shader(
    factory: &dyn ResourceFactory,
    assets: &dyn AssetSource,
    set: &str,
    stage: ShaderStage,
    entry_point: &str,
) -> Result<Shader> {
    load_shader_for_platform(factory, assets, set, stage, entry_point, HostPlatform::current())
}

/// [`load_shader`] with the host platform supplied by the caller.
pub fn load_shader_for_platform(
    factory: &dyn ResourceFactory,
    assets: &dyn AssetSource,
    set: &str,
    stage: ShaderStage,
    entry_point: &str,
    platform: HostPlatform,
) -> Result<Shader> {
    let name = shader_resource_name(set, stage, factory.backend(), platform);
    log::info!("Loading shader '{}' (entry point '{}')", name, entry_point);

    let bytecode = read_embedded_asset_bytes(assets, &name)
        .with_context(|| format!("Failed to read shader asset '{}'", name))?;

    factory
        .create_shader(&ShaderDescription {
            stage,
            bytecode: &bytecode,
            entry_point,
        })
        .with_context(|| format!("Failed to create shader from '{}'", name))
}
