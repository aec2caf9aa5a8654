//! Texture upload: image file -> staging texture -> sampled texture.

use std::path::Path;

use anyhow::{Context, Result};
use asset::{Surface, copy_surface_pixels};

use crate::gfx::{
    GraphicsDevice, PixelFormat, Resource, ResourceFactory, Texture, TextureDescription,
    TextureUsage,
};

/// Best-effort load of an image file into a sampled texture.
///
/// Returns `None` when the file or either handle is missing, and when decoding
/// or uploading fails (logged at warn). Callers treat `None` as "no texture".
pub fn load_texture_from_file<P: AsRef<Path>>(
    path: P,
    device: Option<&dyn GraphicsDevice>,
    factory: Option<&dyn ResourceFactory>,
) -> Option<Texture> {
    let path = path.as_ref();
    let (Some(device), Some(factory)) = (device, factory) else {
        log::debug!("No device/factory; skipping texture {:?}", path);
        return None;
    };
    if !path.exists() {
        log::debug!("Texture file {:?} does not exist", path);
        return None;
    }

    let loaded = Surface::decode_file(path)
        .and_then(|surface| create_texture_from_surface(&surface, Some(device), Some(factory)));
    match loaded {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("Failed to load texture {:?}: {:#}", path, e);
            None
        }
    }
}

/// Upload a 32 bpp surface through a staging texture.
///
/// `Ok(None)` if the surface is not 32 bpp or a handle is missing. The staging
/// texture and command list are released once the device has run the copy.
pub fn create_texture_from_surface(
    surface: &Surface,
    device: Option<&dyn GraphicsDevice>,
    factory: Option<&dyn ResourceFactory>,
) -> Result<Option<Texture>> {
    let (Some(device), Some(factory)) = (device, factory) else {
        return Ok(None);
    };
    if !surface.is_bitmap32() {
        log::debug!("Refusing {} bpp surface", surface.bits_per_pixel());
        return Ok(None);
    }

    let (width, height) = (surface.width(), surface.height());
    let staging = factory
        .create_texture(&TextureDescription::texture_2d(
            width,
            height,
            1,
            1,
            PixelFormat::Rgba8Unorm,
            TextureUsage::Staging,
        ))
        .context("Failed to create staging texture")?;
    let sampled = match factory.create_texture(&TextureDescription::texture_2d(
        width,
        height,
        1,
        1,
        PixelFormat::Rgba8Unorm,
        TextureUsage::Sampled,
    )) {
        Ok(t) => t,
        Err(e) => {
            device.dispose_when_idle(Resource::Texture(staging));
            return Err(e).context("Failed to create sampled texture");
        }
    };

    match upload(surface, device, factory, &staging, &sampled) {
        Ok(()) => {
            device.dispose_when_idle(Resource::Texture(staging));
            log::info!("Uploaded {}x{} texture {:?}", width, height, sampled.id());
            Ok(Some(sampled))
        }
        Err(e) => {
            device.dispose_when_idle(Resource::Texture(staging));
            device.dispose_when_idle(Resource::Texture(sampled));
            Err(e)
        }
    }
}

fn upload(
    surface: &Surface,
    device: &dyn GraphicsDevice,
    factory: &dyn ResourceFactory,
    staging: &Texture,
    sampled: &Texture,
) -> Result<()> {
    let mut commands = factory.create_command_list()?;
    commands.begin()?;

    let dst_stride = surface.width() as usize * PixelFormat::Rgba8Unorm.bytes_per_pixel() as usize;
    let mut copied: Result<()> = Ok(());
    device.map_write(staging, &mut |mapped| {
        copied = copy_surface_pixels(surface, mapped.data, dst_stride);
    })?;
    copied.context("Failed to copy surface into staging texture")?;

    commands.copy_texture(staging, sampled)?;
    commands.end()?;
    let submitted = device.submit_commands(&commands);
    device.dispose_when_idle(Resource::CommandList(commands));
    submitted?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::GraphicsBackend;
    use crate::headless::HeadlessDevice;
    use asset::ChannelOrder;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("two_rows.png");
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        img.put_pixel(1, 0, Rgba([4, 5, 6, 255]));
        img.put_pixel(0, 1, Rgba([7, 8, 9, 255]));
        img.put_pixel(1, 1, Rgba([10, 11, 12, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_path_or_handles_give_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path());
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);

        assert!(load_texture_from_file(dir.path().join("nope.png"), Some(&device), Some(&device)).is_none());
        assert!(load_texture_from_file(&path, None, Some(&device)).is_none());
        assert!(load_texture_from_file(&path, Some(&device), None).is_none());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn undecodable_file_gives_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"\x89PNG but not really").unwrap();
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        assert!(load_texture_from_file(&path, Some(&device), Some(&device)).is_none());
    }

    #[test]
    fn loads_flipped_pixels_into_sampled_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path());
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);

        let texture = load_texture_from_file(&path, Some(&device), Some(&device)).unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 2));
        assert_eq!(texture.description().usage, TextureUsage::Sampled);
        assert_eq!(texture.description().mip_levels, 1);
        assert_eq!(texture.description().array_layers, 1);

        // Staging texture stays alive until the copy has run.
        assert_eq!(device.live_textures(), 2);
        assert_eq!(device.pending_releases(), 2);
        device.wait_for_idle().unwrap();
        assert_eq!(device.live_textures(), 1);
        assert_eq!(device.pending_releases(), 0);

        assert_eq!(
            device.texture_bytes(texture.id()).unwrap(),
            vec![7, 8, 9, 255, 10, 11, 12, 255, 1, 2, 3, 255, 4, 5, 6, 255]
        );
    }

    #[test]
    fn bgra_surface_is_swizzled_on_upload() {
        let surface = Surface::from_raw(
            1,
            2,
            32,
            4,
            ChannelOrder::Bgra,
            vec![30, 20, 10, 255, 60, 50, 40, 128],
        )
        .unwrap();
        let device = HeadlessDevice::new(GraphicsBackend::Metal);
        let texture = create_texture_from_surface(&surface, Some(&device), Some(&device))
            .unwrap()
            .unwrap();
        device.wait_for_idle().unwrap();
        assert_eq!(
            device.texture_bytes(texture.id()).unwrap(),
            vec![10, 20, 30, 255, 40, 50, 60, 128]
        );
    }

    #[test]
    fn non_32bpp_surface_is_refused() {
        let surface = Surface::from_raw(2, 1, 24, 6, ChannelOrder::Rgba, vec![0; 6]).unwrap();
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        assert!(create_texture_from_surface(&surface, Some(&device), Some(&device)).unwrap().is_none());
        assert!(create_texture_from_surface(&surface, None, None).unwrap().is_none());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn zero_sized_surface_fails_without_leaking() {
        let surface = Surface::from_raw(0, 0, 32, 0, ChannelOrder::Rgba, Vec::new()).unwrap();
        let device = HeadlessDevice::new(GraphicsBackend::Vulkan);
        assert!(create_texture_from_surface(&surface, Some(&device), Some(&device)).is_err());
        assert_eq!(device.live_textures(), 0);
    }
}
