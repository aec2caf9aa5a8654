//! Packed 32-bit pixels and the surface-to-upload-buffer copy.

use anyhow::{Context, Result, ensure};
use bytemuck::{Pod, Zeroable};

use crate::surface::{ChannelOrder, Surface};

/// Four 8-bit channels as stored. Whether `c0` is red or blue depends on the
/// surface the pixel came from.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedPixel {
    pub c0: u8,
    pub c1: u8,
    pub c2: u8,
    pub c3: u8,
}

impl PackedPixel {
    pub const SIZE: usize = std::mem::size_of::<PackedPixel>();

    #[inline]
    pub const fn new(c0: u8, c1: u8, c2: u8, c3: u8) -> Self {
        Self { c0, c1, c2, c3 }
    }

    /// Swap channels 0 and 2 (BGRA <-> RGBA).
    #[inline]
    pub const fn swap_red_blue(self) -> Self {
        Self {
            c0: self.c2,
            c1: self.c1,
            c2: self.c0,
            c3: self.c3,
        }
    }
}

/// Copy `surface` into `dst`, one row every `dst_stride` bytes, producing RGBA.
///
/// Each row copies `min(pitch, dst_stride)` bytes; BGRA surfaces are swizzled
/// pixel by pixel, RGBA rows are block-copied. Whatever is left of a
/// destination row is zeroed.
pub fn copy_surface_pixels(surface: &Surface, dst: &mut [u8], dst_stride: usize) -> Result<()> {
    let height = surface.height() as usize;
    if height == 0 || dst_stride == 0 {
        return Ok(());
    }
    ensure!(
        surface.is_bitmap32(),
        "Pixel copy needs a 32 bpp surface, got {} bpp",
        surface.bits_per_pixel()
    );

    let required = dst_stride
        .checked_mul(height)
        .context("Destination size overflows usize")?;
    ensure!(
        dst.len() >= required,
        "Destination holds {} bytes, need {} ({} rows x {})",
        dst.len(),
        required,
        height,
        dst_stride
    );

    let copy_len = surface.pitch().min(dst_stride);
    let whole_pixels = copy_len - copy_len % PackedPixel::SIZE;

    for (y, dst_row) in dst[..required].chunks_exact_mut(dst_stride).enumerate() {
        let src_row = &surface.row(y)[..copy_len];
        let (written, rest) = dst_row.split_at_mut(copy_len);

        match surface.channel_order() {
            ChannelOrder::Bgra => {
                let src_px: &[PackedPixel] = bytemuck::cast_slice(&src_row[..whole_pixels]);
                let dst_px: &mut [PackedPixel] =
                    bytemuck::cast_slice_mut(&mut written[..whole_pixels]);
                for (out, px) in dst_px.iter_mut().zip(src_px) {
                    *out = px.swap_red_blue();
                }
                written[whole_pixels..].copy_from_slice(&src_row[whole_pixels..]);
            }
            ChannelOrder::Rgba => written.copy_from_slice(src_row),
        }

        rest.fill(0);
    }

    Ok(())
}
