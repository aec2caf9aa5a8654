//! Decoded image surfaces.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::DynamicImage;

/// Byte order of the channels inside each 32-bit pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
}

/// CPU-side image with an explicit row pitch.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    pitch: usize,
    channel_order: ChannelOrder,
    data: Vec<u8>,
}

impl Surface {
    /// Wrap raw rows. `pitch` is taken as given; only the buffer length is checked.
    pub fn from_raw(
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        pitch: usize,
        channel_order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self> {
        let required = pitch
            .checked_mul(height as usize)
            .context("Surface size overflows usize")?;
        ensure!(
            data.len() >= required,
            "Surface data is {} bytes, need {} for {} rows of pitch {}",
            data.len(),
            required,
            height,
            pitch
        );
        Ok(Self {
            width,
            height,
            bits_per_pixel,
            pitch,
            channel_order,
            data,
        })
    }

    /// Take a decoded image, converting to 8-bit RGBA if it is anything else.
    pub fn from_image(img: DynamicImage) -> Self {
        let rgba = match img {
            DynamicImage::ImageRgba8(buf) => buf,
            other => {
                log::debug!("Converting {:?} image to RGBA8", other.color());
                other.to_rgba8()
            }
        };
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            bits_per_pixel: 32,
            pitch: width as usize * 4,
            channel_order: ChannelOrder::Rgba,
            data: rgba.into_raw(),
        }
    }

    /// Decode an image file into a bottom-up, 32 bpp surface.
    pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Decoding image {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let mut surface = Self::from_image(img);
        surface.flip_vertical();

        log::info!(
            "Decoded {}x{} surface ({} bytes)",
            surface.width,
            surface.height,
            surface.data.len()
        );
        Ok(surface)
    }

    /// Reverse row order in place.
    pub fn flip_vertical(&mut self) {
        let pitch = self.pitch;
        let rows = self.height as usize;
        if pitch == 0 {
            return;
        }
        let (mut top, mut bottom) = (0usize, rows.saturating_sub(1));
        while top < bottom {
            let (head, tail) = self.data.split_at_mut(bottom * pitch);
            head[top * pitch..(top + 1) * pitch].swap_with_slice(&mut tail[..pitch]);
            top += 1;
            bottom -= 1;
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    /// Bytes per row, padding included.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub fn is_bitmap32(&self) -> bool {
        self.bits_per_pixel == 32
    }

    /// Row `y`, `pitch` bytes long.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.pitch;
        &self.data[start..start + self.pitch]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn from_raw_rejects_short_buffers() {
        assert!(Surface::from_raw(2, 2, 32, 8, ChannelOrder::Rgba, vec![0; 15]).is_err());
        assert!(Surface::from_raw(2, 2, 32, 8, ChannelOrder::Rgba, vec![0; 16]).is_ok());
    }

    #[test]
    fn rgb_input_is_normalized_to_32bpp() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let surface = Surface::from_image(DynamicImage::ImageRgb8(img));
        assert!(surface.is_bitmap32());
        assert_eq!(surface.pitch(), 12);
        assert_eq!(&surface.row(1)[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn flip_vertical_reverses_rows() {
        let data = vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
        let mut surface = Surface::from_raw(1, 3, 32, 4, ChannelOrder::Rgba, data).unwrap();
        surface.flip_vertical();
        assert_eq!(surface.data(), &[3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn decode_file_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.png");
        let mut img = GrayImage::new(1, 2);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(0, 1, Luma([200]));
        img.save(&path).unwrap();

        let surface = Surface::decode_file(&path).unwrap();
        assert_eq!((surface.width(), surface.height()), (1, 2));
        // Top row of the file ends up last.
        assert_eq!(surface.row(0), &[200, 200, 200, 255]);
        assert_eq!(surface.row(1), &[0, 0, 0, 255]);
    }

    #[test]
    fn decode_file_reports_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(Surface::decode_file(&path).is_err());
    }
}
