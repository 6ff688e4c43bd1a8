//! Pixel accumulation and image output.

use std::path::Path;

use image::{ImageResult, Rgb, RgbImage};
use luma_math::DVec3;

use crate::material::Color;

/// Display gamma applied when writing 8-bit images.
pub const GAMMA: f64 = 2.2;

/// Running sum of radiance samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pixel {
    sum: Color,
    count: u64,
}

impl Pixel {
    pub fn accumulate(&mut self, color: Color) {
        self.sum += color;
        self.count += 1;
    }

    /// Merge `count` samples summing to `sum`.
    pub fn accumulate_sum(&mut self, sum: Color, count: u64) {
        self.sum += sum;
        self.count += count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean radiance, black when nothing was accumulated.
    pub fn rgb(&self) -> Color {
        if self.count == 0 {
            DVec3::ZERO
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Gamma-encode one linear channel to 8 bits.
pub fn to_display(linear: f64) -> u8 {
    let v = linear.clamp(0.0, 1.0).powf(1.0 / GAMMA);
    (v * 255.0 + 0.5) as u8
}

/// Pixel accumulators for a whole image, row-major.
#[derive(Debug, Clone)]
pub struct Film {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Film {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> &Pixel {
        &self.pixels[y * self.width + x]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut Pixel {
        &mut self.pixels[y * self.width + x]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn total_samples(&self) -> u64 {
        self.pixels.iter().map(Pixel::count).sum()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Pixel::default());
    }

    /// 8-bit sRGB-ish image.
    ///
    /// The camera sees the scene mirrored, so columns are flipped here.
    pub fn to_image(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixel(self.width - 1 - x, y).rgb();
                img.put_pixel(x as u32, y as u32, Rgb([to_display(c.x), to_display(c.y), to_display(c.z)]));
            }
        }
        img
    }

    /// Write the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.to_image().save(path)
    }
}
