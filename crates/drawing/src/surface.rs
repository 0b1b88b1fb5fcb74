//! CPU surface backing a page bitmap

use crate::geometry::PixelRect;

/// An RGBA surface in linear float storage
/// Stores pixels as [f32; 4] in row-major order
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; pixel_count],
        }
    }

    /// Full-surface rectangle
    #[inline]
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// Clear the surface to a solid color
    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    /// Fill one rectangle with a solid color, clamped to the surface
    pub fn clear_rect(&mut self, rect: PixelRect, color: [f32; 4]) {
        let Some(rect) = rect.intersection(&self.bounds()) else {
            return;
        };
        let stride = self.width as usize;
        for y in rect.y..rect.y_end() {
            let start = (y as usize) * stride + rect.x as usize;
            self.pixels[start..start + rect.width as usize].fill(color);
        }
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        Some(self.pixels[index])
    }

    /// Set a pixel; out of bounds is ignored
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [f32; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        self.pixels[index] = color;
    }

    /// Blend a color onto an existing pixel using alpha compositing
    /// Formula: out = src * alpha + dst * (1 - alpha)
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: [f32; 4], opacity: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        let dst = self.pixels[index];

        let src_alpha = (color[3] * opacity).clamp(0.0, 1.0);
        let inv_src_alpha = 1.0 - src_alpha;

        self.pixels[index] = [
            color[0] * src_alpha + dst[0] * inv_src_alpha,
            color[1] * src_alpha + dst[1] * inv_src_alpha,
            color[2] * src_alpha + dst[2] * inv_src_alpha,
            src_alpha + dst[3] * inv_src_alpha,
        ];
    }

    /// Raw float pixel bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Quantize the whole surface to 8-bit RGBA
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            out.extend(pixel.iter().map(|&c| quantize(c)));
        }
        out
    }

    /// Quantize one rectangle to 8-bit RGBA, row-major
    pub fn region_rgba8(&self, rect: PixelRect) -> Vec<u8> {
        let Some(rect) = rect.intersection(&self.bounds()) else {
            return Vec::new();
        };
        let stride = self.width as usize;
        let mut out = Vec::with_capacity((rect.width as usize) * (rect.height as usize) * 4);
        for y in rect.y..rect.y_end() {
            let start = (y as usize) * stride + rect.x as usize;
            for pixel in &self.pixels[start..start + rect.width as usize] {
                out.extend(pixel.iter().map(|&c| quantize(c)));
            }
        }
        out
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }
}

#[inline]
fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
