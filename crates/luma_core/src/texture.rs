//! Textures sampled by materials and the background.
//!
//! Colors are linear RGB in `DVec3`. Image textures are decoded once into a
//! float buffer and shared through `Arc`, so a render can read them from any
//! thread without locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use luma_math::{DVec2, DVec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture buffer holds {actual} values, {width}x{height}x{stride} expected")]
    BufferSize {
        width: usize,
        height: usize,
        stride: usize,
        actual: usize,
    },

    #[error("Texture stride must be between 1 and 4, got {0}")]
    Stride(usize),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// How texel coordinates outside `[0, n)` are folded back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    Clamp,
    #[default]
    Repeat,
}

impl WrapMode {
    /// Split a continuous texel coordinate into the two neighbouring texel
    /// indices and the blend weight between them.
    pub fn texels(self, x: f64, n: usize) -> (usize, usize, f64) {
        let f = x.floor();
        let t = x - f;
        let i = f as i64;
        let n = n as i64;
        match self {
            WrapMode::Clamp => {
                let i0 = i.clamp(0, n - 1);
                let i1 = (i + 1).clamp(0, n - 1);
                (i0 as usize, i1 as usize, t)
            }
            WrapMode::Repeat => {
                let i0 = i.rem_euclid(n);
                let i1 = (i0 + 1) % n;
                (i0 as usize, i1 as usize, t)
            }
        }
    }
}

/// Which UV component drives a [`Texture::LinearGradient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientAxis {
    U,
    V,
}

/// A texture lookup over surface UVs.
#[derive(Debug, Clone)]
pub enum Texture {
    /// The same color everywhere
    Constant(DVec3),

    /// `color0` at 0 blending to `color1` at 1 along one UV axis
    LinearGradient {
        color0: DVec3,
        color1: DVec3,
        axis: GradientAxis,
    },

    /// Bilinearly filtered texel buffer
    Buffer(Arc<BufferTexture>),
}

impl Texture {
    pub fn constant(color: DVec3) -> Self {
        Texture::Constant(color)
    }

    /// Sample an RGB color.
    pub fn sample(&self, uv: DVec2) -> DVec3 {
        match self {
            Texture::Constant(color) => *color,
            Texture::LinearGradient {
                color0,
                color1,
                axis,
            } => {
                let t = match axis {
                    GradientAxis::U => uv.x,
                    GradientAxis::V => uv.y,
                };
                let t = t.clamp(-1.0, 1.0);
                *color0 * (1.0 - t) + *color1 * t
            }
            Texture::Buffer(buffer) => buffer.sample(uv),
        }
    }

    /// Sample a single channel, 0..=2 for the non-buffer variants.
    pub fn sample_component(&self, uv: DVec2, component: usize) -> f64 {
        match self {
            Texture::Buffer(buffer) => buffer.sample_component(uv, component),
            _ => self.sample(uv)[component.min(2)],
        }
    }

    /// True if the texture is black everywhere.
    pub fn is_black(&self) -> bool {
        match self {
            Texture::Constant(color) => *color == DVec3::ZERO,
            Texture::LinearGradient { color0, color1, .. } => {
                *color0 == DVec3::ZERO && *color1 == DVec3::ZERO
            }
            Texture::Buffer(_) => false,
        }
    }
}

impl Default for Texture {
    fn default() -> Self {
        Texture::Constant(DVec3::ZERO)
    }
}

impl From<DVec3> for Texture {
    fn from(color: DVec3) -> Self {
        Texture::Constant(color)
    }
}

impl From<Arc<BufferTexture>> for Texture {
    fn from(buffer: Arc<BufferTexture>) -> Self {
        Texture::Buffer(buffer)
    }
}

/// Row-major float texels, `stride` channels each.
///
/// Row 0 is the top of the image: `v = 1` samples the first row and
/// `v = 0` the last.
#[derive(Clone)]
pub struct BufferTexture {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    buffer: Vec<f64>,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,

    /// Where the texels came from (for debugging)
    pub source: String,
}

impl std::fmt::Debug for BufferTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("wrap_u", &self.wrap_u)
            .field("wrap_v", &self.wrap_v)
            .field("source", &self.source)
            .finish()
    }
}

impl BufferTexture {
    /// Wrap an existing texel buffer of 1 to 4 channels. One and two
    /// channel buffers are grey (plus alpha) and sample as grey RGB.
    pub fn new(width: usize, height: usize, stride: usize, buffer: Vec<f64>) -> TextureResult<Self> {
        if !(1..=4).contains(&stride) {
            return Err(TextureError::Stride(stride));
        }
        if buffer.len() != width * height * stride || width == 0 || height == 0 {
            return Err(TextureError::BufferSize {
                width,
                height,
                stride,
                actual: buffer.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            buffer,
            wrap_u: WrapMode::default(),
            wrap_v: WrapMode::default(),
            source: "<buffer>".to_string(),
        })
    }

    /// Build an RGB texture by evaluating `filler(x, y)` for every texel.
    pub fn from_fn(width: usize, height: usize, filler: impl Fn(usize, usize) -> DVec3) -> Self {
        let mut buffer = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let c = filler(x, y);
                buffer.extend_from_slice(&[c.x, c.y, c.z]);
            }
        }
        Self {
            width,
            height,
            stride: 3,
            buffer,
            wrap_u: WrapMode::default(),
            wrap_v: WrapMode::default(),
            source: "<procedural>".to_string(),
        }
    }

    /// Load an image file into linear RGBA texels.
    ///
    /// 8 and 16 bit images are treated as sRGB, float images as linear.
    /// Grey and grey-alpha images are expanded to RGBA.
    pub fn load(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let is_float = matches!(
            img.color(),
            image::ColorType::Rgb32F | image::ColorType::Rgba32F
        );

        let (width, height) = (img.width() as usize, img.height() as usize);
        let mut buffer = Vec::with_capacity(width * height * 4);
        if is_float {
            for p in img.to_rgba32f().pixels() {
                buffer.extend(p.0.iter().map(|&c| c as f64));
            }
        } else {
            for p in img.to_rgba8().pixels() {
                buffer.extend_from_slice(&[
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f64 / 255.0, // Alpha is linear
                ]);
            }
        }

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path.display(),
            width,
            height,
            (buffer.len() * std::mem::size_of::<f64>()) as f64 / 1024.0
        );

        let mut texture = Self::new(width, height, 4, buffer)?;
        texture.source = path.display().to_string();
        Ok(texture)
    }

    /// Set both wrap modes.
    pub fn with_wrap(mut self, wrap_u: WrapMode, wrap_v: WrapMode) -> Self {
        self.wrap_u = wrap_u;
        self.wrap_v = wrap_v;
        self
    }

    fn corners(&self, uv: DVec2) -> ([usize; 4], f64, f64) {
        let (x0, x1, xt) = self
            .wrap_u
            .texels(uv.x * self.width as f64 - 0.5, self.width);
        let (y0, y1, yt) = self
            .wrap_v
            .texels((1.0 - uv.y) * self.height as f64 - 0.5, self.height);
        let index = |x: usize, y: usize| (x + y * self.width) * self.stride;
        (
            [index(x0, y0), index(x1, y0), index(x0, y1), index(x1, y1)],
            xt,
            yt,
        )
    }

    /// Bilinear sample of the first three channels, or of the grey channel.
    pub fn sample(&self, uv: DVec2) -> DVec3 {
        let ([i00, i10, i01, i11], xt, yt) = self.corners(uv);
        let texel = |i: usize| {
            if self.stride < 3 {
                DVec3::splat(self.buffer[i])
            } else {
                DVec3::new(self.buffer[i], self.buffer[i + 1], self.buffer[i + 2])
            }
        };

        let top = texel(i00) * (1.0 - xt) + texel(i10) * xt;
        let bottom = texel(i01) * (1.0 - xt) + texel(i11) * xt;
        top * (1.0 - yt) + bottom * yt
    }

    /// Bilinear sample of one channel, clamped to the available channels.
    pub fn sample_component(&self, uv: DVec2, component: usize) -> f64 {
        let c = component.min(self.stride - 1);
        let ([i00, i10, i01, i11], xt, yt) = self.corners(uv);

        let top = self.buffer[i00 + c] * (1.0 - xt) + self.buffer[i10 + c] * xt;
        let bottom = self.buffer[i01 + c] * (1.0 - xt) + self.buffer[i11 + c] * xt;
        top * (1.0 - yt) + bottom * yt
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.buffer.len() * std::mem::size_of::<f64>()
    }
}

/// Cache for loaded image textures.
///
/// Textures are loaded on-demand and cached for reuse.
#[derive(Default)]
pub struct TextureCache {
    /// Cached textures by file path
    textures: HashMap<String, Arc<BufferTexture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("textures", &self.textures.len())
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<BufferTexture>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let texture = Arc::new(BufferTexture::load(self.resolve_path(path))?);
        self.textures.insert(path.to_string(), texture.clone());
        Ok(texture)
    }

    /// Insert an already built texture under a name.
    pub fn insert(&mut self, name: &str, texture: BufferTexture) -> Arc<BufferTexture> {
        let texture = Arc::new(texture);
        self.textures.insert(name.to_string(), texture.clone());
        texture
    }

    /// Get a cached texture without loading.
    pub fn get(&self, path: &str) -> Option<Arc<BufferTexture>> {
        self.textures.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Get total memory usage of cached textures.
    pub fn total_size_bytes(&self) -> usize {
        self.textures.values().map(|t| t.size_bytes()).sum()
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        match &self.base_dir {
            Some(base) if !path.is_absolute() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f64 {
    let v = value as f64 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
