//! Described images: caller memory plus the sampling attributes the engine needs.

pub mod flags;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::foundation::error::{PixError, PixResult};
use crate::foundation::fixed::{Fixed, Transform, fixed_frac, fixed_to_int};
use crate::foundation::math::Argb;
use crate::format::PixelFormat;
use crate::pipeline::dither::DitherMode;

pub use flags::Flags;

/// Largest width or height the 16.16 sampler can address.
pub const MAX_DIMENSION: u32 = 0x7ffe;

/// Stride granularity in bytes: rows start on 32-bit word boundaries.
pub const STRIDE_ALIGN: usize = std::mem::size_of::<u32>();

/// Largest phase-bit count accepted for separable convolution filters.
pub const MAX_PHASE_BITS: i32 = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Repeat {
    /// Samples outside the image are transparent.
    #[default]
    None,
    /// Tile the image.
    Normal,
    /// Clamp to the nearest edge pixel.
    Pad,
    /// Mirror at every edge.
    Reflect,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    Nearest,
    Bilinear,
    /// Dense `w x h` kernel: params `[w, h, weights...]`.
    Convolution,
    /// Phase-indexed 1-D kernels: params
    /// `[w, h, x_phase_bits, y_phase_bits, x weights..., y weights...]`.
    SeparableConvolution,
}

pub type FilterParams = SmallVec<[Fixed; 16]>;

/// Pixel memory behind an [`Image`].
#[derive(Debug)]
pub enum PixelBuffer<'a> {
    Owned(Vec<u8>),
    /// Read-only; the image can be a source or mask but not a destination.
    Shared(&'a [u8]),
    Exclusive(&'a mut [u8]),
}

impl PixelBuffer<'_> {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Shared(s) => s,
            Self::Exclusive(s) => s,
        }
    }

    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Owned(v) => Some(v),
            Self::Shared(_) => None,
            Self::Exclusive(s) => Some(s),
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Shared(_))
    }
}

impl From<Vec<u8>> for PixelBuffer<'static> {
    fn from(v: Vec<u8>) -> Self {
        Self::Owned(v)
    }
}

impl<'a> From<&'a [u8]> for PixelBuffer<'a> {
    fn from(s: &'a [u8]) -> Self {
        Self::Shared(s)
    }
}

impl<'a> From<&'a mut [u8]> for PixelBuffer<'a> {
    fn from(s: &'a mut [u8]) -> Self {
        Self::Exclusive(s)
    }
}

/// An image whose alpha channel replaces the owner's alpha, placed at `origin`.
#[derive(Debug)]
pub struct AlphaMap<'a> {
    image: Box<Image<'a>>,
    origin: (i32, i32),
}

impl<'a> AlphaMap<'a> {
    pub fn image(&self) -> &Image<'a> {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut Image<'a> {
        &mut self.image
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }
}

#[derive(Debug)]
pub struct Image<'a> {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
    row_len: usize,
    buffer: PixelBuffer<'a>,
    transform: Option<Transform>,
    repeat: Repeat,
    filter: FilterKind,
    filter_params: FilterParams,
    alpha_map: Option<AlphaMap<'a>>,
    component_alpha: bool,
    dither: DitherMode,
    dither_offset: (i32, i32),
    flags: Flags,
}

/// Describes caller memory as an image.
///
/// Rejects, as configuration errors: zero or oversized dimensions, a stride that is not a
/// multiple of [`STRIDE_ALIGN`], a stride shorter than one row, and a buffer too short for
/// `height` rows.
pub fn describe_image<'a>(
    format: PixelFormat,
    width: u32,
    height: u32,
    buffer: impl Into<PixelBuffer<'a>>,
    stride: usize,
) -> PixResult<Image<'a>> {
    Image::describe(format, width, height, buffer.into(), stride)
}

impl<'a> Image<'a> {
    fn describe(
        format: PixelFormat,
        width: u32,
        height: u32,
        buffer: PixelBuffer<'a>,
        stride: usize,
    ) -> PixResult<Self> {
        format.validate()?;
        if width == 0 || height == 0 {
            return Err(PixError::configuration(format!(
                "image must not be empty (got {width}x{height})"
            )));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PixError::configuration(format!(
                "image dimensions {width}x{height} exceed {MAX_DIMENSION}"
            )));
        }
        if stride % STRIDE_ALIGN != 0 {
            return Err(PixError::configuration(format!(
                "stride {stride} is not a multiple of {STRIDE_ALIGN} bytes"
            )));
        }
        let row_len = format
            .row_bytes(width as usize)
            .ok_or_else(|| PixError::configuration("row size overflows"))?;
        if stride < row_len {
            return Err(PixError::configuration(format!(
                "stride {stride} is shorter than a {width}-pixel {format} row ({row_len} bytes)"
            )));
        }
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or_else(|| PixError::configuration("image size overflows"))?;
        let have = buffer.bytes().len();
        if have < needed {
            return Err(PixError::configuration(format!(
                "buffer holds {have} bytes, {width}x{height} {format} with stride {stride} needs {needed}"
            )));
        }

        let mut image = Self {
            format,
            width,
            height,
            stride,
            row_len,
            buffer,
            transform: None,
            repeat: Repeat::None,
            filter: FilterKind::Nearest,
            filter_params: FilterParams::new(),
            alpha_map: None,
            component_alpha: false,
            dither: DitherMode::None,
            dither_offset: (0, 0),
            flags: Flags::EMPTY,
        };
        image.refresh_flags();
        Ok(image)
    }

    /// The smallest word-aligned stride for `width` pixels of `format`.
    pub fn min_stride(format: PixelFormat, width: u32) -> Option<usize> {
        let row = format.row_bytes(width as usize)?;
        Some(row.div_ceil(STRIDE_ALIGN) * STRIDE_ALIGN)
    }

    /// Allocates a zeroed image with the minimal stride.
    pub fn new_owned(format: PixelFormat, width: u32, height: u32) -> PixResult<Image<'static>> {
        let stride = Self::min_stride(format, width)
            .ok_or_else(|| PixError::configuration("row size overflows"))?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or_else(|| PixError::configuration("image size overflows"))?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0);
        Image::describe(format, width, height, PixelBuffer::Owned(bytes), stride)
    }

    /// A 1x1 repeating `a8r8g8b8` image holding one premultiplied color.
    pub fn solid(argb: u32) -> Image<'static> {
        let mut image = Image {
            format: PixelFormat::A8R8G8B8,
            width: 1,
            height: 1,
            stride: 4,
            row_len: 4,
            buffer: PixelBuffer::Owned(argb.to_le_bytes().to_vec()),
            transform: None,
            repeat: Repeat::Normal,
            filter: FilterKind::Nearest,
            filter_params: FilterParams::new(),
            alpha_map: None,
            component_alpha: false,
            dither: DitherMode::None,
            dither_offset: (0, 0),
            flags: Flags::EMPTY,
        };
        image.refresh_flags();
        image
    }

    fn refresh_flags(&mut self) {
        self.flags = flags::compute(self);
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        self.buffer.bytes()
    }

    pub fn is_writable(&self) -> bool {
        self.buffer.is_writable()
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    pub fn filter_params(&self) -> &[Fixed] {
        &self.filter_params
    }

    pub fn alpha_map(&self) -> Option<&AlphaMap<'a>> {
        self.alpha_map.as_ref()
    }

    pub(crate) fn alpha_map_mut(&mut self) -> Option<&mut AlphaMap<'a>> {
        self.alpha_map.as_mut()
    }

    pub fn component_alpha(&self) -> bool {
        self.component_alpha
    }

    pub fn dither(&self) -> DitherMode {
        self.dither
    }

    pub fn dither_offset(&self) -> (i32, i32) {
        self.dither_offset
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Sets the destination-to-source transform. The identity is stored as no transform.
    pub fn set_transform(&mut self, transform: Option<Transform>) {
        self.transform = transform.filter(|t| !t.is_identity());
        self.refresh_flags();
    }

    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
        self.refresh_flags();
    }

    /// Sets the resampling filter, validating convolution parameters against their layout.
    pub fn set_filter(&mut self, filter: FilterKind, params: &[Fixed]) -> PixResult<()> {
        validate_filter_params(filter, params)?;
        self.filter = filter;
        self.filter_params = params.iter().copied().collect();
        self.refresh_flags();
        Ok(())
    }

    /// Attaches (or detaches) an alpha map whose top-left corner sits at `(x, y)` in this
    /// image's coordinates.
    pub fn set_alpha_map(&mut self, map: Option<Image<'a>>, x: i32, y: i32) -> PixResult<()> {
        if let Some(map) = &map
            && map.alpha_map.is_some()
        {
            return Err(PixError::configuration(
                "an alpha map cannot carry its own alpha map",
            ));
        }
        self.alpha_map = map.map(|image| AlphaMap {
            image: Box::new(image),
            origin: (x, y),
        });
        self.refresh_flags();
        Ok(())
    }

    pub fn set_component_alpha(&mut self, component_alpha: bool) {
        self.component_alpha = component_alpha;
        self.refresh_flags();
    }

    pub fn set_dither(&mut self, dither: DitherMode) {
        self.dither = dither;
        self.refresh_flags();
    }

    pub fn set_dither_offset(&mut self, x: i32, y: i32) {
        self.dither_offset = (x, y);
        self.refresh_flags();
    }

    pub(crate) fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.buffer.bytes()[start..start + self.row_len]
    }

    pub(crate) fn row_mut(&mut self, y: usize) -> PixResult<&mut [u8]> {
        let start = y * self.stride;
        let len = self.row_len;
        let bytes = self
            .buffer
            .bytes_mut()
            .ok_or_else(|| PixError::configuration("image buffer is read-only"))?;
        Ok(&mut bytes[start..start + len])
    }

    /// Packed `a8r8g8b8` value of the pixel at `(x, y)`; `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height)
            .then(|| self.format.read_narrow(self.row(y as usize), x as usize))
    }

    pub fn pixel_wide(&self, x: u32, y: u32) -> Option<Argb> {
        (x < self.width && y < self.height)
            .then(|| self.format.read_wide(self.row(y as usize), x as usize))
    }

    /// Writes a packed `a8r8g8b8` value, converted to the image format.
    pub fn set_pixel(&mut self, x: u32, y: u32, argb: u32) -> PixResult<()> {
        if x >= self.width || y >= self.height {
            return Err(PixError::configuration(format!(
                "pixel ({x}, {y}) outside {}x{} image",
                self.width, self.height
            )));
        }
        let format = self.format;
        let row = self.row_mut(y as usize)?;
        format.write_narrow(row, x as usize, argb);
        Ok(())
    }

    /// Fills every pixel with a packed `a8r8g8b8` value.
    pub fn fill(&mut self, argb: u32) -> PixResult<()> {
        let format = self.format;
        let width = self.width as usize;
        for y in 0..self.height as usize {
            let row = self.row_mut(y)?;
            for x in 0..width {
                format.write_narrow(row, x, argb);
            }
        }
        Ok(())
    }
}

fn validate_filter_params(filter: FilterKind, params: &[Fixed]) -> PixResult<()> {
    match filter {
        FilterKind::Nearest | FilterKind::Bilinear => {
            if !params.is_empty() {
                return Err(PixError::configuration(format!(
                    "{filter:?} filter takes no parameters"
                )));
            }
        }
        FilterKind::Convolution => {
            let (w, h) = kernel_dims(params)?;
            let expected = 2 + w * h;
            if params.len() != expected {
                return Err(PixError::configuration(format!(
                    "{w}x{h} convolution needs {expected} parameters, got {}",
                    params.len()
                )));
            }
        }
        FilterKind::SeparableConvolution => {
            if params.len() < 4 {
                return Err(PixError::configuration(
                    "separable convolution needs width, height and phase bits",
                ));
            }
            let (w, h) = kernel_dims(params)?;
            let mut phase_bits = [0usize; 2];
            for (slot, &p) in phase_bits.iter_mut().zip(&params[2..4]) {
                let bits = fixed_to_int(p);
                if fixed_frac(p) != 0 || !(0..=MAX_PHASE_BITS).contains(&bits) {
                    return Err(PixError::configuration(format!(
                        "separable convolution phase bits must be an integer in 0..={MAX_PHASE_BITS}"
                    )));
                }
                *slot = bits as usize;
            }
            let expected = 4 + (w << phase_bits[0]) + (h << phase_bits[1]);
            if params.len() != expected {
                return Err(PixError::configuration(format!(
                    "separable {w}x{h} convolution with {}/{} phase bits needs {expected} parameters, got {}",
                    phase_bits[0],
                    phase_bits[1],
                    params.len()
                )));
            }
        }
    }
    Ok(())
}

fn kernel_dims(params: &[Fixed]) -> PixResult<(usize, usize)> {
    if params.len() < 2 {
        return Err(PixError::configuration(
            "convolution needs width and height parameters",
        ));
    }
    let mut dims = [0usize; 2];
    for (slot, &p) in dims.iter_mut().zip(&params[..2]) {
        let v = fixed_to_int(p);
        if fixed_frac(p) != 0 || !(1..=256).contains(&v) {
            return Err(PixError::configuration(
                "convolution kernel dimensions must be integers in 1..=256",
            ));
        }
        *slot = v as usize;
    }
    Ok((dims[0], dims[1]))
}

#[cfg(test)]
#[path = "../../tests/unit/image/mod.rs"]
mod tests;
