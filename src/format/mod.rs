//! Pixel format descriptors.
//!
//! A [`PixelFormat`] records how one pixel is laid out in memory: bits per pixel, channel
//! order and per-channel bit counts. Pixels are little-endian words; channels are
//! premultiplied. Formats without an alpha channel read as opaque.

mod access;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PixError, PixResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelOrder {
    /// Blue in the low bits, alpha in the high bits.
    Argb,
    /// Red in the low bits, alpha in the high bits.
    Abgr,
    /// Blue in the high bits, alpha in the low bits.
    Bgra,
    /// Red in the high bits, alpha in the low bits.
    Rgba,
    /// Alpha only.
    A,
    /// 32-bit float channels stored red, green, blue, alpha.
    Float,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    bpp: u8,
    order: ChannelOrder,
    a: u8,
    r: u8,
    g: u8,
    b: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Shifts {
    pub a: u32,
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl PixelFormat {
    pub const A8R8G8B8: Self = Self::packed(32, ChannelOrder::Argb, 8, 8, 8, 8);
    pub const X8R8G8B8: Self = Self::packed(32, ChannelOrder::Argb, 0, 8, 8, 8);
    pub const A8B8G8R8: Self = Self::packed(32, ChannelOrder::Abgr, 8, 8, 8, 8);
    pub const X8B8G8R8: Self = Self::packed(32, ChannelOrder::Abgr, 0, 8, 8, 8);
    pub const B8G8R8A8: Self = Self::packed(32, ChannelOrder::Bgra, 8, 8, 8, 8);
    pub const B8G8R8X8: Self = Self::packed(32, ChannelOrder::Bgra, 0, 8, 8, 8);
    pub const R8G8B8A8: Self = Self::packed(32, ChannelOrder::Rgba, 8, 8, 8, 8);
    pub const R8G8B8X8: Self = Self::packed(32, ChannelOrder::Rgba, 0, 8, 8, 8);
    pub const A2R10G10B10: Self = Self::packed(32, ChannelOrder::Argb, 2, 10, 10, 10);
    pub const X2R10G10B10: Self = Self::packed(32, ChannelOrder::Argb, 0, 10, 10, 10);
    pub const A2B10G10R10: Self = Self::packed(32, ChannelOrder::Abgr, 2, 10, 10, 10);
    pub const X2B10G10R10: Self = Self::packed(32, ChannelOrder::Abgr, 0, 10, 10, 10);

    pub const R8G8B8: Self = Self::packed(24, ChannelOrder::Argb, 0, 8, 8, 8);
    pub const B8G8R8: Self = Self::packed(24, ChannelOrder::Abgr, 0, 8, 8, 8);

    pub const R5G6B5: Self = Self::packed(16, ChannelOrder::Argb, 0, 5, 6, 5);
    pub const B5G6R5: Self = Self::packed(16, ChannelOrder::Abgr, 0, 5, 6, 5);
    pub const A1R5G5B5: Self = Self::packed(16, ChannelOrder::Argb, 1, 5, 5, 5);
    pub const X1R5G5B5: Self = Self::packed(16, ChannelOrder::Argb, 0, 5, 5, 5);
    pub const A4R4G4B4: Self = Self::packed(16, ChannelOrder::Argb, 4, 4, 4, 4);
    pub const X4R4G4B4: Self = Self::packed(16, ChannelOrder::Argb, 0, 4, 4, 4);

    pub const A8: Self = Self::packed(8, ChannelOrder::A, 8, 0, 0, 0);
    pub const R3G3B2: Self = Self::packed(8, ChannelOrder::Argb, 0, 3, 3, 2);
    pub const A4: Self = Self::packed(4, ChannelOrder::A, 4, 0, 0, 0);
    pub const A1: Self = Self::packed(1, ChannelOrder::A, 1, 0, 0, 0);

    pub const RGBA_FLOAT: Self = Self::packed(128, ChannelOrder::Float, 32, 32, 32, 32);
    pub const RGB_FLOAT: Self = Self::packed(96, ChannelOrder::Float, 0, 32, 32, 32);

    const NAMED: &'static [(&'static str, PixelFormat)] = &[
        ("a8r8g8b8", Self::A8R8G8B8),
        ("x8r8g8b8", Self::X8R8G8B8),
        ("a8b8g8r8", Self::A8B8G8R8),
        ("x8b8g8r8", Self::X8B8G8R8),
        ("b8g8r8a8", Self::B8G8R8A8),
        ("b8g8r8x8", Self::B8G8R8X8),
        ("r8g8b8a8", Self::R8G8B8A8),
        ("r8g8b8x8", Self::R8G8B8X8),
        ("a2r10g10b10", Self::A2R10G10B10),
        ("x2r10g10b10", Self::X2R10G10B10),
        ("a2b10g10r10", Self::A2B10G10R10),
        ("x2b10g10r10", Self::X2B10G10R10),
        ("r8g8b8", Self::R8G8B8),
        ("b8g8r8", Self::B8G8R8),
        ("r5g6b5", Self::R5G6B5),
        ("b5g6r5", Self::B5G6R5),
        ("a1r5g5b5", Self::A1R5G5B5),
        ("x1r5g5b5", Self::X1R5G5B5),
        ("a4r4g4b4", Self::A4R4G4B4),
        ("x4r4g4b4", Self::X4R4G4B4),
        ("a8", Self::A8),
        ("r3g3b2", Self::R3G3B2),
        ("a4", Self::A4),
        ("a1", Self::A1),
        ("rgba_float", Self::RGBA_FLOAT),
        ("rgb_float", Self::RGB_FLOAT),
    ];

    const fn packed(bpp: u8, order: ChannelOrder, a: u8, r: u8, g: u8, b: u8) -> Self {
        Self {
            bpp,
            order,
            a,
            r,
            g,
            b,
        }
    }

    /// Builds a custom descriptor, rejecting layouts the pixel accessors cannot address.
    pub fn new(bpp: u8, order: ChannelOrder, a: u8, r: u8, g: u8, b: u8) -> PixResult<Self> {
        let fmt = Self::packed(bpp, order, a, r, g, b);
        fmt.validate()?;
        Ok(fmt)
    }

    pub(crate) fn validate(&self) -> PixResult<()> {
        let sum = u32::from(self.a) + u32::from(self.r) + u32::from(self.g) + u32::from(self.b);
        if sum > u32::from(self.bpp) {
            return Err(PixError::configuration(format!(
                "channel bits ({sum}) exceed bits per pixel ({})",
                self.bpp
            )));
        }
        match self.order {
            ChannelOrder::Float => {
                let ok = self.r == 32
                    && self.g == 32
                    && self.b == 32
                    && ((self.a == 32 && self.bpp == 128) || (self.a == 0 && self.bpp == 96));
                if !ok {
                    return Err(PixError::configuration(
                        "float formats are 128bpp rgba or 96bpp rgb with 32-bit channels",
                    ));
                }
            }
            ChannelOrder::A => {
                if self.r != 0 || self.g != 0 || self.b != 0 || self.a == 0 {
                    return Err(PixError::configuration(
                        "alpha-only formats carry alpha bits and no color bits",
                    ));
                }
                Self::check_packed_bpp(self.bpp)?;
            }
            _ => {
                if self.r == 0 && self.g == 0 && self.b == 0 {
                    return Err(PixError::configuration("color format without color bits"));
                }
                if self.a > 16 || self.r > 16 || self.g > 16 || self.b > 16 {
                    return Err(PixError::configuration(
                        "packed channels are limited to 16 bits",
                    ));
                }
                Self::check_packed_bpp(self.bpp)?;
            }
        }
        Ok(())
    }

    fn check_packed_bpp(bpp: u8) -> PixResult<()> {
        match bpp {
            1 | 4 | 8 | 16 | 24 | 32 => Ok(()),
            _ => Err(PixError::configuration(format!(
                "unsupported bits per pixel: {bpp}"
            ))),
        }
    }

    pub fn bpp(&self) -> u32 {
        u32::from(self.bpp)
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn alpha_bits(&self) -> u32 {
        u32::from(self.a)
    }

    pub fn red_bits(&self) -> u32 {
        u32::from(self.r)
    }

    pub fn green_bits(&self) -> u32 {
        u32::from(self.g)
    }

    pub fn blue_bits(&self) -> u32 {
        u32::from(self.b)
    }

    pub fn has_alpha(&self) -> bool {
        self.a > 0
    }

    /// Channels wider than 8 bits (or float) need the wide pipeline to avoid precision loss.
    pub fn is_wide(&self) -> bool {
        self.order == ChannelOrder::Float
            || self.a > 8
            || self.r > 8
            || self.g > 8
            || self.b > 8
    }

    /// Bytes occupied by `width` pixels, rounded up to whole bytes.
    pub fn row_bytes(&self, width: usize) -> Option<usize> {
        width.checked_mul(self.bpp as usize).map(|bits| bits.div_ceil(8))
    }

    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::NAMED.iter().map(|(name, _)| *name)
    }

    pub(crate) fn shifts(&self) -> Shifts {
        let (a, r, g, b) = (
            u32::from(self.a),
            u32::from(self.r),
            u32::from(self.g),
            u32::from(self.b),
        );
        match self.order {
            ChannelOrder::Argb => Shifts {
                b: 0,
                g: b,
                r: b + g,
                a: b + g + r,
            },
            ChannelOrder::Abgr => Shifts {
                r: 0,
                g: r,
                b: r + g,
                a: r + g + b,
            },
            ChannelOrder::Bgra => {
                let bs = self.bpp() - b;
                let gs = bs - g;
                let rs = gs - r;
                Shifts {
                    b: bs,
                    g: gs,
                    r: rs,
                    a: rs.saturating_sub(a),
                }
            }
            ChannelOrder::Rgba => {
                let rs = self.bpp() - r;
                let gs = rs - g;
                let bs = gs - b;
                Shifts {
                    r: rs,
                    g: gs,
                    b: bs,
                    a: bs.saturating_sub(a),
                }
            }
            ChannelOrder::A | ChannelOrder::Float => Shifts {
                a: 0,
                r: 0,
                g: 0,
                b: 0,
            },
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(
                f,
                "{:?}{}bpp(a{} r{} g{} b{})",
                self.order, self.bpp, self.a, self.r, self.g, self.b
            ),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = PixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::NAMED
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, f)| *f)
            .ok_or_else(|| PixError::configuration(format!("unknown pixel format: {s}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/format/mod.rs"]
mod tests;
