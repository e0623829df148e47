//! 8-bit channel arithmetic with exact rounding, plus bit-depth and narrow/wide conversions.
//!
//! Narrow pixels are packed `a8r8g8b8` words: alpha in bits 24..32, then red, green, blue.
//! Every packed helper is equivalent to applying its scalar counterpart per channel.

pub const MASK: u32 = 0xff;
pub const ONE_HALF: u32 = 0x80;

pub const A_SHIFT: u32 = 24;
pub const R_SHIFT: u32 = 16;
pub const G_SHIFT: u32 = 8;

/// round(a * b / 255), exact for every pair of 8-bit inputs.
#[inline]
pub fn multiply_channel(a: u8, b: u8) -> u8 {
    mul_un8(u32::from(a), u32::from(b)) as u8
}

/// round(a * 255 / b). Callers never pass `b == 0`; results above 255 are clamped.
#[inline]
pub fn divide_channel(a: u8, b: u8) -> u8 {
    debug_assert!(b != 0, "divide_channel by zero");
    div_un8(u32::from(a), u32::from(b)).min(MASK) as u8
}

/// Saturating 8-bit add.
#[inline]
pub fn add_channel(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[inline]
pub(crate) fn mul_un8(a: u32, b: u32) -> u32 {
    let t = a * b + ONE_HALF;
    ((t >> 8) + t) >> 8
}

#[inline]
pub(crate) fn div_un8(a: u32, b: u32) -> u32 {
    (a * MASK + b / 2) / b
}

#[inline]
pub(crate) fn add_un8(a: u32, b: u32) -> u32 {
    (a + b).min(MASK)
}

/// Divides a value in `0..=255*255` by 255 with rounding.
#[inline]
pub(crate) fn div_one_un8(x: u32) -> u32 {
    let t = x + ONE_HALF;
    (t + (t >> 8)) >> 8
}

#[inline]
pub fn alpha(x: u32) -> u32 {
    x >> A_SHIFT
}

#[inline]
pub fn red(x: u32) -> u32 {
    (x >> R_SHIFT) & MASK
}

#[inline]
pub fn green(x: u32) -> u32 {
    (x >> G_SHIFT) & MASK
}

#[inline]
pub fn blue(x: u32) -> u32 {
    x & MASK
}

#[inline]
pub fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << A_SHIFT) | (r << R_SHIFT) | (g << G_SHIFT) | b
}

#[inline]
fn map4(x: u32, f: impl Fn(u32, u32) -> u32) -> u32 {
    let mut out = 0;
    for shift in [0, 8, 16, 24] {
        out |= f((x >> shift) & MASK, shift) << shift;
    }
    out
}

/// Every channel of `x` times the scalar `a`.
#[inline]
pub fn un8x4_mul_un8(x: u32, a: u32) -> u32 {
    map4(x, |c, _| mul_un8(c, a))
}

/// Channel-wise product of `x` and `a`.
#[inline]
pub fn un8x4_mul_un8x4(x: u32, a: u32) -> u32 {
    map4(x, |c, s| mul_un8(c, (a >> s) & MASK))
}

/// Channel-wise saturating sum.
#[inline]
pub fn un8x4_add_un8x4(x: u32, y: u32) -> u32 {
    map4(x, |c, s| add_un8(c, (y >> s) & MASK))
}

/// `x * a + y`
#[inline]
pub fn un8x4_mul_un8_add_un8x4(x: u32, a: u32, y: u32) -> u32 {
    un8x4_add_un8x4(un8x4_mul_un8(x, a), y)
}

/// `x * a + y * b`
#[inline]
pub fn un8x4_mul_un8_add_un8x4_mul_un8(x: u32, a: u32, y: u32, b: u32) -> u32 {
    un8x4_add_un8x4(un8x4_mul_un8(x, a), un8x4_mul_un8(y, b))
}

/// `x * a + y` with `a` per channel.
#[inline]
pub fn un8x4_mul_un8x4_add_un8x4(x: u32, a: u32, y: u32) -> u32 {
    un8x4_add_un8x4(un8x4_mul_un8x4(x, a), y)
}

/// `x * a + y * b` with `a` per channel.
#[inline]
pub fn un8x4_mul_un8x4_add_un8x4_mul_un8(x: u32, a: u32, y: u32, b: u32) -> u32 {
    un8x4_add_un8x4(un8x4_mul_un8x4(x, a), un8x4_mul_un8(y, b))
}

/// Rescales an unsigned normalized integer between bit depths.
///
/// Widening replicates the high bits into the newly exposed low bits, so `0` stays `0`, the
/// maximum stays the maximum, and widening then narrowing back is lossless.
pub fn unorm_to_unorm(val: u32, from_bits: u32, to_bits: u32) -> u32 {
    if from_bits == 0 {
        return 0;
    }
    let val = if from_bits >= 32 {
        val
    } else {
        val & ((1u32 << from_bits) - 1)
    };
    if from_bits >= to_bits {
        return val >> (from_bits - to_bits);
    }

    let mut result = val << (to_bits - from_bits);
    let mut filled = from_bits;
    while filled < to_bits {
        result |= result >> filled;
        filled *= 2;
    }
    result
}

pub fn unorm_to_float(val: u32, bits: u32) -> f32 {
    if bits == 0 {
        return 0.0;
    }
    let max = ((1u64 << bits) - 1) as f64;
    (f64::from(val) / max) as f32
}

/// Quantizes `f` (clamped to `0..=1`) to `bits` bits.
pub fn float_to_unorm(f: f32, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) };
    let scale = (1u64 << bits) as f64;
    let u = (f64::from(f) * scale) as u64;
    (u - (u >> bits)) as u32
}

/// A wide pixel: premultiplied float channels in alpha, red, green, blue order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Argb {
    pub a: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Argb {
    pub const TRANSPARENT: Self = Self {
        a: 0.0,
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const fn new(a: f32, r: f32, g: f32, b: f32) -> Self {
        Self { a, r, g, b }
    }

    /// Widens a packed `a8r8g8b8` word.
    pub fn expand(x: u32) -> Self {
        Self {
            a: unorm_to_float(alpha(x), 8),
            r: unorm_to_float(red(x), 8),
            g: unorm_to_float(green(x), 8),
            b: unorm_to_float(blue(x), 8),
        }
    }

    /// Narrows to a packed `a8r8g8b8` word.
    pub fn contract(self) -> u32 {
        pack_argb(
            float_to_unorm(self.a, 8),
            float_to_unorm(self.r, 8),
            float_to_unorm(self.g, 8),
            float_to_unorm(self.b, 8),
        )
    }

    pub fn scale(self, k: f32) -> Self {
        Self {
            a: self.a * k,
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
        }
    }

    pub fn add(self, o: Self) -> Self {
        Self {
            a: self.a + o.a,
            r: self.r + o.r,
            g: self.g + o.g,
            b: self.b + o.b,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            a: self.a.clamp(0.0, 1.0),
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
