//! Ordered dithering applied to wide rows before they are narrowed into a destination.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Argb;
use crate::format::PixelFormat;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMode {
    #[default]
    None,
    /// Cheapest available pattern (8x8 Bayer).
    Fast,
    /// Blue noise.
    Good,
    /// Blue noise.
    Best,
    OrderedBayer8,
    OrderedBlueNoise64,
}

impl DitherMode {
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Noise value in `(0, 1)` for the pattern cell covering `(x, y)`; `0` for [`Self::None`].
    pub fn factor(self, x: u32, y: u32) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Fast | Self::OrderedBayer8 => bayer_8(x, y),
            Self::Good | Self::Best | Self::OrderedBlueNoise64 => blue_noise_64(x, y),
        }
    }
}

fn bayer_8(x: u32, y: u32) -> f32 {
    let y = y ^ x;
    // bit-reversed interleave of (x ^ y, x) mod 8
    let m = ((y & 0x1) << 5)
        | ((x & 0x1) << 4)
        | ((y & 0x2) << 2)
        | ((x & 0x2) << 1)
        | ((y & 0x4) >> 1)
        | ((x & 0x4) >> 2);
    m as f32 / 64.0 + 1.0 / 128.0
}

const BLUE_NOISE_SIZE: usize = 64;

fn blue_noise_64(x: u32, y: u32) -> f32 {
    let table = blue_noise_table();
    let idx = ((y as usize & 0x3f) << 6) | (x as usize & 0x3f);
    f32::from(table[idx]) / 4096.0 + 1.0 / 8192.0
}

/// Ranks of interleaved gradient noise over a 64x64 tile: a permutation of `0..4096` whose
/// neighbouring cells differ strongly, built once per process.
fn blue_noise_table() -> &'static [u16] {
    static TABLE: OnceLock<Vec<u16>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let n = BLUE_NOISE_SIZE * BLUE_NOISE_SIZE;
        let noise = |i: usize| {
            let (x, y) = ((i % BLUE_NOISE_SIZE) as f64, (i / BLUE_NOISE_SIZE) as f64);
            (52.982_918_9 * (0.067_110_56 * x + 0.005_837_15 * y).fract()).fract()
        };
        let keys: Vec<f64> = (0..n).map(noise).collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]).then(a.cmp(&b)));

        let mut table = vec![0u16; n];
        for (rank, &cell) in order.iter().enumerate() {
            table[cell] = rank as u16;
        }
        table
    })
}

/// Noise amplitude for a channel of `bits` bits; zero when nothing is lost on store.
pub fn dither_scale(bits: u32) -> f32 {
    if bits == 0 || bits >= 32 {
        0.0
    } else {
        1.0 / (1u64 << bits) as f32
    }
}

#[inline]
fn apply(value: f32, d: f32, scale: f32) -> f32 {
    value + (d - value) * scale
}

/// Dithers one channel value destined for a `depth`-bit channel at `(x, y)`.
///
/// Quantizing the result back to `depth` bits returns exactly the quantized input whenever
/// the input is representable at that depth.
pub fn dither(mode: DitherMode, value: f32, x: i32, y: i32, depth: u32) -> f32 {
    apply(value, mode.factor(x as u32, y as u32), dither_scale(depth))
}

/// Dithers a wide row that is about to be stored at `(x, y)` in an image of `format`.
pub(crate) fn dither_row(
    mode: DitherMode,
    offset: (i32, i32),
    format: PixelFormat,
    x: i32,
    y: i32,
    row: &mut [Argb],
) {
    if mode.is_none() {
        return;
    }
    let a_scale = dither_scale(format.alpha_bits());
    let r_scale = dither_scale(format.red_bits());
    let g_scale = dither_scale(format.green_bits());
    let b_scale = dither_scale(format.blue_bits());
    if a_scale == 0.0 && r_scale == 0.0 && g_scale == 0.0 && b_scale == 0.0 {
        return;
    }

    let x0 = x.wrapping_add(offset.0) as u32;
    let y0 = y.wrapping_add(offset.1) as u32;
    for (i, p) in row.iter_mut().enumerate() {
        let d = mode.factor(x0.wrapping_add(i as u32), y0);
        p.a = apply(p.a, d, a_scale);
        p.r = apply(p.r, d, r_scale);
        p.g = apply(p.g, d, g_scale);
        p.b = apply(p.b, d, b_scale);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/dither.rs"]
mod tests;
