//! Builders for convolution filter parameters.
//!
//! Kernels are sampled in double precision, normalised, then quantised to 16.16 with the
//! rounding error folded into the heaviest tap so every phase sums to exactly one.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PixError, PixResult};
use crate::foundation::fixed::{Fixed, int_to_fixed};
use crate::image::{FilterParams, MAX_PHASE_BITS};

/// Widest kernel the image accepts along one axis.
const MAX_TAPS: usize = 256;

/// Reconstruction kernels for [`separable_params`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kernel {
    /// Unit-width box.
    #[default]
    Box,
    /// Tent of radius one.
    Linear,
    /// Gaussian with sigma 0.5, cut at three sigma.
    Gaussian,
    Lanczos3,
}

impl Kernel {
    /// Half-width of the kernel's support at unit scale.
    fn radius(self) -> f64 {
        match self {
            Self::Box => 0.5,
            Self::Linear => 1.0,
            Self::Gaussian => 1.5,
            Self::Lanczos3 => 3.0,
        }
    }

    fn eval(self, x: f64) -> f64 {
        let ax = x.abs();
        match self {
            Self::Box => {
                if ax < 0.5 {
                    1.0
                } else if ax == 0.5 {
                    0.5
                } else {
                    0.0
                }
            }
            Self::Linear => (1.0 - ax).max(0.0),
            Self::Gaussian => {
                const SIGMA: f64 = 0.5;
                if ax > 3.0 * SIGMA {
                    0.0
                } else {
                    (-x * x / (2.0 * SIGMA * SIGMA)).exp()
                }
            }
            Self::Lanczos3 => {
                if ax >= 3.0 {
                    0.0
                } else if ax < 1e-9 {
                    1.0
                } else {
                    let px = PI * x;
                    3.0 * px.sin() * (px / 3.0).sin() / (px * px)
                }
            }
        }
    }
}

/// Quantises normalised weights to 16.16, fixing the sum at the heaviest tap.
fn quantize(weights: &[f64]) -> PixResult<Vec<Fixed>> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum.abs() < f64::EPSILON {
        return Err(PixError::configuration("filter kernel sums to zero"));
    }
    let mut out: Vec<Fixed> = weights
        .iter()
        .map(|w| ((w / sum) * 65536.0).round() as Fixed)
        .collect();
    let delta = 65536 - out.iter().map(|&q| i64::from(q)).sum::<i64>();
    if delta != 0
        && let Some(heaviest) = (0..out.len()).max_by_key(|&i| out[i])
    {
        out[heaviest] += delta as Fixed;
    }
    Ok(out)
}

/// One axis of a separable filter: `(taps, phase table)` with `taps << bits` entries.
fn axis(kernel: Kernel, scale: f64, bits: u32) -> PixResult<(usize, Vec<Fixed>)> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PixError::configuration(format!(
            "filter scale must be positive, got {scale}"
        )));
    }
    // Downscaling widens the kernel; upscaling keeps the unit footprint.
    let support = kernel.radius() * scale.max(1.0);
    let taps = ((2.0 * support).ceil() as usize).max(1);
    if taps > MAX_TAPS {
        return Err(PixError::configuration(format!(
            "filter needs {taps} taps, at most {MAX_TAPS} are supported"
        )));
    }

    let phases = 1usize << bits;
    let step = 1.0 / phases as f64;
    let mut table = Vec::with_capacity(taps * phases);
    for p in 0..phases {
        let frac = step / 2.0 + p as f64 * step;
        let first = (frac - taps as f64 / 2.0 - 0.5).ceil() - frac + 0.5;
        let weights: Vec<f64> = (0..taps)
            .map(|j| kernel.eval((first + j as f64) / scale.max(1.0)))
            .collect();
        table.extend(quantize(&weights)?);
    }
    Ok((taps, table))
}

/// Parameters for [`FilterKind::SeparableConvolution`](crate::FilterKind::SeparableConvolution).
///
/// `scale_x`/`scale_y` are source pixels per destination pixel; `bits_x`/`bits_y` select
/// `2^bits` subpixel phases per axis.
pub fn separable_params(
    kernel: Kernel,
    scale_x: f64,
    scale_y: f64,
    bits_x: u32,
    bits_y: u32,
) -> PixResult<FilterParams> {
    for bits in [bits_x, bits_y] {
        if bits > MAX_PHASE_BITS as u32 {
            return Err(PixError::configuration(format!(
                "subsample bits must be at most {MAX_PHASE_BITS}, got {bits}"
            )));
        }
    }
    let (w, x_table) = axis(kernel, scale_x, bits_x)?;
    let (h, y_table) = axis(kernel, scale_y, bits_y)?;

    let mut params = FilterParams::new();
    params.extend([
        int_to_fixed(w as i32),
        int_to_fixed(h as i32),
        int_to_fixed(bits_x as i32),
        int_to_fixed(bits_y as i32),
    ]);
    params.extend(x_table);
    params.extend(y_table);
    Ok(params)
}

/// Parameters for [`FilterKind::Convolution`](crate::FilterKind::Convolution) from a dense
/// row-major kernel, normalised to sum to one.
pub fn convolution_params(width: usize, height: usize, weights: &[f64]) -> PixResult<FilterParams> {
    if !(1..=MAX_TAPS).contains(&width) || !(1..=MAX_TAPS).contains(&height) {
        return Err(PixError::configuration(format!(
            "convolution kernel must be between 1x1 and {MAX_TAPS}x{MAX_TAPS}, got {width}x{height}"
        )));
    }
    if weights.len() != width * height {
        return Err(PixError::configuration(format!(
            "{width}x{height} kernel needs {} weights, got {}",
            width * height,
            weights.len()
        )));
    }
    let mut params = FilterParams::new();
    params.extend([int_to_fixed(width as i32), int_to_fixed(height as i32)]);
    params.extend(quantize(weights)?);
    Ok(params)
}

#[cfg(test)]
#[path = "../tests/unit/filter.rs"]
mod tests;
