//! Transformed sampling: destination pixel centers mapped through the image transform,
//! filtered, with per-tap repeat handling.

use crate::foundation::error::PixResult;
use crate::foundation::fixed::{
    FIXED_E, FIXED_HALF, FIXED_ONE, Fixed, fixed_frac, fixed_to_int, int_to_fixed,
};
use crate::foundation::math::{Argb, alpha, blue, green, pack_argb, red};
use crate::image::{FilterKind, Image};
use crate::pipeline::iter::{Pixel, Precision, Scanline, fetch_untransformed, repeat_coord};

/// Fraction bits kept for narrow bilinear weights.
pub const BILINEAR_INTERPOLATION_BITS: u32 = 7;

/// Arithmetic the filters need on top of [`Pixel`].
pub(crate) trait Filterable: Pixel {
    type Acc: Copy + Default;

    /// `distx`/`disty` are the 16-bit fractional offsets from the top-left tap.
    fn bilinear(tl: Self, tr: Self, bl: Self, br: Self, distx: Fixed, disty: Fixed) -> Self;

    fn accumulate(acc: &mut Self::Acc, p: Self, f: i64);

    fn reduce(acc: Self::Acc) -> Self;
}

#[inline]
fn bilinear_weight(f: Fixed) -> u64 {
    let w = (f >> (16 - BILINEAR_INTERPOLATION_BITS)) & ((1 << BILINEAR_INTERPOLATION_BITS) - 1);
    (w as u64) << (8 - BILINEAR_INTERPOLATION_BITS)
}

impl Filterable for u32 {
    type Acc = [i64; 4];

    fn bilinear(tl: u32, tr: u32, bl: u32, br: u32, distx: Fixed, disty: Fixed) -> u32 {
        let dx = bilinear_weight(distx);
        let dy = bilinear_weight(disty);
        let w_xy = dx * dy;
        let w_xiy = dx * (256 - dy);
        let w_ixy = (256 - dx) * dy;
        let w_ixiy = (256 - dx) * (256 - dy);

        let mut out = 0;
        for shift in [0u32, 8, 16, 24] {
            let c = |p: u32| u64::from((p >> shift) & 0xff);
            let f = c(tl) * w_ixiy + c(tr) * w_xiy + c(bl) * w_ixy + c(br) * w_xy;
            out |= ((f >> 16) as u32) << shift;
        }
        out
    }

    fn accumulate(acc: &mut [i64; 4], p: u32, f: i64) {
        acc[0] += i64::from(alpha(p)) * f;
        acc[1] += i64::from(red(p)) * f;
        acc[2] += i64::from(green(p)) * f;
        acc[3] += i64::from(blue(p)) * f;
    }

    fn reduce(acc: [i64; 4]) -> u32 {
        let ch = |v: i64| ((v + 0x8000) >> 16).clamp(0, 0xff) as u32;
        pack_argb(ch(acc[0]), ch(acc[1]), ch(acc[2]), ch(acc[3]))
    }
}

impl Filterable for Argb {
    type Acc = [f64; 4];

    fn bilinear(tl: Argb, tr: Argb, bl: Argb, br: Argb, distx: Fixed, disty: Fixed) -> Argb {
        let dx = fixed_frac(distx) as f32 / 65536.0;
        let dy = fixed_frac(disty) as f32 / 65536.0;
        let w_xy = dx * dy;
        let w_xiy = dx * (1.0 - dy);
        let w_ixy = (1.0 - dx) * dy;
        let w_ixiy = (1.0 - dx) * (1.0 - dy);
        let mix = |a: f32, b: f32, c: f32, d: f32| a * w_ixiy + b * w_xiy + c * w_ixy + d * w_xy;
        Argb::new(
            mix(tl.a, tr.a, bl.a, br.a),
            mix(tl.r, tr.r, bl.r, br.r),
            mix(tl.g, tr.g, bl.g, br.g),
            mix(tl.b, tr.b, bl.b, br.b),
        )
    }

    fn accumulate(acc: &mut [f64; 4], p: Argb, f: i64) {
        let f = f as f64;
        acc[0] += f64::from(p.a) * f;
        acc[1] += f64::from(p.r) * f;
        acc[2] += f64::from(p.g) * f;
        acc[3] += f64::from(p.b) * f;
    }

    fn reduce(acc: [f64; 4]) -> Argb {
        let ch = |v: f64| ((v / 65536.0) as f32).clamp(0.0, 1.0);
        Argb::new(ch(acc[0]), ch(acc[1]), ch(acc[2]), ch(acc[3]))
    }
}

/// Tap at integer source coordinates after repeat mapping; transparent when it falls off a
/// non-repeating image.
#[inline]
fn tap<P: Pixel>(image: &Image<'_>, x: i32, y: i32) -> P {
    let repeat = image.repeat();
    match (
        repeat_coord(repeat, x, image.width() as i32),
        repeat_coord(repeat, y, image.height() as i32),
    ) {
        (Some(x), Some(y)) => P::fetch(image, x as usize, y as usize),
        _ => P::default(),
    }
}

fn nearest<P: Pixel>(image: &Image<'_>, x: Fixed, y: Fixed) -> P {
    tap(
        image,
        fixed_to_int(x.wrapping_sub(FIXED_E)),
        fixed_to_int(y.wrapping_sub(FIXED_E)),
    )
}

fn bilinear<P: Filterable>(image: &Image<'_>, x: Fixed, y: Fixed) -> P {
    let x1 = x.wrapping_sub(FIXED_HALF);
    let y1 = y.wrapping_sub(FIXED_HALF);
    let (distx, disty) = (fixed_frac(x1), fixed_frac(y1));
    let (x1, y1) = (fixed_to_int(x1), fixed_to_int(y1));
    let (x2, y2) = (x1 + 1, y1 + 1);
    P::bilinear(
        tap(image, x1, y1),
        tap(image, x2, y1),
        tap(image, x1, y2),
        tap(image, x2, y2),
        distx,
        disty,
    )
}

fn convolution<P: Filterable>(image: &Image<'_>, x: Fixed, y: Fixed) -> P {
    let params = image.filter_params();
    let (cw, ch) = (params[0], params[1]);
    let x_off = (cw - FIXED_ONE) >> 1;
    let y_off = (ch - FIXED_ONE) >> 1;
    let (cw, ch) = (fixed_to_int(cw), fixed_to_int(ch));
    let weights = &params[2..];

    let x1 = fixed_to_int(x.wrapping_sub(FIXED_E).wrapping_sub(x_off));
    let y1 = fixed_to_int(y.wrapping_sub(FIXED_E).wrapping_sub(y_off));

    let mut acc = P::Acc::default();
    let mut k = weights.iter();
    for ty in y1..y1 + ch {
        for tx in x1..x1 + cw {
            let Some(&f) = k.next() else {
                return P::reduce(acc);
            };
            if f != 0 {
                P::accumulate(&mut acc, tap(image, tx, ty), i64::from(f));
            }
        }
    }
    P::reduce(acc)
}

fn separable_convolution<P: Filterable>(image: &Image<'_>, x: Fixed, y: Fixed) -> P {
    let params = image.filter_params();
    let cw = fixed_to_int(params[0]);
    let ch = fixed_to_int(params[1]);
    let x_phase_bits = fixed_to_int(params[2]) as u32;
    let y_phase_bits = fixed_to_int(params[3]) as u32;
    let x_shift = 16 - x_phase_bits;
    let y_shift = 16 - y_phase_bits;
    let x_off = ((cw << 16) - FIXED_ONE) >> 1;
    let y_off = ((ch << 16) - FIXED_ONE) >> 1;

    // snap to the middle of the nearest phase so the kernel stays aligned
    let x = ((x >> x_shift) << x_shift) + ((1 << x_shift) >> 1);
    let y = ((y >> y_shift) << y_shift) + ((1 << y_shift) >> 1);
    let px = ((x & 0xffff) >> x_shift) as usize;
    let py = ((y & 0xffff) >> y_shift) as usize;

    let (cw_u, ch_u) = (cw as usize, ch as usize);
    let x_table = &params[4..4 + (cw_u << x_phase_bits)];
    let y_table = &params[4 + (cw_u << x_phase_bits)..];
    let x_weights = &x_table[px * cw_u..(px + 1) * cw_u];
    let y_weights = &y_table[py * ch_u..(py + 1) * ch_u];

    let x1 = fixed_to_int(x.wrapping_sub(FIXED_E).wrapping_sub(x_off));
    let y1 = fixed_to_int(y.wrapping_sub(FIXED_E).wrapping_sub(y_off));

    let mut acc = P::Acc::default();
    for (ty, &fy) in (y1..).zip(y_weights) {
        if fy == 0 {
            continue;
        }
        for (tx, &fx) in (x1..).zip(x_weights) {
            if fx == 0 {
                continue;
            }
            let f = (i64::from(fy) * i64::from(fx) + 0x8000) >> 16;
            P::accumulate(&mut acc, tap(image, tx, ty), f);
        }
    }
    P::reduce(acc)
}

#[inline]
fn filter_pixel<P: Filterable>(image: &Image<'_>, x: Fixed, y: Fixed) -> P {
    match image.filter() {
        FilterKind::Nearest => nearest(image, x, y),
        FilterKind::Bilinear => bilinear(image, x, y),
        FilterKind::Convolution => convolution(image, x, y),
        FilterKind::SeparableConvolution => separable_convolution(image, x, y),
    }
}

fn fits_fixed(c: i64) -> bool {
    (i64::from(i16::MIN)..=i64::from(i16::MAX)).contains(&c)
}

/// Per-pixel fallback for rows reaching past the 16.16 range. Centers that cannot be
/// represented sample transparent.
fn sample_far<P: Filterable>(image: &Image<'_>, x: i32, y: i32, out: &mut [P]) {
    for (i, slot) in out.iter_mut().enumerate() {
        let cx = i64::from(x) + i as i64;
        *slot = if fits_fixed(cx) && fits_fixed(y.into()) {
            let mut one = [P::default()];
            sample_into(image, cx as i32, y, &mut one);
            one[0]
        } else {
            P::default()
        };
    }
}

/// Samples `out.len()` destination pixels of row `y` starting at column `x`.
pub(crate) fn sample_into<P: Filterable>(image: &Image<'_>, x: i32, y: i32, out: &mut [P]) {
    let untransformed_copy = image.transform().is_none()
        && matches!(image.filter(), FilterKind::Nearest | FilterKind::Bilinear);
    let last = i64::from(x) + out.len() as i64 - 1;
    if !untransformed_copy && !(fits_fixed(x.into()) && fits_fixed(last) && fits_fixed(y.into())) {
        sample_far(image, x, y, out);
        return;
    }

    let Some(transform) = image.transform() else {
        if matches!(image.filter(), FilterKind::Nearest | FilterKind::Bilinear) {
            fetch_untransformed(image, x, y, out);
        } else {
            let (mut sx, sy) = (int_to_fixed(x) + FIXED_HALF, int_to_fixed(y) + FIXED_HALF);
            for slot in out.iter_mut() {
                *slot = filter_pixel(image, sx, sy);
                sx = sx.wrapping_add(FIXED_ONE);
            }
        }
        return;
    };

    let origin = [
        int_to_fixed(x).wrapping_add(FIXED_HALF),
        int_to_fixed(y).wrapping_add(FIXED_HALF),
        FIXED_ONE,
    ];
    let Some(v) = transform.transform_point_3d(origin) else {
        out.fill(P::default());
        return;
    };
    let m = &transform.matrix;

    if transform.is_affine() {
        let (mut sx, mut sy) = (v[0], v[1]);
        for slot in out.iter_mut() {
            *slot = filter_pixel(image, sx, sy);
            sx = sx.wrapping_add(m[0][0]);
            sy = sy.wrapping_add(m[1][0]);
        }
        return;
    }

    let (mut sx, mut sy, mut sw) = (i64::from(v[0]), i64::from(v[1]), i64::from(v[2]));
    for slot in out.iter_mut() {
        *slot = projected(sx, sy, sw)
            .map(|(px, py)| filter_pixel(image, px, py))
            .unwrap_or_default();
        sx += i64::from(m[0][0]);
        sy += i64::from(m[1][0]);
        sw += i64::from(m[2][0]);
    }
}

/// Perspective divide; a zero or unrepresentable result is a transparent sample.
fn projected(x: i64, y: i64, w: i64) -> Option<(Fixed, Fixed)> {
    if w == 0 {
        return None;
    }
    let px = Fixed::try_from((x << 16) / w).ok()?;
    let py = Fixed::try_from((y << 16) / w).ok()?;
    Some((px, py))
}

/// Samples one destination row through the image's transform, filter and repeat mode.
pub fn sample_row(
    image: &Image<'_>,
    x: i32,
    y: i32,
    width: usize,
    precision: Precision,
) -> PixResult<Scanline> {
    let mut line = Scanline::transparent(precision, width)?;
    match &mut line {
        Scanline::Narrow(buf) => sample_into(image, x, y, buf),
        Scanline::Wide(buf) => sample_into(image, x, y, buf),
    }
    Ok(line)
}

/// Filters the image at source-space point `(x, y)` (16.16), ignoring the transform.
pub fn sample_point(image: &Image<'_>, x: Fixed, y: Fixed) -> u32 {
    filter_pixel(image, x, y)
}

pub fn sample_point_wide(image: &Image<'_>, x: Fixed, y: Fixed) -> Argb {
    filter_pixel(image, x, y)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/sampler.rs"]
mod tests;
