//! Specialised kernels for common operator/format combinations.
//!
//! Every kernel reproduces the general engine bit for bit on the requests its table entry
//! admits; the entries' flag requirements are what make the shortcuts valid (no alpha maps,
//! no dithering, samples fully inside the source).

use crate::foundation::error::{PixError, PixResult};
use crate::foundation::fixed::{FIXED_E, FIXED_HALF, FIXED_ONE, Transform, fixed_to_int, int_to_fixed};
use crate::foundation::math::{
    MASK, add_un8, alpha, mul_un8, un8x4_add_un8x4, un8x4_mul_un8, un8x4_mul_un8_add_un8x4,
    un8x4_mul_un8x4, un8x4_mul_un8x4_add_un8x4,
};
use crate::format::PixelFormat;
use crate::image::{Flags, Image};
use crate::operator::Operator;
use crate::pipeline::dispatch::{CompositeInfo, FastPath, FormatMatch, KernelFn};
use crate::pipeline::iter::{Pixel, repeat_coord};

/// Untransformed source fully covering the rectangle.
const SOURCE: Flags = Flags::STANDARD
    .union(Flags::ID_TRANSFORM)
    .union(Flags::NEAREST_FILTER)
    .union(Flags::SAMPLES_COVER_CLIP_NEAREST);

/// A solid source samples its one pixel everywhere. Transformed solids go to the general
/// engine, where an overflowing transform yields transparent samples.
const SOLID_SOURCE: Flags = Flags::STANDARD.union(Flags::ID_TRANSFORM);

const SCALED_SOURCE: Flags = Flags::STANDARD
    .union(Flags::SCALE_TRANSFORM)
    .union(Flags::NEAREST_FILTER)
    .union(Flags::SAMPLES_COVER_CLIP_NEAREST);

/// Formats whose raw bits survive a read/write round trip unchanged.
const DENSE: &[PixelFormat] = &[
    PixelFormat::A8R8G8B8,
    PixelFormat::A8B8G8R8,
    PixelFormat::B8G8R8A8,
    PixelFormat::R8G8B8A8,
    PixelFormat::R8G8B8,
    PixelFormat::B8G8R8,
    PixelFormat::R5G6B5,
    PixelFormat::B5G6R5,
    PixelFormat::A1R5G5B5,
    PixelFormat::A4R4G4B4,
    PixelFormat::A8,
];

#[inline]
fn over(s: u32, d: u32) -> u32 {
    un8x4_mul_un8_add_un8x4(d, MASK - alpha(s), s)
}

/// Source scaled by a unified mask value.
#[inline]
fn in_mask(s: u32, m: u32) -> u32 {
    if m == 0 { 0 } else { un8x4_mul_un8(s, m) }
}

#[inline]
fn solid_color(image: &Image<'_>) -> u32 {
    u32::fetch(image, 0, 0)
}

/// Calls `f(i, row)` for the `i`-th destination row of the rectangle.
fn each_row(
    info: &CompositeInfo<'_>,
    dest: &mut Image<'_>,
    mut f: impl FnMut(usize, &mut [u8]),
) -> PixResult<()> {
    let y0 = info.dest_y as usize;
    for i in 0..info.height as usize {
        f(i, dest.row_mut(y0 + i)?);
    }
    Ok(())
}

fn span(info: &CompositeInfo<'_>) -> std::ops::Range<usize> {
    let x0 = info.dest_x as usize;
    x0..x0 + info.width as usize
}

fn fill(info: &CompositeInfo<'_>, dest: &mut Image<'_>, argb: u32) -> PixResult<()> {
    let format = dest.format();
    let raw = format.pack(argb);
    let span = span(info);
    each_row(info, dest, |_, row| {
        for x in span.clone() {
            format.write_raw(row, x, raw);
        }
    })
}

fn fill_clear(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    fill(info, dest, 0)
}

fn fill_solid(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    fill(info, dest, solid_color(info.src))
}

fn blit(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    let bytes = dest.format().bpp() as usize / 8;
    let (sx, dx, w) = (info.src_x as usize, info.dest_x as usize, info.width as usize);
    let sy = info.src_y as usize;
    each_row(info, dest, |i, row| {
        let src = info.src.row(sy + i);
        row[dx * bytes..(dx + w) * bytes].copy_from_slice(&src[sx * bytes..(sx + w) * bytes]);
    })
}

/// 32-bit copy with the top byte forced: cleared for padded destinations, set for padded
/// sources.
fn blit_32(info: &CompositeInfo<'_>, dest: &mut Image<'_>, and: u32, or: u32) -> PixResult<()> {
    let (sf, df) = (info.src.format(), dest.format());
    let (sx, sy) = (info.src_x as usize, info.src_y as usize);
    let span = span(info);
    each_row(info, dest, |i, row| {
        let src = info.src.row(sy + i);
        for (k, x) in span.clone().enumerate() {
            df.write_raw(row, x, (sf.read_raw(src, sx + k) & and) | or);
        }
    })
}

fn blit_drop_alpha(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    blit_32(info, dest, 0x00ff_ffff, 0)
}

fn blit_set_alpha(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    blit_32(info, dest, 0x00ff_ffff, 0xff00_0000)
}

/// Per-pixel `dest = f(src, dest)` over an untransformed, unmasked source.
fn src_dest_op(
    info: &CompositeInfo<'_>,
    dest: &mut Image<'_>,
    f: impl Fn(u32, u32) -> u32,
) -> PixResult<()> {
    let (sf, df) = (info.src.format(), dest.format());
    let (sx, sy) = (info.src_x as usize, info.src_y as usize);
    let span = span(info);
    each_row(info, dest, |i, row| {
        let src = info.src.row(sy + i);
        for (k, x) in span.clone().enumerate() {
            let d = df.read_narrow(row, x);
            df.write_narrow(row, x, f(sf.read_narrow(src, sx + k), d));
        }
    })
}

fn required_mask<'i>(info: &CompositeInfo<'i>) -> PixResult<&'i Image<'i>> {
    info.mask.ok_or_else(|| {
        PixError::configuration(format!("{:?} kernel requires a mask", info.op))
    })
}

/// Per-pixel `dest = f(color, mask, dest)` with a solid source.
fn solid_mask_op(
    info: &CompositeInfo<'_>,
    dest: &mut Image<'_>,
    f: impl Fn(u32, u32, u32) -> u32,
) -> PixResult<()> {
    let mask = required_mask(info)?;
    let color = solid_color(info.src);
    let (mf, df) = (mask.format(), dest.format());
    let (mx, my) = (info.mask_x as usize, info.mask_y as usize);
    let span = span(info);
    each_row(info, dest, |i, row| {
        let m_row = mask.row(my + i);
        for (k, x) in span.clone().enumerate() {
            let d = df.read_narrow(row, x);
            df.write_narrow(row, x, f(color, mf.read_narrow(m_row, mx + k), d));
        }
    })
}

fn over_8888(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    src_dest_op(info, dest, |s, d| if alpha(s) == MASK { s } else { over(s, d) })
}

fn add_8888(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    src_dest_op(info, dest, |s, d| un8x4_add_un8x4(d, s))
}

fn over_n_8(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    solid_mask_op(info, dest, |c, m, d| over(in_mask(c, alpha(m)), d))
}

fn over_n_8888_ca(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    solid_mask_op(info, dest, |c, m, d| {
        let s = un8x4_mul_un8x4(c, m);
        let m = un8x4_mul_un8(m, alpha(c));
        un8x4_mul_un8x4_add_un8x4(d, !m, s)
    })
}

/// Byte-wise `dest = f(src, dest)` for a8 onto a8.
fn a8_op(info: &CompositeInfo<'_>, dest: &mut Image<'_>, f: fn(u32, u32) -> u32) -> PixResult<()> {
    let (sx, sy) = (info.src_x as usize, info.src_y as usize);
    let span = span(info);
    each_row(info, dest, |i, row| {
        let src = info.src.row(sy + i);
        for (k, x) in span.clone().enumerate() {
            row[x] = f(u32::from(src[sx + k]), u32::from(row[x])) as u8;
        }
    })
}

/// Byte-wise `dest = f(color alpha, mask, dest)` for a solid source through an a8 mask.
fn a8_solid_op(
    info: &CompositeInfo<'_>,
    dest: &mut Image<'_>,
    f: fn(u32, u32, u32) -> u32,
) -> PixResult<()> {
    let mask = required_mask(info)?;
    let ca = alpha(solid_color(info.src));
    let (mx, my) = (info.mask_x as usize, info.mask_y as usize);
    let span = span(info);
    each_row(info, dest, |i, row| {
        let m_row = mask.row(my + i);
        for (k, x) in span.clone().enumerate() {
            row[x] = f(ca, u32::from(m_row[mx + k]), u32::from(row[x])) as u8;
        }
    })
}

fn add_8_8(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    a8_op(info, dest, add_un8)
}

fn in_8_8(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    a8_op(info, dest, mul_un8)
}

fn add_n_8_8(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    a8_solid_op(info, dest, |a, m, d| add_un8(mul_un8(a, m), d))
}

fn in_n_8_8(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    a8_solid_op(info, dest, |a, m, d| mul_un8(mul_un8(a, m), d))
}

/// Nearest sampling along an affine transform without a mask, `Src` or `Over`.
fn nearest_affine<const OVER: bool>(info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
    let src = info.src;
    let transform = src.transform().copied().unwrap_or(Transform::IDENTITY);
    let m = transform.matrix;
    let (sf, df) = (src.format(), dest.format());
    let (w, h) = (src.width() as i32, src.height() as i32);
    let repeat = src.repeat();
    let span = span(info);

    each_row(info, dest, |i, row| {
        let origin = [
            int_to_fixed(info.src_x).wrapping_add(FIXED_HALF),
            int_to_fixed(info.src_y + i as i32).wrapping_add(FIXED_HALF),
            FIXED_ONE,
        ];
        let start = transform.transform_point_3d(origin);
        let (mut sx, mut sy) = start.map_or((0, 0), |v| (v[0], v[1]));
        for x in span.clone() {
            let s = match (
                start,
                repeat_coord(repeat, fixed_to_int(sx.wrapping_sub(FIXED_E)), w),
                repeat_coord(repeat, fixed_to_int(sy.wrapping_sub(FIXED_E)), h),
            ) {
                (Some(_), Some(px), Some(py)) => sf.read_narrow(src.row(py as usize), px as usize),
                _ => 0,
            };
            let out = if OVER {
                over(s, df.read_narrow(row, x))
            } else {
                s
            };
            df.write_narrow(row, x, out);
            sx = sx.wrapping_add(m[0][0]);
            sy = sy.wrapping_add(m[1][0]);
        }
    })
}

struct Builder {
    paths: Vec<FastPath>,
}

impl Builder {
    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        name: &'static str,
        op: Operator,
        src: FormatMatch,
        src_flags: Flags,
        mask: FormatMatch,
        mask_flags: Flags,
        dest: FormatMatch,
        kernel: KernelFn,
    ) {
        self.paths.push(FastPath {
            name,
            op,
            src,
            src_flags,
            mask,
            mask_flags,
            dest,
            dest_flags: Flags::STD_DEST,
            kernel,
        });
    }
}

/// The portable fast-path table, most specific entries first.
#[rustfmt::skip]
pub fn table() -> Vec<FastPath> {
    use FormatMatch::{Any, Exact, Null, Solid};
    use Operator as O;
    use PixelFormat as F;

    let mut b = Builder { paths: Vec::new() };
    let none = Flags::EMPTY;

    b.add("clear", O::Clear, Any, none, Any, none, Any, fill_clear);
    b.add("solid_fill", O::Src, Solid, SOLID_SOURCE, Null, none, Any, fill_solid);

    for &f in DENSE {
        b.add("src_copy", O::Src, Exact(f), SOURCE, Null, none, Exact(f), blit);
    }
    for (src, dst) in [
        (F::X8R8G8B8, F::X8R8G8B8),
        (F::A8R8G8B8, F::X8R8G8B8),
        (F::X8B8G8R8, F::X8B8G8R8),
        (F::A8B8G8R8, F::X8B8G8R8),
    ] {
        b.add("src_x888", O::Src, Exact(src), SOURCE, Null, none, Exact(dst), blit_drop_alpha);
    }
    for (src, dst) in [(F::X8R8G8B8, F::A8R8G8B8), (F::X8B8G8R8, F::A8B8G8R8)] {
        b.add("src_x888_8888", O::Src, Exact(src), SOURCE, Null, none, Exact(dst), blit_set_alpha);
    }

    for (src, dsts) in [
        (F::A8R8G8B8, [F::A8R8G8B8, F::X8R8G8B8, F::R5G6B5]),
        (F::A8B8G8R8, [F::A8B8G8R8, F::X8B8G8R8, F::B5G6R5]),
    ] {
        for d in dsts {
            b.add("over_8888", O::Over, Exact(src), SOURCE, Null, none, Exact(d), over_8888);
        }
    }

    let unified_mask = SOURCE.union(Flags::UNIFIED_ALPHA);
    let ca_mask = SOURCE.union(Flags::COMPONENT_ALPHA);
    for d in [F::A8R8G8B8, F::X8R8G8B8, F::A8B8G8R8, F::X8B8G8R8, F::R5G6B5, F::B5G6R5] {
        b.add("over_n_8", O::Over, Solid, SOLID_SOURCE, Exact(F::A8), unified_mask, Exact(d), over_n_8);
    }
    for (mask, d) in [
        (F::A8R8G8B8, F::A8R8G8B8),
        (F::A8R8G8B8, F::X8R8G8B8),
        (F::A8R8G8B8, F::R5G6B5),
        (F::A8B8G8R8, F::A8B8G8R8),
        (F::A8B8G8R8, F::X8B8G8R8),
        (F::A8B8G8R8, F::B5G6R5),
    ] {
        b.add("over_n_8888_ca", O::Over, Solid, SOLID_SOURCE, Exact(mask), ca_mask, Exact(d), over_n_8888_ca);
    }

    for f in [F::A8R8G8B8, F::A8B8G8R8] {
        b.add("add_8888", O::Add, Exact(f), SOURCE, Null, none, Exact(f), add_8888);
    }
    b.add("add_8_8", O::Add, Exact(F::A8), SOURCE, Null, none, Exact(F::A8), add_8_8);
    b.add("add_n_8_8", O::Add, Solid, SOLID_SOURCE, Exact(F::A8), unified_mask, Exact(F::A8), add_n_8_8);
    b.add("in_8_8", O::In, Exact(F::A8), SOURCE, Null, none, Exact(F::A8), in_8_8);
    b.add("in_n_8_8", O::In, Solid, SOLID_SOURCE, Exact(F::A8), unified_mask, Exact(F::A8), in_n_8_8);

    for (src, d) in [
        (F::A8R8G8B8, F::A8R8G8B8),
        (F::A8R8G8B8, F::X8R8G8B8),
        (F::X8R8G8B8, F::X8R8G8B8),
        (F::A8B8G8R8, F::A8B8G8R8),
        (F::A8B8G8R8, F::X8B8G8R8),
        (F::X8B8G8R8, F::X8B8G8R8),
    ] {
        b.add("nearest_scaled_src", O::Src, Exact(src), SCALED_SOURCE, Null, none, Exact(d), nearest_affine::<false>);
    }
    for (src, d) in [
        (F::A8R8G8B8, F::A8R8G8B8),
        (F::A8R8G8B8, F::X8R8G8B8),
        (F::A8B8G8R8, F::A8B8G8R8),
        (F::A8B8G8R8, F::X8B8G8R8),
    ] {
        b.add("nearest_scaled_over", O::Over, Exact(src), SCALED_SOURCE, Null, none, Exact(d), nearest_affine::<true>);
    }

    let rotated = Flags::STANDARD
        .union(Flags::NEAREST_FILTER)
        .union(Flags::SAMPLES_COVER_CLIP_NEAREST);
    for rotation in [Flags::ROTATE_90_TRANSFORM, Flags::ROTATE_270_TRANSFORM] {
        for f in [F::A8R8G8B8, F::X8R8G8B8, F::A8B8G8R8, F::X8B8G8R8] {
            b.add("rotate_src", O::Src, Exact(f), rotated.union(rotation), Null, none, Exact(f), nearest_affine::<false>);
        }
    }

    b.paths
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/fast_path.rs"]
mod tests;
