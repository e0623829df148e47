//! The composite entry point: `dest = op(src IN mask, dest)` over a rectangle.
//!
//! A request is clipped to the destination, the sampled extents of source and mask are
//! analysed for coverage, the operator is simplified where opacity allows, and the result is
//! handed to the first matching fast path or to the general engine.

use crate::foundation::error::{PixError, PixResult};
use crate::foundation::fixed::{
    FIXED_E, FIXED_HALF, FIXED_ONE, Fixed, Transform, fixed_to_int, int_to_fixed,
};
use crate::image::{FilterKind, Flags, Image, Repeat};
use crate::operator::Operator;
use crate::pipeline::dispatch::{CompositeInfo, Engine};

/// A half-open box in destination pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extents {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Extents {
    fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    fn intersect(self, other: Extents) -> Extents {
        Extents {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        }
    }
}

/// The destination rectangle clipped to the destination and its alpha map; `None` when empty.
pub fn composite_region(
    dest: &Image<'_>,
    dest_x: i32,
    dest_y: i32,
    width: u32,
    height: u32,
) -> Option<Extents> {
    let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let requested = Extents {
        x1: dest_x,
        y1: dest_y,
        x2: clamp(i64::from(dest_x) + i64::from(width)),
        y2: clamp(i64::from(dest_y) + i64::from(height)),
    };
    let mut region = requested.intersect(Extents {
        x1: 0,
        y1: 0,
        x2: dest.width() as i32,
        y2: dest.height() as i32,
    });
    if let Some(map) = dest.alpha_map() {
        let (ox, oy) = map.origin();
        region = region.intersect(Extents {
            x1: ox,
            y1: oy,
            x2: ox.saturating_add(map.image().width() as i32),
            y2: oy.saturating_add(map.image().height() as i32),
        });
    }
    (!region.is_empty()).then_some(region)
}

/// Sampled extents in 48.16 fixed point.
#[derive(Clone, Copy, Debug)]
struct FixedBox {
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
}

/// Transforms a 16.16 point including the perspective divide.
fn transform_point(t: &Transform, x: Fixed, y: Fixed) -> Option<(i64, i64)> {
    let v = t.transform_point_3d([x, y, FIXED_ONE])?;
    let w = i64::from(v[2]);
    if w == 0 {
        return None;
    }
    let div = |c: Fixed| {
        let q = (i64::from(c) << 16) / w;
        (i64::from(Fixed::MIN)..=i64::from(Fixed::MAX))
            .contains(&q)
            .then_some(q)
    };
    Some((div(v[0])?, div(v[1])?))
}

/// Bounding box of the pixel centers of `e` in source space.
fn transformed_extents(t: Option<&Transform>, e: &Extents) -> Option<FixedBox> {
    let x1 = int_to_fixed(e.x1).checked_add(FIXED_HALF)?;
    let y1 = int_to_fixed(e.y1).checked_add(FIXED_HALF)?;
    let x2 = int_to_fixed(e.x2).checked_sub(FIXED_HALF)?;
    let y2 = int_to_fixed(e.y2).checked_sub(FIXED_HALF)?;

    let Some(t) = t else {
        return Some(FixedBox {
            x1: x1.into(),
            y1: y1.into(),
            x2: x2.into(),
            y2: y2.into(),
        });
    };

    let mut out = FixedBox {
        x1: i64::MAX,
        y1: i64::MAX,
        x2: i64::MIN,
        y2: i64::MIN,
    };
    for (x, y) in [(x1, y1), (x2, y1), (x1, y2), (x2, y2)] {
        let (tx, ty) = transform_point(t, x, y)?;
        out.x1 = out.x1.min(tx);
        out.y1 = out.y1.min(ty);
        out.x2 = out.x2.max(tx);
        out.y2 = out.y2.max(ty);
    }
    Some(out)
}

fn fits_16bit(v: i64) -> bool {
    (i64::from(i16::MIN)..=i64::from(i16::MAX)).contains(&v)
}

/// Widest run of source pixels one sample can touch.
fn footprint(image: &Image<'_>) -> i64 {
    match image.filter() {
        FilterKind::Convolution | FilterKind::SeparableConvolution => {
            let params = image.filter_params();
            let size = |i: usize| params.get(i).map_or(0, |&f| i64::from(fixed_to_int(f)));
            size(0).max(size(1)).max(1)
        }
        FilterKind::Nearest | FilterKind::Bilinear => 1,
    }
}

/// Moves the half-open span `lo..hi` of an untransformed image by a distance that leaves
/// every sample unchanged, landing it as close to the image as the repeat mode allows.
fn fold_span(repeat: Repeat, lo: i64, hi: i64, size: i64, footprint: i64) -> (i64, i64) {
    if size <= 0 {
        return (lo, hi);
    }
    let len = hi - lo;
    let folded = match repeat {
        Repeat::Normal => lo.rem_euclid(size),
        Repeat::Reflect => lo.rem_euclid(size * 2),
        // every sample beyond the margin reads the same edge pixel, or nothing
        Repeat::None | Repeat::Pad => {
            let margin = footprint + 1;
            if lo > size + margin {
                size + margin
            } else if hi < -margin {
                -margin - len
            } else {
                lo
            }
        }
    };
    (folded, folded + len)
}

/// Where `image` is sampled for the destination `region` when `dest_xy` maps to `image_xy`.
///
/// Offsets on untransformed images are folded by the repeat mode, so sampling far from the
/// origin costs nothing and stays in range. Transformed images keep their offsets; positions
/// past the coordinate range saturate and sample transparent.
fn sampled_extents(
    image: &Image<'_>,
    region: Extents,
    image_xy: (i32, i32),
    dest_xy: (i32, i32),
) -> Extents {
    let dx = i64::from(image_xy.0) - i64::from(dest_xy.0);
    let dy = i64::from(image_xy.1) - i64::from(dest_xy.1);
    let (mut x1, mut x2) = (i64::from(region.x1) + dx, i64::from(region.x2) + dx);
    let (mut y1, mut y2) = (i64::from(region.y1) + dy, i64::from(region.y2) + dy);
    if image.transform().is_none() {
        let (repeat, footprint) = (image.repeat(), footprint(image));
        (x1, x2) = fold_span(repeat, x1, x2, image.width().into(), footprint);
        (y1, y2) = fold_span(repeat, y1, y2, image.height().into(), footprint);
    }
    let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    Extents {
        x1: clamp(x1),
        y1: clamp(y1),
        x2: clamp(x2),
        y2: clamp(y2),
    }
}

/// Adds coverage flags for an image sampled over `extents` (in that image's space).
///
/// Returns whether the sample positions could be computed. When they cannot, because the
/// extents leave the 16-bit coordinate range or the projection is singular, the sampler
/// yields transparent pixels and the image must not count as opaque.
pub fn analyze_extent(image: &Image<'_>, extents: &Extents, flags: &mut Flags) -> bool {
    let in_range = fits_16bit(i64::from(extents.x1) - 1)
        && fits_16bit(i64::from(extents.y1) - 1)
        && fits_16bit(i64::from(extents.x2) + 1)
        && fits_16bit(i64::from(extents.y2) + 1);
    if !in_range {
        return false;
    }

    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    if image.flags().contains(Flags::ID_TRANSFORM)
        && extents.x1 >= 0
        && extents.y1 >= 0
        && i64::from(extents.x2) <= w
        && i64::from(extents.y2) <= h
    {
        *flags |= Flags::SAMPLES_COVER_CLIP_NEAREST;
        return true;
    }

    let Some(t) = transformed_extents(image.transform(), extents) else {
        return false;
    };
    let int = |f: i64| f >> 16;
    let e = i64::from(FIXED_E);
    let half = i64::from(FIXED_HALF);

    if int(t.x1 - e) >= 0 && int(t.y1 - e) >= 0 && int(t.x2 - e) < w && int(t.y2 - e) < h {
        *flags |= Flags::SAMPLES_COVER_CLIP_NEAREST;
    }
    if int(t.x1 - half) >= 0 && int(t.y1 - half) >= 0 && int(t.x2 + half) < w && int(t.y2 + half) < h
    {
        *flags |= Flags::SAMPLES_COVER_CLIP_BILINEAR;
    }
    true
}

/// Rewrites `op` into a cheaper equivalent when the source (through the mask) or the
/// destination is opaque.
pub fn optimize_operator(op: Operator, src: Flags, mask: Flags, dest: Flags) -> Operator {
    use Operator::*;
    let src_opaque = (src & mask).contains(Flags::IS_OPAQUE);
    let dest_opaque = dest.contains(Flags::IS_OPAQUE);
    // (neither, source opaque, destination opaque, both)
    let row = match op {
        Over => [Over, Src, Over, Src],
        OverReverse => [OverReverse, OverReverse, Dst, Dst],
        In => [In, In, Src, Src],
        InReverse => [InReverse, Dst, InReverse, Dst],
        Out => [Out, Out, Clear, Clear],
        OutReverse => [OutReverse, Clear, OutReverse, Clear],
        Atop => [Atop, In, Over, Src],
        AtopReverse => [AtopReverse, OverReverse, InReverse, Dst],
        Xor => [Xor, Out, OutReverse, Clear],
        Saturate => [Saturate, OverReverse, Dst, Dst],
        DisjointClear | ConjointClear => return Clear,
        DisjointSrc | ConjointSrc => return Src,
        DisjointDst | ConjointDst => return Dst,
        other => return other,
    };
    row[usize::from(src_opaque) | (usize::from(dest_opaque) << 1)]
}

/// Composites through the process-wide engine.
///
/// `dest = op(src IN mask, dest)` for the `width` x `height` rectangle at `dest_xy`, sampling
/// the source from `src_xy` and the mask from `mask_xy`. Either the whole clipped rectangle
/// is written or an error is returned before any destination pixel changes.
#[allow(clippy::too_many_arguments)]
pub fn composite(
    op: Operator,
    src: &Image<'_>,
    mask: Option<&Image<'_>>,
    dest: &mut Image<'_>,
    src_xy: (i32, i32),
    mask_xy: (i32, i32),
    dest_xy: (i32, i32),
    width: u32,
    height: u32,
) -> PixResult<()> {
    composite_with(
        Engine::global(),
        op,
        src,
        mask,
        dest,
        src_xy,
        mask_xy,
        dest_xy,
        width,
        height,
    )
}

/// [`composite`] with an explicitly configured engine.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(op = ?op, width, height))]
pub fn composite_with(
    engine: &Engine,
    op: Operator,
    src: &Image<'_>,
    mask: Option<&Image<'_>>,
    dest: &mut Image<'_>,
    src_xy: (i32, i32),
    mask_xy: (i32, i32),
    dest_xy: (i32, i32),
    width: u32,
    height: u32,
) -> PixResult<()> {
    let dest_writable =
        dest.is_writable() && dest.alpha_map().is_none_or(|m| m.image().is_writable());
    if !dest_writable {
        return Err(PixError::configuration(
            "composite destination is backed by a read-only buffer",
        ));
    }

    let Some(region) = composite_region(dest, dest_xy.0, dest_xy.1, width, height) else {
        tracing::trace!("empty composite region");
        return Ok(());
    };

    let mut src_flags = src.flags();
    let src_extents = sampled_extents(src, region, src_xy, dest_xy);
    if !analyze_extent(src, &src_extents, &mut src_flags) {
        src_flags.remove(Flags::IS_OPAQUE | Flags::SAMPLES_OPAQUE);
    }

    let mut mask_flags = Flags::IS_OPAQUE | Flags::NO_ALPHA_MAP;
    let mut mask_origin = (0, 0);
    let mask = mask.and_then(|m| {
        let extents = sampled_extents(m, region, mask_xy, dest_xy);
        let mut flags = m.flags();
        if !analyze_extent(m, &extents, &mut flags) {
            flags.remove(Flags::IS_OPAQUE | Flags::SAMPLES_OPAQUE);
        }
        if flags.contains(Flags::IS_OPAQUE) {
            return None;
        }
        mask_flags = flags;
        mask_origin = (extents.x1, extents.y1);
        Some(m)
    });

    for flags in [&mut src_flags, &mut mask_flags] {
        if flags.contains(Flags::NEAREST_OPAQUE) || flags.contains(Flags::BILINEAR_OPAQUE) {
            *flags |= Flags::IS_OPAQUE;
        }
    }

    let dest_flags = dest.flags();
    let reduced = optimize_operator(op, src_flags, mask_flags, dest_flags);

    let info = CompositeInfo {
        op: reduced,
        src,
        mask,
        src_flags,
        mask_flags,
        dest_flags,
        src_x: src_extents.x1,
        src_y: src_extents.y1,
        mask_x: mask_origin.0,
        mask_y: mask_origin.1,
        dest_x: region.x1,
        dest_y: region.y1,
        width: region.x2 - region.x1,
        height: region.y2 - region.y1,
    };

    let selection = engine.select(&info, dest);
    tracing::debug!(
        kernel = selection.name,
        reduced = ?reduced,
        filter = ?src.filter(),
        "composite"
    );
    selection.kernel.run(&info, dest)
}

#[cfg(test)]
#[path = "../tests/unit/composite.rs"]
mod tests;
